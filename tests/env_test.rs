//! Integration tests for `spk env`
//!
//! Refresh needs the AWS CLI and a live SSO session, so only the local
//! subcommands are covered here.

mod common;

use common::{assert_success, repo, stderr, stdout, TestProject};

#[test]
fn test_env_show_hints_when_empty() {
    let project = TestProject::new();
    project.create_workspace();

    let output = project.spk(&["env"]);
    assert_success(&output, "spk env");
    assert!(stdout(&output).contains("spk env set KEY=VALUE"));
}

#[test]
fn test_env_set_then_show() {
    let project = TestProject::new();
    let root = project.create_workspace();

    let output = project.spk(&["env", "set", "STAGE=beta", "URL=https://api.example.com/v1?x=1"]);
    assert_success(&output, "spk env set");

    let content = std::fs::read_to_string(root.join(".env")).unwrap();
    assert!(content.contains("STAGE=beta"), "content: {content}");

    let output = project.spk(&["--json", "env", "show"]);
    assert_success(&output, "spk env show");
    let vars: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(vars["STAGE"], "beta");
    assert_eq!(vars["URL"], "https://api.example.com/v1?x=1");
}

#[test]
fn test_env_set_keeps_existing_values() {
    let project = TestProject::new();
    let root = project.create_workspace();
    std::fs::write(root.join(".env"), "KEEP=1\nSTAGE=old\n").unwrap();

    assert_success(&project.spk(&["env", "set", "STAGE=new"]), "spk env set");

    let output = project.spk(&["--json", "env", "show"]);
    let vars: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(vars["KEEP"], "1");
    assert_eq!(vars["STAGE"], "new");
}

#[test]
fn test_env_set_rejects_malformed_assignment() {
    let project = TestProject::new();
    project.create_workspace();

    let output = project.spk(&["env", "set", "NOEQUALS"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("expected KEY=VALUE"));
}

#[test]
fn test_env_show_truncates_long_values() {
    let project = TestProject::new();
    let root = project.create_workspace();
    let long = "x".repeat(80);
    std::fs::write(root.join(".env"), format!("TOKEN={long}\n")).unwrap();

    let output = project.spk(&["env", "show"]);
    assert_success(&output, "spk env show");
    let out = stdout(&output);
    assert!(out.contains("..."), "stdout: {out}");
    assert!(!out.contains(&long));
}

#[test]
fn test_env_export_quotes_values() {
    let project = TestProject::new();
    project.create_workspace();
    assert_success(
        &project.spk(&["env", "set", "GREETING=hello world"]),
        "spk env set",
    );

    let output = project.spk(&["env", "export"]);
    assert_success(&output, "spk env export");
    assert!(stdout(&output).contains("export GREETING=\"hello world\""));
}

#[cfg(unix)]
#[test]
fn test_env_link_points_repos_at_workspace_env() {
    let project = TestProject::new();
    let root = project.create_workspace();
    project.add_repo("AppAPI", repo("AppAPI", None, &[]));
    project.add_repo("Web", repo("Web", None, &[]));
    std::fs::write(root.join("Web/.env"), "LOCAL=1\n").unwrap();

    let output = project.spk(&["env", "link"]);
    assert_success(&output, "spk env link");

    assert!(root.join(".env").is_file(), "workspace .env should be created");
    let linked = root.join("AppAPI/.env");
    assert!(std::fs::symlink_metadata(&linked).unwrap().file_type().is_symlink());

    let kept = root.join("Web/.env");
    assert!(!std::fs::symlink_metadata(&kept).unwrap().file_type().is_symlink());
    assert_eq!(std::fs::read_to_string(kept).unwrap(), "LOCAL=1\n");
}
