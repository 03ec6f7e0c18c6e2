//! Integration tests for `spk build`, `spk test`, `spk run` and `spk cdk`
//!
//! Build commands are plain shell snippets so the tests need no toolchains.

mod common;

use common::{assert_success, repo, stderr, stdout, TestProject};

/// Shell snippet that produces a complete model package
const MODEL_BUILD: &str = "mkdir -p smithy/build/smithyprojections/smithy/source/typescript-ssdk-codegen/dist-types && echo '{}' > smithy/build/smithyprojections/smithy/source/typescript-ssdk-codegen/package.json";

/// Build command that records the repo name in `../order.log`
fn logging_build(name: &str) -> String {
    format!("echo {name} >> ../order.log")
}

fn build_log(project: &TestProject) -> Vec<String> {
    std::fs::read_to_string(project.workspace_root().join("order.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

// ============================================
// Planning
// ============================================

#[test]
fn test_plan_puts_dependencies_first() {
    let project = TestProject::new();
    project.create_workspace();
    project.add_repo("Api", repo("Api", None, &["Model"]));
    project.add_repo("Model", repo("Model", None, &["Base"]));
    project.add_repo("Base", repo("Base", None, &[]));

    let output = project.spk(&["--json", "build", "--plan"]);
    assert_success(&output, "spk build --plan");

    let plan: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(plan["order"], serde_json::json!(["Base", "Model", "Api"]));
}

#[test]
fn test_plan_includes_builtin_model_edges() {
    let project = TestProject::new();
    project.create_workspace();
    project.add_repo("AppAPI", repo("AppAPI", None, &[]));
    project.add_repo("AppModel", repo("AppModel", None, &[]));

    let output = project.spk(&["--json", "build", "--plan"]);
    assert_success(&output, "spk build --plan");

    let plan: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(plan["order"], serde_json::json!(["AppModel", "AppAPI"]));
}

#[test]
fn test_cycle_is_rejected_before_building() {
    let project = TestProject::new();
    project.create_workspace();
    project.add_repo("X", repo("X", Some(&logging_build("X")), &["Y"]));
    project.add_repo("Y", repo("Y", Some(&logging_build("Y")), &["X"]));

    let output = project.spk(&["build", "--all"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Circular dependency"), "stderr: {}", stderr(&output));
    assert!(build_log(&project).is_empty());
}

#[test]
fn test_unregistered_dependency_is_rejected() {
    let project = TestProject::new();
    project.create_workspace();
    project.add_repo("Api", repo("Api", None, &["Ghost"]));

    let output = project.spk(&["build", "--plan"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Ghost"));
}

// ============================================
// Building
// ============================================

#[test]
fn test_build_all_runs_in_dependency_order() {
    let project = TestProject::new();
    project.create_workspace();
    project.add_repo("Api", repo("Api", Some(&logging_build("Api")), &["Model"]));
    project.add_repo("Model", repo("Model", Some(&logging_build("Model")), &[]));

    let output = project.spk(&["build", "--all"]);
    assert_success(&output, "spk build --all");
    assert_eq!(build_log(&project), ["Model", "Api"]);
}

#[test]
fn test_build_all_stops_at_first_failure() {
    let project = TestProject::new();
    project.create_workspace();
    project.add_repo("A", repo("A", Some(&logging_build("A")), &[]));
    project.add_repo("B", repo("B", Some("exit 3"), &["A"]));
    project.add_repo("C", repo("C", Some(&logging_build("C")), &["B"]));

    let output = project.spk(&["build", "--all"]);
    assert!(!output.status.success());
    assert_eq!(build_log(&project), ["A"]);

    let out = stdout(&output);
    assert!(out.contains("C: not attempted"), "stdout: {out}");
    assert!(stderr(&output).contains("exit status 3"), "stderr: {}", stderr(&output));
}

#[test]
fn test_build_uses_repo_containing_current_directory() {
    let project = TestProject::new();
    let root = project.create_workspace();
    project.add_repo("Model", repo("Model", Some("touch built.txt"), &[]));
    project.add_repo("Other", repo("Other", Some("touch built.txt"), &[]));
    std::fs::create_dir_all(root.join("Model/src")).unwrap();

    let output = project.spk_in(&root.join("Model/src"), &["build"]);
    assert_success(&output, "spk build");

    assert!(root.join("Model/built.txt").exists());
    assert!(!root.join("Other/built.txt").exists());
}

#[test]
fn test_build_outside_a_repo_needs_a_target() {
    let project = TestProject::new();
    project.create_workspace();
    project.add_repo("Model", repo("Model", Some("true"), &[]));

    let output = project.spk(&["build"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Not inside a repo"));
}

#[test]
fn test_repo_without_build_command_is_skipped() {
    let project = TestProject::new();
    project.create_workspace();
    project.add_repo("Docs", repo("Docs", None, &[]));

    let output = project.spk(&["build", "Docs"]);
    assert_success(&output, "spk build Docs");
    assert!(stdout(&output).contains("no build command"));
}

#[test]
fn test_build_sees_workspace_env() {
    let project = TestProject::new();
    let root = project.create_workspace();
    std::fs::write(root.join(".env"), "STAGE=beta\n").unwrap();
    project.add_repo("Model", repo("Model", Some("echo $STAGE > stage.txt"), &[]));

    let output = project.spk(&["build", "Model"]);
    assert_success(&output, "spk build Model");
    assert_eq!(
        std::fs::read_to_string(root.join("Model/stage.txt")).unwrap().trim(),
        "beta"
    );
}

// ============================================
// Linking
// ============================================

#[cfg(unix)]
#[test]
fn test_build_links_model_output_into_api() {
    let project = TestProject::new();
    let root = project.create_workspace();
    project.add_repo("AppModel", repo("AppModel", Some(MODEL_BUILD), &[]));
    project.add_repo("AppAPI", repo("AppAPI", Some("true"), &[]));

    let output = project.spk(&["build", "--all"]);
    assert_success(&output, "spk build --all");

    let slot = root.join("AppAPI/node_modules/@spark-rewards/sra-sdk");
    let meta = std::fs::symlink_metadata(&slot).expect("package slot should exist");
    assert!(meta.file_type().is_symlink());
    assert!(slot.join("package.json").is_file());
}

#[cfg(unix)]
#[test]
fn test_no_link_leaves_consumer_alone() {
    let project = TestProject::new();
    let root = project.create_workspace();
    project.add_repo("AppModel", repo("AppModel", Some(MODEL_BUILD), &[]));
    project.add_repo("AppAPI", repo("AppAPI", Some("true"), &[]));

    let output = project.spk(&["build", "--all", "--no-link"]);
    assert_success(&output, "spk build --all --no-link");
    assert!(!root.join("AppAPI/node_modules").exists());
}

#[cfg(unix)]
#[test]
fn test_real_package_directory_is_never_replaced() {
    let project = TestProject::new();
    let root = project.create_workspace();
    project.add_repo("AppModel", repo("AppModel", Some(MODEL_BUILD), &[]));
    project.add_repo("AppAPI", repo("AppAPI", Some("true"), &[]));
    let slot = root.join("AppAPI/node_modules/@spark-rewards/sra-sdk");
    std::fs::create_dir_all(&slot).unwrap();
    std::fs::write(slot.join("installed.txt"), "published").unwrap();

    let output = project.spk(&["build", "--all"]);
    assert_success(&output, "spk build --all");

    assert!(!std::fs::symlink_metadata(&slot).unwrap().file_type().is_symlink());
    assert!(slot.join("installed.txt").exists());
    assert!(stderr(&output).contains("not a link"), "stderr: {}", stderr(&output));
}

// ============================================
// spk test
// ============================================

#[test]
fn test_test_all_reports_every_failure() {
    let project = TestProject::new();
    let root = project.create_workspace();
    let mut passing = repo("Good", None, &[]);
    passing.test_command = Some("touch tested.txt".to_string());
    let mut failing = repo("Bad", None, &[]);
    failing.test_command = Some("exit 1".to_string());
    project.add_repo("Bad", failing);
    project.add_repo("Good", passing);

    let output = project.spk(&["test", "--all"]);
    assert!(!output.status.success());
    assert!(root.join("Good/tested.txt").exists());
    assert!(stderr(&output).contains("Bad"));
}

// ============================================
// spk run
// ============================================

#[test]
fn test_run_outside_repo_runs_command_at_root() {
    let project = TestProject::new();
    let root = project.create_workspace();
    std::fs::write(root.join(".env"), "GREETING=hello\n").unwrap();

    let output = project.spk(&["run", "echo $GREETING > greeting.txt"]);
    assert_success(&output, "spk run");
    assert_eq!(
        std::fs::read_to_string(root.join("greeting.txt")).unwrap().trim(),
        "hello"
    );
}

#[cfg(unix)]
#[test]
fn test_run_script_in_repo_uses_login_shell() {
    use std::os::unix::fs::PermissionsExt;

    let project = TestProject::new();
    let root = project.create_workspace();
    project.add_repo("Service", repo("Service", None, &[]));
    std::fs::write(root.join("Service/build.gradle"), "").unwrap();
    std::fs::write(root.join("Service/gradlew"), "#!/bin/sh\necho \"$@\" > ran.txt\n").unwrap();

    // Login shell wrapper: records its flags, then runs the command
    project.create_file(
        "bin/login-sh",
        "#!/bin/sh\necho \"$1\" > \"$PWD/shell-flags.txt\"\nexec /bin/sh \"$@\"\n",
    );
    for script in [root.join("Service/gradlew"), project.path().join("bin/login-sh")] {
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    let output = project
        .command(&root.join("Service"), &["run", "assemble"])
        .env("SHELL", project.path().join("bin/login-sh"))
        .output()
        .unwrap();
    assert_success(&output, "spk run assemble");

    let flags = std::fs::read_to_string(root.join("Service/shell-flags.txt")).unwrap();
    assert_eq!(flags.trim(), "-l");
    let ran = std::fs::read_to_string(root.join("Service/ran.txt")).unwrap();
    assert_eq!(ran.trim(), "assemble");
}

#[test]
fn test_run_unknown_script_in_repo_fails() {
    let project = TestProject::new();
    let root = project.create_workspace();
    project.add_repo("Docs", repo("Docs", None, &[]));

    let output = project.spk_in(&root.join("Docs"), &["run", "deploy"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Script 'deploy' not found"));
}

// ============================================
// spk cdk
// ============================================

#[cfg(unix)]
#[test]
fn test_cdk_runs_in_repo_with_cdk_json() {
    use std::os::unix::fs::PermissionsExt;

    let project = TestProject::new();
    let root = project.create_workspace();
    project.add_repo("AppAPI", repo("AppAPI", None, &[]));
    project.add_repo("CorePipeline", repo("CorePipeline", None, &[]));
    std::fs::write(root.join("CorePipeline/cdk.json"), "{}").unwrap();

    // Stand-in cdk that records its arguments where it ran
    project.create_file("bin/cdk", "#!/bin/sh\necho \"$@\" > cdk-args.txt\n");
    let cdk = project.path().join("bin/cdk");
    std::fs::set_permissions(&cdk, std::fs::Permissions::from_mode(0o755)).unwrap();
    let path = format!(
        "{}:{}",
        project.path().join("bin").display(),
        std::env::var("PATH").unwrap_or_default()
    );

    let output = project
        .command(&root.join("AppAPI"), &["cdk", "diff", "--context", "stage=beta"])
        .env("PATH", path)
        .output()
        .unwrap();
    assert_success(&output, "spk cdk diff");

    let args = std::fs::read_to_string(root.join("CorePipeline/cdk-args.txt")).unwrap();
    assert_eq!(args.trim(), "diff --context stage=beta");
}

#[test]
fn test_cdk_without_app_fails() {
    let project = TestProject::new();
    project.create_workspace();
    project.add_repo("AppAPI", repo("AppAPI", None, &[]));

    let output = project.spk(&["cdk", "list"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("No CDK app"), "stderr: {}", stderr(&output));
}
