//! Project type detection and command mapping
//!
//! Repos are classified by the marker files in their root, and each type
//! knows how to build, test and run scripts.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::core::registry::Repository;

/// Build commands for repos whose default would be wrong
const KNOWN_BUILD_COMMANDS: &[(&str, &str)] = &[
    ("AppModel", "npm run build:all"),
    ("BusinessModel", "npm run build:all"),
    ("AppAPI", "npm run build"),
    ("BusinessAPI", "npm run build"),
];

/// Test commands for repos whose default would be wrong
const KNOWN_TEST_COMMANDS: &[(&str, &str)] = &[("AppAPI", "npm test"), ("BusinessAPI", "npm test")];

/// Kind of project found in a repo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectType {
    /// `package.json`
    Node,
    /// `build.gradle` or `build.gradle.kts`
    Gradle,
    /// `go.mod`
    Go,
    /// `Makefile`
    Make,
    /// Nothing recognized
    Unknown,
}

impl ProjectType {
    /// Classify a repo given a predicate over root-relative marker files
    ///
    /// Markers are checked in a fixed order, so a repo with both
    /// `package.json` and a `Makefile` is a Node project.
    pub fn classify(has_marker: impl Fn(&str) -> bool) -> Self {
        if has_marker("package.json") {
            Self::Node
        } else if has_marker("build.gradle") || has_marker("build.gradle.kts") {
            Self::Gradle
        } else if has_marker("go.mod") {
            Self::Go
        } else if has_marker("Makefile") {
            Self::Make
        } else {
            Self::Unknown
        }
    }

    /// Classify the repo checked out at `dir`
    pub fn detect(dir: &Path) -> Self {
        Self::classify(|marker| dir.join(marker).is_file())
    }

    /// Default build command
    pub fn build_command(self) -> Option<&'static str> {
        match self {
            Self::Node => Some("npm run build"),
            Self::Gradle => Some("./gradlew build"),
            Self::Go => Some("go build ./..."),
            Self::Make => Some("make"),
            Self::Unknown => None,
        }
    }

    /// Default test command
    pub fn test_command(self, watch: bool) -> Option<&'static str> {
        match (self, watch) {
            (Self::Node, false) => Some("npm test"),
            (Self::Node, true) => Some("npm run test:watch"),
            (Self::Gradle, false) => Some("./gradlew test"),
            (Self::Gradle, true) => Some("./gradlew test --continuous"),
            (Self::Go, _) => Some("go test ./..."),
            (Self::Make, _) => Some("make test"),
            (Self::Unknown, _) => None,
        }
    }

    /// Map a script name to a command
    ///
    /// Node scripts must be declared in `package.json`; `npm_scripts` is
    /// the parsed `scripts` table (or `None` if unreadable).
    pub fn script_command(
        self,
        script: &str,
        extra_args: &[String],
        npm_scripts: Option<&BTreeMap<String, String>>,
    ) -> Option<String> {
        let extra = extra_args.join(" ");
        match self {
            Self::Node => {
                npm_scripts?.get(script)?;
                if extra.is_empty() {
                    Some(format!("npm run {script}"))
                } else {
                    Some(format!("npm run {script} -- {extra}"))
                }
            }
            Self::Gradle => Some(join_words("./gradlew", script, &extra)),
            Self::Make => Some(join_words("make", script, &extra)),
            Self::Go => {
                let targets = if extra.is_empty() { "./..." } else { extra.as_str() };
                match script {
                    "build" => Some(format!("go build {targets}")),
                    "test" => Some(format!("go test {targets}")),
                    "run" if extra.is_empty() => Some("go run .".to_string()),
                    "run" => Some(format!("go run {extra}")),
                    "fmt" => Some("go fmt ./...".to_string()),
                    "vet" => Some("go vet ./...".to_string()),
                    _ => None,
                }
            }
            Self::Unknown => None,
        }
    }

    /// Script names worth suggesting for this project type
    ///
    /// Node lifecycle hooks (`pre*`, `post*`) are hidden.
    pub fn suggested_scripts(self, npm_scripts: Option<&BTreeMap<String, String>>) -> Vec<String> {
        match self {
            Self::Node => npm_scripts
                .into_iter()
                .flat_map(BTreeMap::keys)
                .filter(|name| !name.starts_with("pre") && !name.starts_with("post"))
                .cloned()
                .collect(),
            Self::Gradle => vec!["build".into(), "test".into(), "clean build".into()],
            Self::Go => vec!["build".into(), "test".into(), "fmt".into(), "vet".into()],
            Self::Make => vec!["<target>".into()],
            Self::Unknown => Vec::new(),
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Node => "node",
            Self::Gradle => "gradle",
            Self::Go => "go",
            Self::Make => "make",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

fn join_words(program: &str, script: &str, extra: &str) -> String {
    if extra.is_empty() {
        format!("{program} {script}")
    } else {
        format!("{program} {script} {extra}")
    }
}

fn known(table: &[(&str, &'static str)], name: &str) -> Option<&'static str> {
    table.iter().find(|(n, _)| *n == name).map(|(_, cmd)| *cmd)
}

/// Build command for a repo: manifest override, then known table, then
/// project type default
pub fn resolve_build_command(repo: &Repository, project_type: ProjectType) -> Option<String> {
    repo.build_command
        .clone()
        .or_else(|| known(KNOWN_BUILD_COMMANDS, &repo.name).map(str::to_string))
        .or_else(|| project_type.build_command().map(str::to_string))
}

/// Test command for a repo, resolved like [`resolve_build_command`]
///
/// In watch mode a known npm command switches to its `:watch` script.
pub fn resolve_test_command(
    repo: &Repository,
    project_type: ProjectType,
    watch: bool,
) -> Option<String> {
    if let Some(cmd) = &repo.test_command {
        return Some(if watch { format!("{cmd}:watch") } else { cmd.clone() });
    }
    if let Some(cmd) = known(KNOWN_TEST_COMMANDS, &repo.name) {
        return Some(if watch {
            "npm run test:watch".to_string()
        } else {
            cmd.to_string()
        });
    }
    project_type.test_command(watch).map(str::to_string)
}

/// Parse the `scripts` table out of a `package.json` document
pub fn npm_scripts(package_json: &str) -> Option<BTreeMap<String, String>> {
    #[derive(serde::Deserialize)]
    struct Package {
        #[serde(default)]
        scripts: BTreeMap<String, String>,
    }
    serde_json::from_str::<Package>(package_json)
        .ok()
        .map(|pkg| pkg.scripts)
}

/// Read the `scripts` table of `<dir>/package.json`
pub fn read_npm_scripts(dir: &Path) -> Option<BTreeMap<String, String>> {
    std::fs::read_to_string(dir.join("package.json"))
        .ok()
        .and_then(|content| npm_scripts(&content))
}

/// True if a Node repo has not had its dependencies installed
///
/// npm writes `node_modules/.package-lock.json` on every install.
pub fn needs_npm_install(dir: &Path) -> bool {
    let modules = dir.join("node_modules");
    !modules.is_dir() || !modules.join(".package-lock.json").is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers(present: &'static [&'static str]) -> impl Fn(&str) -> bool {
        move |m| present.contains(&m)
    }

    #[test]
    fn test_classify_marker_priority() {
        assert_eq!(ProjectType::classify(markers(&["package.json", "Makefile"])), ProjectType::Node);
        assert_eq!(ProjectType::classify(markers(&["build.gradle.kts"])), ProjectType::Gradle);
        assert_eq!(ProjectType::classify(markers(&["go.mod", "Makefile"])), ProjectType::Go);
        assert_eq!(ProjectType::classify(markers(&["Makefile"])), ProjectType::Make);
        assert_eq!(ProjectType::classify(markers(&[])), ProjectType::Unknown);
    }

    #[test]
    fn test_build_command_override_wins() {
        let repo = Repository::new("AppModel", "/ws/AppModel").with_build_command("make all");
        assert_eq!(
            resolve_build_command(&repo, ProjectType::Node).as_deref(),
            Some("make all")
        );
    }

    #[test]
    fn test_build_command_known_table() {
        let repo = Repository::new("AppModel", "/ws/AppModel");
        assert_eq!(
            resolve_build_command(&repo, ProjectType::Node).as_deref(),
            Some("npm run build:all")
        );
    }

    #[test]
    fn test_build_command_project_default() {
        let repo = Repository::new("Service", "/ws/Service");
        assert_eq!(
            resolve_build_command(&repo, ProjectType::Go).as_deref(),
            Some("go build ./...")
        );
        assert_eq!(resolve_build_command(&repo, ProjectType::Unknown), None);
    }

    #[test]
    fn test_test_command_watch() {
        let api = Repository::new("AppAPI", "/ws/AppAPI");
        assert_eq!(
            resolve_test_command(&api, ProjectType::Node, true).as_deref(),
            Some("npm run test:watch")
        );

        let custom = Repository::new("Web", "/ws/Web").with_test_command("npm run test:unit");
        assert_eq!(
            resolve_test_command(&custom, ProjectType::Node, true).as_deref(),
            Some("npm run test:unit:watch")
        );
    }

    #[test]
    fn test_npm_script_must_exist() {
        let scripts = npm_scripts(r#"{"scripts":{"build":"tsc","lint":"eslint ."}}"#).unwrap();
        assert_eq!(
            ProjectType::Node.script_command("build", &[], Some(&scripts)).as_deref(),
            Some("npm run build")
        );
        assert_eq!(
            ProjectType::Node
                .script_command("lint", &["--fix".to_string()], Some(&scripts))
                .as_deref(),
            Some("npm run lint -- --fix")
        );
        assert_eq!(ProjectType::Node.script_command("deploy", &[], Some(&scripts)), None);
        assert_eq!(ProjectType::Node.script_command("build", &[], None), None);
    }

    #[test]
    fn test_gradle_and_make_pass_everything_through() {
        assert_eq!(
            ProjectType::Gradle
                .script_command("clean", &["build".to_string()], None)
                .as_deref(),
            Some("./gradlew clean build")
        );
        assert_eq!(
            ProjectType::Make.script_command("deploy", &[], None).as_deref(),
            Some("make deploy")
        );
    }

    #[test]
    fn test_go_scripts() {
        assert_eq!(
            ProjectType::Go.script_command("test", &[], None).as_deref(),
            Some("go test ./...")
        );
        assert_eq!(
            ProjectType::Go
                .script_command("run", &["./cmd/server".to_string()], None)
                .as_deref(),
            Some("go run ./cmd/server")
        );
        assert_eq!(ProjectType::Go.script_command("deploy", &[], None), None);
    }

    #[test]
    fn test_suggested_scripts_hide_lifecycle_hooks() {
        let scripts =
            npm_scripts(r#"{"scripts":{"prebuild":"x","build":"tsc","postbuild":"y","test":"jest"}}"#)
                .unwrap();
        assert_eq!(
            ProjectType::Node.suggested_scripts(Some(&scripts)),
            vec!["build", "test"]
        );
    }

    #[test]
    fn test_npm_scripts_tolerates_missing_table() {
        assert_eq!(npm_scripts(r#"{"name":"x"}"#), Some(BTreeMap::new()));
        assert_eq!(npm_scripts("not json"), None);
    }

    #[test]
    fn test_detect_and_install_state_on_disk() {
        let temp = tempfile::TempDir::new().unwrap();
        assert_eq!(ProjectType::detect(temp.path()), ProjectType::Unknown);

        std::fs::write(temp.path().join("package.json"), r#"{"scripts":{"build":"tsc"}}"#).unwrap();
        assert_eq!(ProjectType::detect(temp.path()), ProjectType::Node);
        assert!(read_npm_scripts(temp.path()).unwrap().contains_key("build"));
        assert!(needs_npm_install(temp.path()));

        std::fs::create_dir(temp.path().join("node_modules")).unwrap();
        assert!(needs_npm_install(temp.path()));
        std::fs::write(temp.path().join("node_modules/.package-lock.json"), "{}").unwrap();
        assert!(!needs_npm_install(temp.path()));
    }
}
