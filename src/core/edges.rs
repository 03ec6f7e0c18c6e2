//! Producer/consumer edges
//!
//! A producer repository (a Smithy model) generates an npm package that a
//! consumer repository (an API) depends on. The edge table is plain
//! configuration: the built-in pairs plus whatever consumers declare in
//! their `spk.config.json`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::defaults::REPO_CONFIG_FILE;
use crate::core::registry::Registry;
use crate::error::{ResolverError, SpkError, WorkspaceError};

/// Root of the Smithy projection output inside a producer
pub const SMITHY_OUTPUT_BASE: &str = "smithy/build/smithyprojections/smithy/source";

/// Codegen used for server SDKs unless an edge says otherwise
pub const DEFAULT_CODEGEN: &str = "typescript-ssdk-codegen";

/// Package descriptor that must exist in a complete build
pub const PACKAGE_DESCRIPTOR: &str = "package.json";

/// Compiled-output marker that must exist in a complete build
pub const COMPILED_MARKER: &str = "dist-types";

/// Directory holding a consumer's resolved packages
pub const MODULES_DIR: &str = "node_modules";

/// Producer `P` builds package `K`, consumed by `C`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProducerConsumerEdge {
    /// Repository that builds the package
    pub producer: String,
    /// Repository that depends on the package
    pub consumer: String,
    /// Published package name
    pub package: String,
    /// Codegen projection the package is built into
    pub codegen: String,
}

impl ProducerConsumerEdge {
    /// Create an edge using the default codegen
    pub fn new(
        producer: impl Into<String>,
        consumer: impl Into<String>,
        package: impl Into<String>,
    ) -> Self {
        Self {
            producer: producer.into(),
            consumer: consumer.into(),
            package: package.into(),
            codegen: DEFAULT_CODEGEN.to_string(),
        }
    }

    /// Use a different codegen projection
    #[must_use]
    pub fn with_codegen(mut self, codegen: impl Into<String>) -> Self {
        self.codegen = codegen.into();
        self
    }

    /// Build output directory inside the producer's working copy
    pub fn output_dir(&self, producer_location: &Path) -> PathBuf {
        producer_location
            .join(SMITHY_OUTPUT_BASE)
            .join(&self.codegen)
    }

    /// Resolution entry for the package inside the consumer's working copy
    pub fn link_slot(&self, consumer_location: &Path) -> PathBuf {
        package_slot(consumer_location, &self.package)
    }
}

/// Resolution entry for `package` inside `consumer_location`
pub fn package_slot(consumer_location: &Path, package: &str) -> PathBuf {
    consumer_location.join(MODULES_DIR).join(package)
}

/// Immutable set of producer/consumer edges
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeTable {
    edges: Vec<ProducerConsumerEdge>,
}

impl EdgeTable {
    /// Build a table, rejecting two producers for one (consumer, package)
    ///
    /// Identical duplicate edges are collapsed.
    pub fn new<I>(edges: I) -> Result<Self, ResolverError>
    where
        I: IntoIterator<Item = ProducerConsumerEdge>,
    {
        let mut table = Self::default();
        for edge in edges {
            table.insert(edge)?;
        }
        Ok(table)
    }

    /// The built-in model → API pairs
    pub fn builtin() -> Self {
        Self {
            edges: vec![
                ProducerConsumerEdge::new("AppModel", "AppAPI", "@spark-rewards/sra-sdk"),
                ProducerConsumerEdge::new(
                    "BusinessModel",
                    "BusinessAPI",
                    "@spark-rewards/srw-sdk",
                ),
            ],
        }
    }

    /// A new table with `extra` edges added to this one
    pub fn merged<I>(&self, extra: I) -> Result<Self, ResolverError>
    where
        I: IntoIterator<Item = ProducerConsumerEdge>,
    {
        let mut table = self.clone();
        for edge in extra {
            table.insert(edge)?;
        }
        Ok(table)
    }

    fn insert(&mut self, edge: ProducerConsumerEdge) -> Result<(), ResolverError> {
        if let Some(existing) = self
            .edges
            .iter()
            .find(|e| e.consumer == edge.consumer && e.package == edge.package)
        {
            if *existing == edge {
                return Ok(());
            }
            return Err(ResolverError::ConflictingEdge {
                consumer: edge.consumer,
                package: edge.package,
                first: existing.producer.clone(),
                second: edge.producer,
            });
        }
        self.edges.push(edge);
        Ok(())
    }

    /// All edges
    pub fn edges(&self) -> &[ProducerConsumerEdge] {
        &self.edges
    }

    /// Edges where `consumer` is the consumer
    pub fn producers_for<'a>(
        &'a self,
        consumer: &'a str,
    ) -> impl Iterator<Item = &'a ProducerConsumerEdge> + 'a {
        self.edges.iter().filter(move |e| e.consumer == consumer)
    }

    /// Edges where `producer` is the producer
    pub fn consumers_of<'a>(
        &'a self,
        producer: &'a str,
    ) -> impl Iterator<Item = &'a ProducerConsumerEdge> + 'a {
        self.edges.iter().filter(move |e| e.producer == producer)
    }

    /// Number of edges
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// True if there are no edges
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Per-repo `spk.config.json`: the packages a consumer takes from producers
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoConfig {
    /// Consumed producer packages
    #[serde(default)]
    pub consumes: Vec<ConsumesEntry>,
}

/// One consumed package
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsumesEntry {
    /// Producer repository name
    pub model: String,
    /// Package name the consumer imports
    pub package: String,
    /// Codegen projection to link
    #[serde(default = "default_codegen")]
    pub codegen: String,
}

fn default_codegen() -> String {
    DEFAULT_CODEGEN.to_string()
}

impl RepoConfig {
    /// Parse from a JSON string
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Read `spk.config.json` from a repo; a missing file yields `None`
    pub fn load(repo_dir: &Path) -> Result<Option<Self>, WorkspaceError> {
        let path = repo_dir.join(REPO_CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).map_err(|e| WorkspaceError::ReadError {
            path: path.clone(),
            error: e.to_string(),
        })?;
        Self::from_json(&content)
            .map(Some)
            .map_err(|e| WorkspaceError::ParseError {
                path,
                error: e.to_string(),
            })
    }

    /// Edges declared by `consumer`
    pub fn edges_for(&self, consumer: &str) -> Vec<ProducerConsumerEdge> {
        self.consumes
            .iter()
            .map(|entry| {
                ProducerConsumerEdge::new(&entry.model, consumer, &entry.package)
                    .with_codegen(&entry.codegen)
            })
            .collect()
    }
}

/// Built-in edges merged with those declared by every cloned repo
pub fn workspace_edges(registry: &Registry) -> Result<EdgeTable, SpkError> {
    let mut table = EdgeTable::builtin();
    for repo in registry.all() {
        if let Some(config) = RepoConfig::load(&repo.location)? {
            table = table.merged(config.edges_for(&repo.name))?;
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_is_valid() {
        let builtin = EdgeTable::builtin();
        let rebuilt = EdgeTable::new(builtin.edges().iter().cloned()).unwrap();
        assert_eq!(rebuilt, builtin);
        assert_eq!(builtin.len(), 2);
    }

    #[test]
    fn test_output_dir_follows_codegen() {
        let edge = ProducerConsumerEdge::new("AppModel", "AppAPI", "@spark-rewards/sra-sdk");
        assert_eq!(
            edge.output_dir(Path::new("/ws/AppModel")),
            PathBuf::from(
                "/ws/AppModel/smithy/build/smithyprojections/smithy/source/typescript-ssdk-codegen"
            )
        );

        let client = edge.clone().with_codegen("typescript-client-codegen");
        assert!(client
            .output_dir(Path::new("/ws/AppModel"))
            .ends_with("typescript-client-codegen"));
    }

    #[test]
    fn test_link_slot_keeps_package_scope() {
        let edge = ProducerConsumerEdge::new("AppModel", "AppAPI", "@spark-rewards/sra-sdk");
        assert_eq!(
            edge.link_slot(Path::new("/ws/AppAPI")),
            PathBuf::from("/ws/AppAPI/node_modules/@spark-rewards/sra-sdk")
        );
    }

    #[test]
    fn test_conflicting_producers_rejected() {
        let result = EdgeTable::new([
            ProducerConsumerEdge::new("ModelA", "API", "pkg"),
            ProducerConsumerEdge::new("ModelB", "API", "pkg"),
        ]);
        assert_eq!(
            result.unwrap_err(),
            ResolverError::ConflictingEdge {
                consumer: "API".to_string(),
                package: "pkg".to_string(),
                first: "ModelA".to_string(),
                second: "ModelB".to_string(),
            }
        );
    }

    #[test]
    fn test_identical_edges_collapse() {
        let edge = ProducerConsumerEdge::new("M", "API", "pkg");
        let table = EdgeTable::new([edge.clone(), edge]).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_one_producer_many_consumers() {
        let table = EdgeTable::new([
            ProducerConsumerEdge::new("M", "API", "pkg"),
            ProducerConsumerEdge::new("M", "Web", "pkg"),
        ])
        .unwrap();
        assert_eq!(table.consumers_of("M").count(), 2);
        assert_eq!(table.producers_for("Web").count(), 1);
        assert_eq!(table.producers_for("M").count(), 0);
    }

    #[test]
    fn test_merged_with_declared_edges() {
        let config = RepoConfig::from_json(
            r#"{"consumes":[{"model":"AppModel","package":"@spark-rewards/sra-client","codegen":"typescript-client-codegen"}]}"#,
        )
        .unwrap();

        let table = EdgeTable::builtin()
            .merged(config.edges_for("AppWeb"))
            .unwrap();

        assert_eq!(table.len(), 3);
        let declared = table.producers_for("AppWeb").next().unwrap();
        assert_eq!(declared.producer, "AppModel");
        assert_eq!(declared.codegen, "typescript-client-codegen");
    }

    #[test]
    fn test_repo_config_defaults_codegen() {
        let config =
            RepoConfig::from_json(r#"{"consumes":[{"model":"M","package":"pkg"}]}"#).unwrap();
        assert_eq!(config.consumes[0].codegen, DEFAULT_CODEGEN);
    }

    #[test]
    fn test_repo_config_load_missing_is_none() {
        let temp = tempfile::TempDir::new().unwrap();
        assert!(RepoConfig::load(temp.path()).unwrap().is_none());
    }

    #[test]
    fn test_repo_config_load_invalid_json() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join(REPO_CONFIG_FILE), "{ not json").unwrap();
        assert!(matches!(
            RepoConfig::load(temp.path()),
            Err(WorkspaceError::ParseError { .. })
        ));
    }

    #[test]
    fn test_workspace_edges_reads_declared_consumers() {
        let temp = tempfile::TempDir::new().unwrap();
        let web = temp.path().join("AppWeb");
        std::fs::create_dir_all(&web).unwrap();
        std::fs::write(
            web.join(REPO_CONFIG_FILE),
            r#"{"consumes":[{"model":"AppModel","package":"@spark-rewards/sra-client"}]}"#,
        )
        .unwrap();
        let registry: Registry = [
            crate::core::registry::Repository::new("AppWeb", &web),
            crate::core::registry::Repository::new("AppModel", temp.path().join("AppModel")),
        ]
        .into_iter()
        .collect();

        let table = workspace_edges(&registry).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.consumers_of("AppModel").count(), 2);
    }
}
