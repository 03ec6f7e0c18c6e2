//! Test utilities
//!
//! Proptest generators for repository graphs, and in-memory fakes for the
//! filesystem and build runner seams.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    /// Generate a repository name
    pub fn repo_name() -> impl Strategy<Value = String> {
        "[A-Z][a-zA-Z]{0,10}"
    }

    /// Generate an acyclic dependency graph as `(name, dependencies)` pairs
    ///
    /// Names are unique and shuffled, so name order says nothing about
    /// dependency order.
    pub fn acyclic_graph() -> impl Strategy<Value = Vec<(String, Vec<String>)>> {
        proptest::collection::btree_set(repo_name(), 1..10)
            .prop_map(|names| names.into_iter().collect::<Vec<_>>())
            .prop_shuffle()
            .prop_flat_map(|names| {
                let n = names.len();
                (
                    Just(names),
                    proptest::collection::vec(proptest::collection::vec(any::<bool>(), n), n),
                )
            })
            .prop_map(|(names, matrix)| {
                names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| {
                        let deps = (0..i)
                            .filter(|&j| matrix[i][j])
                            .map(|j| names[j].clone())
                            .collect();
                        (name.clone(), deps)
                    })
                    .collect()
            })
    }
}

#[cfg(test)]
pub mod fakes {
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;

    use crate::core::link::LinkFs;
    use crate::core::orchestrator::{BuildRunner, RunOutcome};
    use crate::error::LinkError;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Entry {
        File,
        Dir,
        Link(PathBuf),
    }

    #[derive(Debug, Default)]
    struct MemState {
        entries: BTreeMap<PathBuf, Entry>,
        link_failure: Option<String>,
    }

    /// In-memory filesystem; clones share state
    #[derive(Debug, Clone, Default)]
    pub struct MemFs {
        state: Rc<RefCell<MemState>>,
    }

    impl MemFs {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_file(&self, path: impl Into<PathBuf>) {
            self.state.borrow_mut().entries.insert(path.into(), Entry::File);
        }

        pub fn add_dir(&self, path: impl Into<PathBuf>) {
            self.state.borrow_mut().entries.insert(path.into(), Entry::Dir);
        }

        pub fn add_link(&self, slot: impl Into<PathBuf>, target: impl Into<PathBuf>) {
            self.state
                .borrow_mut()
                .entries
                .insert(slot.into(), Entry::Link(target.into()));
        }

        /// Make every subsequent link attempt fail
        pub fn fail_links_with(&self, message: &str) {
            self.state.borrow_mut().link_failure = Some(message.to_string());
        }

        pub fn link_target(&self, slot: &Path) -> Option<PathBuf> {
            match self.state.borrow().entries.get(slot) {
                Some(Entry::Link(target)) => Some(target.clone()),
                _ => None,
            }
        }

        /// Follow links through every component of `path`
        fn resolve(&self, path: &Path) -> Option<PathBuf> {
            let state = self.state.borrow();
            let mut resolved = PathBuf::new();
            for component in path.components() {
                resolved.push(component);
                let mut hops = 0;
                while let Some(Entry::Link(target)) = state.entries.get(&resolved) {
                    hops += 1;
                    if hops > 16 {
                        return None;
                    }
                    resolved = if target.is_absolute() {
                        target.clone()
                    } else {
                        resolved.parent().unwrap_or(Path::new("/")).join(target)
                    };
                }
            }
            Some(resolved)
        }

        fn has_entry_at_or_below(&self, path: &Path) -> bool {
            self.state
                .borrow()
                .entries
                .keys()
                .any(|key| key.starts_with(path))
        }
    }

    impl LinkFs for MemFs {
        fn exists(&self, path: &Path) -> bool {
            self.resolve(path)
                .is_some_and(|resolved| self.has_entry_at_or_below(&resolved))
        }

        fn is_link(&self, path: &Path) -> bool {
            matches!(self.state.borrow().entries.get(path), Some(Entry::Link(_)))
        }

        fn occupied(&self, path: &Path) -> bool {
            self.has_entry_at_or_below(path)
        }

        fn attempt_link(&self, source: &Path, slot: &Path) -> Result<(), LinkError> {
            if let Some(error) = self.state.borrow().link_failure.clone() {
                return Err(LinkError::Failed {
                    slot: slot.to_path_buf(),
                    source_dir: source.to_path_buf(),
                    error,
                });
            }
            if self.occupied(slot) {
                return Err(LinkError::Conflict {
                    slot: slot.to_path_buf(),
                });
            }
            self.add_link(slot, source);
            Ok(())
        }

        fn remove_if_link(&self, slot: &Path) -> Result<bool, LinkError> {
            if self.is_link(slot) {
                self.state.borrow_mut().entries.remove(slot);
                return Ok(true);
            }
            Ok(false)
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Behavior {
        exit: Option<i32>,
        interrupted: bool,
        produces: Vec<PathBuf>,
    }

    /// Build runner that records calls and plays back scripted outcomes
    ///
    /// Directories without a script succeed and produce nothing.
    #[derive(Debug)]
    pub struct FakeRunner {
        fs: MemFs,
        scripts: RefCell<BTreeMap<PathBuf, Behavior>>,
        calls: RefCell<Vec<(PathBuf, String)>>,
    }

    impl FakeRunner {
        pub fn new(fs: &MemFs) -> Self {
            Self {
                fs: fs.clone(),
                scripts: RefCell::new(BTreeMap::new()),
                calls: RefCell::new(Vec::new()),
            }
        }

        /// Succeed in `dir`, creating `files`
        pub fn produces<I, P>(&self, dir: impl Into<PathBuf>, files: I)
        where
            I: IntoIterator<Item = P>,
            P: Into<PathBuf>,
        {
            self.scripts.borrow_mut().insert(
                dir.into(),
                Behavior {
                    exit: Some(0),
                    produces: files.into_iter().map(Into::into).collect(),
                    ..Behavior::default()
                },
            );
        }

        /// Exit with `code` in `dir`
        pub fn fails(&self, dir: impl Into<PathBuf>, code: i32) {
            self.scripts.borrow_mut().insert(
                dir.into(),
                Behavior {
                    exit: Some(code),
                    ..Behavior::default()
                },
            );
        }

        /// Report cancellation in `dir`
        pub fn interrupted(&self, dir: impl Into<PathBuf>) {
            self.scripts.borrow_mut().insert(
                dir.into(),
                Behavior {
                    interrupted: true,
                    ..Behavior::default()
                },
            );
        }

        /// Directories a build ran in, in call order
        pub fn dirs(&self) -> Vec<PathBuf> {
            self.calls.borrow().iter().map(|(dir, _)| dir.clone()).collect()
        }

        /// Commands run, in call order
        pub fn commands(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|(_, cmd)| cmd.clone()).collect()
        }
    }

    impl BuildRunner for FakeRunner {
        async fn run(&self, command: &str, working_dir: &Path) -> std::io::Result<RunOutcome> {
            self.calls
                .borrow_mut()
                .push((working_dir.to_path_buf(), command.to_string()));

            let behavior = self
                .scripts
                .borrow()
                .get(working_dir)
                .cloned()
                .unwrap_or(Behavior {
                    exit: Some(0),
                    ..Behavior::default()
                });

            if behavior.interrupted {
                return Ok(RunOutcome::Interrupted);
            }
            for file in behavior.produces {
                self.fs.add_file(file);
            }
            Ok(RunOutcome::Exited(behavior.exit))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::MemFs;
    use super::generators::*;
    use crate::config::defaults::MIN_PROPTEST_ITERATIONS;
    use crate::core::link::LinkFs;
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use std::path::Path;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(MIN_PROPTEST_ITERATIONS))]

        #[test]
        fn test_acyclic_graph_names_unique(graph in acyclic_graph()) {
            let names: BTreeSet<_> = graph.iter().map(|(n, _)| n.clone()).collect();
            prop_assert_eq!(names.len(), graph.len());
        }

        #[test]
        fn test_acyclic_graph_deps_point_backwards(graph in acyclic_graph()) {
            for (i, (_, deps)) in graph.iter().enumerate() {
                for dep in deps {
                    let pos = graph.iter().position(|(n, _)| n == dep).unwrap();
                    prop_assert!(pos < i);
                }
            }
        }
    }

    #[test]
    fn test_memfs_follows_links_through_parents() {
        let fs = MemFs::new();
        fs.add_file("/ws/Model/out/package.json");
        fs.add_link("/ws/API/node_modules/pkg", "/ws/Model/out");

        assert!(fs.exists(Path::new("/ws/API/node_modules/pkg/package.json")));
        assert!(fs.exists(Path::new("/ws/API/node_modules")));
        assert!(!fs.exists(Path::new("/ws/API/node_modules/pkg/missing")));
    }

    #[test]
    fn test_memfs_dangling_link_is_occupied_not_existing() {
        let fs = MemFs::new();
        fs.add_link("/ws/API/node_modules/pkg", "/nowhere");

        let slot = Path::new("/ws/API/node_modules/pkg");
        assert!(fs.occupied(slot));
        assert!(fs.is_link(slot));
        assert!(!fs.exists(slot));
    }
}
