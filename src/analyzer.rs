//! Analysis pipeline
//!
//! Phase 1 parses every selected file on a pool of workers, each building a
//! private per-file repository. The coordinator merges them in path order,
//! so entity ids do not depend on thread scheduling, and seals the result.
//! Phase 2 resolves bindings over the whole tree on one thread.

use crate::adapter::{ParsedFile, ProcessorRegistry};
use crate::ignore::IgnoreFilter;
use crate::repo::EntityRepo;
use crate::scope::Inferer;
use crate::ui::{ProgressMessage, ProgressPhase};
use crate::{Error, ParseMessage, Result};
use crossbeam::channel::{self, Sender};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Knobs of one analysis run
#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    /// Type every expression during resolution instead of afterwards
    pub eager_expression_resolve: bool,
    /// Parser workers; 0 picks the available parallelism
    pub threads: usize,
    /// Gitignore-style patterns excluded on top of the defaults
    pub exclude: Vec<String>,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            eager_expression_resolve: true,
            threads: 0,
            exclude: Vec::new(),
        }
    }
}

/// A file that could not be read or parsed
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ParseFailure {
    pub path: String,
    pub message: String,
}

/// Summary of an analysis run
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub root: String,
    pub files: usize,
    /// Declared entities by kind, before built-ins are registered
    pub entities: BTreeMap<String, usize>,
    pub expressions: usize,
    pub typed_expressions: usize,
    pub unresolved: Vec<String>,
    pub parse_errors: Vec<ParseFailure>,
    pub elapsed_ms: u128,
}

impl AnalysisReport {
    pub fn entity_count(&self) -> usize {
        self.entities.values().sum()
    }
}

/// Resolved repository with the resolver that bound it
pub struct Analysis {
    pub repo: EntityRepo,
    pub inferer: Inferer,
    pub report: AnalysisReport,
}

pub struct Analyzer {
    registry: ProcessorRegistry,
    options: AnalyzerOptions,
}

impl Analyzer {
    pub fn new(registry: ProcessorRegistry, options: AnalyzerOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }

    /// Source files under `root` that some processor handles, sorted.
    pub fn collect_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.exists() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", root.display()),
            )));
        }
        let filter = IgnoreFilter::new(root, &self.options.exclude);
        let walker = ignore::WalkBuilder::new(root)
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                !filter.is_ignored(entry.path(), is_dir)
            })
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            if self.registry.find_processor(entry.path()).is_some() {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Parse, merge, seal and resolve everything under `root`.
    pub fn run(&self, root: &Path, progress: Option<&Sender<ProgressMessage>>) -> Result<Analysis> {
        let started = Instant::now();
        let notify = |message: ProgressMessage| {
            if let Some(progress) = progress {
                let _ = progress.send(message);
            }
        };

        let files = self.collect_files(root)?;
        info!("Analyzing {} files under {}", files.len(), root.display());
        notify(ProgressMessage::Started {
            phase: ProgressPhase::Parsing,
            total: files.len(),
        });

        let (mut parsed, parse_errors) = self.parse_all(root, &files, &notify)?;
        notify(ProgressMessage::Finished {
            phase: ProgressPhase::Parsing,
        });

        parsed.sort_by(|a, b| a.path.cmp(&b.path));
        let file_count = parsed.len();
        let mut repo = EntityRepo::new();
        for file in parsed {
            repo.merge(file.entities);
        }
        repo.seal();
        let entities = repo
            .count_by_kind()
            .into_iter()
            .map(|(kind, count)| (kind.to_string(), count))
            .collect();

        notify(ProgressMessage::Started {
            phase: ProgressPhase::Resolving,
            total: repo.len(),
        });
        let inferer = Inferer::new(
            &mut repo,
            &self.registry.built_in_types(),
            self.options.eager_expression_resolve,
        )
        .with_import_lookups(self.registry.import_lookups());
        let unresolved = inferer.resolve_all_bindings(&repo);
        if !self.options.eager_expression_resolve {
            debug!("Typing expressions on demand");
            for entity in repo.iter().filter(|e| e.container().is_some()) {
                repo.resolve_expressions(entity.id(), &inferer);
            }
        }
        notify(ProgressMessage::Finished {
            phase: ProgressPhase::Resolving,
        });

        let (expressions, typed_expressions) = count_expressions(&repo);
        if !unresolved.is_empty() {
            warn!("{} names could not be resolved", unresolved.len());
        }
        info!(
            "Typed {}/{} expressions in {} files",
            typed_expressions, expressions, file_count
        );

        let report = AnalysisReport {
            root: root.display().to_string(),
            files: file_count,
            entities,
            expressions,
            typed_expressions,
            unresolved: unresolved.into_iter().collect(),
            parse_errors,
            elapsed_ms: started.elapsed().as_millis(),
        };
        Ok(Analysis { repo, inferer, report })
    }

    fn parse_all(
        &self,
        root: &Path,
        files: &[PathBuf],
        notify: &dyn Fn(ProgressMessage),
    ) -> Result<(Vec<ParsedFile>, Vec<ParseFailure>)> {
        let threads = match self.options.threads {
            0 => std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            n => n,
        }
        .min(files.len())
        .max(1);

        let (work_tx, work_rx) = channel::unbounded::<&Path>();
        for file in files {
            let _ = work_tx.send(file.as_path());
        }
        drop(work_tx);

        let (result_tx, result_rx) = channel::unbounded::<ParseMessage>();
        let mut parsed = Vec::new();
        let mut failures = Vec::new();

        crossbeam::scope(|s| {
            for _ in 0..threads {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                s.spawn(move |_| {
                    for path in work_rx {
                        if result_tx.send(self.parse_one(root, path)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            for (index, message) in result_rx.iter().enumerate() {
                match message {
                    ParseMessage::Parsed(file) => {
                        notify(ProgressMessage::Progress {
                            phase: ProgressPhase::Parsing,
                            current: index + 1,
                            file: Some(file.path.clone()),
                        });
                        parsed.push(file);
                    }
                    ParseMessage::Failed { path, message } => {
                        error!("Failed to parse {}: {}", path, message);
                        notify(ProgressMessage::Error(format!("{}: {}", path, message)));
                        failures.push(ParseFailure { path, message });
                    }
                }
            }
        })
        .map_err(|_| Error::Processor("parser worker panicked".to_string()))?;

        failures.sort_by(|a, b| a.path.cmp(&b.path));
        Ok((parsed, failures))
    }

    fn parse_one(&self, root: &Path, path: &Path) -> ParseMessage {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let display = relative.to_string_lossy().replace('\\', "/");
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                return ParseMessage::Failed {
                    path: display,
                    message: e.to_string(),
                };
            }
        };
        match self.registry.parse_file(relative, &content) {
            Ok(Some(file)) => ParseMessage::Parsed(file),
            Ok(None) => ParseMessage::Failed {
                path: display,
                message: "no processor for file".to_string(),
            },
            Err(e) => ParseMessage::Failed {
                path: display,
                message: e.to_string(),
            },
        }
    }
}

/// Total and typed expressions over every container
fn count_expressions(repo: &EntityRepo) -> (usize, usize) {
    repo.iter()
        .filter_map(|e| e.container())
        .flat_map(|c| c.expressions().iter())
        .fold((0, 0), |(total, typed), expression| {
            (total + 1, typed + usize::from(expression.get_type().is_some()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::default_registry;
    use crate::entity::{EntityId, EntityKind};
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, path: &str, content: &str) {
        let path = root.join(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn sample_project() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "app/models.py",
            "class User:\n    def greet(self) -> str:\n        return 'hi'\n",
        );
        write(
            dir.path(),
            "app/views.py",
            "from app.models import User\n\ndef show():\n    u = User()\n    return u.greet()\n",
        );
        write(dir.path(), "app/__init__.py", "");
        write(dir.path(), "venv/lib/site.py", "class Hidden: pass\n");
        write(dir.path(), "generated/stub.py", "class Stub: pass\n");
        write(dir.path(), "README.md", "# sample\n");
        dir
    }

    fn function_named(analysis: &Analysis, name: &str) -> EntityId {
        analysis
            .repo
            .iter()
            .find(|e| e.kind() == EntityKind::Function && e.raw_name() == name)
            .unwrap()
            .id()
    }

    fn analyzer(eager: bool, exclude: &[&str]) -> Analyzer {
        let options = AnalyzerOptions {
            eager_expression_resolve: eager,
            threads: 2,
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
        };
        Analyzer::new(default_registry(), options)
    }

    #[test]
    fn test_collect_files_skips_excluded_and_unknown() {
        let dir = sample_project();
        let files = analyzer(true, &["generated/"]).collect_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|f| f.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();

        assert_eq!(names, vec!["app/__init__.py", "app/models.py", "app/views.py"]);
    }

    #[test]
    fn test_run_resolves_across_modules() {
        let dir = sample_project();
        let analysis = analyzer(true, &["generated/"]).run(dir.path(), None).unwrap();
        let report = &analysis.report;

        assert_eq!(report.files, 3);
        assert!(report.parse_errors.is_empty());
        assert!(report.unresolved.is_empty(), "unresolved: {:?}", report.unresolved);
        assert_eq!(report.entities.get("file"), Some(&3));
        assert!(report.typed_expressions > 0);

        let repo = &analysis.repo;
        let show = repo
            .iter()
            .find(|e| e.kind() == EntityKind::Function && e.raw_name() == "show")
            .unwrap()
            .id();
        assert_eq!(repo.get_type(show), analysis.inferer.built_in_type("str"));
    }

    #[test]
    fn test_lazy_mode_types_expressions_afterwards() {
        let dir = sample_project();
        let eager = analyzer(true, &[]).run(dir.path(), None).unwrap();
        let lazy = analyzer(false, &[]).run(dir.path(), None).unwrap();

        assert_eq!(lazy.report.expressions, eager.report.expressions);
        assert_eq!(lazy.report.typed_expressions, eager.report.typed_expressions);

        let show = function_named(&lazy, "show");
        assert_eq!(lazy.repo.get_type(show), lazy.inferer.built_in_type("str"));
    }

    #[test]
    fn test_lazy_mode_infers_constructor_return() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "factory.py", "class User:\n    pass\n\ndef make():\n    return User()\n");

        for eager in [true, false] {
            let analysis = analyzer(eager, &[]).run(dir.path(), None).unwrap();
            let user = analysis
                .repo
                .iter()
                .find(|e| e.kind() == EntityKind::Type && e.raw_name() == "User")
                .unwrap()
                .id();
            let make = function_named(&analysis, "make");
            assert_eq!(analysis.repo.get_type(make), Some(user), "eager = {}", eager);
        }
    }

    #[test]
    fn test_imported_function_call_is_typed() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "util.py", "def helper() -> int:\n    return 1\n");
        write(
            dir.path(),
            "main.py",
            "from util import helper\n\ndef main():\n    return helper()\n",
        );

        let analysis = analyzer(true, &[]).run(dir.path(), None).unwrap();
        let int = analysis.inferer.built_in_type("int");
        assert!(int.is_some());
        assert_eq!(analysis.repo.get_type(function_named(&analysis, "helper")), int);
        assert_eq!(analysis.repo.get_type(function_named(&analysis, "main")), int);
        assert!(analysis.report.unresolved.is_empty(), "unresolved: {:?}", analysis.report.unresolved);
    }

    #[test]
    fn test_language_filter_and_mixed_project() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "main.py", "x = 1\n");
        write(dir.path(), "main.go", "package main\n\nfunc main() {}\n");

        let mut registry = default_registry();
        registry.retain_languages(&["go".to_string()]).unwrap();
        let go_only = Analyzer::new(registry, AnalyzerOptions::default())
            .run(dir.path(), None)
            .unwrap();
        assert_eq!(go_only.report.files, 1);
        assert_eq!(go_only.report.entities.get("package"), Some(&1));

        let both = analyzer(true, &[]).run(dir.path(), None).unwrap();
        assert_eq!(both.report.files, 2);
    }

    #[test]
    fn test_progress_messages_sent() {
        let dir = sample_project();
        let (tx, rx) = channel::unbounded();
        analyzer(true, &[]).run(dir.path(), Some(&tx)).unwrap();
        drop(tx);

        let messages: Vec<ProgressMessage> = rx.iter().collect();
        let parsed = messages
            .iter()
            .filter(|m| matches!(m, ProgressMessage::Progress { .. }))
            .count();
        assert_eq!(parsed, 4);
        assert!(matches!(
            messages.last(),
            Some(ProgressMessage::Finished {
                phase: ProgressPhase::Resolving
            })
        ));
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(analyzer(true, &[]).run(&missing, None).is_err());
    }
}
