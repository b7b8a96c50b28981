use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;

/// Gitignore-style filter applied while walking the analyzed tree
pub struct IgnoreFilter {
    inner: Gitignore,
}

impl IgnoreFilter {
    pub fn new(root: &Path, extra_excludes: &[String]) -> Self {
        let mut builder = GitignoreBuilder::new(root);

        // 1. Load from .gitignore and .ignore
        builder.add(root.join(".gitignore"));
        builder.add(root.join(".ignore"));

        // 2. Add defaults (global)
        let defaults = [
            // Noise directories
            "target/", "node_modules/", "venv/", ".venv/", "vendor/", "dist/", "build/",
            "__pycache__/", "*.egg-info/", ".git/", ".bindgraph/", ".mypy_cache/", ".tox/",
            // Generated sources
            "*_pb2.py", "*.pb.go", "*_gen.go",
        ];

        for pattern in defaults {
            builder.add_line(None, pattern).ok();
        }

        // 3. Add user config excludes
        for pattern in extra_excludes {
            if builder.add_line(None, pattern).is_err() {
                tracing::warn!("Ignoring invalid exclude pattern: {}", pattern);
            }
        }

        Self {
            inner: builder.build().unwrap_or_else(|_| Gitignore::empty()),
        }
    }

    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        self.inner.matched(path, is_dir).is_ignore()
    }
}
