//! Shared test harness utilities for rainlint crates.

use std::fs;
use std::path::{Path, PathBuf};

use rainlint_config::Config;
use tempfile::TempDir;

/// Returns a baseline configuration for tests.
pub fn test_config() -> Config {
    Config::default()
}

/// Temporary `Skins` folder laid out the way the skin engine expects:
/// `<tmp>/Skins/<Suite>/@Resources` plus any files written into it.
pub struct SkinTree {
    dir: TempDir,
}

impl SkinTree {
    /// Empty tree with only the `Skins` folder.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create tempdir");
        fs::create_dir_all(dir.path().join("Skins")).expect("create Skins folder");
        SkinTree { dir }
    }

    /// Tree with a `<suite>/@Resources` folder already in place.
    pub fn with_suite(suite: &str) -> Self {
        let tree = Self::new();
        fs::create_dir_all(tree.skins().join(suite).join("@Resources"))
            .expect("create resources folder");
        tree
    }

    /// Temporary directory holding the tree, usable as a project root.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn skins(&self) -> PathBuf {
        self.dir.path().join("Skins")
    }

    /// Write `contents` at `relative` below `Skins`, creating parent folders.
    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.skins().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directory");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    /// Baseline config rooted at the tree.
    pub fn config(&self) -> Config {
        Config::defaults(self.root())
    }
}

impl Default for SkinTree {
    fn default() -> Self {
        Self::new()
    }
}
