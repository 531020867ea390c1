// Simulated engine configuration

use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory resource paths are resolved against
    pub asset_root: PathBuf,
    /// Hold instances in `LOADING` until `finish_loading` is called
    pub manual_loading: bool,
    /// Resource paths whose load always fails
    pub fail_paths: HashSet<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("."),
            manual_loading: false,
            fail_paths: HashSet::new(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = root.into();
        self
    }

    pub fn with_manual_loading(mut self, manual: bool) -> Self {
        self.manual_loading = manual;
        self
    }

    pub fn with_fail_path(mut self, path: impl Into<String>) -> Self {
        self.fail_paths.insert(path.into());
        self
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.asset_root.join(candidate)
        }
    }

    pub fn should_fail(&self, path: &str) -> bool {
        self.fail_paths.contains(path)
    }
}
