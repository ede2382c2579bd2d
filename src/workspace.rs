// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Where a pipeline run's files live. Constructed once by the driver
/// and passed into whatever needs a path; nothing reads ambient
/// global state.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_root(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Store file for one table at one geographic level,
    /// e.g. `<root>/cas001.oa.csb`.
    pub fn store_path(&self, table: &str, level: &str) -> PathBuf {
        self.root.join(format!("{table}.{level}.csb"))
    }

    /// Auxiliary lookup file, e.g. `<root>/oa2ward.lut`.
    pub fn lookup_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.lut"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_rooted_and_suffixed() {
        let ws = Workspace::new("/data/census");
        assert_eq!(
            ws.store_path("cas001", "oa"),
            PathBuf::from("/data/census/cas001.oa.csb")
        );
        assert_eq!(
            ws.lookup_path("oa2ward"),
            PathBuf::from("/data/census/oa2ward.lut")
        );
    }
}
