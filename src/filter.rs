use crate::constants::IGNORED_EXTENSION_GROUPS;
use crate::utils;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Groups of extensions that are never tagged
#[derive(Debug, Clone)]
pub struct IgnoredExtensions {
    groups: Vec<HashSet<String>>,
}

impl IgnoredExtensions {
    pub fn new(groups: &[&[&str]]) -> Self {
        Self {
            groups: groups
                .iter()
                .map(|group| group.iter().map(|ext| ext.to_lowercase()).collect())
                .collect(),
        }
    }

    /// True when the suffix belongs to any group
    pub fn contains(&self, suffix: &str) -> bool {
        self.groups.iter().any(|group| group.contains(suffix))
    }
}

impl Default for IgnoredExtensions {
    fn default() -> Self {
        Self::new(IGNORED_EXTENSION_GROUPS)
    }
}

/// Lowercase text after the last `.` of the file name
fn suffix(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
}

/// Drop paths whose suffix is ignored, preserving the order of the rest
pub fn filter_ignored(paths: Vec<PathBuf>, ignored: &IgnoredExtensions) -> Vec<PathBuf> {
    paths
        .into_iter()
        .filter(|path| match suffix(path) {
            Some(ext) if ignored.contains(&ext) => {
                debug!(path = %path.display(), "Ignoring file because of extension");
                false
            }
            _ => true,
        })
        .collect()
}

/// Selected files followed by every file found below the selected folders
pub fn expand_selection(files: &[PathBuf], folders: &[PathBuf]) -> Vec<PathBuf> {
    let mut paths = files.to_vec();
    for folder in folders {
        let inner = utils::collect_files_recursive(folder);
        debug!(folder = %folder.display(), count = inner.len(), "Expanded selected folder");
        paths.extend(inner);
    }
    paths
}
