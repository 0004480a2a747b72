//! Literal version substitution across the source tree.

use crate::error::VersionError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Version-control metadata directories, never rewritten
const VCS_DIRS: &[&str] = &[".git", ".hg", ".svn", ".bzr", "_darcs", "CVS"];

/// Files touched by a rewrite
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    /// Files whose content changed, relative to the root, in walk order
    pub modified_files: Vec<PathBuf>,
    /// Total substitutions made
    pub replacements: usize,
    /// Files skipped because they are not UTF-8 text
    pub skipped_binary: usize,
    /// Files skipped because version control does not track them
    pub skipped_untracked: usize,
}

/// Replaces one version string with another in every text file under a root
#[derive(Debug, Clone)]
pub struct VersionRewriter {
    root: PathBuf,
    exclude: Vec<String>,
    tracked: Option<HashSet<PathBuf>>,
}

impl VersionRewriter {
    /// Rewriter over `root`, also skipping directories named in `exclude`
    pub fn new<P: AsRef<Path>>(root: P, exclude: &[String]) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            exclude: exclude.to_vec(),
            tracked: None,
        }
    }

    /// Only rewrite these files (paths relative to the root)
    ///
    /// Cleanup restores tracked content only, so anything else must stay untouched.
    pub fn only_tracked<I>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.tracked = Some(files.into_iter().collect());
        self
    }

    fn is_excluded(&self, name: &str) -> bool {
        VCS_DIRS.contains(&name) || self.exclude.iter().any(|e| e == name)
    }

    /// Substitute `old` with `new` everywhere
    ///
    /// Files are visited in sorted order so repeated runs touch files identically.
    pub fn rewrite(&self, old: &str, new: &str) -> Result<RewriteSummary, VersionError> {
        let mut summary = RewriteSummary::default();
        if old.is_empty() || old == new {
            return Ok(summary);
        }

        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !self.is_excluded(&entry.file_name().to_string_lossy())
            });

        for entry in walker {
            let entry = entry.map_err(|e| VersionError::RewriteFailed {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone()),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(&self.root).unwrap_or(path).to_path_buf();
            if let Some(tracked) = &self.tracked
                && !tracked.contains(&relative)
            {
                summary.skipped_untracked += 1;
                continue;
            }

            let bytes = std::fs::read(path).map_err(|source| VersionError::RewriteFailed {
                path: path.to_path_buf(),
                source,
            })?;
            let Ok(text) = String::from_utf8(bytes) else {
                summary.skipped_binary += 1;
                continue;
            };

            let count = text.matches(old).count();
            if count == 0 {
                continue;
            }

            std::fs::write(path, text.replace(old, new)).map_err(|source| {
                VersionError::RewriteFailed {
                    path: path.to_path_buf(),
                    source,
                }
            })?;

            log::debug!("rewrote {} ({} occurrence(s))", relative.display(), count);
            summary.modified_files.push(relative);
            summary.replacements += count;
        }

        Ok(summary)
    }
}
