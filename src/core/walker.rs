use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::core::config::ScanSettings;

/// Enumerates candidate source files below a root directory.
///
/// Entries are visited in file-name order within each directory so that two
/// walks over the same tree always yield the same sequence. Hidden directories
/// and configured build-output directories are pruned before descending.
#[derive(Debug, Clone)]
pub struct TreeWalker {
    extension: String,
    excluded_dirs: Vec<String>,
    skip_hidden: bool,
}

impl TreeWalker {
    pub fn new(settings: &ScanSettings) -> Self {
        Self {
            extension: settings.source_extension.trim_start_matches('.').to_string(),
            excluded_dirs: settings.excluded_dirs.clone(),
            skip_hidden: settings.skip_hidden,
        }
    }

    /// Lazily walks `root`, yielding files with the configured extension.
    ///
    /// Symlinks to regular files are yielded; symlinked directories are not
    /// descended into. Directory read errors (permissions, races with
    /// deletion) are logged at debug level and the affected subtree is skipped.
    pub fn walk<'a>(&'a self, root: &Path) -> impl Iterator<Item = PathBuf> + 'a {
        WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| entry.depth() == 0 || !self.is_pruned(entry))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(error = %e, "Skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| {
                entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
            })
            .map(DirEntry::into_path)
            .filter(move |path| self.has_source_extension(path))
    }

    fn is_pruned(&self, entry: &DirEntry) -> bool {
        if !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        (self.skip_hidden && name.starts_with('.'))
            || self.excluded_dirs.iter().any(|excluded| *excluded == name)
    }

    fn has_source_extension(&self, path: &Path) -> bool {
        path.extension() == Some(OsStr::new(&self.extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "class A {}").unwrap();
    }

    #[test]
    fn test_walk_prunes_hidden_and_build_directories() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("src/main/java/Keep.java"));
        touch(&root.join(".git/objects/Hidden.java"));
        touch(&root.join("build/generated/Generated.java"));
        touch(&root.join("module/target/classes/Compiled.java"));
        touch(&root.join("src/main/resources/notes.txt"));

        let walker = TreeWalker::new(&ScanSettings::default());
        let found: Vec<PathBuf> = walker.walk(root).collect();

        assert_eq!(found, vec![root.join("src/main/java/Keep.java")]);
    }

    #[test]
    fn test_walk_order_is_lexicographic() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("b/Second.java"));
        touch(&root.join("a/Zeta.java"));
        touch(&root.join("a/Alpha.java"));

        let walker = TreeWalker::new(&ScanSettings::default());
        let found: Vec<PathBuf> = walker.walk(root).collect();

        assert_eq!(
            found,
            vec![
                root.join("a/Alpha.java"),
                root.join("a/Zeta.java"),
                root.join("b/Second.java"),
            ]
        );
    }

    #[test]
    fn test_root_named_like_excluded_directory_is_still_walked() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("build");
        touch(&root.join("Inside.java"));

        let walker = TreeWalker::new(&ScanSettings::default());
        assert_eq!(walker.walk(&root).count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("ok/Keep.java"));
        let locked = root.join("locked");
        touch(&locked.join("Secret.java"));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users bypass directory permissions.
        let bypassed = fs::read_dir(&locked).is_ok();
        let found: Vec<PathBuf> = TreeWalker::new(&ScanSettings::default())
            .walk(root)
            .collect();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(found.contains(&root.join("ok/Keep.java")));
        if !bypassed {
            assert_eq!(found.len(), 1);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_source_file_is_yielded() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("outside/Real.java");
        touch(&target);
        let root = dir.path().join("repo");
        fs::create_dir_all(&root).unwrap();
        std::os::unix::fs::symlink(&target, root.join("Linked.java")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("missing.java"), root.join("Dangling.java"))
            .unwrap();

        let found: Vec<PathBuf> = TreeWalker::new(&ScanSettings::default())
            .walk(&root)
            .collect();
        assert_eq!(found, vec![root.join("Linked.java")]);
    }

    #[test]
    fn test_extension_with_leading_dot_is_accepted() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("Rule.kt"));
        touch(&dir.path().join("Rule.java"));

        let settings = ScanSettings {
            source_extension: ".kt".to_string(),
            ..ScanSettings::default()
        };
        let found: Vec<PathBuf> = TreeWalker::new(&settings).walk(dir.path()).collect();
        assert_eq!(found, vec![dir.path().join("Rule.kt")]);
    }
}
