use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

use crate::error::MirrorError;

/// Ephemeral workspace holding downloads and transforms for one run. The
/// backing directory is removed when the value is dropped; nothing in it is
/// durable state.
pub struct Scratch {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Scratch {
    pub fn new() -> Result<Self, MirrorError> {
        let dir = tempfile::Builder::new()
            .prefix("refmirror")
            .tempdir()
            .map_err(|err| MirrorError::Filesystem(err.to_string()))?;
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|_| MirrorError::Filesystem("non-utf8 scratch path".to_string()))?;
        Ok(Self { _dir: dir, root })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Scratch location for a downloaded file, keyed by its base name.
    pub fn file_path(&self, base: &str) -> Utf8PathBuf {
        self.root.join(base)
    }

    /// Scratch location for a mirrored folder, keyed by its base name.
    pub fn folder_path(&self, base: &str) -> Utf8PathBuf {
        self.root.join(base)
    }
}

/// All regular files under `root`, recursively, in sorted order.
pub fn walk_files(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>, MirrorError> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(path) = stack.pop() {
        let entries =
            fs::read_dir(path.as_std_path()).map_err(|err| MirrorError::Filesystem(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| MirrorError::Filesystem(err.to_string()))?;
            let entry_path = Utf8PathBuf::from_path_buf(entry.path())
                .map_err(|_| MirrorError::Filesystem("non-utf8 scratch entry".to_string()))?;
            if entry_path.is_dir() {
                stack.push(entry_path);
            } else {
                files.push(entry_path);
            }
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_paths_live_under_root() {
        let scratch = Scratch::new().unwrap();
        let path = scratch.file_path("nt.gz");
        assert_eq!(path.parent().unwrap(), scratch.root());
        assert_eq!(path.file_name().unwrap(), "nt.gz");
    }

    #[test]
    fn walk_files_is_recursive_and_sorted() {
        let scratch = Scratch::new().unwrap();
        let dir = scratch.folder_path("accession2taxid");
        fs::create_dir_all(dir.join("sub").as_std_path()).unwrap();
        fs::write(dir.join("b.gz").as_std_path(), b"b").unwrap();
        fs::write(dir.join("a.gz").as_std_path(), b"a").unwrap();
        fs::write(dir.join("sub/c.gz").as_std_path(), b"c").unwrap();

        let files = walk_files(&dir).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|path| path.strip_prefix(&dir).unwrap().as_str())
            .collect();
        assert_eq!(names, vec!["a.gz", "b.gz", "sub/c.gz"]);
    }
}
