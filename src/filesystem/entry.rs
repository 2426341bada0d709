use std::fs::FileType;
use std::io;
use std::path::{Path, PathBuf};

use derive_more::Display;
use walkdir::DirEntry;

/// Represents the type of a filesystem node as seen without following links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EntryKind {
    #[display("directory")]
    Directory,
    #[display("file")]
    File,
    /// Symbolic links, sockets, FIFOs and device nodes
    #[display("special file")]
    Other,
}

impl EntryKind {
    pub fn from_file_type(file_type: FileType) -> Self {
        if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }

    /// Inspects `path` without following a trailing symbolic link.
    ///
    /// Returns `Ok(None)` when nothing exists there, including the case where
    /// one of the ancestors turned out to be a regular file.
    pub fn of_path(path: &Path) -> io::Result<Option<Self>> {
        match path.symlink_metadata() {
            Ok(metadata) => Ok(Some(Self::from_file_type(metadata.file_type()))),
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
                ) =>
            {
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }
}

/// A directory or file discovered during a walk, addressed relative to the
/// root of the tree it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    relative_path: PathBuf,
    kind: EntryKind,
}

impl TreeEntry {
    pub fn new(relative_path: impl Into<PathBuf>, kind: EntryKind) -> Self {
        Self {
            relative_path: relative_path.into(),
            kind,
        }
    }

    /// Builds an entry from a walk rooted at `root`.
    ///
    /// Returns `None` if the walked path does not live under `root`, which
    /// `walkdir` never yields for a walk started at `root`.
    pub fn from_walk(root: &Path, entry: &DirEntry) -> Option<Self> {
        let relative_path = entry.path().strip_prefix(root).ok()?;
        Some(Self::new(
            relative_path,
            EntryKind::from_file_type(entry.file_type()),
        ))
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_root(&self) -> bool {
        self.relative_path.as_os_str().is_empty()
    }

    /// The location of this entry inside the tree rooted at `root`
    pub fn resolve(&self, root: &Path) -> PathBuf {
        if self.is_root() {
            root.to_path_buf()
        } else {
            root.join(&self.relative_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use walkdir::WalkDir;

    #[test]
    fn kind_of_missing_path_is_none() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let kind = EntryKind::of_path(&temp_dir.path().join("missing")).unwrap();
        assert_eq!(kind, None);
    }

    #[test]
    fn kind_of_path_below_a_file_is_none() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();

        let kind = EntryKind::of_path(&file.join("child")).unwrap();

        assert_eq!(kind, None);
    }

    #[test]
    fn kind_distinguishes_files_and_directories() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();

        assert_eq!(EntryKind::of_path(&file).unwrap(), Some(EntryKind::File));
        assert_eq!(
            EntryKind::of_path(temp_dir.path()).unwrap(),
            Some(EntryKind::Directory)
        );
    }

    #[cfg(unix)]
    #[test]
    fn kind_does_not_follow_symlinks() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let link = temp_dir.path().join("link");
        std::os::unix::fs::symlink(temp_dir.path(), &link).unwrap();

        assert_eq!(EntryKind::of_path(&link).unwrap(), Some(EntryKind::Other));
    }

    #[test]
    fn from_walk_strips_the_root() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir_all(temp_dir.path().join("nested/deeper")).unwrap();
        fs::write(temp_dir.path().join("nested/deeper/leaf.txt"), "leaf").unwrap();

        let entries: Vec<TreeEntry> = WalkDir::new(temp_dir.path())
            .into_iter()
            .filter_map(Result::ok)
            .filter_map(|entry| TreeEntry::from_walk(temp_dir.path(), &entry))
            .collect();

        assert!(entries.iter().any(TreeEntry::is_root));
        assert!(entries.contains(&TreeEntry::new(
            "nested/deeper/leaf.txt",
            EntryKind::File
        )));
        assert!(entries.contains(&TreeEntry::new("nested", EntryKind::Directory)));
    }

    #[test]
    fn resolve_maps_the_root_onto_the_root() {
        let root = Path::new("/replica");
        assert_eq!(
            TreeEntry::new("", EntryKind::Directory).resolve(root),
            PathBuf::from("/replica")
        );
        assert_eq!(
            TreeEntry::new("a/b.txt", EntryKind::File).resolve(root),
            PathBuf::from("/replica/a/b.txt")
        );
    }
}
