//! Helpers for building and inspecting throwaway trees in tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use walkdir::WalkDir;

/// A file with the given contents, or a directory when `None`.
pub type Layout<'a> = &'a [(&'a str, Option<&'a str>)];

pub fn write_tree(root: &Path, layout: Layout) {
    for (relative_path, contents) in layout {
        let path = root.join(relative_path);
        match contents {
            Some(contents) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).expect("Failed to create parent directory");
                }
                fs::write(&path, contents).expect("Failed to write fixture file");
            }
            None => fs::create_dir_all(&path).expect("Failed to create fixture directory"),
        }
    }
}

/// Every entry below `root`, keyed by `/`-separated relative path.
/// Directories map to `None`, files to their contents.
pub fn snapshot(root: &Path) -> BTreeMap<String, Option<Vec<u8>>> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|entry| entry.expect("Failed to walk fixture tree"))
        .map(|entry| {
            let relative_path = entry
                .path()
                .strip_prefix(root)
                .expect("Walked outside of the fixture root")
                .components()
                .map(|component| component.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            let contents = if entry.file_type().is_dir() {
                None
            } else {
                Some(fs::read(entry.path()).expect("Failed to read fixture file"))
            };
            (relative_path, contents)
        })
        .collect()
}
