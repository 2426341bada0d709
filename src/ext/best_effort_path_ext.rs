use std::path::{Component, Path, PathBuf};

/// Resolves `path` to an absolute form without requiring it to exist.
///
/// Existing paths are canonicalized. For paths that do not exist yet the
/// longest existing ancestor is canonicalized and the missing tail is
/// appended, after `.` and `..` components have been folded lexically.
pub fn best_effort_absolute(path: &Path) -> PathBuf {
    if let Ok(canonical_path) = path.canonicalize() {
        return canonical_path;
    }

    let absolute_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(current_dir) => current_dir.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let normalized = normalize_path(&absolute_path);
    canonicalize_existing_prefix(&normalized).unwrap_or(normalized)
}

fn canonicalize_existing_prefix(path: &Path) -> Option<PathBuf> {
    let mut missing = Vec::new();
    let mut existing = path;
    loop {
        if let Ok(canonical_path) = existing.canonicalize() {
            return Some(missing.iter().rev().fold(canonical_path, |acc, name| acc.join(name)));
        }
        missing.push(existing.file_name()?);
        existing = existing.parent()?;
    }
}

pub fn best_effort_path_display(path: &Path) -> String {
    best_effort_absolute(path).display().to_string()
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                }
            }
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

pub trait BestEffortPathExt {
    fn best_effort_path_display(&self) -> String;
}

impl BestEffortPathExt for Path {
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(self)
    }
}

impl BestEffortPathExt for PathBuf {
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(self)
    }
}
