//! Document-relative path notation
//!
//! Backing paths are stored the way the host writes relative library paths:
//! a `//` prefix means "relative to the directory of the document". Paths
//! are always resolved before they are checked, and written back in
//! relative form after every link or relocation.

use std::path::{Component, Path, PathBuf};

/// Prefix marking a document-relative path
pub const RELATIVE_PREFIX: &str = "//";

/// Resolve a stored backing path to an absolute filesystem path
pub fn resolve(stored: &str, document_dir: &Path) -> PathBuf {
    match stored.strip_prefix(RELATIVE_PREFIX) {
        Some(rest) => {
            let mut path = document_dir.to_path_buf();
            for part in rest.split(['/', '\\']).filter(|p| !p.is_empty()) {
                path.push(part);
            }
            normalize(&path)
        }
        None => normalize(Path::new(stored)),
    }
}

/// Express `target` relative to `document_dir` in stored notation.
///
/// Falls back to the absolute path when the two do not share a root
/// (different drives on Windows).
pub fn to_document_relative(target: &Path, document_dir: &Path) -> String {
    let target = normalize(target);
    if target.is_relative() {
        return format!("{RELATIVE_PREFIX}{}", join_slash(target.components()));
    }

    let base = normalize(document_dir);
    let target_parts: Vec<Component> = target.components().collect();
    let base_parts: Vec<Component> = base.components().collect();

    if !base.is_absolute() || target_parts.first() != base_parts.first() {
        return target.to_string_lossy().into_owned();
    }

    let common = target_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = std::iter::repeat_n("..".to_string(), base_parts.len() - common)
        .collect();
    parts.extend(
        target_parts[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );

    format!("{RELATIVE_PREFIX}{}", parts.join("/"))
}

/// Lexically remove `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn join_slash<'a>(components: impl Iterator<Item = Component<'a>>) -> String {
    components
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
