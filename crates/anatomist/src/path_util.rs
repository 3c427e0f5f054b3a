//! Path normalization utilities for cross-platform file handling.

use std::path::{Component, Path};

/// Renders a path as a UTF-8 string with forward slashes, without touching
/// the filesystem. A leading `./` is dropped.
pub fn display_path(path: &Path) -> String {
    let simplified = dunce::simplified(path);
    let s = simplified.to_string_lossy().replace('\\', "/");
    match s.strip_prefix("./") {
        Some(rest) => rest.to_string(),
        None => s,
    }
}

/// Dotted module name for a relative `.py` path, plus whether it is a package.
///
/// `pkg/sub/__init__.py` → `("pkg.sub", true)`, `pkg/util.py` → `("pkg.util", false)`.
pub fn module_name(relative: &Path) -> (String, bool) {
    let is_package = relative.file_stem().is_some_and(|stem| stem == "__init__");
    let mut parts: Vec<String> = relative
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if !is_package {
        if let Some(stem) = relative.file_stem() {
            parts.push(stem.to_string_lossy().into_owned());
        }
    }

    if parts.is_empty() {
        // A bare `__init__.py` at the root.
        return ("__init__".to_string(), is_package);
    }
    (parts.join("."), is_package)
}
