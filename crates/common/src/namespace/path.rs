//! Path helpers for the namespace.
//!
//! Paths are absolute, `/`-separated and never carry a trailing slash
//! (except the root itself).

/// Normalize a path to a consistent format
pub fn normalize(path: &str) -> String {
    let path = path.trim();

    if path.is_empty() || path == "/" {
        return "/".to_string();
    }

    // Ensure leading slash, no trailing slash
    let mut normalized = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };

    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }

    normalized
}

/// Join a directory path and a child name
pub fn join(parent: &str, name: &str) -> String {
    let parent = normalize(parent);
    if parent == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Get the parent path of a given path
pub fn parent(path: &str) -> String {
    let normalized = normalize(path);
    if normalized == "/" {
        return "/".to_string();
    }

    match normalized.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(pos) => normalized[..pos].to_string(),
    }
}

/// Get the last component of a path
pub fn filename(path: &str) -> &str {
    let trimmed = path.trim().trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    }
}

/// Iterate over the non-empty components of a path
pub fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|c| !c.is_empty())
}

/// Whether `name` can be used as a single path component
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/') && !name.contains('\0')
}
