//! Slash-delimited object path helpers. Paths never carry leading or trailing slashes and the
//! empty string denotes the bucket root.

/// Drops empty components, collapsing duplicate, leading and trailing slashes.
pub fn canonicalize(path: &str) -> String {
    path.split('/')
        .filter(|component| !component.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn parent(path: &str) -> Option<String> {
    if path.is_empty() {
        return None;
    }
    match path.rfind('/') {
        Some(index) => Some(path[..index].to_string()),
        None => Some(String::new()),
    }
}

pub fn child(path: &str, child_path: &str) -> String {
    let canonical_child = canonicalize(child_path);
    match (path.is_empty(), canonical_child.is_empty()) {
        (true, _) => canonical_child,
        (false, true) => path.to_string(),
        (false, false) => format!("{path}/{canonical_child}"),
    }
}

pub fn last_component(path: &str) -> &str {
    match path.rfind('/') {
        Some(index) => &path[index + 1..],
        None => path,
    }
}
