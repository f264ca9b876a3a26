//! Request path validation for files served from a fixed directory.

use std::path::{Component, Path};

/// Interpret `raw` as a path relative to a served directory.
///
/// Returns `None` for empty, absolute, or parent-escaping inputs; only plain
/// name components are accepted.
pub fn relative_within(raw: &str) -> Option<&Path> {
    if raw.is_empty() || raw.contains('\0') {
        return None;
    }

    let relative = Path::new(raw);
    let mut components = relative.components().peekable();
    components.peek()?;

    components
        .all(|component| matches!(component, Component::Normal(_)))
        .then_some(relative)
}

#[cfg(test)]
mod tests {
    use super::relative_within;

    #[test]
    fn accepts_plain_and_nested_names() {
        assert!(relative_within("2024_03_01-a.md").is_some());
        assert!(relative_within("img/logo.png").is_some());
    }

    #[test]
    fn rejects_traversal_and_absolute_paths() {
        assert!(relative_within("../../etc/passwd").is_none());
        assert!(relative_within("img/../../secret.txt").is_none());
        assert!(relative_within("/etc/passwd").is_none());
        assert!(relative_within("./aboutme.md").is_none());
        assert!(relative_within("").is_none());
    }
}
