/// Whether a path is absolute. Lookup paths (`?...`) are absolute too.
pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || path.starts_with('?')
}

/// Resolve `path` against the absolute path of a binding context.
///
/// Returns `None` when a relative path has nothing to resolve against and
/// legacy syntax (relative paths promoted to the root) is disabled. A
/// resolved path never ends in `/` unless it is the root itself.
pub fn resolve(path: &str, context: Option<&str>, legacy_syntax: bool) -> Option<String> {
    let resolved = if path.is_empty() {
        context?.to_string()
    } else if is_absolute(path) {
        path.to_string()
    } else if let Some(base) = context {
        if base.ends_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    } else if legacy_syntax {
        format!("/{}", path)
    } else {
        return None;
    };

    Some(trim_trailing_slash(resolved))
}

fn trim_trailing_slash(mut path: String) -> String {
    while path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    path
}
