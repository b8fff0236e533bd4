//! Parameter name helpers.
//!
//! Names are `/`-separated paths.  A name or namespace is *absolute* when it
//! starts with the separator.  Namespaces handed to a store are normalised to
//! end with the separator so that prefix matching never splits a segment:
//! `/a/` selects `/a/x` but not `/ab/x`.

use rush_types::ParamError;

/// Path separator for parameter names.
pub const SEPARATOR: char = '/';

/// `true` when `name` starts with [`SEPARATOR`].
pub fn is_absolute(name: &str) -> bool {
    name.starts_with(SEPARATOR)
}

/// Append a trailing separator to a namespace that lacks one.
///
/// The empty namespace becomes `/`, the root.
///
/// ```
/// use rush_registry::names::normalize_namespace;
///
/// assert_eq!(normalize_namespace("robot"), "robot/");
/// assert_eq!(normalize_namespace("/robot/"), "/robot/");
/// assert_eq!(normalize_namespace(""), "/");
/// ```
pub fn normalize_namespace(namespace: &str) -> String {
    if namespace.ends_with(SEPARATOR) {
        namespace.to_string()
    } else {
        format!("{namespace}{SEPARATOR}")
    }
}

/// Resolve a normalised namespace against `context`.
///
/// Absolute namespaces are returned unchanged.  Relative ones are appended
/// to `context`, which is itself forced to be
/// absolute and separator-terminated first.
pub fn resolve_namespace(namespace: &str, context: &str) -> String {
    if is_absolute(namespace) {
        return namespace.to_string();
    }
    let mut resolved = String::with_capacity(context.len() + namespace.len() + 2);
    if !is_absolute(context) {
        resolved.push(SEPARATOR);
    }
    resolved.push_str(context);
    if !resolved.ends_with(SEPARATOR) {
        resolved.push(SEPARATOR);
    }
    resolved.push_str(namespace);
    resolved
}

/// Join `key` onto `namespace` with exactly one separator between them.
pub fn join_name(namespace: &str, key: &str) -> String {
    let key = key.trim_start_matches(SEPARATOR);
    if namespace.ends_with(SEPARATOR) {
        format!("{namespace}{key}")
    } else {
        format!("{namespace}{SEPARATOR}{key}")
    }
}

/// Check that `name` is usable as a leaf parameter name.
///
/// A valid name is absolute, has at least one segment, does not end with the
/// separator and contains no empty segments.
pub fn validate_name(name: &str) -> Result<(), ParamError> {
    let reason = if !is_absolute(name) {
        Some("must be absolute")
    } else if name.len() == 1 || name.ends_with(SEPARATOR) {
        Some("must not end with a separator")
    } else if name.contains("//") {
        Some("must not contain empty segments")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(ParamError::InvalidName(format!("'{name}' {reason}"))),
        None => Ok(()),
    }
}
