//! Name rules shared by containers, entity sets, types and properties

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{EdmError, NamedConstruct, Result};

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("name pattern compiles"));

/// Separator between a namespace and the name it qualifies.
pub const NAMESPACE_SEPARATOR: char = '.';

/// True if `name` is non-empty and consists only of `[A-Za-z0-9_]`.
pub fn is_valid_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

/// Check a name for the given construct.
pub fn validate_name(construct: NamedConstruct, name: &str) -> Result<()> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(EdmError::IllegalName {
            construct,
            name: name.to_string(),
        })
    }
}

/// Namespaces are either empty or dot-separated valid names.
pub fn validate_namespace(namespace: &str) -> Result<()> {
    if namespace.is_empty() || namespace.split(NAMESPACE_SEPARATOR).all(is_valid_name) {
        Ok(())
    } else {
        Err(EdmError::IllegalNamespace(namespace.to_string()))
    }
}

/// Join a namespace and a name, or return the bare name when there is no namespace.
pub fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}{NAMESPACE_SEPARATOR}{name}")
    }
}

/// Split a qualified name at its last separator into `(namespace, name)`.
pub fn split_qualified(full_name: &str) -> (&str, &str) {
    match full_name.rfind(NAMESPACE_SEPARATOR) {
        Some(pos) => (&full_name[..pos], &full_name[pos + 1..]),
        None => ("", full_name),
    }
}
