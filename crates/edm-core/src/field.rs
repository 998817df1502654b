//! Field references and the host-side accessor they are resolved against

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EdmError, Result};

/// Identifies the host field a property description reads from: the owning
/// class identifier plus the field name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldRef {
    pub class: String,
    pub field: String,
}

impl FieldRef {
    pub fn new(class: impl Into<String>, field: impl Into<String>) -> Self {
        FieldRef {
            class: class.into(),
            field: field.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class, self.field)
    }
}

/// Answers whether a host class declares a field.
pub trait FieldAccessor {
    fn has_field(&self, class: &str, field: &str) -> bool;
}

/// Resolve a `(class, field)` pair into a [`FieldRef`] through an accessor.
pub fn bind_field(accessor: &dyn FieldAccessor, class: &str, field: &str) -> Result<FieldRef> {
    if accessor.has_field(class, field) {
        Ok(FieldRef::new(class, field))
    } else {
        Err(EdmError::UnknownField {
            class: class.to_string(),
            field: field.to_string(),
        })
    }
}

/// In-memory description of host classes and their fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassCatalog {
    classes: BTreeMap<String, BTreeSet<String>>,
}

impl ClassCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a class with the given fields, merging with earlier declarations.
    pub fn declare<I, S>(&mut self, class: impl Into<String>, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes
            .entry(class.into())
            .or_default()
            .extend(fields.into_iter().map(Into::into));
    }

    pub fn add_field(&mut self, class: impl Into<String>, field: impl Into<String>) {
        self.classes.entry(class.into()).or_default().insert(field.into());
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn fields(&self, class: &str) -> impl Iterator<Item = &str> {
        self.classes
            .get(class)
            .into_iter()
            .flat_map(|fields| fields.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl FieldAccessor for ClassCatalog {
    fn has_field(&self, class: &str, field: &str) -> bool {
        self.classes
            .get(class)
            .is_some_and(|fields| fields.contains(field))
    }
}
