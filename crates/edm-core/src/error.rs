//! Errors raised while assembling or decoding a model description

use std::fmt;

use thiserror::Error as ThisError;

/// The named constructs whose names are checked against the name rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedConstruct {
    EntityContainer,
    EntitySet,
    PropertyDescription,
    StructuredType,
}

impl fmt::Display for NamedConstruct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NamedConstruct::EntityContainer => "an entity container",
            NamedConstruct::EntitySet => "an entity set",
            NamedConstruct::PropertyDescription => "a property description",
            NamedConstruct::StructuredType => "a structured type",
        };
        f.write_str(label)
    }
}

/// Invalid-argument errors. Every variant is raised synchronously at the
/// point of violation and leaves the registry as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum EdmError {
    #[error(
        "\"{name}\" is an illegal name for {construct}. The name for {construct} may only contain alphanumeric characters and underscores"
    )]
    IllegalName {
        construct: NamedConstruct,
        name: String,
    },

    #[error(
        "\"{0}\" is an illegal namespace. A namespace consists of names separated by dots, each containing only alphanumeric characters and underscores"
    )]
    IllegalNamespace(String),

    #[error("a model with namespace \"{0}\" is already registered")]
    DuplicateNamespace(String),

    #[error(
        "tried to add entity container \"{name}\" to the model with namespace \"{namespace}\", but that model already contains a container with that name"
    )]
    DuplicateContainer { name: String, namespace: String },

    #[error(
        "tried to add entity set with name \"{set}\" to entity container \"{container}\", but this entity container already contains an element with that name"
    )]
    DuplicateEntitySet { set: String, container: String },

    #[error("a structured type named \"{0}\" is already registered")]
    DuplicateType(String),

    #[error("property \"{property}\" is already declared along the inheritance chain of \"{type_name}\"")]
    DuplicateProperty { property: String, type_name: String },

    #[error("only boolean values are allowed for \"{field}\"")]
    NotBoolean { field: String },

    #[error("property description \"{property}\" already belongs to structured type \"{owner}\"")]
    OwnerAlreadySet { property: String, owner: String },

    #[error("\"{0}\" is not an entity type")]
    EntityTypeExpected(String),

    #[error("\"{0}\" is not a complex type")]
    ComplexTypeExpected(String),

    #[error("\"{name}\" cannot inherit from \"{base}\": base and derived types must be of the same kind")]
    BaseTypeKindMismatch { name: String, base: String },

    #[error("\"{0}\" already has an e-tag property along its inheritance chain")]
    MultipleETags(String),

    #[error("e-tag properties can only be declared on entity types, \"{0}\" is a complex type")]
    ETagOnComplexType(String),

    #[error("no {0} with this id exists in the registry")]
    UnknownNode(&'static str),

    #[error("class \"{class}\" has no field named \"{field}\"")]
    UnknownField { class: String, field: String },

    #[error("cache record field \"{field}\" is missing or malformed")]
    MalformedCacheRecord { field: String },
}

impl EdmError {
    /// Everything except a malformed cache record is an invalid argument.
    pub fn is_invalid_argument(&self) -> bool {
        !matches!(self, EdmError::MalformedCacheRecord { .. })
    }
}

pub type Result<T> = std::result::Result<T, EdmError>;
