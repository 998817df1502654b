//! Core data structures for the entity data model

use std::fmt;

use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};

use crate::error::{NamedConstruct, Result};
use crate::field::FieldRef;
use crate::naming::validate_name;

macro_rules! node_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) NodeIndex);

        impl $name {
            /// Position of the node in the registry graph.
            pub fn index(self) -> usize {
                self.0.index()
            }
        }
    };
}

node_id!(
    /// Handle of an [`EntityDataModel`] in a registry.
    ModelId
);
node_id!(
    /// Handle of an [`EntityContainer`] in a registry.
    ContainerId
);
node_id!(
    /// Handle of an [`EntitySet`] in a registry.
    EntitySetId
);
node_id!(
    /// Handle of a [`StructuredType`] in a registry.
    TypeId
);
node_id!(
    /// Handle of a [`ResourcePropertyDescription`] in a registry.
    PropertyId
);

/// Atomic EDM types. These cannot be decomposed into smaller types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrimitiveType {
    Binary,
    Boolean,
    Byte,
    DateTime,
    DateTimeOffset,
    Decimal,
    Double,
    Guid,
    Int16,
    Int32,
    Int64,
    SByte,
    Single,
    String,
    Time,
}

impl PrimitiveType {
    /// Namespace shared by every primitive type.
    pub const NAMESPACE: &'static str = "Edm";

    pub const ALL: [PrimitiveType; 15] = [
        PrimitiveType::Binary,
        PrimitiveType::Boolean,
        PrimitiveType::Byte,
        PrimitiveType::DateTime,
        PrimitiveType::DateTimeOffset,
        PrimitiveType::Decimal,
        PrimitiveType::Double,
        PrimitiveType::Guid,
        PrimitiveType::Int16,
        PrimitiveType::Int32,
        PrimitiveType::Int64,
        PrimitiveType::SByte,
        PrimitiveType::Single,
        PrimitiveType::String,
        PrimitiveType::Time,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Binary => "Binary",
            PrimitiveType::Boolean => "Boolean",
            PrimitiveType::Byte => "Byte",
            PrimitiveType::DateTime => "DateTime",
            PrimitiveType::DateTimeOffset => "DateTimeOffset",
            PrimitiveType::Decimal => "Decimal",
            PrimitiveType::Double => "Double",
            PrimitiveType::Guid => "Guid",
            PrimitiveType::Int16 => "Int16",
            PrimitiveType::Int32 => "Int32",
            PrimitiveType::Int64 => "Int64",
            PrimitiveType::SByte => "SByte",
            PrimitiveType::Single => "Single",
            PrimitiveType::String => "String",
            PrimitiveType::Time => "Time",
        }
    }

    pub fn namespace(self) -> &'static str {
        Self::NAMESPACE
    }

    pub fn full_name(self) -> String {
        format!("{}.{}", Self::NAMESPACE, self.name())
    }

    /// Parse either the bare name (`Guid`) or the qualified name (`Edm.Guid`).
    pub fn from_name(name: &str) -> Option<Self> {
        let bare = name
            .strip_prefix(Self::NAMESPACE)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(name);
        Self::ALL.into_iter().find(|p| p.name() == bare)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", Self::NAMESPACE, self.name())
    }
}

/// The type of a property value: either a primitive or a structured type
/// registered in the same registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Primitive(PrimitiveType),
    Structured(TypeId),
}

impl ResourceType {
    pub fn as_primitive(self) -> Option<PrimitiveType> {
        match self {
            ResourceType::Primitive(p) => Some(p),
            ResourceType::Structured(_) => None,
        }
    }

    pub fn as_structured(self) -> Option<TypeId> {
        match self {
            ResourceType::Structured(id) => Some(id),
            ResourceType::Primitive(_) => None,
        }
    }
}

impl From<PrimitiveType> for ResourceType {
    fn from(primitive: PrimitiveType) -> Self {
        ResourceType::Primitive(primitive)
    }
}

impl From<TypeId> for ResourceType {
    fn from(id: TypeId) -> Self {
        ResourceType::Structured(id)
    }
}

/// Discriminates entity types (with identity) from complex types (values).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuredKind {
    Entity,
    Complex,
}

impl fmt::Display for StructuredKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuredKind::Entity => f.write_str("entity type"),
            StructuredKind::Complex => f.write_str("complex type"),
        }
    }
}

/// Top-level model: a namespace that containers and types are defined in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDataModel {
    pub(crate) namespace: String,
}

impl EntityDataModel {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

/// A named grouping of entity sets. The owning model and optional parent
/// container are edges in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityContainer {
    pub(crate) name: String,
}

impl EntityContainer {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A named collection of entities of one entity type. The container is
/// assigned when the set is added to one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySet {
    name: String,
    entity_type: TypeId,
}

impl EntitySet {
    pub fn new(name: impl Into<String>, entity_type: TypeId) -> Result<Self> {
        let name = name.into();
        validate_name(NamedConstruct::EntitySet, &name)?;
        Ok(EntitySet { name, entity_type })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity_type(&self) -> TypeId {
        self.entity_type
    }
}

/// An entity type or complex type. Base type, owning model and properties
/// are edges in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredType {
    name: String,
    class: String,
    kind: StructuredKind,
    is_abstract: bool,
}

impl StructuredType {
    /// `class` identifies the host-side type the description was derived from.
    pub fn new(name: impl Into<String>, class: impl Into<String>, kind: StructuredKind) -> Result<Self> {
        let name = name.into();
        validate_name(NamedConstruct::StructuredType, &name)?;
        Ok(StructuredType {
            name,
            class: class.into(),
            kind,
            is_abstract: false,
        })
    }

    pub fn with_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn kind(&self) -> StructuredKind {
        self.kind
    }

    pub fn is_entity_type(&self) -> bool {
        self.kind == StructuredKind::Entity
    }

    pub fn is_complex_type(&self) -> bool {
        self.kind == StructuredKind::Complex
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }
}

/// Relationship flags of a navigation property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Navigation {
    pub target: TypeId,
    pub is_entity_reference: bool,
    pub is_entity_set_reference: bool,
    pub is_bag: bool,
}

/// Which variant of property description this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Primitive,
    /// Primitive property supplying optimistic-concurrency tokens.
    ETag,
    Complex,
    Navigation(Navigation),
}

impl PropertyKind {
    pub fn tag(&self) -> PropertyKindTag {
        match self {
            PropertyKind::Primitive => PropertyKindTag::Primitive,
            PropertyKind::ETag => PropertyKindTag::Etag,
            PropertyKind::Complex => PropertyKindTag::Complex,
            PropertyKind::Navigation(_) => PropertyKindTag::Navigation,
        }
    }
}

/// Serializable discriminant of [`PropertyKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKindTag {
    Primitive,
    Etag,
    Complex,
    Navigation,
}

impl fmt::Display for PropertyKindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PropertyKindTag::Primitive => "primitive",
            PropertyKindTag::Etag => "etag",
            PropertyKindTag::Complex => "complex",
            PropertyKindTag::Navigation => "navigation",
        };
        f.write_str(label)
    }
}

/// Describes one property of a structured type.
///
/// The owning structured type is attached afterwards through
/// [`Registry::set_structured_type`](crate::Registry::set_structured_type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePropertyDescription {
    name: String,
    field: FieldRef,
    value_type: ResourceType,
    is_collection: bool,
    nullable: bool,
    kind: PropertyKind,
}

impl ResourcePropertyDescription {
    fn new(
        name: String,
        field: FieldRef,
        value_type: ResourceType,
        is_collection: bool,
        nullable: bool,
        kind: PropertyKind,
    ) -> Result<Self> {
        validate_name(NamedConstruct::PropertyDescription, &name)?;
        Ok(ResourcePropertyDescription {
            name,
            field,
            value_type,
            is_collection,
            nullable,
            kind,
        })
    }

    pub fn primitive(
        name: impl Into<String>,
        field: FieldRef,
        value_type: PrimitiveType,
        is_collection: bool,
        nullable: bool,
    ) -> Result<Self> {
        Self::new(
            name.into(),
            field,
            value_type.into(),
            is_collection,
            nullable,
            PropertyKind::Primitive,
        )
    }

    /// E-tag properties are single-valued and never nullable.
    pub fn etag(name: impl Into<String>, field: FieldRef, value_type: PrimitiveType) -> Result<Self> {
        Self::new(
            name.into(),
            field,
            value_type.into(),
            false,
            false,
            PropertyKind::ETag,
        )
    }

    /// `value_type` must name a complex type; checked when the property is attached.
    pub fn complex(
        name: impl Into<String>,
        field: FieldRef,
        value_type: TypeId,
        is_collection: bool,
        nullable: bool,
    ) -> Result<Self> {
        Self::new(
            name.into(),
            field,
            value_type.into(),
            is_collection,
            nullable,
            PropertyKind::Complex,
        )
    }

    /// The target must be an entity type; checked when the property is attached.
    pub fn navigation(
        name: impl Into<String>,
        field: FieldRef,
        navigation: Navigation,
        nullable: bool,
    ) -> Result<Self> {
        Self::new(
            name.into(),
            field,
            navigation.target.into(),
            navigation.is_bag,
            nullable,
            PropertyKind::Navigation(navigation),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self) -> &FieldRef {
        &self.field
    }

    pub fn value_type(&self) -> ResourceType {
        self.value_type
    }

    pub fn is_collection(&self) -> bool {
        self.is_collection
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Has no effect on e-tag properties, which stay non-nullable.
    pub fn set_nullable(&mut self, nullable: bool) {
        if self.kind == PropertyKind::ETag {
            tracing::debug!("Ignoring nullable={} on e-tag property {}", nullable, self.name);
            return;
        }
        self.nullable = nullable;
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn is_etag(&self) -> bool {
        self.kind == PropertyKind::ETag
    }

    pub fn navigation_info(&self) -> Option<&Navigation> {
        match &self.kind {
            PropertyKind::Navigation(nav) => Some(nav),
            _ => None,
        }
    }
}
