//! Builder API for describing structured types and their properties

use std::collections::HashSet;

use crate::error::{EdmError, Result};
use crate::field::FieldRef;
use crate::model::*;
use crate::naming::qualify;
use crate::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PropertySpec {
    Primitive(PrimitiveType),
    ETag(PrimitiveType),
    Complex(TypeId),
    Navigation {
        target: TypeId,
        entity_reference: Option<bool>,
        entity_set_reference: Option<bool>,
    },
}

/// Describes one property before it is bound to its owning class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyBuilder {
    name: String,
    field: Option<String>,
    spec: PropertySpec,
    is_collection: bool,
    nullable: bool,
}

impl PropertyBuilder {
    fn new(name: impl Into<String>, spec: PropertySpec) -> Self {
        PropertyBuilder {
            name: name.into(),
            field: None,
            spec,
            is_collection: false,
            nullable: true,
        }
    }

    pub fn primitive(name: impl Into<String>, value_type: PrimitiveType) -> Self {
        Self::new(name, PropertySpec::Primitive(value_type))
    }

    pub fn etag(name: impl Into<String>, value_type: PrimitiveType) -> Self {
        Self::new(name, PropertySpec::ETag(value_type))
    }

    pub fn complex(name: impl Into<String>, value_type: TypeId) -> Self {
        Self::new(name, PropertySpec::Complex(value_type))
    }

    /// A single-entity reference to `target`, or an entity-set reference
    /// when marked as a collection, unless the flags are set explicitly.
    pub fn navigation(name: impl Into<String>, target: TypeId) -> Self {
        Self::new(
            name,
            PropertySpec::Navigation {
                target,
                entity_reference: None,
                entity_set_reference: None,
            },
        )
    }

    /// Host field backing the property. Defaults to the property name.
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn collection(mut self) -> Self {
        self.is_collection = true;
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Only meaningful for navigation properties.
    pub fn entity_reference(mut self, value: bool) -> Self {
        if let PropertySpec::Navigation {
            entity_reference, ..
        } = &mut self.spec
        {
            *entity_reference = Some(value);
        }
        self
    }

    /// Only meaningful for navigation properties.
    pub fn entity_set_reference(mut self, value: bool) -> Self {
        if let PropertySpec::Navigation {
            entity_set_reference,
            ..
        } = &mut self.spec
        {
            *entity_set_reference = Some(value);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Produce the description, binding the field to `class`.
    pub fn build(self, class: &str) -> Result<ResourcePropertyDescription> {
        let field = FieldRef::new(class, self.field.unwrap_or_else(|| self.name.clone()));
        match self.spec {
            PropertySpec::Primitive(value_type) => ResourcePropertyDescription::primitive(
                self.name,
                field,
                value_type,
                self.is_collection,
                self.nullable,
            ),
            PropertySpec::ETag(value_type) => {
                ResourcePropertyDescription::etag(self.name, field, value_type)
            }
            PropertySpec::Complex(value_type) => ResourcePropertyDescription::complex(
                self.name,
                field,
                value_type,
                self.is_collection,
                self.nullable,
            ),
            PropertySpec::Navigation {
                target,
                entity_reference,
                entity_set_reference,
            } => ResourcePropertyDescription::navigation(
                self.name,
                field,
                Navigation {
                    target,
                    is_entity_reference: entity_reference.unwrap_or(!self.is_collection),
                    is_entity_set_reference: entity_set_reference.unwrap_or(self.is_collection),
                    is_bag: self.is_collection,
                },
                self.nullable,
            ),
        }
    }
}

/// Describes an entity or complex type and registers it, with its
/// properties, in one step.
///
/// Everything is validated before the registry is touched, so a failed
/// `build` leaves the registry unchanged.
#[derive(Debug, Clone)]
pub struct StructuredTypeBuilder {
    name: String,
    class: String,
    kind: StructuredKind,
    base: Option<TypeId>,
    is_abstract: bool,
    properties: Vec<PropertyBuilder>,
}

impl StructuredTypeBuilder {
    pub fn new(name: impl Into<String>, class: impl Into<String>, kind: StructuredKind) -> Self {
        StructuredTypeBuilder {
            name: name.into(),
            class: class.into(),
            kind,
            base: None,
            is_abstract: false,
            properties: Vec::new(),
        }
    }

    pub fn entity(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self::new(name, class, StructuredKind::Entity)
    }

    pub fn complex(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self::new(name, class, StructuredKind::Complex)
    }

    pub fn base(mut self, base: TypeId) -> Self {
        self.base = Some(base);
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn property(mut self, property: PropertyBuilder) -> Self {
        self.properties.push(property);
        self
    }

    pub fn build(self, registry: &mut Registry, model: ModelId) -> Result<TypeId> {
        let ty = StructuredType::new(self.name, self.class, self.kind)?.with_abstract(self.is_abstract);
        registry.check_structured_type(model, &ty, self.base)?;

        let class = ty.class().to_string();
        let descriptions = self
            .properties
            .into_iter()
            .map(|p| p.build(&class))
            .collect::<Result<Vec<_>>>()?;

        let full_name = qualify(
            registry.model(model).map_or("", EntityDataModel::namespace),
            ty.name(),
        );
        let scope = self.base.map(|b| registry.base_chain(b)).unwrap_or_default();

        let mut seen = HashSet::new();
        let mut has_etag = false;
        for description in &descriptions {
            registry.check_property_in_scope(ty.kind(), &full_name, &scope, description)?;
            if !seen.insert(description.name()) {
                return Err(EdmError::DuplicateProperty {
                    property: description.name().to_string(),
                    type_name: full_name,
                });
            }
            if description.is_etag() {
                if has_etag {
                    return Err(EdmError::MultipleETags(full_name));
                }
                has_etag = true;
            }
        }

        let id = registry.add_structured_type(model, ty, self.base)?;
        for description in descriptions {
            let property = registry.add_property(description);
            registry.set_structured_type(property, id)?;
        }

        tracing::debug!("Built '{}' with {} properties", full_name, registry.properties(id).len());
        Ok(id)
    }
}
