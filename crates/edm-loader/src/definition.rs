//! TOML model definitions

use std::path::Path;

use edm_core::PropertyKindTag;
use serde::Deserialize;

use crate::error::LoadError;

/// One model: a namespace with its types and containers.
///
/// ```toml
/// namespace = "Sales"
/// references = ["Common"]
///
/// [[entity_types]]
/// name = "Customer"
/// class = "app::Customer"
/// properties = [
///     { name = "Id", type = "Guid", nullable = false },
///     { name = "Orders", type = "Order", kind = "navigation", collection = true },
/// ]
///
/// [[containers]]
/// name = "Main"
/// parent = "Common.Base"
/// entity_sets = [{ name = "Customers", entity_type = "Customer" }]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDefinition {
    #[serde(default)]
    pub namespace: String,
    /// Namespaces of other definitions this one builds on.
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub complex_types: Vec<TypeDefinition>,
    #[serde(default)]
    pub entity_types: Vec<TypeDefinition>,
    #[serde(default)]
    pub containers: Vec<ContainerDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeDefinition {
    pub name: String,
    /// Host class identifier. Defaults to the type's full name.
    pub class: Option<String>,
    pub base: Option<String>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub properties: Vec<PropertyDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyDefinition {
    pub name: String,
    /// Backing field. Defaults to the property name.
    pub field: Option<String>,
    #[serde(rename = "type")]
    pub type_name: String,
    /// Inferred from `type` when omitted: primitive for `Edm` types,
    /// complex otherwise.
    pub kind: Option<PropertyKindTag>,
    #[serde(default)]
    pub collection: bool,
    pub nullable: Option<bool>,
    pub entity_reference: Option<bool>,
    pub entity_set_reference: Option<bool>,
}

impl PropertyDefinition {
    pub fn field_name(&self) -> &str {
        self.field.as_deref().unwrap_or(&self.name)
    }

    pub fn resolved_kind(&self) -> PropertyKindTag {
        self.kind.unwrap_or_else(|| {
            if edm_core::PrimitiveType::from_name(&self.type_name).is_some() {
                PropertyKindTag::Primitive
            } else {
                PropertyKindTag::Complex
            }
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerDefinition {
    pub name: String,
    /// Bare name of a container in the same model, or `Namespace.Name`.
    pub parent: Option<String>,
    #[serde(default)]
    pub entity_sets: Vec<EntitySetDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntitySetDefinition {
    pub name: String,
    pub entity_type: String,
}

impl ModelDefinition {
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.complex_types.is_empty() && self.entity_types.is_empty() && self.containers.is_empty()
    }

    /// Namespaces this definition depends on: explicit references plus the
    /// namespaces of qualified names it uses, excluding its own and `Edm`.
    pub fn dependencies(&self) -> Vec<String> {
        let mut names: Vec<&str> = Vec::new();
        for ty in self.complex_types.iter().chain(&self.entity_types) {
            names.extend(ty.base.as_deref());
            names.extend(ty.properties.iter().map(|p| p.type_name.as_str()));
        }
        for container in &self.containers {
            names.extend(container.parent.as_deref());
            names.extend(container.entity_sets.iter().map(|s| s.entity_type.as_str()));
        }

        let mut deps: Vec<String> = self.references.clone();
        for name in names {
            let (namespace, _) = edm_core::naming::split_qualified(name);
            if namespace.is_empty()
                || namespace == self.namespace
                || namespace == edm_core::PrimitiveType::NAMESPACE
            {
                continue;
            }
            deps.push(namespace.to_string());
        }
        deps.sort();
        deps.dedup();
        deps
    }
}
