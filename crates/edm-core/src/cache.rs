//! Property description cache: essential fields of every property of a
//! model, written as JSON and bound back to host fields on load

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EdmError, Result};
use crate::field::{FieldAccessor, FieldRef, bind_field};
use crate::model::{ModelId, PropertyId, PropertyKind, PropertyKindTag};
use crate::registry::Registry;

/// Cache directory: .edm/
pub const CACHE_DIR: &str = ".edm";

/// File stem used for models without a namespace. Not a valid namespace,
/// so it never collides with a named model's cache file.
pub const DEFAULT_MODEL_CACHE: &str = "-default";

/// Get cache directory path
pub fn cache_dir(root: &Path) -> PathBuf {
    root.join(CACHE_DIR)
}

/// Get the cache file path of the model with the given namespace
pub fn model_cache_path(root: &Path, namespace: &str) -> PathBuf {
    let stem = if namespace.is_empty() {
        DEFAULT_MODEL_CACHE
    } else {
        namespace
    };
    cache_dir(root).join(format!("{stem}.json"))
}

/// Ensure cache directory exists
pub fn ensure_cache_dir(root: &Path) -> std::io::Result<()> {
    let cache = cache_dir(root);
    if !cache.exists() {
        std::fs::create_dir_all(&cache)?;
    }
    Ok(())
}

/// Essential state of one property description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyCacheRecord {
    /// Host class owning the backing field.
    pub class: String,
    /// Property name.
    pub name: String,
    /// Backing field name.
    pub field: String,
    /// Full name of the owning structured type.
    pub owner: String,
    pub kind: PropertyKindTag,
    /// Full name of the value type.
    pub value_type: String,
    pub is_collection: bool,
    pub nullable: bool,
    pub is_entity_reference: bool,
    pub is_entity_set_reference: bool,
    pub is_bag: bool,
}

impl PropertyCacheRecord {
    /// Capture an attached property. Returns None for unknown or unattached ids.
    pub fn from_description(registry: &Registry, id: PropertyId) -> Option<Self> {
        let property = registry.property(id)?;
        let owner = registry.property_owner(id)?;
        let navigation = property.navigation_info();

        Some(PropertyCacheRecord {
            class: property.field().class.clone(),
            name: property.name().to_string(),
            field: property.field().field.clone(),
            owner: registry.type_full_name(owner)?,
            kind: property.kind().tag(),
            value_type: registry.resource_type_full_name(property.value_type())?,
            is_collection: property.is_collection(),
            nullable: property.is_nullable(),
            is_entity_reference: navigation.is_some_and(|n| n.is_entity_reference),
            is_entity_set_reference: navigation.is_some_and(|n| n.is_entity_set_reference),
            is_bag: matches!(property.kind(), PropertyKind::Navigation(n) if n.is_bag),
        })
    }

    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Decode a record field by field, reporting the first missing or
    /// mistyped field.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| EdmError::MalformedCacheRecord {
            field: "<record>".to_string(),
        })?;

        let kind = object
            .get("kind")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .ok_or_else(|| EdmError::MalformedCacheRecord {
                field: "kind".to_string(),
            })?;

        Ok(PropertyCacheRecord {
            class: string_field(object, "class")?,
            name: string_field(object, "name")?,
            field: string_field(object, "field")?,
            owner: string_field(object, "owner")?,
            kind,
            value_type: string_field(object, "value_type")?,
            is_collection: bool_field(object, "is_collection")?,
            nullable: bool_field(object, "nullable")?,
            is_entity_reference: bool_field(object, "is_entity_reference")?,
            is_entity_set_reference: bool_field(object, "is_entity_set_reference")?,
            is_bag: bool_field(object, "is_bag")?,
        })
    }

    /// Re-establish the field binding against the host class.
    pub fn bind(&self, accessor: &dyn FieldAccessor) -> Result<FieldRef> {
        bind_field(accessor, &self.class, &self.field)
    }
}

fn string_field(object: &Map<String, Value>, field: &str) -> Result<String> {
    object
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| EdmError::MalformedCacheRecord {
            field: field.to_string(),
        })
}

fn bool_field(object: &Map<String, Value>, field: &str) -> Result<bool> {
    match object.get(field) {
        Some(Value::Bool(value)) => Ok(*value),
        Some(_) => Err(EdmError::NotBoolean {
            field: field.to_string(),
        }),
        None => Err(EdmError::MalformedCacheRecord {
            field: field.to_string(),
        }),
    }
}

/// Every property record of one model plus a small header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCache {
    pub version: String,
    pub generated_at: String,
    pub namespace: String,
    pub properties: Vec<PropertyCacheRecord>,
}

impl ModelCache {
    /// Collect the records of all types defined on `model`, in declaration order.
    pub fn collect(registry: &Registry, model: ModelId) -> Option<Self> {
        let namespace = registry.model(model)?.namespace().to_string();
        let properties = registry
            .structured_types(model)
            .into_iter()
            .flat_map(|ty| registry.properties(ty))
            .filter_map(|id| PropertyCacheRecord::from_description(registry, id))
            .collect();

        Some(ModelCache {
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            namespace,
            properties,
        })
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| EdmError::MalformedCacheRecord {
            field: "<cache>".to_string(),
        })?;
        let properties = object
            .get("properties")
            .and_then(Value::as_array)
            .ok_or_else(|| EdmError::MalformedCacheRecord {
                field: "properties".to_string(),
            })?
            .iter()
            .map(PropertyCacheRecord::from_json)
            .collect::<Result<Vec<_>>>()?;

        Ok(ModelCache {
            version: string_field(object, "version")?,
            generated_at: string_field(object, "generated_at")?,
            namespace: string_field(object, "namespace")?,
            properties,
        })
    }

    /// Bind every record, failing on the first field the host no longer has.
    pub fn bind_all(&self, accessor: &dyn FieldAccessor) -> Result<Vec<FieldRef>> {
        self.properties.iter().map(|r| r.bind(accessor)).collect()
    }
}

/// Write the cache of `model` under `root`. Returns the file written.
pub fn save_model_cache(registry: &Registry, model: ModelId, root: &Path) -> anyhow::Result<PathBuf> {
    let cache = ModelCache::collect(registry, model)
        .ok_or_else(|| anyhow::anyhow!("model is not part of this registry"))?;
    ensure_cache_dir(root)?;
    let path = model_cache_path(root, &cache.namespace);

    let json_str = serde_json::to_string_pretty(&cache)?;
    std::fs::write(&path, json_str)?;

    tracing::debug!(
        "Model cache saved: {} ({} properties)",
        path.display(),
        cache.properties.len()
    );
    Ok(path)
}

/// Load the cache of the model with the given namespace, if one was written.
pub fn load_model_cache(root: &Path, namespace: &str) -> anyhow::Result<Option<ModelCache>> {
    let path = model_cache_path(root, namespace);
    if !path.exists() {
        return Ok(None);
    }

    let json_str = std::fs::read_to_string(&path)?;
    let value: Value = serde_json::from_str(&json_str)?;
    let cache = ModelCache::from_json(&value)?;

    tracing::debug!("Model cache loaded from: {}", path.display());
    Ok(Some(cache))
}

/// Clear cache directory
pub fn clear_cache(root: &Path) -> std::io::Result<()> {
    let cache = cache_dir(root);
    if cache.exists() {
        std::fs::remove_dir_all(&cache)?;
    }
    Ok(())
}
