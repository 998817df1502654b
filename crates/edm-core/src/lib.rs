//! EDM Core: entity data model description graph, builder API and property cache

pub mod builder;
pub mod cache;
pub mod error;
pub mod field;
pub mod model;
pub mod naming;
pub mod outline;
pub mod registry;

#[cfg(test)]
mod tests;

#[cfg(test)]
mod test_utils;

pub use builder::{PropertyBuilder, StructuredTypeBuilder};
pub use cache::{CACHE_DIR, DEFAULT_MODEL_CACHE, ModelCache, PropertyCacheRecord, cache_dir, clear_cache, load_model_cache, model_cache_path, save_model_cache};
pub use error::{EdmError, NamedConstruct, Result};
pub use field::{ClassCatalog, FieldAccessor, FieldRef, bind_field};
pub use model::{
    ContainerId, EntityContainer, EntityDataModel, EntitySet, EntitySetId, ModelId, Navigation, PrimitiveType,
    PropertyId, PropertyKind, PropertyKindTag, ResourcePropertyDescription, ResourceType, StructuredKind,
    StructuredType, TypeId,
};
pub use naming::{is_valid_name, qualify, validate_name, validate_namespace};
pub use outline::outline;
pub use registry::Registry;
