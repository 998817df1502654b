//! Turns model definitions into builder calls on a fresh registry

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use edm_core::{
    ClassCatalog, EntitySet, ModelId, PrimitiveType, PropertyBuilder, PropertyKindTag, Registry,
    StructuredKind, StructuredTypeBuilder, TypeId, qualify,
};

use crate::definition::{ContainerDefinition, ModelDefinition, PropertyDefinition, TypeDefinition};
use crate::error::LoadError;

/// Everything produced by a load: the registry, the host class catalog
/// derived from the declared classes, and the model ids by namespace.
#[derive(Debug)]
pub struct LoadedModels {
    pub registry: Registry,
    pub catalog: ClassCatalog,
    pub models: BTreeMap<String, ModelId>,
}

impl LoadedModels {
    pub fn model(&self, namespace: &str) -> Option<ModelId> {
        self.models.get(namespace).copied()
    }
}

/// Collects definitions and loads them into one registry, referenced
/// models first.
#[derive(Debug, Default)]
pub struct ModelLoader {
    definitions: Vec<(Option<PathBuf>, ModelDefinition)>,
}

impl ModelLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, path: &Path) -> Result<&mut Self, LoadError> {
        let definition = ModelDefinition::from_path(path)?;
        tracing::debug!("Read model definition '{}' from {}", definition.namespace, path.display());
        self.definitions.push((Some(path.to_path_buf()), definition));
        Ok(self)
    }

    pub fn add_definition(&mut self, definition: ModelDefinition) -> &mut Self {
        self.definitions.push((None, definition));
        self
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn load(&self) -> Result<LoadedModels, LoadError> {
        let mut loaded = LoadedModels {
            registry: Registry::new(),
            catalog: ClassCatalog::new(),
            models: BTreeMap::new(),
        };

        for (path, definition) in self.ordered()? {
            if definition.is_empty() {
                tracing::warn!(
                    "Model definition '{}' ({}) declares no types or containers",
                    definition.namespace,
                    path.as_deref().map_or("<inline>".into(), |p| p.display().to_string())
                );
            }
            let model = load_definition(&mut loaded.registry, &mut loaded.catalog, definition)?;
            loaded.models.insert(definition.namespace.clone(), model);
        }

        Ok(loaded)
    }

    /// Order definitions so every dependency is loaded before its dependents.
    fn ordered(&self) -> Result<Vec<(&Option<PathBuf>, &ModelDefinition)>, LoadError> {
        let known: BTreeSet<&str> = self
            .definitions
            .iter()
            .map(|(_, d)| d.namespace.as_str())
            .collect();

        let mut pending: Vec<(&Option<PathBuf>, &ModelDefinition, Vec<String>)> = Vec::new();
        for (path, definition) in &self.definitions {
            let deps = definition.dependencies();
            if let Some(unknown) = deps.iter().find(|d| !known.contains(d.as_str())) {
                return Err(LoadError::UnknownReference {
                    namespace: definition.namespace.clone(),
                    reference: unknown.clone(),
                });
            }
            pending.push((path, definition, deps));
        }

        let mut done: BTreeSet<&str> = BTreeSet::new();
        let mut ordered = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            let before = pending.len();
            let mut remaining = Vec::new();
            for (path, definition, deps) in pending {
                if deps.iter().all(|d| done.contains(d.as_str())) {
                    done.insert(definition.namespace.as_str());
                    ordered.push((path, definition));
                } else {
                    remaining.push((path, definition, deps));
                }
            }
            pending = remaining;

            if pending.len() == before {
                let names: Vec<&str> = pending.iter().map(|(_, d, _)| d.namespace.as_str()).collect();
                return Err(LoadError::CyclicReferences(names.join(", ")));
            }
        }

        Ok(ordered)
    }
}

fn load_definition(
    registry: &mut Registry,
    catalog: &mut ClassCatalog,
    definition: &ModelDefinition,
) -> Result<ModelId, LoadError> {
    let namespace = definition.namespace.as_str();
    let model = registry
        .add_model(namespace)
        .map_err(LoadError::model(namespace))?;

    for dependency in definition.dependencies() {
        let referenced = registry
            .model_by_namespace(&dependency)
            .ok_or_else(|| LoadError::UnknownReference {
                namespace: namespace.to_string(),
                reference: dependency.clone(),
            })?;
        registry
            .add_referenced_model(model, referenced)
            .map_err(LoadError::model(namespace))?;
    }

    let types = load_types(registry, catalog, model, definition)?;
    load_navigation(registry, definition, &types)?;
    load_containers(registry, model, definition)?;

    tracing::info!(
        "Loaded model '{}' ({} types, {} containers)",
        namespace,
        types.len(),
        definition.containers.len()
    );
    Ok(model)
}

/// Resolve a bare name within `namespace`, or a qualified name as is.
fn resolve_type(registry: &Registry, namespace: &str, name: &str) -> Option<TypeId> {
    if name.contains(edm_core::naming::NAMESPACE_SEPARATOR) {
        registry.type_by_full_name(name)
    } else {
        registry.type_by_full_name(&qualify(namespace, name))
    }
}

/// First type a definition needs that is not registered yet.
fn missing_dependency<'a>(registry: &Registry, namespace: &str, ty: &'a TypeDefinition) -> Option<&'a str> {
    let base = ty.base.as_deref();
    let complex = ty
        .properties
        .iter()
        .filter(|p| p.resolved_kind() == PropertyKindTag::Complex)
        .map(|p| p.type_name.as_str());

    base.into_iter()
        .chain(complex)
        .find(|name| resolve_type(registry, namespace, name).is_none())
}

fn load_types<'a>(
    registry: &mut Registry,
    catalog: &mut ClassCatalog,
    model: ModelId,
    definition: &'a ModelDefinition,
) -> Result<Vec<(&'a TypeDefinition, TypeId)>, LoadError> {
    let namespace = definition.namespace.as_str();
    let mut pending: Vec<(&TypeDefinition, StructuredKind)> = definition
        .complex_types
        .iter()
        .map(|t| (t, StructuredKind::Complex))
        .chain(definition.entity_types.iter().map(|t| (t, StructuredKind::Entity)))
        .collect();

    let mut built = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let before = pending.len();
        let mut remaining = Vec::new();
        for (ty, kind) in pending {
            if missing_dependency(registry, namespace, ty).is_some() {
                remaining.push((ty, kind));
                continue;
            }
            let id = build_type(registry, model, namespace, ty, kind)?;
            let class = type_class(namespace, ty);
            catalog.declare(class, ty.properties.iter().map(PropertyDefinition::field_name));
            built.push((ty, id));
        }
        pending = remaining;

        if pending.len() == before {
            let (ty, _) = pending[0];
            let name = missing_dependency(registry, namespace, ty).unwrap_or(&ty.name);
            return Err(LoadError::UnresolvedType {
                namespace: namespace.to_string(),
                name: name.to_string(),
            });
        }
    }

    Ok(built)
}

fn type_class(namespace: &str, ty: &TypeDefinition) -> String {
    ty.class.clone().unwrap_or_else(|| qualify(namespace, &ty.name))
}

fn build_type(
    registry: &mut Registry,
    model: ModelId,
    namespace: &str,
    ty: &TypeDefinition,
    kind: StructuredKind,
) -> Result<TypeId, LoadError> {
    let unresolved = |name: &str| LoadError::UnresolvedType {
        namespace: namespace.to_string(),
        name: name.to_string(),
    };

    let mut builder = StructuredTypeBuilder::new(&ty.name, type_class(namespace, ty), kind);
    if let Some(base) = &ty.base {
        builder = builder.base(resolve_type(registry, namespace, base).ok_or_else(|| unresolved(base))?);
    }
    if ty.is_abstract {
        builder = builder.abstract_type();
    }

    for property in &ty.properties {
        let prop = match property.resolved_kind() {
            PropertyKindTag::Navigation => continue,
            PropertyKindTag::Primitive => PropertyBuilder::primitive(&property.name, primitive(namespace, property)?),
            PropertyKindTag::Etag => PropertyBuilder::etag(&property.name, primitive(namespace, property)?),
            PropertyKindTag::Complex => {
                let value_type = resolve_type(registry, namespace, &property.type_name)
                    .ok_or_else(|| unresolved(&property.type_name))?;
                PropertyBuilder::complex(&property.name, value_type)
            }
        };
        builder = builder.property(configure(prop, property));
    }

    builder.build(registry, model).map_err(LoadError::model(namespace))
}

fn primitive(namespace: &str, property: &PropertyDefinition) -> Result<PrimitiveType, LoadError> {
    PrimitiveType::from_name(&property.type_name).ok_or_else(|| LoadError::UnknownPrimitive {
        namespace: namespace.to_string(),
        name: property.type_name.clone(),
    })
}

fn configure(mut builder: PropertyBuilder, property: &PropertyDefinition) -> PropertyBuilder {
    builder = builder.field(property.field_name());
    if property.collection {
        builder = builder.collection();
    }
    if let Some(nullable) = property.nullable {
        builder = builder.nullable(nullable);
    }
    builder
}

/// Navigation properties go last so that types may refer to each other.
fn load_navigation(
    registry: &mut Registry,
    definition: &ModelDefinition,
    types: &[(&TypeDefinition, TypeId)],
) -> Result<(), LoadError> {
    let namespace = definition.namespace.as_str();

    for &(ty, id) in types {
        let class = type_class(namespace, ty);
        for property in ty
            .properties
            .iter()
            .filter(|p| p.resolved_kind() == PropertyKindTag::Navigation)
        {
            let target = resolve_type(registry, namespace, &property.type_name).ok_or_else(|| {
                LoadError::UnresolvedType {
                    namespace: namespace.to_string(),
                    name: property.type_name.clone(),
                }
            })?;

            let mut builder = configure(PropertyBuilder::navigation(&property.name, target), property);
            if let Some(value) = property.entity_reference {
                builder = builder.entity_reference(value);
            }
            if let Some(value) = property.entity_set_reference {
                builder = builder.entity_set_reference(value);
            }
            let description = builder.build(&class).map_err(LoadError::model(namespace))?;
            registry
                .attach_property(id, description)
                .map_err(LoadError::model(namespace))?;
        }
    }
    Ok(())
}

fn load_containers(
    registry: &mut Registry,
    model: ModelId,
    definition: &ModelDefinition,
) -> Result<(), LoadError> {
    let namespace = definition.namespace.as_str();
    let resolve_parent = |registry: &Registry, name: &str| {
        if name.contains(edm_core::naming::NAMESPACE_SEPARATOR) {
            registry.container_by_full_name(name)
        } else {
            registry.container_by_name(model, name)
        }
    };

    let mut pending: Vec<&ContainerDefinition> = definition.containers.iter().collect();
    while !pending.is_empty() {
        let before = pending.len();
        let mut remaining = Vec::new();
        for container in pending {
            let parent = match &container.parent {
                Some(name) => match resolve_parent(registry, name) {
                    Some(parent) => Some(parent),
                    None => {
                        remaining.push(container);
                        continue;
                    }
                },
                None => None,
            };

            let id = registry
                .add_container(&container.name, model, parent)
                .map_err(LoadError::model(namespace))?;
            for set in &container.entity_sets {
                let entity_type = resolve_type(registry, namespace, &set.entity_type).ok_or_else(|| {
                    LoadError::UnresolvedType {
                        namespace: namespace.to_string(),
                        name: set.entity_type.clone(),
                    }
                })?;
                let entity_set = EntitySet::new(&set.name, entity_type).map_err(LoadError::model(namespace))?;
                registry
                    .add_entity_set(id, entity_set)
                    .map_err(LoadError::model(namespace))?;
            }
        }
        pending = remaining;

        if pending.len() == before {
            return Err(LoadError::UnresolvedContainer {
                namespace: namespace.to_string(),
                name: pending[0].parent.clone().unwrap_or_default(),
            });
        }
    }
    Ok(())
}
