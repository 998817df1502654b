//! Plain-text outline of every model in a registry

use std::fmt::Write;

use crate::model::{ContainerId, ModelId, PropertyId, PropertyKind, TypeId};
use crate::registry::Registry;

/// Render all models, their types and their containers, one line per node.
pub fn outline(registry: &Registry) -> String {
    let mut out = String::new();
    for model in registry.models() {
        write_model(registry, model, &mut out);
    }
    out
}

fn write_model(registry: &Registry, model: ModelId, out: &mut String) {
    let Some(namespace) = registry.model(model).map(|m| m.namespace()) else {
        return;
    };
    let label = if namespace.is_empty() { "<default>" } else { namespace };

    let references: Vec<&str> = registry
        .referenced_models(model)
        .into_iter()
        .filter_map(|id| registry.model(id).map(|m| m.namespace()))
        .collect();
    if references.is_empty() {
        let _ = writeln!(out, "model {label}");
    } else {
        let _ = writeln!(out, "model {label} (references: {})", references.join(", "));
    }

    for ty in registry.structured_types(model) {
        write_type(registry, ty, out);
    }
    for container in registry.containers(model) {
        write_container(registry, container, out);
    }
}

fn write_type(registry: &Registry, ty: TypeId, out: &mut String) {
    let (Some(structured), Some(full_name)) = (registry.structured_type(ty), registry.type_full_name(ty))
    else {
        return;
    };

    let prefix = if structured.is_abstract() { "abstract " } else { "" };
    let _ = write!(out, "  {prefix}{} {full_name}", structured.kind());
    if let Some(base) = registry.base_type(ty).and_then(|b| registry.type_full_name(b)) {
        let _ = write!(out, " : {base}");
    }
    out.push('\n');

    for property in registry.properties(ty) {
        write_property(registry, property, out);
    }
}

fn write_property(registry: &Registry, id: PropertyId, out: &mut String) {
    let Some(property) = registry.property(id) else {
        return;
    };
    let value_type = registry
        .resource_type_full_name(property.value_type())
        .unwrap_or_default();

    let _ = write!(out, "    {}: ", property.name());
    if property.is_collection() {
        let _ = write!(out, "Collection({value_type})");
    } else {
        out.push_str(&value_type);
    }

    match property.kind() {
        PropertyKind::ETag => out.push_str(" etag"),
        PropertyKind::Navigation(_) => out.push_str(" navigation"),
        PropertyKind::Primitive | PropertyKind::Complex => {}
    }
    if !property.is_nullable() {
        out.push_str(" not null");
    }
    out.push('\n');
}

fn write_container(registry: &Registry, container: ContainerId, out: &mut String) {
    let Some(full_name) = registry.container_full_name(container) else {
        return;
    };

    let _ = write!(out, "  container {full_name}");
    if let Some(parent) = registry
        .parent_container(container)
        .and_then(|p| registry.container_full_name(p))
    {
        let _ = write!(out, " (parent: {parent})");
    }
    out.push('\n');

    for set in registry.entity_sets(container) {
        let Some(entity_set) = registry.entity_set(set) else {
            continue;
        };
        let entity_type = registry
            .type_full_name(entity_set.entity_type())
            .unwrap_or_default();
        let _ = writeln!(out, "    {}: {entity_type}", entity_set.name());
    }
}
