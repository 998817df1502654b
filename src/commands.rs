//! CLI command implementations

use anyhow::Context;
use edm_core::{ModelCache, Registry, load_model_cache, outline, save_model_cache};
use edm_loader::{LoadedModels, ModelLoader};
use std::path::{Path, PathBuf};

/// Load every definition file into one registry.
fn load(files: &[PathBuf]) -> anyhow::Result<LoadedModels> {
    let mut loader = ModelLoader::new();
    for file in files {
        loader
            .add_file(file)
            .with_context(|| format!("Cannot load {}", file.display()))?;
    }
    Ok(loader.load()?)
}

pub fn check(files: &[PathBuf]) -> anyhow::Result<()> {
    let loaded = load(files)?;
    let registry = &loaded.registry;

    for (namespace, &model) in &loaded.models {
        let types = registry.structured_types(model);
        let containers = registry.containers(model);
        let sets: usize = containers
            .iter()
            .map(|&c| registry.entity_sets(c).len())
            .sum();
        let properties: usize = types.iter().map(|&t| registry.properties(t).len()).sum();
        println!(
            "{}: {} types, {} properties, {} containers, {} entity sets",
            if namespace.is_empty() { "<default>" } else { namespace.as_str() },
            types.len(),
            properties,
            containers.len(),
            sets
        );
    }

    tracing::info!("Registry holds {} nodes, {} edges", registry.node_count(), registry.edge_count());
    Ok(())
}

pub fn describe(files: &[PathBuf]) -> anyhow::Result<()> {
    let loaded = load(files)?;
    print!("{}", outline(&loaded.registry));
    Ok(())
}

pub fn resolve(files: &[PathBuf], container: &str, set: &str) -> anyhow::Result<()> {
    let loaded = load(files)?;
    let registry = &loaded.registry;

    let container_id = registry
        .container_by_full_name(container)
        .with_context(|| format!("No entity container named '{container}'"))?;
    let set_id = registry
        .entity_set_by_name(container_id, set)
        .with_context(|| format!("Entity set '{set}' not found from container '{container}'"))?;

    println!("{}", describe_entity_set(registry, set_id));
    Ok(())
}

fn describe_entity_set(registry: &Registry, set: edm_core::EntitySetId) -> String {
    let owner = registry
        .container_of(set)
        .and_then(|c| registry.container_full_name(c))
        .unwrap_or_default();
    let (name, entity_type) = registry
        .entity_set(set)
        .map(|s| {
            (
                s.name().to_string(),
                registry.type_full_name(s.entity_type()).unwrap_or_default(),
            )
        })
        .unwrap_or_default();
    format!("{owner}.{name}: {entity_type}")
}

pub fn cache(root: &Path, files: &[PathBuf]) -> anyhow::Result<()> {
    let loaded = load(files)?;

    for (namespace, &model) in &loaded.models {
        let path = save_model_cache(&loaded.registry, model, root)?;
        let cache: ModelCache = load_model_cache(root, namespace)?
            .with_context(|| format!("Cache for '{namespace}' was not written"))?;
        let bound = cache
            .bind_all(&loaded.catalog)
            .with_context(|| format!("Cache for '{namespace}' no longer matches its classes"))?;
        println!("{}: {} properties cached", path.display(), bound.len());
    }
    Ok(())
}

pub fn clear(root: &Path) -> anyhow::Result<()> {
    tracing::info!("Clearing cache for: {}", root.display());

    edm_core::clear_cache(root)?;

    tracing::info!("Cache cleared");
    Ok(())
}
