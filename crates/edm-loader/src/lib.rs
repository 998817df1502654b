//! Model definition loading
//!
//! Reads declarative TOML model definitions and assembles them into an
//! `edm_core::Registry` through the builder API, together with the class
//! catalog the property cache binds against.

pub mod definition;
pub mod error;
pub mod loader;


pub use definition::{ContainerDefinition, EntitySetDefinition, ModelDefinition, PropertyDefinition, TypeDefinition};
pub use error::LoadError;
pub use loader::{LoadedModels, ModelLoader};
