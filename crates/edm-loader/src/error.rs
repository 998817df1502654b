//! Loader errors

use std::path::PathBuf;

use edm_core::EdmError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("model '{namespace}': {source}")]
    Model { namespace: String, source: EdmError },

    #[error("model '{namespace}' references unknown model '{reference}'")]
    UnknownReference { namespace: String, reference: String },

    #[error("cyclic references between models: {0}")]
    CyclicReferences(String),

    #[error("model '{namespace}': unresolved type '{name}'")]
    UnresolvedType { namespace: String, name: String },

    #[error("model '{namespace}': unresolved container '{name}'")]
    UnresolvedContainer { namespace: String, name: String },

    #[error("model '{namespace}': '{name}' is not a primitive type")]
    UnknownPrimitive { namespace: String, name: String },
}

impl LoadError {
    pub(crate) fn model(namespace: &str) -> impl FnOnce(EdmError) -> LoadError + '_ {
        move |source| LoadError::Model {
            namespace: namespace.to_string(),
            source,
        }
    }
}
