//! Catalog and selection errors.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to load a catalog from disk.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The catalog path is not a readable directory.
    #[error("catalog directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A decision-tree file is not valid JSON of the expected shape.
    #[error("decision tree {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A selection that cannot be confirmed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no standards selected")]
    Empty,

    #[error("unknown standard {0:?}")]
    UnknownStandard(String),
}
