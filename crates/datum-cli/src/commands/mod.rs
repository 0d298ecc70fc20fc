//! Subcommand implementations

pub mod describe;
pub mod new;

use anyhow::Context;
use datum_core::{ClassRegistry, Schema};
use std::path::Path;

/// Fresh registry holding every class of the schema at `path`
pub fn load_registry(path: &Path) -> anyhow::Result<ClassRegistry> {
    let schema = Schema::from_path(path)
        .with_context(|| format!("failed to read schema {}", path.display()))?;
    let registry = ClassRegistry::new();
    registry
        .load_schema(&schema)
        .with_context(|| format!("failed to define classes from {}", path.display()))?;
    tracing::debug!(classes = registry.len(), "loaded schema");
    Ok(registry)
}
