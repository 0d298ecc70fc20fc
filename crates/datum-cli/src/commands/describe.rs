//! `datum describe`: list schema classes with resolved fields.

use super::load_registry;
use datum_core::{defaults_for, DATUM, FROZEN_DATUM};
use std::path::Path;

pub fn execute(schema: &Path) -> anyhow::Result<()> {
    let registry = load_registry(schema)?;

    for class in registry.classes() {
        if class.name() == DATUM || class.name() == FROZEN_DATUM {
            continue;
        }

        let kind = if class.is_frozen() { "frozen" } else { "mutable" };
        match class.parent() {
            Some(parent) => println!("{} ({}) extends {}", class.name(), kind, parent.name()),
            None => println!("{} ({})", class.name(), kind),
        }

        let defaults = defaults_for(&class);
        let fields = class.fields();
        if fields.is_empty() {
            println!("  (no fields)");
        }
        for field in fields.iter() {
            match defaults.get(&field.name) {
                Some(default) => println!("  {}: {} = {:?}", field.name, field.ty, default),
                None => println!("  {}: {}", field.name, field.ty),
            }
        }
    }

    Ok(())
}
