//! `datum new`: construct an instance from command-line field values.

use super::load_registry;
use anyhow::{anyhow, Context};
use datum_core::{Args, Value};
use std::path::Path;

/// Parse `name=value`; the value is JSON when it parses, else a plain string
fn parse_assignment(arg: &str) -> anyhow::Result<(String, Value)> {
    let (name, raw) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("expected `name=value`, got `{}`", arg))?;
    let value = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => Value::from_json(&json).with_context(|| format!("bad value for `{}`", name))?,
        Err(_) => Value::str(raw),
    };
    Ok((name.to_string(), value))
}

pub fn execute(schema: &Path, class: &str, fields: &[String], json: bool) -> anyhow::Result<()> {
    let registry = load_registry(schema)?;
    let class = registry.lookup(class)?;

    let args = fields
        .iter()
        .map(|f| parse_assignment(f))
        .try_fold(Args::new(), |args, parsed| {
            parsed.map(|(name, value)| args.kwarg(name, value))
        })?;
    let instance = class.construct(&args)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&instance.to_json()?)?);
    } else {
        println!("{}", instance.repr()?);
    }
    Ok(())
}
