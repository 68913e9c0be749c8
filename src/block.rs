use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Num(f64),
    Bool(bool),
}

impl FieldValue {
    pub fn as_str(&self) -> String {
        match self {
            FieldValue::Str(s) => s.clone(),
            FieldValue::Num(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            FieldValue::Bool(b) => b.to_string(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Num(n) => Some(*n),
            FieldValue::Str(s) => s.trim().parse::<f64>().ok(),
            FieldValue::Bool(_) => None,
        }
    }
}

/// One visual block. `kind` is namespaced as `<scope>.<action>` where the
/// scope is empty or a robot-model id; value inputs hold nested value blocks
/// and `next` chains sibling statement blocks.
#[derive(Debug, Clone)]
pub struct Block {
    pub kind: String,
    pub fields: BTreeMap<String, FieldValue>,
    pub values: BTreeMap<String, Option<Block>>,
    pub next: Option<Box<Block>>,
}

impl Block {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn value_input(&self, name: &str) -> Option<&Block> {
        self.values.get(name).and_then(|slot| slot.as_ref())
    }

    /// Splits the namespaced kind at the first dot.
    pub fn split_kind(&self) -> (&str, &str) {
        split_kind(&self.kind)
    }
}

pub fn split_kind(kind: &str) -> (&str, &str) {
    match kind.find('.') {
        Some(index) => (&kind[..index], &kind[index + 1..]),
        None => ("", kind),
    }
}

#[derive(Debug, Clone)]
pub struct BlockProgram {
    pub blocks: Vec<Block>,
}

impl BlockProgram {
    pub fn from_json(source: &str) -> Result<BlockProgram> {
        let root: Value =
            serde_json::from_str(source).context("Block program is not valid JSON.")?;
        let blocks_value = root
            .get("blocks")
            .ok_or_else(|| anyhow!("Block program is missing the 'blocks' array."))?;
        let entries = blocks_value
            .as_array()
            .ok_or_else(|| anyhow!("'blocks' must be an array of block objects."))?;
        let mut blocks = Vec::new();
        for (index, entry) in entries.iter().enumerate() {
            blocks.push(
                block_from_value(entry)
                    .with_context(|| format!("Invalid block at top-level index {}.", index))?,
            );
        }
        Ok(BlockProgram { blocks })
    }
}

fn block_from_value(value: &Value) -> Result<Block> {
    let object = value
        .as_object()
        .ok_or_else(|| anyhow!("Block must be a JSON object."))?;
    let kind = object
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("Block is missing a string 'kind'."))?
        .to_string();
    validate_kind(&kind)?;

    let mut fields = BTreeMap::new();
    if let Some(raw) = object.get("fields") {
        let map = raw
            .as_object()
            .ok_or_else(|| anyhow!("'fields' of block '{}' must be an object.", kind))?;
        for (name, field) in map {
            let parsed = match field {
                Value::String(s) => FieldValue::Str(s.clone()),
                Value::Number(n) => FieldValue::Num(
                    n.as_f64()
                        .ok_or_else(|| anyhow!("Field '{}' is not a finite number.", name))?,
                ),
                Value::Bool(b) => FieldValue::Bool(*b),
                _ => bail!("Field '{}' of block '{}' must be a scalar.", name, kind),
            };
            fields.insert(name.clone(), parsed);
        }
    }

    let mut values = BTreeMap::new();
    if let Some(raw) = object.get("values") {
        let map = raw
            .as_object()
            .ok_or_else(|| anyhow!("'values' of block '{}' must be an object.", kind))?;
        for (name, slot) in map {
            let nested = match slot {
                Value::Null => None,
                other => Some(block_from_value(other).with_context(|| {
                    format!("Invalid value input '{}' of block '{}'.", name, kind)
                })?),
            };
            values.insert(name.clone(), nested);
        }
    }

    let next = match object.get("next") {
        None | Some(Value::Null) => None,
        Some(other) => Some(Box::new(block_from_value(other).with_context(|| {
            format!("Invalid 'next' block after '{}'.", kind)
        })?)),
    };

    Ok(Block { kind, fields, values, next })
}

fn validate_kind(kind: &str) -> Result<()> {
    let (scope, action) = split_kind(kind);
    if action.is_empty() {
        bail!("Block kind '{}' has an empty action name.", kind);
    }
    if action.contains('.') {
        bail!("Block kind '{}' has a dotted action name.", kind);
    }
    if scope.contains('.') {
        bail!("Block kind '{}' has a dotted scope.", kind);
    }
    Ok(())
}
