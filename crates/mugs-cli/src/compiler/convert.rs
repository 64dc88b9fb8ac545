//! Conversion between Starlark values and JSON values.
//!
//! Values placed in the shared store must outlive the evaluator heap they
//! were created on, so they cross the boundary as `serde_json::Value`.

use anyhow::{anyhow, bail, Result};
use starlark::collections::SmallMap;
use starlark::values::dict::{Dict, DictRef};
use starlark::values::list::{AllocList, ListRef};
use starlark::values::tuple::TupleRef;
use starlark::values::{Heap, Value};

/// Converts a Starlark value to JSON.
///
/// Supported: `None`, `bool`, `int`, `float`, `string`, `list`, `tuple`
/// (as array) and `dict` with string keys.
pub fn starlark_to_json(value: Value) -> Result<serde_json::Value> {
    if value.is_none() {
        return Ok(serde_json::Value::Null);
    }

    if let Some(b) = value.unpack_bool() {
        return Ok(serde_json::Value::Bool(b));
    }

    if let Some(i) = value.unpack_i32() {
        return Ok(serde_json::Value::Number(i.into()));
    }
    // `unpack_i32` only covers part of the int range; go through the string
    // form for the rest.
    if value.get_type() == "int" {
        let s = value.to_str();
        if let Ok(i) = s.parse::<i64>() {
            return Ok(serde_json::Value::Number(i.into()));
        }
        bail!("cannot represent int {} as JSON number", s);
    }

    if let Some(s) = value.unpack_str() {
        return Ok(serde_json::Value::String(s.to_string()));
    }

    if value.get_type() == "float" {
        let s = value.to_str();
        let f: f64 = s
            .parse()
            .map_err(|_| anyhow!("cannot parse float {}", s))?;
        return serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .ok_or_else(|| anyhow!("cannot represent float {} as JSON number", f));
    }

    if let Some(list) = ListRef::from_value(value) {
        let items: Result<Vec<_>> = list.iter().map(starlark_to_json).collect();
        return Ok(serde_json::Value::Array(items?));
    }

    if let Some(tuple) = TupleRef::from_value(value) {
        let items: Result<Vec<_>> = tuple.content().iter().copied().map(starlark_to_json).collect();
        return Ok(serde_json::Value::Array(items?));
    }

    if let Some(dict) = DictRef::from_value(value) {
        let mut map = serde_json::Map::new();
        for (k, v) in dict.iter() {
            let key = k
                .unpack_str()
                .ok_or_else(|| anyhow!("dict keys must be strings, got {}", k.get_type()))?;
            map.insert(key.to_string(), starlark_to_json(v)?);
        }
        return Ok(serde_json::Value::Object(map));
    }

    bail!("unsupported value type for shared data: {}", value.get_type())
}

/// Allocates a JSON value on a Starlark heap.
pub fn json_to_starlark<'v>(value: &serde_json::Value, heap: &'v Heap) -> Result<Value<'v>> {
    Ok(match value {
        serde_json::Value::Null => Value::new_none(),
        serde_json::Value::Bool(b) => Value::new_bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => heap.alloc(i),
            None => heap.alloc(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => heap.alloc_str(s).to_value(),
        serde_json::Value::Array(items) => {
            let values: Result<Vec<Value<'v>>> =
                items.iter().map(|item| json_to_starlark(item, heap)).collect();
            heap.alloc(AllocList(values?))
        }
        serde_json::Value::Object(map) => {
            let mut entries: SmallMap<Value<'v>, Value<'v>> = SmallMap::new();
            for (k, v) in map {
                let key = heap
                    .alloc_str(k)
                    .to_value()
                    .get_hashed()
                    .map_err(|e| anyhow!("{}", e))?;
                entries.insert_hashed(key, json_to_starlark(v, heap)?);
            }
            heap.alloc(Dict::new(entries))
        }
    })
}
