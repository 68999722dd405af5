//! Structured-data operations: `BUILD_LIST`, `BUILD_MAP`, `GET_ITEM`,
//! `SET_ITEM`, `LEN`.
//!
//! `BUILD_MAP` and `SET_ITEM` here implement the specification's corrected
//! semantics rather than `original_source/src/sym/vm.py`'s behavior —
//! see the Design Decisions section of `SPEC_FULL.md` for why those two
//! handlers are not a direct port.

use crate::error::RuntimeError;
use crate::value::{HashableValue, Value};

use super::pop;

/// `BUILD_LIST n`: pop `n` values (pushed in order, so the pop order is
/// reversed) and assemble them into a list preserving push order.
pub(super) fn handle_build_list(n: usize, stack: &mut Vec<Value>) -> Result<(), RuntimeError> {
    let mut items = Vec::with_capacity(n);
    for _ in 0..n {
        items.push(pop(stack)?);
    }
    items.reverse();
    stack.push(Value::list(items));
    Ok(())
}

/// `BUILD_MAP n`: pop `n` (key, value) pairs and assign each key to its
/// value, overwriting on a duplicate key. The buggy source this was
/// distilled from instead appends into a never-initialized bucket
/// (`new_map[key].append(val)`), which always raises at runtime — that
/// defect is not reproduced here.
pub(super) fn handle_build_map(n: usize, stack: &mut Vec<Value>) -> Result<(), RuntimeError> {
    let mut pairs = Vec::with_capacity(n);
    for _ in 0..n {
        let value = pop(stack)?;
        let key = pop(stack)?;
        pairs.push((key, value));
    }
    pairs.reverse();
    stack.push(Value::map(pairs));
    Ok(())
}

/// `GET_ITEM`: pops `key` then `container`. Lists index by non-negative
/// integer; maps look up by structural key equality.
pub(super) fn handle_get_item(stack: &mut Vec<Value>) -> Result<(), RuntimeError> {
    let key = pop(stack)?;
    let container = pop(stack)?;
    let result = match &container {
        Value::List(items) => {
            let idx = key.as_int()?;
            if idx < 0 {
                return Err(RuntimeError::KeyOrIndex(format!(
                    "list index out of range: {}",
                    idx
                )));
            }
            items
                .borrow()
                .get(idx as usize)
                .cloned()
                .ok_or_else(|| RuntimeError::KeyOrIndex(format!("list index out of range: {}", idx)))?
        }
        Value::Map(map) => map
            .borrow()
            .get(&HashableValue(key.clone()))
            .cloned()
            .ok_or_else(|| {
                RuntimeError::KeyOrIndex(format!("key '{}' not found", key.to_display_string()))
            })?,
        Value::Str(s) => {
            let idx = key.as_int()?;
            if idx < 0 {
                return Err(RuntimeError::KeyOrIndex(format!(
                    "string index out of range: {}",
                    idx
                )));
            }
            s.chars()
                .nth(idx as usize)
                .map(|c| Value::Str(c.to_string()))
                .ok_or_else(|| {
                    RuntimeError::KeyOrIndex(format!("string index out of range: {}", idx))
                })?
        }
        other => {
            return Err(RuntimeError::TypeMismatch(format!(
                "'{}' is not indexable",
                other.kind_name()
            )))
        }
    };
    stack.push(result);
    Ok(())
}

/// `SET_ITEM`: pops `value`, then `key`, then `container`, in that order,
/// mutates the container in place, and pushes the same container back so
/// the mutation is observable through any other reference to it. This is
/// the specification's corrected pop order; the source this was distilled
/// from only pops two values while referencing a third that was never
/// popped (`val, key, obj = self.stack.pop()`), which is itself broken.
pub(super) fn handle_set_item(stack: &mut Vec<Value>) -> Result<(), RuntimeError> {
    let value = pop(stack)?;
    let key = pop(stack)?;
    let container = pop(stack)?;
    match &container {
        Value::List(items) => {
            let idx = key.as_int()?;
            if idx < 0 {
                return Err(RuntimeError::KeyOrIndex(format!(
                    "list index out of range: {}",
                    idx
                )));
            }
            let mut items = items.borrow_mut();
            let idx = idx as usize;
            if idx >= items.len() {
                return Err(RuntimeError::KeyOrIndex(format!(
                    "list index out of range: {}",
                    idx
                )));
            }
            items[idx] = value;
        }
        Value::Map(map) => {
            map.borrow_mut().insert(HashableValue(key), value);
        }
        other => {
            return Err(RuntimeError::TypeMismatch(format!(
                "'{}' does not support item assignment",
                other.kind_name()
            )))
        }
    }
    stack.push(container);
    Ok(())
}

/// `LEN`: string length in code points; list/map length in elements.
pub(super) fn handle_len(stack: &mut Vec<Value>) -> Result<(), RuntimeError> {
    let v = pop(stack)?;
    let len = match &v {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.borrow().len(),
        Value::Map(map) => map.borrow().len(),
        other => {
            return Err(RuntimeError::TypeMismatch(format!(
                "object of type '{}' has no len()",
                other.kind_name()
            )))
        }
    };
    stack.push(Value::Int(len as i64));
    Ok(())
}
