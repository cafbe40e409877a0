//! List primitives
//!
//! Lists are immutable; every operation answers a fresh list and leaves
//! the receiver untouched.

use super::{count_arg, index_arg, list_arg, method, static_method};
use crate::value::{same_obj, RuntimeError, TableData, Value};
use crate::vm::Vm;
use std::rc::Rc;

pub(super) fn install(vm: &mut Vm) {
    let list = vm.core.list.clone();
    method(vm, &list, "!", list_at);
    method(vm, &list, "at_:", list_at);
    method(vm, &list, "<>", list_append);
    method(vm, &list, "++", list_concat);
    method(vm, &list, "len", list_len);
    method(vm, &list, "all", list_all);
    method(vm, &list, "any", list_any);
    method(vm, &list, "takeNumber:", list_take);
    method(vm, &list, "dropNumber:", list_drop);
    method(vm, &list, "compress:", list_compress);
    method(vm, &list, "slice:end:", list_slice_end);
    method(vm, &list, "groupList:", list_group);
    static_method(vm, &list, "new:fill:", list_new_fill);
}

/// `xs ! i` and `xs at_: i` — zero-based element access
fn list_at(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let items = list_arg(args, 0, "Receiver")?;
    let at = index_arg(args, 1, items.len())?;
    Ok(items[at].clone())
}

/// `xs <> x` — append one element
fn list_append(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let items = list_arg(args, 0, "Receiver")?;
    let mut out = items.as_ref().clone();
    out.push(args[1].clone());
    Ok(Value::list(out))
}

/// `xs ++ ys` — concatenate two lists
fn list_concat(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let lhs = list_arg(args, 0, "Left side")?;
    let rhs = list_arg(args, 1, "Right side")?;
    let mut out = lhs.as_ref().clone();
    out.extend(rhs.iter().cloned());
    Ok(Value::list(out))
}

fn list_len(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let items = list_arg(args, 0, "Receiver")?;
    Ok(Value::Number(items.len() as f64))
}

fn list_all(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let items = list_arg(args, 0, "Receiver")?;
    Ok(Value::bool(items.iter().all(|v| !v.is_falsey())))
}

fn list_any(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let items = list_arg(args, 0, "Receiver")?;
    Ok(Value::bool(items.iter().any(|v| !v.is_falsey())))
}

/// First `n` elements; `n` clamps to the length
fn list_take(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let items = list_arg(args, 0, "Receiver")?;
    let n = count_arg(args, 1, "Count")?.min(items.len());
    Ok(Value::list(items[..n].to_vec()))
}

/// Everything after the first `n` elements; `n` clamps to the length
fn list_drop(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let items = list_arg(args, 0, "Receiver")?;
    let n = count_arg(args, 1, "Count")?.min(items.len());
    Ok(Value::list(items[n..].to_vec()))
}

/// `xs compress: mask` — elements whose parallel mask entry is truthy
fn list_compress(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let items = list_arg(args, 0, "Receiver")?;
    let mask = list_arg(args, 1, "Mask")?;
    Ok(Value::list(
        items
            .iter()
            .zip(mask.iter())
            .filter(|(_, keep)| !keep.is_falsey())
            .map(|(item, _)| item.clone())
            .collect(),
    ))
}

/// `[start, end)` slice with clamping bounds
fn list_slice_end(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let items = list_arg(args, 0, "Receiver")?;
    let start = count_arg(args, 1, "Start")?.min(items.len());
    let end = count_arg(args, 2, "End")?.clamp(start, items.len());
    Ok(Value::list(items[start..end].to_vec()))
}

/// `xs groupList: keys` — partition by the parallel key vector.
///
/// The result table holds one bucket per distinct key, in order of first
/// appearance; keys match by `same_obj`.
fn list_group(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let items = list_arg(args, 0, "Receiver")?;
    let keys = list_arg(args, 1, "Keys")?;
    if items.len() != keys.len() {
        return Err(RuntimeError::DifferingSizes);
    }

    let mut out_keys: Vec<Value> = Vec::new();
    let mut buckets: Vec<Vec<Value>> = Vec::new();
    for (item, key) in items.iter().zip(keys.iter()) {
        match out_keys.iter().position(|k| same_obj(k, key)) {
            Some(at) => buckets[at].push(item.clone()),
            None => {
                out_keys.push(key.clone());
                buckets.push(vec![item.clone()]);
            }
        }
    }

    Ok(Value::Table(Rc::new(TableData {
        keys: out_keys,
        values: buckets.into_iter().map(Value::list).collect(),
    })))
}

/// `List new: n fill: x` — a list of `n` copies of `x`
fn list_new_fill(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let n = count_arg(args, 1, "Count")?;
    let fill = args
        .get(2)
        .cloned()
        .ok_or_else(|| RuntimeError::TypeError("Fill value missing.".to_string()))?;
    Ok(Value::list(vec![fill; n]))
}
