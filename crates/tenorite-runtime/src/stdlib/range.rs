//! Range primitives
//!
//! Ranges are inclusive at both ends; the step is +1 or -1 depending on
//! the sign of `to - from`. `next:` is the iteration primitive the
//! prelude builds its loops on.

use super::method;
use crate::value::{RuntimeError, Value};
use crate::vm::Vm;

pub(super) fn install(vm: &mut Vm) {
    let range = vm.core.range.clone();
    method(vm, &range, "from", range_from);
    method(vm, &range, "to", range_to);
    method(vm, &range, "min", range_min);
    method(vm, &range, "max", range_max);
    method(vm, &range, "len", range_len);
    method(vm, &range, "list", range_list);
    method(vm, &range, "next:", range_next);
}

fn range_recv(args: &[Value]) -> Result<(f64, f64), RuntimeError> {
    match args.first() {
        Some(Value::Range { from, to }) => Ok((*from, *to)),
        _ => Err(RuntimeError::TypeError("Receiver must be a range.".to_string())),
    }
}

fn range_from(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (from, _) = range_recv(args)?;
    Ok(Value::Number(from))
}

fn range_to(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (_, to) = range_recv(args)?;
    Ok(Value::Number(to))
}

fn range_min(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (from, to) = range_recv(args)?;
    Ok(Value::Number(from.min(to)))
}

fn range_max(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (from, to) = range_recv(args)?;
    Ok(Value::Number(from.max(to)))
}

/// Count of values the range visits: `|to - from| + 1`
fn range_len(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (from, to) = range_recv(args)?;
    Ok(Value::Number((to - from).abs().floor() + 1.0))
}

/// Materialize the range, inclusive of both endpoints
fn range_list(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (from, to) = range_recv(args)?;
    let step = if to >= from { 1.0 } else { -1.0 };
    let mut items = Vec::new();
    let mut current = from;
    loop {
        items.push(Value::Number(current));
        if (step > 0.0 && current + step > to) || (step < 0.0 && current + step < to) {
            break;
        }
        current += step;
    }
    Ok(Value::list(items))
}

/// Successor of `current` in range order; None seeds the iteration at
/// `from`, and a step past `to` answers None
fn range_next(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (from, to) = range_recv(args)?;
    match args.get(1) {
        Some(Value::None) => Ok(Value::Number(from)),
        Some(Value::Number(current)) => {
            let next = if to >= from { current + 1.0 } else { current - 1.0 };
            let exhausted = if to >= from { next > to } else { next < to };
            if exhausted {
                Ok(Value::None)
            } else {
                Ok(Value::Number(next))
            }
        }
        _ => Err(RuntimeError::TypeError("Current must be number.".to_string())),
    }
}
