//! Table and Pair primitives

use super::method;
use crate::value::{same_obj, RuntimeError, Value};
use crate::vm::Vm;
use std::rc::Rc;

pub(super) fn install(vm: &mut Vm) {
    let table = vm.core.table.clone();
    method(vm, &table, "len", table_len);
    method(vm, &table, "keys", table_keys);
    method(vm, &table, "values", table_values);
    method(vm, &table, "at_:", table_at);

    let pair = vm.core.pair.clone();
    method(vm, &pair, "first", pair_first);
    method(vm, &pair, "second", pair_second);
}

fn table_recv(args: &[Value]) -> Result<Rc<crate::value::TableData>, RuntimeError> {
    match args.first() {
        Some(Value::Table(table)) => Ok(table.clone()),
        _ => Err(RuntimeError::TypeError("Receiver must be a table.".to_string())),
    }
}

fn table_len(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let table = table_recv(args)?;
    Ok(Value::Number(table.keys.len() as f64))
}

fn table_keys(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let table = table_recv(args)?;
    Ok(Value::list(table.keys.clone()))
}

fn table_values(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let table = table_recv(args)?;
    Ok(Value::list(table.values.clone()))
}

/// Key lookup by `same_obj`; a missing key answers None
fn table_at(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let table = table_recv(args)?;
    let key = &args[1];
    for (candidate, value) in table.keys.iter().zip(table.values.iter()) {
        if same_obj(candidate, key) {
            return Ok(value.clone());
        }
    }
    Ok(Value::None)
}

fn pair_recv(args: &[Value]) -> Result<Rc<(Value, Value)>, RuntimeError> {
    match args.first() {
        Some(Value::Pair(pair)) => Ok(pair.clone()),
        _ => Err(RuntimeError::TypeError("Receiver must be a pair.".to_string())),
    }
}

fn pair_first(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(pair_recv(args)?.0.clone())
}

fn pair_second(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(pair_recv(args)?.1.clone())
}
