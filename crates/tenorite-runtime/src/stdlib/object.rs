//! Object, Bool, Namespace, and Function primitives

use super::{list_arg, method};
use crate::value::{same_obj, ObjectData, RuntimeError, Value};
use crate::vm::{dispatch, Vm};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub(super) fn install(vm: &mut Vm) {
    let object = vm.core.object.clone();
    method(vm, &object, "===", object_identical);
    method(vm, &object, "!==", object_not_identical);
    method(vm, &object, "=>", object_pair);
    method(vm, &object, "string", object_string);

    let bools = vm.core.bools.clone();
    method(vm, &bools, "==", bool_eq);
    method(vm, &bools, "!=", bool_ne);
    method(vm, &bools, "not", bool_not);
    method(vm, &bools, "string", object_string);

    let namespace = vm.core.namespace.clone();
    method(vm, &namespace, "new:", namespace_new);

    let function = vm.core.function.clone();
    method(vm, &function, "arity", function_arity);
    method(vm, &function, "call", function_call);
    method(vm, &function, "value:", function_call);
    method(vm, &function, "value:value:", function_call);
    method(vm, &function, "value:value:value:", function_call);
    method(vm, &function, "callWithValues:", function_call_with_values);
}

fn object_identical(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::bool(same_obj(&args[0], &args[1])))
}

fn object_not_identical(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::bool(!same_obj(&args[0], &args[1])))
}

fn object_pair(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Pair(Rc::new((args[0].clone(), args[1].clone()))))
}

fn object_string(vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::string(args[0].display_string(&vm.symbols)))
}

fn bool_eq(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::bool(args[0] == args[1]))
}

fn bool_ne(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::bool(args[0] != args[1]))
}

fn bool_not(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::bool(args[0].is_falsey()))
}

/// `Ns new: initializer` — construct an object with the namespace as its
/// single role, then run the one-argument initializer with the fresh
/// object. The object is the result regardless of the initializer's own
/// return value.
fn namespace_new(vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let Value::Namespace(ns) = &args[0] else {
        return Err(RuntimeError::TypeError(
            "Receiver must be a namespace.".to_string(),
        ));
    };
    let init = args
        .get(1)
        .ok_or_else(|| RuntimeError::TypeError("Initializer must be a function.".to_string()))?;
    if !matches!(init, Value::Closure(_) | Value::Primitive(_)) {
        return Err(RuntimeError::TypeError(
            "Initializer must be a function.".to_string(),
        ));
    }

    let object = Value::Object(Rc::new(ObjectData {
        roles: vec![ns.clone()],
        fields: RefCell::new(HashMap::new()),
    }));
    dispatch::invoke(vm, init, &[init.clone(), object.clone()])?;
    Ok(object)
}

fn function_arity(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Closure(closure) => Ok(Value::Number(f64::from(closure.code.arity))),
        Value::Primitive(_) => Ok(Value::None),
        _ => Err(RuntimeError::NotCallable),
    }
}

/// `call`, `value:`, `value:value:`, … — invoke the receiver with the
/// call vector as-is, so the callee sees itself at index 0
fn function_call(vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let callee = args[0].clone();
    dispatch::invoke(vm, &callee, args)
}

/// `callWithValues: list` — spread a list as the argument vector.
/// The callee is prepended at index 0, closure or primitive alike.
fn function_call_with_values(vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let callee = args[0].clone();
    let values = list_arg(args, 1, "Argument")?;
    let mut vector = Vec::with_capacity(values.len() + 1);
    vector.push(callee.clone());
    vector.extend(values.iter().cloned());
    dispatch::invoke(vm, &callee, &vector)
}
