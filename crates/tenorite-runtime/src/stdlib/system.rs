//! System and Reflect namespaces
//!
//! Both are pure class-level namespaces: every verb lives on the static
//! twin and the namespace value itself is the receiver.

use super::{bind, static_method, string_arg};
use crate::value::{NamespaceData, RuntimeError, Value};
use crate::vm::{dispatch, Vm};

pub(super) fn install(vm: &mut Vm) {
    let system = NamespaceData::new("System");
    static_method(vm, &system, "assert:", system_assert);
    static_method(vm, &system, "panic:", system_panic);
    static_method(vm, &system, "writeString:", system_write_string);
    bind(vm, "System", Value::Namespace(system));

    let reflect = NamespaceData::new("Reflect");
    static_method(vm, &reflect, "listMethods:", reflect_list_methods);
    static_method(vm, &reflect, "notResponds:to:", reflect_not_responds);
    bind(vm, "Reflect", Value::Namespace(reflect));
}

/// `System assert: cond` — unwind unless `cond` is truthy
fn system_assert(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    match args.get(1) {
        Some(value) if !value.is_falsey() => Ok(Value::None),
        _ => Err(RuntimeError::AssertionFailed),
    }
}

/// `System panic: message` — explicit unconditional failure
fn system_panic(vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let message = match args.get(1) {
        Some(Value::String(s)) => s.to_string(),
        Some(other) => other.display_string(&vm.symbols),
        None => String::new(),
    };
    Err(RuntimeError::Panic(message))
}

/// `System writeString: s` — write without a trailing newline
fn system_write_string(vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let s = string_arg(args, 1, "Argument")?;
    vm.write_out(&s);
    Ok(Value::None)
}

/// `Reflect listMethods: obj` — selectors visible on a value, sorted
fn reflect_list_methods(vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let target = args
        .get(1)
        .ok_or_else(|| RuntimeError::TypeError("Argument missing.".to_string()))?;
    let symbols = dispatch::method_symbols(vm, target);
    Ok(Value::list(symbols.into_iter().map(Value::Symbol).collect()))
}

/// `Reflect notResponds: obj to: selector` — whether lookup would fail
fn reflect_not_responds(vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let target = args
        .get(1)
        .ok_or_else(|| RuntimeError::TypeError("Argument missing.".to_string()))?;
    let Some(Value::Symbol(sym)) = args.get(2) else {
        return Err(RuntimeError::TypeError("Selector must be a symbol.".to_string()));
    };
    Ok(Value::bool(dispatch::get_method(vm, target, *sym).is_none()))
}
