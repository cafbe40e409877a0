//! Primitive library
//!
//! Populates the home namespaces with host-function methods and binds
//! the seed names (namespaces, booleans, None) into the VM's top module.
//! Everything else the language offers is defined in the prelude, in
//! Tenorite itself.

mod list;
mod number;
mod object;
mod range;
mod regex;
mod string;
mod system;
mod table;

use crate::value::{NamespaceData, NamespaceRef, Primitive, PrimitiveFn, RuntimeError, Value};
use crate::vm::Vm;
use std::rc::Rc;

/// Install every primitive and seed binding into a fresh VM
pub fn install(vm: &mut Vm) {
    object::install(vm);
    number::install(vm);
    string::install(vm);
    list::install(vm);
    table::install(vm);
    range::install(vm);
    regex::install(vm);

    bind(vm, "Object", Value::Namespace(vm.core.object.clone()));
    bind(vm, "Bool", Value::Namespace(vm.core.bools.clone()));
    bind(vm, "Number", Value::Namespace(vm.core.number.clone()));
    bind(vm, "String", Value::Namespace(vm.core.string.clone()));
    bind(vm, "Function", Value::Namespace(vm.core.function.clone()));
    bind(vm, "List", Value::Namespace(vm.core.list.clone()));
    bind(vm, "Table", Value::Namespace(vm.core.table.clone()));
    bind(vm, "Range", Value::Namespace(vm.core.range.clone()));
    bind(vm, "Namespace", Value::Namespace(vm.core.namespace.clone()));
    bind(vm, "Symbol", Value::Namespace(vm.core.symbol.clone()));
    bind(vm, "Pair", Value::Namespace(vm.core.pair.clone()));
    bind(vm, "Regex", Value::Namespace(vm.core.regex.clone()));

    system::install(vm);

    bind(vm, "True", Value::True);
    bind(vm, "False", Value::False);
    bind(vm, "None", Value::None);
}

/// Bind a name in the top module
pub(crate) fn bind(vm: &mut Vm, name: &str, value: Value) {
    let sym = vm
        .symbols
        .intern(name)
        .expect("symbol space exhausted during bootstrap");
    vm.top_module.add(sym, value);
}

/// Install an instance method on a namespace
pub(crate) fn method(vm: &mut Vm, ns: &NamespaceRef, name: &'static str, func: PrimitiveFn) {
    let sym = vm
        .symbols
        .intern(name)
        .expect("symbol space exhausted during bootstrap");
    ns.borrow_mut()
        .table
        .insert(sym, Value::Primitive(Primitive { name, func }));
}

/// Install a class-level method into a namespace's static twin
pub(crate) fn static_method(vm: &mut Vm, ns: &NamespaceRef, name: &'static str, func: PrimitiveFn) {
    let sym = vm
        .symbols
        .intern(name)
        .expect("symbol space exhausted during bootstrap");
    let static_ns = {
        let mut ns = ns.borrow_mut();
        if ns.static_ns.is_none() {
            ns.static_ns = Some(NamespaceData::new(""));
        }
        ns.static_ns.clone().expect("static twin just created")
    };
    static_ns
        .borrow_mut()
        .table
        .insert(sym, Value::Primitive(Primitive { name, func }));
}

// ===== Argument validation =====

pub(crate) fn number_arg(args: &[Value], at: usize, what: &str) -> Result<f64, RuntimeError> {
    match args.get(at) {
        Some(Value::Number(n)) => Ok(*n),
        _ => Err(RuntimeError::TypeError(format!("{} must be number.", what))),
    }
}

pub(crate) fn string_arg(args: &[Value], at: usize, what: &str) -> Result<Rc<str>, RuntimeError> {
    match args.get(at) {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(RuntimeError::TypeError(format!("{} must be string.", what))),
    }
}

pub(crate) fn list_arg(
    args: &[Value],
    at: usize,
    what: &str,
) -> Result<Rc<Vec<Value>>, RuntimeError> {
    match args.get(at) {
        Some(Value::List(items)) => Ok(items.clone()),
        _ => Err(RuntimeError::TypeError(format!("{} must be a list.", what))),
    }
}

/// A non-negative integral index strictly below `len`
pub(crate) fn index_arg(args: &[Value], at: usize, len: usize) -> Result<usize, RuntimeError> {
    let n = number_arg(args, at, "Index")?;
    if n < 0.0 || n.fract() != 0.0 || n >= len as f64 {
        return Err(RuntimeError::TypeError("Index out of range.".to_string()));
    }
    Ok(n as usize)
}

/// A non-negative integral count (clamping is up to the caller)
pub(crate) fn count_arg(args: &[Value], at: usize, what: &str) -> Result<usize, RuntimeError> {
    let n = number_arg(args, at, what)?;
    if n < 0.0 || n.fract() != 0.0 {
        return Err(RuntimeError::TypeError(format!(
            "{} must be a non-negative integer.",
            what
        )));
    }
    Ok(n as usize)
}
