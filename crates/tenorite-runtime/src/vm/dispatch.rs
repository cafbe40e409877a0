//! Message dispatch with rank lifting
//!
//! The semantic heart of the language: a send either resolves directly
//! on the receiver, or — when argument ranks name collection levels —
//! zips over the collection arguments and delivers the message
//! elementwise, collecting the results.

use super::Vm;
use crate::symbol::Symbol;
use crate::value::{NamespaceRef, RuntimeError, TableData, Value};
use std::rc::Rc;

/// A selector plus one rank per call-vector position (receiver included)
#[derive(Debug, Clone)]
pub struct Message {
    pub selector: Symbol,
    pub ranks: Vec<u16>,
}

impl Message {
    /// An ordinary send: all ranks zero
    pub fn plain(selector: Symbol, argc: usize) -> Self {
        Self {
            selector,
            ranks: vec![0; argc],
        }
    }
}

/// Dispatch a message.
///
/// Auto-promotion: a rank-free send to a collection that does not itself
/// define the selector is re-ranked to `ranks[0] = 1`, so `list + 1`
/// vectorizes without explicit rank syntax. The caller's rank vector is
/// never mutated; promotion works on a fresh copy.
pub fn call(vm: &mut Vm, msg: &Message, args: &[Value]) -> Result<Value, RuntimeError> {
    if args[0].is_collection()
        && msg.ranks.iter().all(|&rank| rank == 0)
        && get_method(vm, &args[0], msg.selector).is_none()
    {
        let mut ranks = msg.ranks.clone();
        ranks[0] = 1;
        let promoted = Message {
            selector: msg.selector,
            ranks,
        };
        return call_rec(vm, 0, &promoted, args);
    }
    call_rec(vm, 0, msg, args)
}

fn call_rec(vm: &mut Vm, depth: u32, msg: &Message, args: &[Value]) -> Result<Value, RuntimeError> {
    let mut to_zip = Vec::new();
    for (i, &rank) in msg.ranks.iter().enumerate() {
        if u32::from(rank) == depth + 1 && args[i].is_collection() {
            to_zip.push(i);
        }
    }

    if to_zip.is_empty() {
        return deliver(vm, msg, args);
    }

    let size = args[to_zip[0]].size();
    for &i in &to_zip {
        if args[i].size() != size {
            return Err(RuntimeError::DifferingSizes);
        }
    }

    let mut results = Vec::with_capacity(size);
    for k in 0..size {
        let new_args: Vec<Value> = args
            .iter()
            .enumerate()
            .map(|(j, arg)| {
                if u32::from(msg.ranks[j]) == depth + 1 {
                    arg.get_at(k)
                } else {
                    arg.clone()
                }
            })
            .collect();
        results.push(call_rec(vm, depth + 1, msg, &new_args)?);
    }

    // A table receiver zipped at rank 1 keeps its keys.
    if msg.ranks[0] == 1 {
        if let Value::Table(table) = &args[0] {
            return Ok(Value::Table(Rc::new(TableData {
                keys: table.keys.clone(),
                values: results,
            })));
        }
    }
    Ok(Value::list(results))
}

/// Resolve and invoke the selector on the receiver without any zipping
fn deliver(vm: &mut Vm, msg: &Message, args: &[Value]) -> Result<Value, RuntimeError> {
    // `&field` selectors read object fields directly.
    if let Value::Object(obj) = &args[0] {
        let name = vm.symbols.resolve(msg.selector);
        if let Some(field) = name.strip_prefix('&') {
            let sym = vm
                .symbols
                .intern(field)
                .map_err(|err| RuntimeError::TypeError(err.to_string()))?;
            return obj
                .fields
                .borrow()
                .get(&sym)
                .cloned()
                .ok_or_else(|| RuntimeError::InvalidFieldAccess(field.to_string()));
        }
    }

    let method = get_method(vm, &args[0], msg.selector).ok_or_else(|| {
        RuntimeError::UnknownMethod {
            selector: format!("'{}", vm.symbols.resolve(msg.selector)),
            receiver: args[0].display_string(&vm.symbols),
        }
    })?;
    invoke(vm, &method, args)
}

/// Invoke a callable with the given call vector (receiver at index 0)
pub fn invoke(vm: &mut Vm, callable: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    match callable {
        Value::Closure(closure) => vm.run_closure(&closure.clone(), args.to_vec()),
        Value::Primitive(primitive) => (primitive.func)(vm, args),
        _ => Err(RuntimeError::NotCallable),
    }
}

/// Resolve a selector on a receiver through its home namespaces.
///
/// Namespaces check their static twin first; objects walk their roles in
/// order. Everything falls back to the Object namespace.
pub fn get_method(vm: &Vm, recv: &Value, sym: Symbol) -> Option<Value> {
    let core = &vm.core;
    let lookup = |ns: &NamespaceRef| ns.borrow().table.get(&sym).cloned();
    match recv {
        Value::None | Value::Symbol(_) | Value::Regex(_) => lookup(&core.object),
        Value::True | Value::False => lookup(&core.bools).or_else(|| lookup(&core.object)),
        Value::Number(_) => lookup(&core.number).or_else(|| lookup(&core.object)),
        Value::String(_) => lookup(&core.string).or_else(|| lookup(&core.object)),
        Value::Pair(_) => lookup(&core.pair).or_else(|| lookup(&core.object)),
        Value::Range { .. } => lookup(&core.range).or_else(|| lookup(&core.object)),
        Value::List(_) => lookup(&core.list).or_else(|| lookup(&core.object)),
        Value::Table(_) => lookup(&core.table).or_else(|| lookup(&core.object)),
        Value::Closure(_) | Value::Primitive(_) => {
            lookup(&core.function).or_else(|| lookup(&core.object))
        }
        Value::Namespace(ns) => {
            let from_static = ns
                .borrow()
                .static_ns
                .as_ref()
                .and_then(|static_ns| lookup(static_ns));
            from_static
                .or_else(|| lookup(&core.namespace))
                .or_else(|| lookup(&core.object))
        }
        Value::Object(obj) => obj
            .roles
            .iter()
            .find_map(|role| lookup(role))
            .or_else(|| lookup(&core.object)),
        Value::Code(_) => None,
    }
}

/// `value type Ns` — whether `ns` is a home namespace (or role) of `value`
pub fn type_is(vm: &Vm, value: &Value, ns: &Value) -> bool {
    let Value::Namespace(target) = ns else {
        return false;
    };
    let core = &vm.core;
    let is = |home: &NamespaceRef| Rc::ptr_eq(home, target);
    match value {
        Value::None => is(&core.object),
        Value::True | Value::False => is(&core.bools) || is(&core.object),
        Value::Number(_) => is(&core.number) || is(&core.object),
        Value::String(_) => is(&core.string) || is(&core.object),
        Value::Symbol(_) => is(&core.symbol) || is(&core.object),
        Value::Pair(_) => is(&core.pair) || is(&core.object),
        Value::Range { .. } => is(&core.range) || is(&core.object),
        Value::List(_) => is(&core.list) || is(&core.object),
        Value::Table(_) => is(&core.table) || is(&core.object),
        Value::Namespace(_) => is(&core.namespace) || is(&core.object),
        Value::Closure(_) | Value::Primitive(_) => is(&core.function) || is(&core.object),
        Value::Regex(_) => is(&core.regex) || is(&core.object),
        Value::Object(obj) => obj.roles.iter().any(|role| Rc::ptr_eq(role, target)),
        Value::Code(_) => false,
    }
}

/// Selectors visible on a receiver, sorted by name (for Reflect)
pub fn method_symbols(vm: &Vm, recv: &Value) -> Vec<Symbol> {
    let core = &vm.core;
    let mut namespaces: Vec<NamespaceRef> = Vec::new();
    match recv {
        Value::None | Value::Symbol(_) | Value::Regex(_) => {}
        Value::True | Value::False => namespaces.push(core.bools.clone()),
        Value::Number(_) => namespaces.push(core.number.clone()),
        Value::String(_) => namespaces.push(core.string.clone()),
        Value::Pair(_) => namespaces.push(core.pair.clone()),
        Value::Range { .. } => namespaces.push(core.range.clone()),
        Value::List(_) => namespaces.push(core.list.clone()),
        Value::Table(_) => namespaces.push(core.table.clone()),
        Value::Closure(_) | Value::Primitive(_) => namespaces.push(core.function.clone()),
        Value::Namespace(ns) => {
            if let Some(static_ns) = ns.borrow().static_ns.clone() {
                namespaces.push(static_ns);
            }
            namespaces.push(core.namespace.clone());
        }
        Value::Object(obj) => namespaces.extend(obj.roles.iter().cloned()),
        Value::Code(_) => {}
    }
    namespaces.push(core.object.clone());

    let mut symbols: Vec<Symbol> = Vec::new();
    for ns in &namespaces {
        for &sym in ns.borrow().table.keys() {
            if !symbols.contains(&sym) {
                symbols.push(sym);
            }
        }
    }
    symbols.sort_by_key(|&sym| vm.symbols.resolve(sym));
    symbols
}
