//! Runtime value representation
//!
//! Values are a closed tagged sum. Scalars are stored inline; strings,
//! collections, namespaces, closures, and objects are reference-counted.
//! Namespaces and object field tables are the only interior-mutable
//! values; lists and tables are immutable and primitives build new ones.

use crate::bytecode::CodeObject;
use crate::symbol::{Symbol, SymbolTable};
use crate::vm::Vm;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Shared, mutable method table
pub type NamespaceRef = Rc<RefCell<NamespaceData>>;

/// A namespace: selector → callable, with an optional static twin
/// holding class-level methods.
pub struct NamespaceData {
    /// Human-readable name
    pub name: String,
    /// Instance methods
    pub table: HashMap<Symbol, Value>,
    /// Class-level methods, looked up first when the receiver is the
    /// namespace itself. Created lazily by MAKE_STATIC.
    pub static_ns: Option<NamespaceRef>,
}

impl NamespaceData {
    /// Create an empty namespace with the given name
    pub fn new(name: impl Into<String>) -> NamespaceRef {
        Rc::new(RefCell::new(NamespaceData {
            name: name.into(),
            table: HashMap::new(),
            static_ns: None,
        }))
    }
}

impl fmt::Debug for NamespaceData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.name)
    }
}

/// Role-based object: a non-empty ordered role list plus per-instance fields
pub struct ObjectData {
    /// Method resolution walks roles in order; the last role names the object.
    pub roles: Vec<NamespaceRef>,
    /// Per-instance field map
    pub fields: RefCell<HashMap<Symbol, Value>>,
}

impl fmt::Debug for ObjectData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.roles.last() {
            Some(role) => write!(f, "<object {}>", role.borrow().name),
            None => write!(f, "<Object>"),
        }
    }
}

/// Association table: parallel key/value vectors, keys compared by `same_obj`
#[derive(Debug, Clone, PartialEq)]
pub struct TableData {
    pub keys: Vec<Value>,
    pub values: Vec<Value>,
}

/// Precompiled, opaque pattern
#[derive(Debug)]
pub struct RegexValue {
    pub pattern: regex::Regex,
}

/// Host function callable from Tenorite code
///
/// Receives the VM and the full argument vector, receiver at index 0.
#[derive(Clone, Copy)]
pub struct Primitive {
    pub name: &'static str,
    pub func: PrimitiveFn,
}

pub type PrimitiveFn = fn(&mut Vm, &[Value]) -> Result<Value, RuntimeError>;

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<primitive {}>", self.name)
    }
}

/// Compiled function bound to its captured upvalues
pub struct Closure {
    pub code: Rc<CodeObject>,
    pub upvalues: Vec<Rc<UpvalueCell>>,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.code.name)
    }
}

/// A captured variable cell.
///
/// Open cells alias a live local slot of an enclosing activation; closed
/// cells own the value. A cell transitions open → closed exactly once,
/// after which writes to the original slot no longer reach it.
pub struct UpvalueCell {
    state: RefCell<UpvalueState>,
}

enum UpvalueState {
    Open {
        locals: Rc<RefCell<Vec<Value>>>,
        slot: u16,
    },
    Closed(Value),
}

impl UpvalueCell {
    /// Create an open cell aliasing `locals[slot]`
    pub fn open(locals: Rc<RefCell<Vec<Value>>>, slot: u16) -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::new(UpvalueState::Open { locals, slot }),
        })
    }

    /// Read through the cell
    pub fn get(&self) -> Value {
        match &*self.state.borrow() {
            UpvalueState::Open { locals, slot } => locals.borrow()[*slot as usize].clone(),
            UpvalueState::Closed(value) => value.clone(),
        }
    }

    /// Write through the cell
    pub fn set(&self, value: Value) {
        match &mut *self.state.borrow_mut() {
            UpvalueState::Open { locals, slot } => {
                locals.borrow_mut()[*slot as usize] = value;
            }
            UpvalueState::Closed(cell) => *cell = value,
        }
    }

    /// The aliased slot index while open, None once closed
    pub fn open_slot(&self) -> Option<u16> {
        match &*self.state.borrow() {
            UpvalueState::Open { slot, .. } => Some(*slot),
            UpvalueState::Closed(_) => None,
        }
    }

    /// Promote the cell to closed, taking ownership of the current value
    pub fn close(&self) {
        let value = self.get();
        *self.state.borrow_mut() = UpvalueState::Closed(value);
    }
}

impl fmt::Debug for UpvalueCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.state.borrow() {
            UpvalueState::Open { slot, .. } => write!(f, "<upvalue open:{}>", slot),
            UpvalueState::Closed(_) => write!(f, "<upvalue closed>"),
        }
    }
}

/// Runtime value type
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value; falsey
    None,
    /// Boolean truth
    True,
    /// Boolean falsehood; falsey
    False,
    /// 64-bit float
    Number(f64),
    /// Immutable UTF-8 string
    String(Rc<str>),
    /// Interned symbol
    Symbol(Symbol),
    /// Two-element association
    Pair(Rc<(Value, Value)>),
    /// Inclusive integer range; direction follows the sign of `to - from`
    Range { from: f64, to: f64 },
    /// Ordered sequence
    List(Rc<Vec<Value>>),
    /// Parallel-array association table
    Table(Rc<TableData>),
    /// Shared method table
    Namespace(NamespaceRef),
    /// User function with captured upvalues
    Closure(Rc<Closure>),
    /// Host function
    Primitive(Primitive),
    /// Role-based instance
    Object(Rc<ObjectData>),
    /// Opaque precompiled pattern
    Regex(Rc<RegexValue>),
    /// Compiled function prototype; appears only in constant pools
    Code(Rc<CodeObject>),
}

impl Value {
    /// Create a string value
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Rc::from(s.as_ref()))
    }

    /// Create a list value
    pub fn list(values: Vec<Value>) -> Self {
        Value::List(Rc::new(values))
    }

    /// Create a boolean value
    pub fn bool(b: bool) -> Self {
        if b {
            Value::True
        } else {
            Value::False
        }
    }

    /// Only `False` and `None` are falsey
    pub fn is_falsey(&self) -> bool {
        matches!(self, Value::False | Value::None)
    }

    /// Lists and tables participate in rank-lifted dispatch
    pub fn is_collection(&self) -> bool {
        matches!(self, Value::List(_) | Value::Table(_))
    }

    /// Element count for rank lifting; scalars count as 1
    pub fn size(&self) -> usize {
        match self {
            Value::List(items) => items.len(),
            Value::Table(table) => table.keys.len(),
            _ => 1,
        }
    }

    /// Element at `index` for rank lifting; scalars yield themselves
    pub fn get_at(&self, index: usize) -> Value {
        match self {
            Value::List(items) => items[index].clone(),
            Value::Table(table) => table.values[index].clone(),
            _ => self.clone(),
        }
    }

    /// Variant name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "None",
            Value::True | Value::False => "Bool",
            Value::Number(_) => "Number",
            Value::String(_) => "String",
            Value::Symbol(_) => "Symbol",
            Value::Pair(_) => "Pair",
            Value::Range { .. } => "Range",
            Value::List(_) => "List",
            Value::Table(_) => "Table",
            Value::Namespace(_) => "Namespace",
            Value::Closure(_) | Value::Primitive(_) => "Function",
            Value::Object(_) => "Object",
            Value::Regex(_) => "Regex",
            Value::Code(_) => "Code",
        }
    }

    /// Human-readable rendering used by the `string` primitive
    pub fn display_string(&self, symbols: &SymbolTable) -> String {
        match self {
            Value::None => "None".to_string(),
            Value::True => "True".to_string(),
            Value::False => "False".to_string(),
            Value::Number(n) => fmt_number(*n),
            Value::String(s) => s.to_string(),
            Value::Symbol(sym) => format!("'{}", symbols.resolve(*sym)),
            Value::Pair(pair) => format!(
                "{} => {}",
                pair.0.debug_string(symbols),
                pair.1.debug_string(symbols)
            ),
            Value::Range { from, to } => format!("{};{}", fmt_number(*from), fmt_number(*to)),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.debug_string(symbols)).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Table(table) => {
                let parts: Vec<String> = table
                    .keys
                    .iter()
                    .zip(table.values.iter())
                    .map(|(k, v)| {
                        format!("{}: {}", k.debug_string(symbols), v.debug_string(symbols))
                    })
                    .collect();
                format!("#[{}]", parts.join(", "))
            }
            Value::Namespace(ns) => format!("<{}>", ns.borrow().name),
            Value::Closure(_) | Value::Primitive(_) => "<Function>".to_string(),
            Value::Object(obj) => match obj.roles.last() {
                Some(role) => format!("<object {}>", role.borrow().name),
                None => "<Object>".to_string(),
            },
            Value::Regex(re) => format!("#'{}'", re.pattern.as_str()),
            Value::Code(code) => format!("<code {}>", code.name),
        }
    }

    /// Like [`Value::display_string`] but quotes strings
    pub fn debug_string(&self, symbols: &SymbolTable) -> String {
        match self {
            Value::String(s) => format!("{:?}", s.as_ref()),
            _ => self.display_string(symbols),
        }
    }
}

/// Identity-or-equality comparison used for table keys and `===`.
///
/// Lists never compare equal, even to themselves.
pub fn same_obj(a: &Value, b: &Value) -> bool {
    match a {
        Value::List(_) => false,
        _ => a == b,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::True, Value::True) => true,
            (Value::False, Value::False) => true,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Pair(a), Value::Pair(b)) => a.0 == b.0 && a.1 == b.1,
            (
                Value::Range { from: a, to: b },
                Value::Range { from: c, to: d },
            ) => a == c && b == d,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Table(a), Value::Table(b)) => Rc::ptr_eq(a, b),
            (Value::Namespace(a), Value::Namespace(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Primitive(a), Value::Primitive(b)) => {
                std::ptr::fn_addr_eq(a.func, b.func)
            }
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Regex(a), Value::Regex(b)) => a.pattern.as_str() == b.pattern.as_str(),
            (Value::Code(a), Value::Code(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Render a float the way Tenorite prints numbers: integral values
/// without a decimal point, everything else in shortest form.
pub fn fmt_number(n: f64) -> String {
    if n == 0.0 {
        // Avoid "-0"
        return "0".to_string();
    }
    n.to_string()
}

/// Errors raised during execution
///
/// Compile-time failures use [`crate::diagnostic::Diagnostic`] instead;
/// these unwind the running task, picking up a source line on the way out.
#[derive(Debug, Error, Clone)]
pub enum RuntimeError {
    /// A primitive argument failed its type predicate
    #[error("{0}")]
    TypeError(String),
    /// Selector not defined on the receiver
    #[error("Invalid method {selector} for {receiver}")]
    UnknownMethod { selector: String, receiver: String },
    /// Zipped arguments of a rank-lifted send have unequal sizes
    #[error("Differing sizes")]
    DifferingSizes,
    /// Module binding missing at runtime
    #[error("Undefined name {0}")]
    UndefinedName(String),
    /// Field read/write on a non-object receiver, or a missing field
    #[error("Invalid field `{0}´ access")]
    InvalidFieldAccess(String),
    /// MAKE_METHOD / MAKE_STATIC applied to a non-namespace
    #[error("{0} is not a namespace")]
    NotANamespace(String),
    /// Call target is neither a closure nor a primitive
    #[error("Not a callable")]
    NotCallable,
    /// `System assert:` received a falsey value
    #[error("Assertion failed")]
    AssertionFailed,
    /// `System panic:`
    #[error("Panic: {0}")]
    Panic(String),
    /// Corrupt opcode stream
    #[error("Invalid opcode {0}")]
    InvalidOpcode(u16),
    /// An error tagged with the source line it unwound from
    #[error("line {line}: {error}")]
    At {
        line: usize,
        error: Box<RuntimeError>,
    },
}

impl RuntimeError {
    /// Attach a source line unless one is already attached
    pub fn at(self, line: usize) -> Self {
        match self {
            RuntimeError::At { .. } => self,
            other => RuntimeError::At {
                line,
                error: Box::new(other),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_falseyness() {
        assert!(Value::False.is_falsey());
        assert!(Value::None.is_falsey());
        assert!(!Value::True.is_falsey());
        assert!(!Value::Number(0.0).is_falsey());
        assert!(!Value::string("").is_falsey());
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(fmt_number(3.0), "3");
        assert_eq!(fmt_number(0.5), "0.5");
        assert_eq!(fmt_number(-2.0), "-2");
        assert_eq!(fmt_number(-0.0), "0");
    }

    #[test]
    fn test_lists_are_never_same_obj() {
        let list = Value::list(vec![Value::Number(1.0)]);
        assert!(!same_obj(&list, &list.clone()));
        assert!(same_obj(&Value::Number(2.0), &Value::Number(2.0)));
        assert!(same_obj(&Value::string("a"), &Value::string("a")));
    }

    #[test]
    fn test_upvalue_cell_close_is_final() {
        let locals = Rc::new(RefCell::new(vec![Value::Number(1.0)]));
        let cell = UpvalueCell::open(locals.clone(), 0);
        assert_eq!(cell.get(), Value::Number(1.0));

        locals.borrow_mut()[0] = Value::Number(2.0);
        assert_eq!(cell.get(), Value::Number(2.0));

        cell.close();
        locals.borrow_mut()[0] = Value::Number(3.0);
        assert_eq!(cell.get(), Value::Number(2.0));
        assert_eq!(cell.open_slot(), None);

        cell.set(Value::Number(9.0));
        assert_eq!(cell.get(), Value::Number(9.0));
        assert_eq!(locals.borrow()[0], Value::Number(3.0));
    }

    #[test]
    fn test_collection_size_and_get_at() {
        let list = Value::list(vec![Value::Number(1.0), Value::Number(2.0)]);
        assert_eq!(list.size(), 2);
        assert_eq!(list.get_at(1), Value::Number(2.0));
        assert_eq!(Value::Number(7.0).size(), 1);
        assert_eq!(Value::Number(7.0).get_at(5), Value::Number(7.0));
    }
}
