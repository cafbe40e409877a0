//! Register-free stack virtual machine
//!
//! Executes code objects with an operand stack per task. Each closure
//! activation allocates its own locals and task; nested sends recurse
//! through the dispatcher and grow only the host call stack.

pub mod dispatch;
mod task;

pub use dispatch::Message;
pub use task::Task;

use crate::bytecode::{CodeObject, Op};
use crate::module::Module;
use crate::symbol::SymbolTable;
use crate::value::{Closure, NamespaceData, NamespaceRef, RuntimeError, TableData, Value};
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

/// Destination for PRINT and `System writeString:` output
pub type OutputWriter = Rc<RefCell<dyn Write>>;

/// Home namespaces for the built-in value variants
pub struct CoreNamespaces {
    pub object: NamespaceRef,
    pub bools: NamespaceRef,
    pub number: NamespaceRef,
    pub string: NamespaceRef,
    pub function: NamespaceRef,
    pub list: NamespaceRef,
    pub table: NamespaceRef,
    pub range: NamespaceRef,
    pub namespace: NamespaceRef,
    pub symbol: NamespaceRef,
    pub pair: NamespaceRef,
    pub regex: NamespaceRef,
    pub regex_results: NamespaceRef,
}

impl CoreNamespaces {
    fn new() -> Self {
        Self {
            object: NamespaceData::new("Object"),
            bools: NamespaceData::new("Bool"),
            number: NamespaceData::new("Number"),
            string: NamespaceData::new("String"),
            function: NamespaceData::new("Function"),
            list: NamespaceData::new("List"),
            table: NamespaceData::new("Table"),
            range: NamespaceData::new("Range"),
            namespace: NamespaceData::new("Namespace"),
            symbol: NamespaceData::new("Symbol"),
            pair: NamespaceData::new("Pair"),
            regex: NamespaceData::new("Regex"),
            regex_results: NamespaceData::new("RegexResults"),
        }
    }
}

/// Virtual machine state
///
/// Owns the symbol interner (so independent VMs can coexist), the active
/// top module, the home namespaces, and the output writer.
pub struct Vm {
    /// Process-independent symbol interner
    pub symbols: SymbolTable,
    /// The module LOAD_MODULE/STORE_MODULE address
    pub top_module: Module,
    /// Home namespaces for built-in variants
    pub core: CoreNamespaces,
    /// Output writer for PRINT (defaults to stdout)
    writer: OutputWriter,
}

impl Vm {
    /// Create a VM with an empty top module and empty home namespaces
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            top_module: Module::new(""),
            core: CoreNamespaces::new(),
            writer: Rc::new(RefCell::new(std::io::stdout())),
        }
    }

    /// Redirect PRINT and `System writeString:` output
    pub fn set_output_writer(&mut self, writer: OutputWriter) {
        self.writer = writer;
    }

    /// Write raw text to the output writer
    pub fn write_out(&mut self, text: &str) {
        let writer = self.writer.clone();
        let _ = writer.borrow_mut().write_all(text.as_bytes());
    }

    /// Send `selector` to `recv` with an ordinary (rank-free) message
    pub fn send(
        &mut self,
        recv: &Value,
        selector: &str,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        let sym = self
            .symbols
            .intern(selector)
            .map_err(|err| RuntimeError::TypeError(err.to_string()))?;
        let mut vector = Vec::with_capacity(args.len() + 1);
        vector.push(recv.clone());
        vector.extend_from_slice(args);
        let msg = Message::plain(sym, vector.len());
        dispatch::call(self, &msg, &vector)
    }

    /// Execute a closure against a call vector (receiver at index 0).
    ///
    /// Allocates `arity + local_size + 1` local slots, copies the call
    /// vector into the prefix, seeds the rest with None, and runs the
    /// fetch-decode loop until RETURN.
    pub fn run_closure(
        &mut self,
        closure: &Rc<Closure>,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let code = closure.code.clone();
        // Size for the declared frame even when the caller passed fewer
        // arguments; missing parameters read as None.
        let needed = code.frame_size().max(code.local_size as usize + args.len());
        let mut slots = vec![Value::None; needed];
        for (i, arg) in args.into_iter().enumerate() {
            slots[i] = arg;
        }
        let locals = Rc::new(RefCell::new(slots));

        let mut task = Task::new();
        task.push(locals.borrow()[0].clone());

        let mut ip = 0usize;
        loop {
            let Some(&word) = code.code.get(ip) else {
                return Err(RuntimeError::InvalidOpcode(0).at(code.line_for_ip(ip)));
            };
            let Some(op) = Op::from_word(word) else {
                return Err(RuntimeError::InvalidOpcode(word).at(code.line_for_ip(ip)));
            };

            match op {
                Op::Nop => ip += 1,
                Op::Const => {
                    let at = code.code[ip + 1] as usize;
                    task.push(code.consts[at].clone());
                    ip += 2;
                }
                Op::Sym => {
                    task.push(Value::Symbol(crate::symbol::Symbol(code.code[ip + 1])));
                    ip += 2;
                }
                Op::Closure => {
                    let at = code.code[ip + 1] as usize;
                    let Value::Code(proto) = &code.consts[at] else {
                        return Err(
                            RuntimeError::InvalidOpcode(word).at(code.line_for_ip(ip))
                        );
                    };
                    let proto = proto.clone();
                    ip += 2;
                    let mut upvalues = Vec::with_capacity(proto.upvalue_count as usize);
                    for _ in 0..proto.upvalue_count {
                        let is_local = code.code[ip];
                        let index = code.code[ip + 1];
                        ip += 2;
                        if is_local != 0 {
                            upvalues.push(task.capture_upvalue(&locals, index));
                        } else {
                            upvalues.push(closure.upvalues[index as usize].clone());
                        }
                    }
                    task.push(Value::Closure(Rc::new(Closure {
                        code: proto,
                        upvalues,
                    })));
                }
                Op::StoreModule => {
                    let sym = crate::symbol::Symbol(code.code[ip + 1]);
                    let value = task.peek().clone();
                    self.top_module.add(sym, value);
                    ip += 2;
                }
                Op::LoadModule => {
                    let sym = crate::symbol::Symbol(code.code[ip + 1]);
                    match self.top_module.get(sym) {
                        Some(value) => task.push(value.clone()),
                        None => {
                            return Err(RuntimeError::UndefinedName(
                                self.symbols.resolve(sym),
                            )
                            .at(code.line_for_ip(ip)));
                        }
                    }
                    ip += 2;
                }
                Op::StoreLocal => {
                    let at = code.code[ip + 1] as usize;
                    let value = task.pop();
                    locals.borrow_mut()[at] = value;
                    ip += 2;
                }
                Op::LoadLocal => {
                    let at = code.code[ip + 1] as usize;
                    let value = locals.borrow()[at].clone();
                    task.push(value);
                    ip += 2;
                }
                Op::StoreUpvalue => {
                    let at = code.code[ip + 1] as usize;
                    let value = task.pop();
                    closure.upvalues[at].set(value);
                    ip += 2;
                }
                Op::LoadUpvalue => {
                    let at = code.code[ip + 1] as usize;
                    task.push(closure.upvalues[at].get());
                    ip += 2;
                }
                Op::LoadField => {
                    let sym = crate::symbol::Symbol(code.code[ip + 1]);
                    let receiver = locals.borrow()[0].clone();
                    let Value::Object(obj) = receiver else {
                        return Err(RuntimeError::InvalidFieldAccess(
                            self.symbols.resolve(sym),
                        )
                        .at(code.line_for_ip(ip)));
                    };
                    let Some(value) = obj.fields.borrow().get(&sym).cloned() else {
                        return Err(RuntimeError::InvalidFieldAccess(
                            self.symbols.resolve(sym),
                        )
                        .at(code.line_for_ip(ip)));
                    };
                    task.push(value);
                    ip += 2;
                }
                Op::StoreField => {
                    let sym = crate::symbol::Symbol(code.code[ip + 1]);
                    let receiver = locals.borrow()[0].clone();
                    let Value::Object(obj) = receiver else {
                        return Err(RuntimeError::InvalidFieldAccess(
                            self.symbols.resolve(sym),
                        )
                        .at(code.line_for_ip(ip)));
                    };
                    obj.fields.borrow_mut().insert(sym, task.peek().clone());
                    ip += 2;
                }
                Op::JumpFalse => {
                    let offset = code.code[ip + 1] as usize;
                    if task.pop().is_falsey() {
                        ip += offset;
                    } else {
                        ip += 2;
                    }
                }
                Op::Loop => {
                    let offset = code.code[ip + 1] as usize;
                    if task.pop().is_falsey() {
                        ip += 2;
                    } else {
                        ip = ip
                            .checked_sub(offset + 2)
                            .ok_or(RuntimeError::InvalidOpcode(word))?;
                    }
                }
                Op::Call => {
                    let argc = code.code[ip + 1] as usize + 1;
                    ip += 2;
                    let msg = Message::plain(self.pop_selector(&mut task, &code, ip)?, argc);
                    self.run_call(&mut task, argc, &msg, &code, ip)?;
                }
                Op::CallR => {
                    let argc = code.code[ip + 1] as usize + 1;
                    ip += 2;
                    let selector = self.pop_selector(&mut task, &code, ip)?;
                    let mut ranks = Vec::with_capacity(argc);
                    for _ in 0..argc {
                        ranks.push(code.code[ip]);
                        ip += 1;
                    }
                    let msg = Message { selector, ranks };
                    self.run_call(&mut task, argc, &msg, &code, ip)?;
                }
                Op::Pop => {
                    task.pop();
                    ip += 1;
                }
                Op::Print => {
                    let value = task.pop();
                    if let Value::String(s) = value {
                        self.write_out(&format!("{}\n", s));
                    }
                    ip += 1;
                }
                Op::CloseUpvalue => {
                    let slot = code.code[ip + 1];
                    task.close_upvalues(slot);
                    ip += 2;
                }
                Op::Return => {
                    return Ok(task.pop());
                }
                Op::Type => {
                    let ns = task.pop();
                    let value = task.pop();
                    task.push(Value::bool(dispatch::type_is(self, &value, &ns)));
                    ip += 1;
                }
                Op::MakeList => {
                    let n = code.code[ip + 1] as usize;
                    let at = task.stack.len() - n;
                    let items = task.stack.split_off(at);
                    task.push(Value::list(items));
                    ip += 2;
                }
                Op::MakeTable => {
                    let n = code.code[ip + 1] as usize;
                    let at = task.stack.len() - 2 * n;
                    let flat = task.stack.split_off(at);
                    let mut keys = Vec::with_capacity(n);
                    let mut values = Vec::with_capacity(n);
                    for pair in flat.chunks_exact(2) {
                        keys.push(pair[0].clone());
                        values.push(pair[1].clone());
                    }
                    task.push(Value::Table(Rc::new(TableData { keys, values })));
                    ip += 2;
                }
                Op::MakeNs => {
                    let name = task.pop();
                    let Value::String(name) = name else {
                        return Err(RuntimeError::TypeError(
                            "Namespace name must be string.".to_string(),
                        )
                        .at(code.line_for_ip(ip)));
                    };
                    task.push(Value::Namespace(NamespaceData::new(name.as_ref())));
                    ip += 1;
                }
                Op::MakeMethod => {
                    let sym = crate::symbol::Symbol(code.code[ip + 1]);
                    let method = task.pop();
                    let target = task.pop();
                    let Value::Namespace(ns) = &target else {
                        return Err(RuntimeError::NotANamespace(
                            target.display_string(&self.symbols),
                        )
                        .at(code.line_for_ip(ip)));
                    };
                    ns.borrow_mut().table.insert(sym, method);
                    task.push(target);
                    ip += 2;
                }
                Op::MakeStatic => {
                    let sym = crate::symbol::Symbol(code.code[ip + 1]);
                    let method = task.pop();
                    let target = task.pop();
                    let Value::Namespace(ns) = &target else {
                        return Err(RuntimeError::NotANamespace(
                            target.display_string(&self.symbols),
                        )
                        .at(code.line_for_ip(ip)));
                    };
                    {
                        let mut ns = ns.borrow_mut();
                        if ns.static_ns.is_none() {
                            ns.static_ns = Some(NamespaceData::new(""));
                        }
                        if let Some(static_ns) = &ns.static_ns {
                            static_ns.borrow_mut().table.insert(sym, method);
                        }
                    }
                    task.push(target);
                    ip += 2;
                }
                Op::Recursive => {
                    task.stack.truncate(1);
                    ip = 0;
                }
                Op::End => {
                    return Err(RuntimeError::InvalidOpcode(word).at(code.line_for_ip(ip)));
                }
            }
        }
    }

    fn pop_selector(
        &mut self,
        task: &mut Task,
        code: &CodeObject,
        ip: usize,
    ) -> Result<crate::symbol::Symbol, RuntimeError> {
        match task.pop() {
            Value::Symbol(sym) => Ok(sym),
            other => Err(RuntimeError::TypeError(format!(
                "Selector must be a symbol, got {}",
                other.type_name()
            ))
            .at(code.line_for_ip(ip))),
        }
    }

    /// Slice the call window off the stack, dispatch, and push the result
    fn run_call(
        &mut self,
        task: &mut Task,
        argc: usize,
        msg: &Message,
        code: &CodeObject,
        ip: usize,
    ) -> Result<(), RuntimeError> {
        let fp = task.stack.len() - argc;
        let args: Vec<Value> = task.stack[fp..].to_vec();
        let result = dispatch::call(self, msg, &args)
            .map_err(|err| err.at(code.line_for_ip(ip)))?;
        task.stack.truncate(fp);
        task.push(result);
        Ok(())
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}
