//! Embedding façade
//!
//! Wires the pipeline together: lex → parse → compile → run, with the
//! prelude evaluated once at construction and its bindings copied into
//! a fresh `__main__` module for every evaluation.

use crate::compiler::Compiler;
use crate::diagnostic::Diagnostic;
use crate::lexer::Lexer;
use crate::module::Module;
use crate::parser::Parser;
use crate::value::{Closure, RuntimeError, Value};
use crate::vm::{OutputWriter, Vm};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// The prelude source bundled into the binary
pub const CORE_SOURCE: &str = include_str!("core.tenor");

/// Why an evaluation failed
#[derive(Debug, Error)]
pub enum EvalError {
    /// Scan, parse, or compile failure
    #[error("{}", format_diagnostics(.0))]
    Compile(Vec<Diagnostic>),
    /// The program unwound at runtime
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    let rendered: Vec<String> = diagnostics
        .iter()
        .map(Diagnostic::to_human_string)
        .collect();
    rendered.join("\n")
}

impl EvalError {
    /// The diagnostics of a compile failure, if that is what this is
    pub fn diagnostics(&self) -> Option<&[Diagnostic]> {
        match self {
            EvalError::Compile(diagnostics) => Some(diagnostics),
            EvalError::Runtime(_) => None,
        }
    }
}

/// A ready-to-run Tenorite runtime with the prelude loaded
pub struct Tenorite {
    vm: Vm,
    /// Snapshot of the module state after the prelude ran; every eval
    /// starts from a copy so symbol identity and slot indices carry over
    core_module: Module,
}

impl fmt::Debug for Tenorite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tenorite {{ core: {} bindings }}", self.vm.symbols.len())
    }
}

impl Tenorite {
    /// Construct a runtime: install primitives, then compile and run the
    /// embedded prelude against the core module
    pub fn new() -> Result<Self, EvalError> {
        let mut vm = Vm::new();
        crate::stdlib::install(&mut vm);

        let unit = parse_source(CORE_SOURCE)?;
        let code = Compiler::new(&mut vm)
            .compile_unit(&unit, "__core__")
            .map_err(|diagnostic| EvalError::Compile(vec![diagnostic]))?;
        let closure = Rc::new(Closure {
            code,
            upvalues: Vec::new(),
        });
        vm.run_closure(&closure, vec![Value::None])?;

        let core_module = vm.top_module.clone();
        Ok(Self { vm, core_module })
    }

    /// Compile and run a program, returning the final expression's value
    pub fn eval(&mut self, source: &str, unit_name: &str) -> Result<Value, EvalError> {
        let unit = parse_source(source)?;

        let mut main = self.core_module.clone();
        main.name = "__main__".to_string();
        self.vm.top_module = main;

        let code = Compiler::new(&mut self.vm)
            .compile_unit(&unit, unit_name)
            .map_err(|diagnostic| EvalError::Compile(vec![diagnostic]))?;
        let closure = Rc::new(Closure {
            code,
            upvalues: Vec::new(),
        });
        Ok(self.vm.run_closure(&closure, vec![Value::None])?)
    }

    /// The `string` of a value, as the language itself would render it
    pub fn display(&mut self, value: &Value) -> Result<String, RuntimeError> {
        let result = self.vm.send(value, "string", &[])?;
        Ok(match result {
            Value::String(s) => s.to_string(),
            other => other.display_string(&self.vm.symbols),
        })
    }

    /// Redirect PRINT and `System writeString:` output
    pub fn set_output_writer(&mut self, writer: OutputWriter) {
        self.vm.set_output_writer(writer);
    }

    /// Access the underlying VM (tests, tooling)
    pub fn vm_mut(&mut self) -> &mut Vm {
        &mut self.vm
    }
}

fn parse_source(source: &str) -> Result<crate::ast::Unit, EvalError> {
    let (tokens, diagnostics) = Lexer::new(source).tokenize();
    if !diagnostics.is_empty() {
        return Err(EvalError::Compile(diagnostics));
    }
    Parser::new(tokens)
        .parse_unit()
        .map_err(|diagnostic| EvalError::Compile(vec![diagnostic]))
}
