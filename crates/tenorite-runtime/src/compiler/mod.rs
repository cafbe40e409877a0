//! Single-pass AST to bytecode compiler
//!
//! Walks the AST once, emitting 16-bit words into one code object per
//! function. A stack of frames tracks the environment of each function
//! being compiled; enclosing frames are addressed by index so that frame
//! pushes never invalidate references.
//!
//! - Expressions leave exactly one value on the operand stack
//! - Locals are addressed by slot: receiver at 0, parameters at 1..,
//!   user locals after that
//! - Captured variables become upvalue descriptor chains that always
//!   terminate at a local of some enclosing frame

mod expr;
mod stmt;

use crate::ast::Unit;
use crate::bytecode::{CodeObject, Op};
use crate::diagnostic::Diagnostic;
use crate::value::Value;
use crate::vm::Vm;
use std::collections::HashMap;
use std::rc::Rc;

/// A resolved local variable
#[derive(Debug, Clone)]
pub(crate) struct Local {
    /// Frame-relative slot index
    pub(crate) slot: u16,
    /// Set when an inner function captures this local; the owning frame
    /// emits CloseUpvalue for it before returning
    pub(crate) is_captured: bool,
}

/// One `(is_local, index)` capture descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UpvalueDesc {
    pub(crate) index: u16,
    pub(crate) is_local: bool,
}

/// Per-function compilation state
pub(crate) struct Frame {
    /// name → local binding for this function
    env: HashMap<String, Local>,
    /// Capture descriptors accumulated for this function
    upvalues: Vec<UpvalueDesc>,
    /// The code object being emitted
    code: CodeObject,
    /// Index of the lexically enclosing frame, if any
    parent: Option<usize>,
}

/// Compiler state
pub struct Compiler<'vm> {
    pub(crate) vm: &'vm mut Vm,
    frames: Vec<Frame>,
}

impl<'vm> Compiler<'vm> {
    /// Create a compiler that interns symbols and reserves module slots
    /// on the given VM
    pub fn new(vm: &'vm mut Vm) -> Self {
        Self {
            vm,
            frames: Vec::new(),
        }
    }

    /// Compile a unit into a top-level code object named `unit_name`
    pub fn compile_unit(
        &mut self,
        unit: &Unit,
        unit_name: &str,
    ) -> Result<Rc<CodeObject>, Diagnostic> {
        self.push_frame(None, &[], unit_name.to_string());
        let last = unit.stmts.len().saturating_sub(1);
        for (i, stmt) in unit.stmts.iter().enumerate() {
            self.compile_top_level_stmt(stmt, i == last)?;
        }
        self.write(&[Op::Return as u16, Op::End as u16]);
        let (code, _) = self.pop_frame();
        Ok(Rc::new(code))
    }

    // ===== Frame management =====

    /// Open a frame for a function with the given receiver name and
    /// parameter names. Slot 0 belongs to the receiver even when unnamed.
    pub(crate) fn push_frame(&mut self, recv: Option<&str>, params: &[String], name: String) {
        let parent = self.frames.len().checked_sub(1);
        let mut env = HashMap::new();
        if let Some(recv) = recv {
            env.insert(
                recv.to_string(),
                Local {
                    slot: 0,
                    is_captured: false,
                },
            );
        }
        for (i, param) in params.iter().enumerate() {
            env.insert(
                param.clone(),
                Local {
                    slot: i as u16 + 1,
                    is_captured: false,
                },
            );
        }
        self.frames.push(Frame {
            env,
            upvalues: Vec::new(),
            code: CodeObject {
                arity: params.len() as u16,
                name,
                ..CodeObject::default()
            },
            parent,
        });
    }

    /// Close the current frame, yielding its finished code object and
    /// the capture descriptors the enclosing frame must emit
    pub(crate) fn pop_frame(&mut self) -> (CodeObject, Vec<UpvalueDesc>) {
        let frame = self.frames.pop().expect("unbalanced frame stack");
        let mut code = frame.code;
        let mut varnames = vec![String::new(); code.frame_size()];
        for (name, local) in &frame.env {
            varnames[local.slot as usize] = name.clone();
        }
        code.varnames = varnames;
        (code, frame.upvalues)
    }

    pub(crate) fn frame(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("no active frame")
    }

    // ===== Emission =====

    /// Append instruction words, returning the index of the last word
    pub(crate) fn write(&mut self, words: &[u16]) -> usize {
        let code = &mut self.frame().code.code;
        code.extend_from_slice(words);
        code.len() - 1
    }

    /// Emit a CLOSURE instruction and its capture descriptors
    pub(crate) fn write_closure(&mut self, const_idx: u16, upvalues: &[UpvalueDesc]) {
        self.write(&[Op::Closure as u16, const_idx]);
        for upvalue in upvalues {
            self.write(&[u16::from(upvalue.is_local), upvalue.index]);
        }
    }

    /// Patch a forward jump: `label` is the operand index, `end` the
    /// index of the instruction the false branch lands after
    pub(crate) fn patch_jump(&mut self, label: usize, end: usize) {
        self.frame().code.code[label] = (end - label + 2) as u16;
    }

    /// Record that the code for `line` ends at the current offset
    pub(crate) fn add_line(&mut self, line: u32) {
        let line = line as usize;
        let offset = self.frame().code.code.len();
        let lines = &mut self.frame().code.lines;
        if line >= lines.len() {
            lines.resize(line + 1, 0);
        }
        lines[line] = offset;
    }

    /// Intern a constant, deduplicated by value equality
    pub(crate) fn push_const(&mut self, value: Value, line: u32) -> Result<u16, Diagnostic> {
        let consts = &mut self.frame().code.consts;
        for (at, existing) in consts.iter().enumerate() {
            if *existing == value {
                return Ok(at as u16);
            }
        }
        if consts.len() > usize::from(u16::MAX) {
            return Err(Diagnostic::error("Too many constants in one function", line));
        }
        let at = consts.len() as u16;
        consts.push(value);
        Ok(at)
    }

    /// Intern a symbol, mapping interner exhaustion to a diagnostic
    pub(crate) fn intern(
        &mut self,
        name: &str,
        line: u32,
    ) -> Result<crate::symbol::Symbol, Diagnostic> {
        self.vm
            .symbols
            .intern(name)
            .map_err(|err| Diagnostic::error(err.to_string(), line).with_lexeme(name))
    }

    // ===== Name resolution =====

    /// Look up `name` in the current frame's environment
    pub(crate) fn local_slot(&mut self, name: &str) -> Option<u16> {
        self.frame().env.get(name).map(|local| local.slot)
    }

    /// Define a fresh local in the current frame at the next slot
    pub(crate) fn define_local(&mut self, name: &str) -> u16 {
        let frame = self.frame();
        let slot = frame.code.local_size + frame.code.arity + 1;
        frame.env.insert(
            name.to_string(),
            Local {
                slot,
                is_captured: false,
            },
        );
        frame.code.local_size += 1;
        slot
    }

    /// Slots of captured locals in the current frame, ascending
    pub(crate) fn captured_slots(&mut self) -> Vec<u16> {
        let mut slots: Vec<u16> = self
            .frame()
            .env
            .values()
            .filter(|local| local.is_captured)
            .map(|local| local.slot)
            .collect();
        slots.sort_unstable();
        slots
    }

    /// Resolve `name` as an upvalue of the current frame.
    ///
    /// Walks enclosing frames; the first frame owning the name has its
    /// local marked captured, and a descriptor is registered at every
    /// frame in between so the chain terminates at that local.
    pub(crate) fn find_upvalue(&mut self, name: &str) -> Option<u16> {
        let current = self.frames.len().checked_sub(1)?;
        self.find_upvalue_in(current, name)
    }

    fn find_upvalue_in(&mut self, frame_idx: usize, name: &str) -> Option<u16> {
        let parent = self.frames[frame_idx].parent?;
        if let Some(local) = self.frames[parent].env.get_mut(name) {
            local.is_captured = true;
            let slot = local.slot;
            return Some(self.add_upvalue(frame_idx, slot, true));
        }
        let parent_idx = self.find_upvalue_in(parent, name)?;
        Some(self.add_upvalue(frame_idx, parent_idx, false))
    }

    /// Register a capture descriptor, cached by `(index, is_local)`
    fn add_upvalue(&mut self, frame_idx: usize, index: u16, is_local: bool) -> u16 {
        let frame = &mut self.frames[frame_idx];
        let desc = UpvalueDesc { index, is_local };
        if let Some(pos) = frame.upvalues.iter().position(|u| *u == desc) {
            return pos as u16;
        }
        frame.upvalues.push(desc);
        frame.code.upvalue_count = frame.upvalues.len() as u16;
        frame.upvalues.len() as u16 - 1
    }

    /// Emit a load for a bare identifier: local, upvalue, or module
    pub(crate) fn resolve_name(&mut self, name: &str, line: u32) -> Result<(), Diagnostic> {
        if let Some(slot) = self.local_slot(name) {
            self.write(&[Op::LoadLocal as u16, slot]);
            return Ok(());
        }
        if let Some(idx) = self.find_upvalue(name) {
            self.write(&[Op::LoadUpvalue as u16, idx]);
            return Ok(());
        }
        let sym = self.intern(name, line)?;
        if self.vm.top_module.contains(sym) {
            self.write(&[Op::LoadModule as u16, sym.0]);
            return Ok(());
        }
        Err(Diagnostic::error(format!("No such name {}", name), line).with_lexeme(name))
    }
}
