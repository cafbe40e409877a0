//! Statement compilation
//!
//! Top-level statements may define module bindings, namespaces, and
//! methods; statements inside function bodies work with locals and
//! upvalues instead. The last statement of a block leaves its value on
//! the stack as the block's value.

use super::Compiler;
use crate::ast::{Expr, MethodDef, Stmt};
use crate::bytecode::Op;
use crate::diagnostic::Diagnostic;
use crate::value::Value;
use std::rc::Rc;

impl Compiler<'_> {
    pub(crate) fn compile_top_level_stmt(
        &mut self,
        stmt: &Stmt,
        is_last: bool,
    ) -> Result<(), Diagnostic> {
        match stmt {
            Stmt::Assign {
                nonlocal,
                name,
                value,
                line,
            } => {
                if *nonlocal {
                    return Err(Diagnostic::error(
                        "Invalid nonlocal assignment in top level of module",
                        *line,
                    )
                    .with_lexeme(name.clone()));
                }
                self.compile_expr(value)?;
                let sym = self.intern(name, *line)?;
                self.vm.top_module.reserve(sym);
                self.write(&[Op::StoreModule as u16, sym.0]);
                if !is_last {
                    self.write(&[Op::Pop as u16]);
                }
                self.add_line(*line);
                Ok(())
            }
            Stmt::Method(def) => self.compile_method_def(def),
            Stmt::Type { name, line } => {
                let name_idx = self.push_const(Value::string(name), *line)?;
                self.write(&[Op::Const as u16, name_idx, Op::MakeNs as u16]);
                let sym = self.intern(name, *line)?;
                self.vm.top_module.reserve(sym);
                self.write(&[Op::StoreModule as u16, sym.0, Op::Pop as u16]);
                self.add_line(*line);
                Ok(())
            }
            Stmt::Loop { line } | Stmt::ReturnIf { line, .. } => Err(Diagnostic::error(
                "Invalid statement in top level of module",
                *line,
            )),
            Stmt::FieldAssign { name, line, .. } => Err(Diagnostic::error(
                "Invalid field assignment in top level of module",
                *line,
            )
            .with_lexeme(format!("&{}", name))),
            Stmt::Expr(expr) => {
                self.compile_expr(expr)?;
                if !is_last {
                    // A bare interpolated string at top level prints.
                    if matches!(expr, Expr::Interp { .. }) {
                        self.write(&[Op::Print as u16]);
                    } else {
                        self.write(&[Op::Pop as u16]);
                    }
                }
                self.add_line(expr.line());
                Ok(())
            }
        }
    }

    pub(crate) fn compile_stmt_list(&mut self, stmts: &[Stmt]) -> Result<(), Diagnostic> {
        let last = stmts.len().saturating_sub(1);
        for (i, stmt) in stmts.iter().enumerate() {
            self.compile_stmt(stmt, i == last)?;
        }
        Ok(())
    }

    fn compile_stmt(&mut self, stmt: &Stmt, is_last: bool) -> Result<(), Diagnostic> {
        match stmt {
            Stmt::Assign {
                nonlocal,
                name,
                value,
                line,
            } => self.compile_assign(*nonlocal, name, value, *line, is_last),
            Stmt::FieldAssign { name, value, line } => {
                self.compile_expr(value)?;
                let sym = self.intern(name, *line)?;
                self.write(&[Op::StoreField as u16, sym.0]);
                if !is_last {
                    self.write(&[Op::Pop as u16]);
                }
                Ok(())
            }
            Stmt::Method(def) => Err(Diagnostic::error(
                "Invalid statement outside top level of module",
                def.line,
            )
            .with_lexeme(def.namespace.clone())),
            Stmt::Type { name, line } => Err(Diagnostic::error(
                "Invalid statement outside top level of module",
                *line,
            )
            .with_lexeme(name.clone())),
            Stmt::Loop { .. } => {
                self.write(&[Op::Recursive as u16]);
                Ok(())
            }
            Stmt::ReturnIf { cond, value, .. } => {
                self.compile_expr(cond)?;
                let label = self.write(&[Op::JumpFalse as u16, 0]);
                self.compile_expr(value)?;
                let end = self.write(&[Op::Return as u16]);
                self.patch_jump(label, end);
                Ok(())
            }
            Stmt::Expr(expr) => {
                self.compile_expr(expr)?;
                if !is_last {
                    if matches!(expr, Expr::Interp { .. }) {
                        self.write(&[Op::Print as u16]);
                    } else {
                        self.write(&[Op::Pop as u16]);
                    }
                }
                self.add_line(expr.line());
                Ok(())
            }
        }
    }

    /// Assignments create a local on first mention. Nonlocal assignments
    /// never create locals: they write through an upvalue, falling back
    /// to an existing module binding.
    fn compile_assign(
        &mut self,
        nonlocal: bool,
        name: &str,
        value: &Expr,
        line: u32,
        is_last: bool,
    ) -> Result<(), Diagnostic> {
        self.add_line(line);

        if !nonlocal {
            let slot = match self.local_slot(name) {
                Some(slot) => slot,
                None => self.define_local(name),
            };
            self.compile_expr(value)?;
            self.write(&[Op::StoreLocal as u16, slot]);
            if is_last {
                self.write(&[Op::LoadLocal as u16, slot]);
            }
            return Ok(());
        }

        self.compile_expr(value)?;
        if let Some(idx) = self.find_upvalue(name) {
            self.write(&[Op::StoreUpvalue as u16, idx]);
            return Ok(());
        }

        let sym = self.intern(name, line)?;
        if !self.vm.top_module.contains(sym) {
            return Err(
                Diagnostic::error(format!("No such name {} in nonlocal", name), line)
                    .with_lexeme(name),
            );
        }
        self.write(&[Op::StoreModule as u16, sym.0]);
        if !is_last {
            self.write(&[Op::Pop as u16]);
        }
        Ok(())
    }

    /// `Ns fn recv selector { body }` — compile the body as a fresh
    /// closure and install it on the namespace. When the receiver name
    /// is the namespace name the method is class-level and installs into
    /// the static twin.
    fn compile_method_def(&mut self, def: &MethodDef) -> Result<(), Diagnostic> {
        let selector = self.intern(&def.selector, def.line)?;

        self.push_frame(
            Some(&def.receiver),
            &def.params,
            format!("{}#{}", def.namespace, def.selector),
        );
        self.compile_stmt_list(&def.body)?;
        self.write(&[Op::Return as u16, Op::End as u16]);
        let (code, upvalues) = self.pop_frame();

        let ns_sym = self.intern(&def.namespace, def.line)?;
        if !self.vm.top_module.contains(ns_sym) {
            return Err(Diagnostic::error(
                format!("No such name {} in method", def.namespace),
                def.line,
            )
            .with_lexeme(def.namespace.clone()));
        }
        self.write(&[Op::LoadModule as u16, ns_sym.0]);

        let const_idx = self.push_const(Value::Code(Rc::new(code)), def.line)?;
        self.write_closure(const_idx, &upvalues);

        let install = if def.receiver == def.namespace {
            Op::MakeStatic
        } else {
            Op::MakeMethod
        };
        self.write(&[install as u16, selector.0, Op::Pop as u16]);
        self.add_line(def.line);
        Ok(())
    }
}
