//! Expression compilation
//!
//! Message sends compile the receiver, then each argument left to right,
//! then the selector symbol, then CALL (all ranks zero) or CALL_R with
//! one rank word per call-vector position.

use super::Compiler;
use crate::ast::Expr;
use crate::bytecode::Op;
use crate::diagnostic::Diagnostic;
use crate::value::{RegexValue, Value};
use std::rc::Rc;

impl Compiler<'_> {
    pub(crate) fn compile_expr(&mut self, expr: &Expr) -> Result<(), Diagnostic> {
        match expr {
            Expr::Call {
                recv,
                recv_rank,
                selector,
                args,
                line,
            } => {
                self.compile_expr(recv)?;
                let sym = self.intern(selector, *line)?;

                let mut ranks = Vec::with_capacity(args.len() + 1);
                ranks.push(*recv_rank);
                for arg in args {
                    self.compile_expr(&arg.value)?;
                    ranks.push(arg.rank);
                }

                self.write(&[Op::Sym as u16, sym.0]);
                self.write_call(args.len() as u16, &ranks);
                Ok(())
            }
            Expr::Binary {
                lhs,
                lhs_rank,
                op,
                rhs,
                rhs_rank,
                line,
            } => {
                self.compile_expr(lhs)?;
                self.compile_expr(rhs)?;
                let sym = self.intern(op, *line)?;
                self.write(&[Op::Sym as u16, sym.0]);
                self.write_call(1, &[*lhs_rank, *rhs_rank]);
                Ok(())
            }
            Expr::TypeTest { lhs, rhs, .. } => {
                self.compile_expr(lhs)?;
                self.compile_expr(rhs)?;
                self.write(&[Op::Type as u16]);
                Ok(())
            }
            Expr::Unary {
                recv,
                recv_rank,
                method,
                line,
            } => {
                self.compile_expr(recv)?;
                let sym = self.intern(method, *line)?;
                self.write(&[Op::Sym as u16, sym.0]);
                self.write_call(0, &[*recv_rank]);
                Ok(())
            }
            Expr::Index { recv, index, line } => {
                self.compile_expr(recv)?;
                self.compile_expr(index)?;
                let sym = self.intern("at_:", *line)?;
                self.write(&[Op::Sym as u16, sym.0, Op::Call as u16, 1]);
                Ok(())
            }
            Expr::Lambda { params, body, line } => {
                self.push_frame(None, params, format!("(lambda:{})", line));
                self.compile_stmt_list(body)?;
                for slot in self.captured_slots() {
                    self.write(&[Op::CloseUpvalue as u16, slot]);
                }
                self.write(&[Op::Return as u16, Op::End as u16]);
                let (code, upvalues) = self.pop_frame();
                let const_idx = self.push_const(Value::Code(Rc::new(code)), *line)?;
                self.write_closure(const_idx, &upvalues);
                Ok(())
            }
            Expr::List { items, .. } => {
                for item in items {
                    self.compile_expr(item)?;
                }
                self.write(&[Op::MakeList as u16, items.len() as u16]);
                Ok(())
            }
            Expr::Table { entries, .. } => {
                for (key, value) in entries {
                    self.compile_expr(key)?;
                    self.compile_expr(value)?;
                }
                self.write(&[Op::MakeTable as u16, entries.len() as u16]);
                Ok(())
            }
            Expr::SymbolLit { name, line } => {
                let sym = self.intern(name, *line)?;
                self.write(&[Op::Sym as u16, sym.0]);
                Ok(())
            }
            Expr::Name { name, line } => {
                if name == "__line__" {
                    let idx = self.push_const(Value::Number(f64::from(*line)), *line)?;
                    self.write(&[Op::Const as u16, idx]);
                    return Ok(());
                }
                self.resolve_name(name, *line)
            }
            Expr::Field { name, line } => {
                let sym = self.intern(name, *line)?;
                self.write(&[Op::LoadField as u16, sym.0]);
                Ok(())
            }
            Expr::Number { value, line } => {
                let idx = self.push_const(Value::Number(*value), *line)?;
                self.write(&[Op::Const as u16, idx]);
                Ok(())
            }
            Expr::Str { value, line } => {
                let idx = self.push_const(Value::string(value), *line)?;
                self.write(&[Op::Const as u16, idx]);
                Ok(())
            }
            Expr::Regex { pattern, line } => {
                let compiled = regex::Regex::new(pattern).map_err(|err| {
                    Diagnostic::error(format!("Invalid regex: {}", err), *line)
                        .with_lexeme(pattern.clone())
                })?;
                let idx = self.push_const(
                    Value::Regex(Rc::new(RegexValue { pattern: compiled })),
                    *line,
                )?;
                self.write(&[Op::Const as u16, idx]);
                Ok(())
            }
            Expr::Interp { parts, line } => self.compile_interp(parts, *line),
        }
    }

    /// Multi-part interpolations desugar to `"" join: [parts…]`
    fn compile_interp(&mut self, parts: &[Expr], line: u32) -> Result<(), Diagnostic> {
        match parts {
            [] => {
                let idx = self.push_const(Value::string(""), line)?;
                self.write(&[Op::Const as u16, idx]);
                Ok(())
            }
            [part] => self.compile_expr(part),
            _ => {
                let empty = self.push_const(Value::string(""), line)?;
                self.write(&[Op::Const as u16, empty]);
                for part in parts {
                    self.compile_expr(part)?;
                }
                self.write(&[Op::MakeList as u16, parts.len() as u16]);
                let join = self.intern("join:", line)?;
                self.write(&[Op::Sym as u16, join.0, Op::Call as u16, 1]);
                Ok(())
            }
        }
    }

    /// CALL when every rank is zero, CALL_R with rank words otherwise
    fn write_call(&mut self, nargs: u16, ranks: &[u16]) {
        if ranks.iter().all(|&rank| rank == 0) {
            self.write(&[Op::Call as u16, nargs]);
        } else {
            self.write(&[Op::CallR as u16, nargs]);
            self.write(ranks);
        }
    }
}
