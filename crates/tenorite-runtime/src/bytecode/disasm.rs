//! Bytecode disassembler
//!
//! Renders one code object per call; closure prototypes in the constant
//! pool are listed by name, not expanded.

use super::{CodeObject, Op};
use crate::symbol::{Symbol, SymbolTable};

/// Render a code object as one instruction per line
pub fn disassemble(code: &CodeObject, symbols: &SymbolTable) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "<code {}> (1+{}+{})\n",
        code.name, code.arity, code.local_size
    ));

    let mut ip = 0;
    while ip < code.code.len() {
        let word = code.code[ip];
        let op = match Op::from_word(word) {
            Some(op) => op,
            None => {
                out.push_str(&format!("{:6}  ???({})\n", ip, word));
                ip += 1;
                continue;
            }
        };

        match op {
            Op::Nop | Op::Pop | Op::Print | Op::Return | Op::Type | Op::MakeNs
            | Op::Recursive | Op::End => {
                out.push_str(&format!("{:6}  {:?}\n", ip, op));
                ip += 1;
            }
            Op::Const => {
                let at = code.code[ip + 1] as usize;
                let rendered = code
                    .consts
                    .get(at)
                    .map(|v| v.debug_string(symbols))
                    .unwrap_or_else(|| "<bad const>".to_string());
                out.push_str(&format!("{:6}  Const {} ({})\n", ip, at, rendered));
                ip += 2;
            }
            Op::Sym | Op::StoreModule | Op::LoadModule | Op::LoadField | Op::StoreField
            | Op::MakeMethod | Op::MakeStatic => {
                let sym = Symbol(code.code[ip + 1]);
                out.push_str(&format!(
                    "{:6}  {:?} ({})\n",
                    ip,
                    op,
                    symbols.resolve(sym)
                ));
                ip += 2;
            }
            Op::StoreLocal | Op::LoadLocal | Op::CloseUpvalue => {
                let at = code.code[ip + 1] as usize;
                let name = code.varnames.get(at).map(String::as_str).unwrap_or("");
                out.push_str(&format!("{:6}  {:?} {} ({})\n", ip, op, at, name));
                ip += 2;
            }
            Op::StoreUpvalue | Op::LoadUpvalue | Op::MakeList | Op::MakeTable | Op::Call => {
                out.push_str(&format!("{:6}  {:?} {}\n", ip, op, code.code[ip + 1]));
                ip += 2;
            }
            Op::JumpFalse => {
                let offset = code.code[ip + 1] as usize;
                out.push_str(&format!(
                    "{:6}  JumpFalse {} (to {})\n",
                    ip,
                    offset,
                    ip + offset
                ));
                ip += 2;
            }
            Op::Loop => {
                let offset = code.code[ip + 1] as usize;
                out.push_str(&format!(
                    "{:6}  Loop {} (to {})\n",
                    ip,
                    offset,
                    ip.saturating_sub(offset + 2)
                ));
                ip += 2;
            }
            Op::CallR => {
                let nargs = code.code[ip + 1] as usize;
                let ranks = &code.code[ip + 2..ip + 2 + nargs + 1];
                out.push_str(&format!("{:6}  CallR {} ranks {:?}\n", ip, nargs, ranks));
                ip += 2 + nargs + 1;
            }
            Op::Closure => {
                let at = code.code[ip + 1] as usize;
                let (name, count) = match code.consts.get(at) {
                    Some(crate::value::Value::Code(proto)) => {
                        (proto.name.clone(), proto.upvalue_count as usize)
                    }
                    _ => ("<bad const>".to_string(), 0),
                };
                out.push_str(&format!("{:6}  Closure {} ({})\n", ip, at, name));
                ip += 2;
                for _ in 0..count {
                    let is_local = code.code[ip];
                    let index = code.code[ip + 1];
                    out.push_str(&format!(
                        "{:6}    capture {} {}\n",
                        ip,
                        if is_local != 0 { "local" } else { "upvalue" },
                        index
                    ));
                    ip += 2;
                }
            }
        }
    }

    out
}
