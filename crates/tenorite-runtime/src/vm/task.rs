//! Task state for one executing closure
//!
//! A task owns the operand stack and the list of open upvalues for its
//! activation. Nested sends run in their own tasks; only the host call
//! stack links them.

use crate::value::{UpvalueCell, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// Execution state of one closure activation
pub struct Task {
    /// Operand stack
    pub stack: Vec<Value>,
    /// Open upvalue cells, ordered by descending slot index
    open_upvalues: Vec<Rc<UpvalueCell>>,
}

impl Task {
    pub fn new() -> Self {
        Self {
            stack: Vec::with_capacity(16),
            open_upvalues: Vec::new(),
        }
    }

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Value {
        self.stack.pop().expect("operand stack underflow")
    }

    pub fn peek(&self) -> &Value {
        self.stack.last().expect("operand stack underflow")
    }

    /// Find or create the open upvalue cell for `locals[slot]`.
    ///
    /// Closures capturing the same slot share one cell, so writes through
    /// either alias stay visible to both until the cell closes.
    pub fn capture_upvalue(
        &mut self,
        locals: &Rc<RefCell<Vec<Value>>>,
        slot: u16,
    ) -> Rc<UpvalueCell> {
        let mut insert_at = self.open_upvalues.len();
        for (i, cell) in self.open_upvalues.iter().enumerate() {
            match cell.open_slot() {
                Some(existing) if existing == slot => return cell.clone(),
                Some(existing) if existing < slot => {
                    insert_at = i;
                    break;
                }
                _ => {}
            }
        }
        let cell = UpvalueCell::open(locals.clone(), slot);
        self.open_upvalues.insert(insert_at, cell.clone());
        cell
    }

    /// Close every open upvalue at or above `slot`, walking from the head
    /// of the descending-ordered list
    pub fn close_upvalues(&mut self, slot: u16) {
        while let Some(first) = self.open_upvalues.first() {
            match first.open_slot() {
                Some(existing) if existing >= slot => {
                    first.close();
                    self.open_upvalues.remove(0);
                }
                _ => break,
            }
        }
    }
}

impl Default for Task {
    fn default() -> Self {
        Self::new()
    }
}
