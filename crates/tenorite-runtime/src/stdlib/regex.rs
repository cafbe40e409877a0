//! Regex construction
//!
//! Matching lives on String (`findRegex:`); this module only provides
//! the class-level constructor.

use super::{static_method, string_arg};
use crate::value::{RegexValue, RuntimeError, Value};
use crate::vm::Vm;
use std::rc::Rc;

pub(super) fn install(vm: &mut Vm) {
    let ns = vm.core.regex.clone();
    static_method(vm, &ns, "new:", regex_new);
}

/// `Regex new: pattern` — compile a pattern at runtime
fn regex_new(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let pattern = string_arg(args, 1, "Regex")?;
    let compiled = regex::Regex::new(&pattern)
        .map_err(|err| RuntimeError::TypeError(err.to_string()))?;
    Ok(Value::Regex(Rc::new(RegexValue { pattern: compiled })))
}
