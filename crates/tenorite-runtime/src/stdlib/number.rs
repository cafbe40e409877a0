//! Number primitives

use super::{method, number_arg};
use crate::value::{fmt_number, RuntimeError, Value};
use crate::vm::Vm;

pub(super) fn install(vm: &mut Vm) {
    let number = vm.core.number.clone();
    method(vm, &number, "+", number_add);
    method(vm, &number, "-", number_sub);
    method(vm, &number, "*", number_mul);
    method(vm, &number, "/", number_div);
    method(vm, &number, "%", number_mod);
    method(vm, &number, "**", number_pow);
    method(vm, &number, ">", number_gt);
    method(vm, &number, "<", number_lt);
    method(vm, &number, ">=", number_ge);
    method(vm, &number, "<=", number_le);
    method(vm, &number, "==", number_eq);
    method(vm, &number, "!=", number_ne);
    method(vm, &number, ";", number_range);
    method(vm, &number, ">>", number_shr);
    method(vm, &number, "<<", number_shl);
    method(vm, &number, "string", number_string);
}

fn operands(args: &[Value]) -> Result<(f64, f64), RuntimeError> {
    let lhs = number_arg(args, 0, "Left side")?;
    let rhs = number_arg(args, 1, "Right side")?;
    Ok((lhs, rhs))
}

fn number_add(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (a, b) = operands(args)?;
    Ok(Value::Number(a + b))
}

fn number_sub(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (a, b) = operands(args)?;
    Ok(Value::Number(a - b))
}

fn number_mul(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (a, b) = operands(args)?;
    Ok(Value::Number(a * b))
}

fn number_div(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (a, b) = operands(args)?;
    Ok(Value::Number(a / b))
}

fn number_mod(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (a, b) = operands(args)?;
    Ok(Value::Number(a % b))
}

fn number_pow(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (a, b) = operands(args)?;
    Ok(Value::Number(a.powf(b)))
}

fn number_gt(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (a, b) = operands(args)?;
    Ok(Value::bool(a > b))
}

fn number_lt(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (a, b) = operands(args)?;
    Ok(Value::bool(a < b))
}

fn number_ge(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (a, b) = operands(args)?;
    Ok(Value::bool(a >= b))
}

fn number_le(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (a, b) = operands(args)?;
    Ok(Value::bool(a <= b))
}

/// Equality never errors: a non-number on the right is just unequal
fn number_eq(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::bool(args[0] == args[1]))
}

fn number_ne(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::bool(args[0] != args[1]))
}

/// `from ; to` — an inclusive range whose direction follows the sign of
/// `to - from`
fn number_range(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (from, to) = operands(args)?;
    Ok(Value::Range { from, to })
}

fn number_shr(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (a, b) = operands(args)?;
    Ok(Value::Number(((a as i64) >> (b as i64 & 63)) as f64))
}

fn number_shl(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (a, b) = operands(args)?;
    Ok(Value::Number(((a as i64) << (b as i64 & 63)) as f64))
}

fn number_string(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let n = number_arg(args, 0, "Receiver")?;
    Ok(Value::string(fmt_number(n)))
}
