//! String primitives
//!
//! Indexing via `at_:` works on bytes; `slice:`/`slice:end:` and
//! `explode` work on Unicode scalars. `len` counts bytes.

use super::{count_arg, method, number_arg, string_arg};
use crate::value::{RuntimeError, Value};
use crate::vm::Vm;
use std::rc::Rc;

pub(super) fn install(vm: &mut Vm) {
    let string = vm.core.string.clone();
    method(vm, &string, "==", string_eq);
    method(vm, &string, "!=", string_ne);
    method(vm, &string, "<", string_lt);
    method(vm, &string, "<=", string_le);
    method(vm, &string, ">", string_gt);
    method(vm, &string, ">=", string_ge);
    method(vm, &string, "len", string_len);
    method(vm, &string, "upper", string_upper);
    method(vm, &string, "lower", string_lower);
    method(vm, &string, "trim", string_trim);
    method(vm, &string, "trimLeft", string_trim_left);
    method(vm, &string, "trimRight", string_trim_right);
    method(vm, &string, "explode", string_explode);
    method(vm, &string, "at_:", string_at);
    method(vm, &string, "startsWith:", string_starts_with);
    method(vm, &string, "endsWith:", string_ends_with);
    method(vm, &string, "containsString:", string_contains);
    method(vm, &string, "indexOfString:", string_index_of);
    method(vm, &string, "indexOfString:start:", string_index_of_start);
    method(vm, &string, "repeat:", string_repeat);
    method(vm, &string, "split:", string_split);
    method(vm, &string, "concatString:", string_concat);
    method(vm, &string, "slice:", string_slice);
    method(vm, &string, "slice:end:", string_slice_end);
    method(vm, &string, "%%", string_format);
    method(vm, &string, "string", string_identity);
    method(vm, &string, "findRegex:", string_find_regex);
    method(vm, &string, "findRegex:start:", string_find_regex_start);
}

fn operands(args: &[Value]) -> Result<(Rc<str>, Rc<str>), RuntimeError> {
    let lhs = string_arg(args, 0, "Left side")?;
    let rhs = string_arg(args, 1, "Right side")?;
    Ok((lhs, rhs))
}

fn string_eq(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::bool(args[0] == args[1]))
}

fn string_ne(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::bool(args[0] != args[1]))
}

fn string_lt(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (a, b) = operands(args)?;
    Ok(Value::bool(*a < *b))
}

fn string_le(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (a, b) = operands(args)?;
    Ok(Value::bool(*a <= *b))
}

fn string_gt(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (a, b) = operands(args)?;
    Ok(Value::bool(*a > *b))
}

fn string_ge(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (a, b) = operands(args)?;
    Ok(Value::bool(*a >= *b))
}

/// Byte length
fn string_len(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let s = string_arg(args, 0, "Receiver")?;
    Ok(Value::Number(s.len() as f64))
}

fn string_upper(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let s = string_arg(args, 0, "Receiver")?;
    Ok(Value::string(s.to_uppercase()))
}

fn string_lower(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let s = string_arg(args, 0, "Receiver")?;
    Ok(Value::string(s.to_lowercase()))
}

fn string_trim(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let s = string_arg(args, 0, "Receiver")?;
    Ok(Value::string(s.trim()))
}

fn string_trim_left(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let s = string_arg(args, 0, "Receiver")?;
    Ok(Value::string(s.trim_start()))
}

fn string_trim_right(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let s = string_arg(args, 0, "Receiver")?;
    Ok(Value::string(s.trim_end()))
}

/// One single-scalar string per Unicode scalar
fn string_explode(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let s = string_arg(args, 0, "Receiver")?;
    Ok(Value::list(
        s.chars().map(|c| Value::string(c.to_string())).collect(),
    ))
}

/// Byte indexing: yields a one-byte string
fn string_at(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let s = string_arg(args, 0, "Receiver")?;
    let at = super::index_arg(args, 1, s.len())?;
    let byte = s.as_bytes()[at];
    Ok(Value::string(
        String::from_utf8_lossy(&[byte]).into_owned(),
    ))
}

fn string_starts_with(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (s, prefix) = operands(args)?;
    Ok(Value::bool(s.starts_with(prefix.as_ref())))
}

fn string_ends_with(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (s, suffix) = operands(args)?;
    Ok(Value::bool(s.ends_with(suffix.as_ref())))
}

fn string_contains(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (s, needle) = operands(args)?;
    Ok(Value::bool(s.contains(needle.as_ref())))
}

/// Byte index of the first occurrence, or None
fn string_index_of(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (s, needle) = operands(args)?;
    Ok(match s.find(needle.as_ref()) {
        Some(at) => Value::Number(at as f64),
        None => Value::None,
    })
}

/// Like `indexOfString:` but searching from a byte offset; the result is
/// still an absolute index
fn string_index_of_start(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (s, needle) = operands(args)?;
    let start = count_arg(args, 2, "Start")?;
    let Some(tail) = s.get(start..) else {
        return Err(RuntimeError::TypeError("Index out of range.".to_string()));
    };
    Ok(match tail.find(needle.as_ref()) {
        Some(at) => Value::Number((start + at) as f64),
        None => Value::None,
    })
}

fn string_repeat(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let s = string_arg(args, 0, "Receiver")?;
    let n = count_arg(args, 1, "Count")?;
    Ok(Value::string(s.repeat(n)))
}

fn string_split(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (s, sep) = operands(args)?;
    if sep.is_empty() {
        return string_explode(_vm, args);
    }
    Ok(Value::list(
        s.split(sep.as_ref()).map(Value::string).collect(),
    ))
}

fn string_concat(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let (a, b) = operands(args)?;
    Ok(Value::string(format!("{}{}", a, b)))
}

/// Scalar slicing from `start` to the end of the string
fn string_slice(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let s = string_arg(args, 0, "Receiver")?;
    let start = count_arg(args, 1, "Start")?;
    Ok(Value::string(s.chars().skip(start).collect::<String>()))
}

/// Scalar slicing over `[start, end)`; bounds clamp to the string
fn string_slice_end(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let s = string_arg(args, 0, "Receiver")?;
    let start = count_arg(args, 1, "Start")?;
    let end = count_arg(args, 2, "End")?;
    let taken = end.saturating_sub(start);
    Ok(Value::string(
        s.chars().skip(start).take(taken).collect::<String>(),
    ))
}

fn string_identity(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let s = string_arg(args, 0, "Receiver")?;
    Ok(Value::String(s))
}

/// `self %% spec` — pad or debug-quote per `[fill]<|>width[r]`
fn string_format(vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let s = string_arg(args, 0, "Receiver")?;
    let spec = string_arg(args, 1, "Format")?;
    let (fill, right, width, rest) = parse_format_spec(&spec);
    let rendered = if rest.contains('r') {
        args[0].debug_string(&vm.symbols)
    } else {
        s.to_string()
    };
    Ok(Value::string(pad_str(fill, right, width, &rendered)))
}

/// Parse a `[fill]<|>width[r]` format spec
fn parse_format_spec(spec: &str) -> (char, bool, usize, String) {
    let chars: Vec<char> = spec.chars().collect();
    let mut fill = ' ';
    let mut right = false;
    let mut width_start = 0;

    if chars.len() > 2 && chars[1] == '<' {
        fill = chars[0];
        width_start = 2;
    } else if chars.len() > 2 && chars[1] == '>' {
        fill = chars[0];
        right = true;
        width_start = 2;
    } else if chars.len() > 1 && chars[0] == '<' {
        width_start = 1;
    } else if chars.len() > 1 && chars[0] == '>' {
        right = true;
        width_start = 1;
    }

    let tail: String = chars[width_start..].iter().collect();
    let Some(width_end) = tail.rfind(|c: char| c.is_ascii_digit()) else {
        return (fill, right, 0, tail);
    };
    let width = tail[..=width_end].parse().unwrap_or(0);
    let rest = tail[width_end + 1..].to_string();
    (fill, right, width, rest)
}

fn pad_str(fill: char, right: bool, width: usize, s: &str) -> String {
    let shortfall = width.saturating_sub(s.chars().count());
    if shortfall == 0 {
        return s.to_string();
    }
    let padding: String = std::iter::repeat(fill).take(shortfall).collect();
    if right {
        format!("{}{}", padding, s)
    } else {
        format!("{}{}", s, padding)
    }
}

// ===== Regex matching =====

fn string_find_regex(vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let s = string_arg(args, 0, "Receiver")?;
    find_regex(vm, args, &s, 0)
}

fn string_find_regex_start(vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let s = string_arg(args, 0, "Receiver")?;
    let start = number_arg(args, 2, "Argument")?;
    if start < 0.0 || start.fract() != 0.0 || !s.is_char_boundary(start as usize) {
        return Err(RuntimeError::TypeError("Index out of range.".to_string()));
    }
    find_regex(vm, args, &s, start as usize)
}

/// Match a pattern against `subject[start..]`, answering a RegexResults
/// object with `groups`, `spans` (absolute byte ranges), `matched`, and
/// `subject` fields. Unmatched groups yield an empty string and None.
fn find_regex(
    vm: &mut Vm,
    args: &[Value],
    subject: &str,
    start: usize,
) -> Result<Value, RuntimeError> {
    let Some(Value::Regex(pattern)) = args.get(1) else {
        return Err(RuntimeError::TypeError("Argument must be regex.".to_string()));
    };

    let mut groups = Vec::new();
    let mut spans = Vec::new();
    let captures = pattern.pattern.captures(&subject[start..]);
    if let Some(captures) = &captures {
        for i in 0..pattern.pattern.captures_len() {
            match captures.get(i) {
                Some(group) => {
                    groups.push(Value::string(group.as_str()));
                    spans.push(Value::Range {
                        from: (start + group.start()) as f64,
                        to: (start + group.end()) as f64,
                    });
                }
                None => {
                    groups.push(Value::string(""));
                    spans.push(Value::None);
                }
            }
        }
    }

    let fields = [
        ("groups", Value::list(groups)),
        ("spans", Value::list(spans)),
        ("matched", Value::bool(captures.is_some())),
        ("subject", Value::string(subject)),
    ];
    let mut field_map = std::collections::HashMap::new();
    for (name, value) in fields {
        let sym = vm
            .symbols
            .intern(name)
            .map_err(|err| RuntimeError::TypeError(err.to_string()))?;
        field_map.insert(sym, value);
    }

    Ok(Value::Object(Rc::new(crate::value::ObjectData {
        roles: vec![vm.core.regex_results.clone()],
        fields: std::cell::RefCell::new(field_map),
    })))
}
