//! Closure and upvalue semantics
//!
//! Captured variables alias the live frame while it runs, survive it
//! afterwards, and stay shared between closures that captured the same
//! slot.

use pretty_assertions::assert_eq;
use tenorite_runtime::{Tenorite, Value};

fn eval(source: &str) -> Value {
    let mut runtime = Tenorite::new().expect("runtime construction failed");
    runtime.eval(source, "test").expect("eval failed")
}

#[test]
fn test_counter_accumulates_across_calls() {
    let value = eval(
        "counter := { n := 0. { nonlocal n := n + 1. n } }. \
         c := counter call. c call. c call. c call.",
    );
    assert_eq!(value, Value::Number(3.0));
}

#[test]
fn test_two_counters_are_independent() {
    let value = eval(
        "counter := { n := 0. { nonlocal n := n + 1. n } }. \
         a := counter call. b := counter call. \
         a call. a call. b call.",
    );
    assert_eq!(value, Value::Number(1.0));
}

#[test]
fn test_closures_share_a_captured_slot() {
    let value = eval(
        "make := { n := 0. bump := { nonlocal n := n + 1. n }. read := { n }. [bump, read] }. \
         fns := make call. \
         (fns at_: 0) call. (fns at_: 0) call. \
         (fns at_: 1) call.",
    );
    assert_eq!(value, Value::Number(2.0));
}

#[test]
fn test_capture_chains_through_intermediate_frames() {
    let value = eval(
        "outer := { x := 10. { { x + 1 } } }. \
         mid := outer call. inner := mid call. inner call.",
    );
    assert_eq!(value, Value::Number(11.0));
}

#[test]
fn test_parameter_capture() {
    let value = eval("adder := { |n| { |m| n + m } }. add3 := adder value: 3. add3 value: 4.");
    assert_eq!(value, Value::Number(7.0));
}

#[test]
fn test_nonlocal_falls_back_to_module_binding() {
    let value = eval("g := 0. bump := { nonlocal g := g + 1 }. bump call. bump call. g.");
    assert_eq!(value, Value::Number(2.0));
}

#[test]
fn test_nonlocal_to_unknown_name_is_compile_error() {
    let mut runtime = Tenorite::new().unwrap();
    let err = runtime
        .eval("f := { nonlocal zzz := 1 }.", "test")
        .unwrap_err();
    assert!(err.to_string().contains("nonlocal"));
}

#[test]
fn test_loop_reuses_the_frame() {
    // Sum 1..=5 through the prelude's loop-based iteration: the body
    // re-enters itself via RECURSIVE, with locals persisting.
    let value = eval(
        "total := 0. \
         (1 ; 5) each: { |i| nonlocal total := total + i }. \
         total.",
    );
    assert_eq!(value, Value::Number(15.0));
}

#[test]
fn test_lambda_returns_receiver_when_body_is_empty() {
    // An empty body pops the implicit receiver push, so a lambda called
    // through `call` answers itself.
    let value = eval("f := { }. (f call) === f.");
    assert_eq!(value, Value::True);
}
