//! End-to-end scenarios: source in, stdout/value out
//!
//! Each case evaluates a program against a fresh runtime and checks the
//! language-level `string` of the final expression, exactly as the CLI
//! prints it.

use pretty_assertions::assert_eq;
use rstest::rstest;
use std::cell::RefCell;
use std::rc::Rc;
use tenorite_runtime::{Tenorite, Value};

fn eval_display(source: &str) -> String {
    let mut runtime = Tenorite::new().expect("runtime construction failed");
    let value = runtime.eval(source, "test").expect("eval failed");
    runtime.display(&value).expect("display failed")
}

#[rstest]
#[case::arithmetic("1 + 2 :> string.", "3")]
#[case::auto_rank_promotion("[1, 2, 3] + 10.", "[11, 12, 13]")]
#[case::lambda_value("sq := { |x| x * x }. sq value: 7.", "49")]
#[case::counter_upvalue(
    "counter := { n := 0. { nonlocal n := n + 1. n } }. c := counter call. c call. c call. c call.",
    "3"
)]
#[case::roles_and_fields(
    "type Point. Point fn p x: x y: y { &x := x. &y := y }. p := Point new: { |o| o x: 3 y: 4 }. p &x + p &y.",
    "7"
)]
#[case::table_keys("#[ 'a: 1, 'b: 2 ] :> keys.", "['a, 'b]")]
#[case::table_values("#[ 'a: 1, 'b: 2 ] :> values.", "[1, 2]")]
fn test_scenario(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(eval_display(source), expected);
}

#[rstest]
#[case::map("[1, 2, 3] map: { |x| x * 2 }.", "[2, 4, 6]")]
#[case::filter("[1, 2, 3, 4] filter: { |x| x > 2 }.", "[3, 4]")]
#[case::reduce("[1, 2, 3, 4] reduce: { |a b| a + b } into: 0.", "10")]
#[case::reverse("[1, 2, 3] reverse.", "[3, 2, 1]")]
#[case::contains("[1, 2, 3] contains: 2.", "True")]
#[case::join("\", \" join: [\"a\", \"b\", \"c\"].", "a, b, c")]
#[case::range_list("(1 ; 5) :> list :> len.", "5")]
#[case::number_max("5 max: 3.", "5")]
#[case::table_wrap("#['a: 1, 'b: 2] + 10.", "#['a: 11, 'b: 12]")]
#[case::type_test("3 type Number.", "True")]
#[case::type_test_negative("3 type String.", "False")]
fn test_prelude_and_dispatch(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(eval_display(source), expected);
}

#[test]
fn test_top_level_interpolation_prints() {
    let mut runtime = Tenorite::new().unwrap();
    let buffer = Rc::new(RefCell::new(Vec::<u8>::new()));
    runtime.set_output_writer(buffer.clone());

    let value = runtime
        .eval("\"x is #{40 + 2}\"\n0.", "test")
        .expect("eval failed");
    assert_eq!(value, Value::Number(0.0));

    let printed = String::from_utf8(buffer.borrow().clone()).unwrap();
    assert_eq!(printed, "x is 42\n");
}

#[test]
fn test_write_string_goes_to_writer() {
    let mut runtime = Tenorite::new().unwrap();
    let buffer = Rc::new(RefCell::new(Vec::<u8>::new()));
    runtime.set_output_writer(buffer.clone());

    runtime
        .eval("[1, 2, 3] each: { |x| System writeString: (x string) }.", "test")
        .expect("eval failed");

    let printed = String::from_utf8(buffer.borrow().clone()).unwrap();
    assert_eq!(printed, "123");
}

#[test]
fn test_final_interpolated_string_is_program_output() {
    assert_eq!(eval_display("name := \"world\". \"hello #{name}\"."), "hello world");
}

#[test]
fn test_assert_failure_unwinds() {
    let mut runtime = Tenorite::new().unwrap();
    let err = runtime.eval("System assert: 1 > 2.", "test").unwrap_err();
    assert!(err.to_string().contains("Assertion failed"));
}

#[test]
fn test_panic_carries_message() {
    let mut runtime = Tenorite::new().unwrap();
    let err = runtime
        .eval("System panic: \"boom\".", "test")
        .unwrap_err();
    assert!(err.to_string().contains("boom"));
}

#[test]
fn test_runtime_error_reports_line() {
    let mut runtime = Tenorite::new().unwrap();
    let err = runtime.eval("x := 1.\nx foo.", "test").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("line 2"), "got: {}", message);
    assert!(message.contains("foo"), "got: {}", message);
}

#[test]
fn test_regex_find() {
    assert_eq!(
        eval_display("(\"abc123\" findRegex: #'[0-9]+') &matched."),
        "True"
    );
    assert_eq!(
        eval_display("((\"abc123\" findRegex: #'[0-9]+') &groups) at_: 0."),
        "123"
    );
}

#[test]
fn test_object_string_uses_primary_role() {
    assert_eq!(
        eval_display("type Point. Point new: { |o| o }."),
        "<object Point>"
    );
}
