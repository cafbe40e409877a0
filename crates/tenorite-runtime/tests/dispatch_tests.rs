//! Rank-lifting dispatch behavior

use pretty_assertions::assert_eq;
use tenorite_runtime::{Tenorite, Value};

fn eval(source: &str) -> Value {
    let mut runtime = Tenorite::new().expect("runtime construction failed");
    runtime.eval(source, "test").expect("eval failed")
}

fn eval_display(source: &str) -> String {
    let mut runtime = Tenorite::new().expect("runtime construction failed");
    let value = runtime.eval(source, "test").expect("eval failed");
    runtime.display(&value).expect("display failed")
}

fn eval_err(source: &str) -> String {
    let mut runtime = Tenorite::new().expect("runtime construction failed");
    runtime.eval(source, "test").unwrap_err().to_string()
}

#[test]
fn test_auto_promotion_vectorizes_missing_selectors() {
    assert_eq!(eval_display("[1, 2, 3] + 10."), "[11, 12, 13]");
    assert_eq!(eval_display("[1, 2, 3] @ * @ [1, 2, 3]."), "[1, 4, 9]");
}

#[test]
fn test_no_promotion_when_selector_exists_on_collection() {
    // `len` is defined on List, so the send stays un-lifted.
    assert_eq!(eval("[1, 2, 3] len."), Value::Number(3.0));
    // `string` resolves through Object, which also counts.
    assert_eq!(eval_display("[1, 2] string."), "[1, 2]");
}

#[test]
fn test_vectorization_matches_elementwise_map() {
    let lifted = eval_display("[1, 2, 3, 4] * 3.");
    let mapped = eval_display("[1, 2, 3, 4] map: { |x| x * 3 }.");
    assert_eq!(lifted, mapped);
}

#[test]
fn test_explicit_ranks_zip_both_sides() {
    assert_eq!(eval_display("[1, 2] @ + @ [10, 20]."), "[11, 22]");
}

#[test]
fn test_differing_sizes_fail() {
    let message = eval_err("[1, 2] @ + @ [10, 20, 30].");
    assert!(message.contains("Differing sizes"), "got: {}", message);
}

#[test]
fn test_scalar_arguments_broadcast() {
    // The scalar right side is reused for every zipped element.
    assert_eq!(eval_display("[1, 2, 3] @ + 5."), "[6, 7, 8]");
}

#[test]
fn test_table_receiver_keeps_keys() {
    assert_eq!(
        eval_display("#['a: 1, 'b: 2] * 10."),
        "#['a: 10, 'b: 20]"
    );
}

#[test]
fn test_nested_promotion_stops_at_one_level() {
    // Rank lifting delivers rows as-is; the inner send fails because
    // `+` is not defined on List and no re-promotion happens mid-zip.
    let message = eval_err("[[1, 2], [3, 4]] @ + 1.");
    assert!(message.contains("Invalid method"), "got: {}", message);
}

#[test]
fn test_unknown_selector_on_scalar_reports_receiver() {
    let message = eval_err("3 frobnicate.");
    assert!(message.contains("'frobnicate"), "got: {}", message);
    assert!(message.contains('3'), "got: {}", message);
}

#[test]
fn test_field_selector_reads_object_fields() {
    assert_eq!(
        eval(
            "type P. P fn p v: v { &v := v }. \
             o := P new: { |o| o v: 9 }. o &v."
        ),
        Value::Number(9.0)
    );
}

#[test]
fn test_missing_field_fails() {
    let message = eval_err("type P. o := P new: { |o| o }. o &nope.");
    assert!(message.contains("field"), "got: {}", message);
}

#[test]
fn test_static_methods_shadow_instance_lookup() {
    let value = eval(
        "type Box. \
         Box fn Box make { 41 }. \
         Box make + 1.",
    );
    assert_eq!(value, Value::Number(42.0));
}

#[test]
fn test_vectorized_send_over_objects() {
    // Rank lifting composes with user-defined methods on objects.
    let value = eval(
        "type P. P fn p v: v { &v := v }. P fn p get { &v }. \
         xs := [P new: { |o| o v: 1 }, P new: { |o| o v: 2 }]. \
         (xs get) reduce: { |a b| a + b } into: 0.",
    );
    assert_eq!(value, Value::Number(3.0));
}
