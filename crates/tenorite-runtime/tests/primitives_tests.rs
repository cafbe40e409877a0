//! Primitive library behavior and property laws

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;
use tenorite_runtime::{SymbolTable, Tenorite, Value};

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

// ===== Number =====

#[rstest]
#[case("2 ** 10.", 1024.0)]
#[case("7 % 3.", 1.0)]
#[case("1 << 4.", 16.0)]
#[case("32 >> 2.", 8.0)]
#[case("9 / 2.", 4.5)]
#[case("10 - 4 - 3.", 3.0)]
fn test_number_ops(#[case] source: &str, #[case] expected: f64) {
    assert_eq!(eval(source), Value::Number(expected));
}

#[test]
fn test_number_comparisons() {
    assert_eq!(eval("1 < 2."), Value::True);
    assert_eq!(eval("2 <= 1."), Value::False);
    assert_eq!(eval("3 == 3."), Value::True);
    assert_eq!(eval("3 == \"3\"."), Value::False);
    assert_eq!(eval("3 != 'x."), Value::True);
}

#[test]
fn test_number_comparison_needs_number() {
    let message = eval_err("1 < \"2\".");
    assert!(message.contains("must be number"), "got: {}", message);
}

// ===== String =====

#[test]
fn test_string_basics() {
    assert_eq!(eval_display("\"hello\" upper."), "HELLO");
    assert_eq!(eval_display("\"  x \" trim."), "x");
    assert_eq!(eval("\"abc\" len."), Value::Number(3.0));
    assert_eq!(eval("\"ab\" startsWith: \"a\"."), Value::True);
    assert_eq!(eval("\"ab\" endsWith: \"a\"."), Value::False);
    assert_eq!(eval("\"abcd\" containsString: \"bc\"."), Value::True);
    assert_eq!(eval_display("\"ab\" repeat: 3."), "ababab");
    assert_eq!(eval_display("\"a\" concatString: \"b\"."), "ab");
}

#[test]
fn test_string_len_counts_bytes() {
    // 'é' is two bytes in UTF-8.
    assert_eq!(eval("\"hé\" len."), Value::Number(3.0));
}

#[test]
fn test_string_at_is_byte_indexed() {
    assert_eq!(eval_display("\"abc\" at_: 1."), "b");
    let message = eval_err("\"abc\" at_: 9.");
    assert!(message.contains("Index out of range"), "got: {}", message);
}

#[test]
fn test_string_slice_is_scalar_indexed() {
    assert_eq!(eval_display("\"héllo\" slice: 1 end: 3."), "él");
    assert_eq!(eval_display("\"héllo\" slice: 2."), "llo");
}

#[test]
fn test_string_split_and_explode() {
    assert_eq!(eval_display("\"a,b,c\" split: \",\"."), "[\"a\", \"b\", \"c\"]");
    assert_eq!(eval_display("\"ab\" explode."), "[\"a\", \"b\"]");
}

#[test]
fn test_string_index_of() {
    assert_eq!(eval("\"abcabc\" indexOfString: \"bc\"."), Value::Number(1.0));
    assert_eq!(
        eval("\"abcabc\" indexOfString: \"bc\" start: 2."),
        Value::Number(4.0)
    );
    assert_eq!(eval("\"abc\" indexOfString: \"zz\"."), Value::None);
}

#[rstest]
#[case("\"ab\" %% \"<5\".", "ab   ")]
#[case("\"ab\" %% \">5\".", "   ab")]
#[case("\"ab\" %% \"*>4\".", "**ab")]
#[case("\"ab\" %% \"*<4\".", "ab**")]
#[case("\"abcdef\" %% \"<3\".", "abcdef")]
fn test_string_format_padding(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(eval_display(source), expected);
}

#[test]
fn test_string_format_debug_quotes() {
    assert_eq!(eval_display("\"ab\" %% \"r\"."), "\"ab\"");
}

// ===== List =====

#[test]
fn test_list_ops() {
    assert_eq!(eval_display("[1, 2] ++ [3]."), "[1, 2, 3]");
    assert_eq!(eval_display("[1, 2] <> 3."), "[1, 2, 3]");
    assert_eq!(eval("[1, 2, 3] ! 1."), Value::Number(2.0));
    assert_eq!(eval("[1, 2, 3] at_: 0."), Value::Number(1.0));
    assert_eq!(eval("[1, True] all."), Value::True);
    assert_eq!(eval("[False, None] any."), Value::False);
    assert_eq!(eval_display("[1, 2, 3, 4] slice: 1 end: 3."), "[2, 3]");
    assert_eq!(eval_display("List new: 3 fill: 0."), "[0, 0, 0]");
}

#[test]
fn test_list_compress() {
    assert_eq!(
        eval_display("[1, 2, 3] compress: [True, False, True]."),
        "[1, 3]"
    );
}

#[test]
fn test_list_group() {
    assert_eq!(
        eval_display("[1, 2, 3, 4] groupList: ['a, 'b, 'a, 'b]."),
        "#['a: [1, 3], 'b: [2, 4]]"
    );
    let message = eval_err("[1, 2] groupList: ['a].");
    assert!(message.contains("Differing sizes"), "got: {}", message);
}

#[test]
fn test_list_index_out_of_range() {
    let message = eval_err("[1] at_: 1.");
    assert!(message.contains("Index out of range"), "got: {}", message);
}

// ===== Table and Pair =====

#[test]
fn test_table_lookup() {
    assert_eq!(eval("#['a: 1, 'b: 2] at_: 'b."), Value::Number(2.0));
    assert_eq!(eval("#['a: 1] at_: 'missing."), Value::None);
    assert_eq!(eval("#['a: 1, 'b: 2] len."), Value::Number(2.0));
}

#[test]
fn test_pair_laws() {
    assert_eq!(eval("(1 => 2) first."), Value::Number(1.0));
    assert_eq!(eval("(1 => 2) second."), Value::Number(2.0));
    assert_eq!(eval_display("'k => 3."), "'k => 3");
}

// ===== Range =====

#[test]
fn test_range_endpoints() {
    assert_eq!(eval("(2 ; 9) from."), Value::Number(2.0));
    assert_eq!(eval("(2 ; 9) to."), Value::Number(9.0));
    assert_eq!(eval("(9 ; 2) min."), Value::Number(2.0));
    assert_eq!(eval("(9 ; 2) max."), Value::Number(9.0));
}

#[test]
fn test_range_list_is_inclusive_both_directions() {
    assert_eq!(eval_display("(1 ; 4) list."), "[1, 2, 3, 4]");
    assert_eq!(eval_display("(4 ; 1) list."), "[4, 3, 2, 1]");
    assert_eq!(eval_display("(3 ; 3) list."), "[3]");
}

#[test]
fn test_range_next_protocol() {
    assert_eq!(eval("(1 ; 3) next: None."), Value::Number(1.0));
    assert_eq!(eval("(1 ; 3) next: 1."), Value::Number(2.0));
    assert_eq!(eval("(1 ; 3) next: 3."), Value::None);
    assert_eq!(eval("(3 ; 1) next: None."), Value::Number(3.0));
    assert_eq!(eval("(3 ; 1) next: 2."), Value::Number(1.0));
    assert_eq!(eval("(3 ; 1) next: 1."), Value::None);
}

// ===== Reflect and identity =====

#[test]
fn test_reflect() {
    assert_eq!(eval("Reflect notResponds: 1 to: 'frob."), Value::True);
    assert_eq!(eval("Reflect notResponds: 1 to: '+."), Value::False);
    assert_eq!(eval("(Reflect listMethods: 1) contains: '+."), Value::True);
}

#[test]
fn test_identity_operators() {
    assert_eq!(eval("1 === 1."), Value::True);
    assert_eq!(eval("1 !== 2."), Value::True);
    // Lists never compare identical, even to themselves.
    assert_eq!(eval("xs := [1]. xs === xs."), Value::False);
}

#[test]
fn test_function_primitives() {
    assert_eq!(eval("{ |a b| a + b } arity."), Value::Number(2.0));
    assert_eq!(
        eval("{ |a b| a * b } callWithValues: [6, 7]."),
        Value::Number(42.0)
    );
    assert_eq!(
        eval("{ |a b c| a + b + c } value: 1 value: 2 value: 3."),
        Value::Number(6.0)
    );
}

#[test]
fn test_regex_constructor() {
    assert_eq!(
        eval("(\"x42\" findRegex: (Regex new: \"[0-9]+\")) &matched."),
        Value::True
    );
    let message = eval_err("Regex new: \"[\".");
    assert!(!message.is_empty());
}

#[test]
fn test_regex_spans_are_absolute() {
    assert_eq!(
        eval_display("((\"ab12\" findRegex: #'[0-9]+') &spans) at_: 0."),
        "2;4"
    );
    assert_eq!(
        eval_display("((\"12ab12\" findRegex: #'[0-9]+' start: 2) &spans) at_: 0."),
        "4;6"
    );
}

// ===== Property laws =====

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_take_drop_partition(items in prop::collection::vec(-100i64..100, 0..12), n in 0usize..12) {
        let n = n.min(items.len());
        let rendered: Vec<String> = items.iter().map(|x| x.to_string()).collect();
        let source = format!(
            "xs := [{}]. ((xs takeNumber: {}) len) + ((xs dropNumber: {}) len).",
            rendered.join(", "),
            n,
            n
        );
        prop_assert_eq!(eval(&source), Value::Number(items.len() as f64));
    }

    #[test]
    fn prop_range_list_len(from in -20i64..20, to in -20i64..20) {
        let source = format!("(({}) ; ({})) :> list :> len.", from, to);
        let expected = (to - from).abs() + 1;
        prop_assert_eq!(eval(&source), Value::Number(expected as f64));
    }

    #[test]
    fn prop_symbol_interning_is_injective(names in prop::collection::hash_set("[a-z]{1,8}", 1..50)) {
        let mut table = SymbolTable::new();
        let mut seen = std::collections::HashMap::new();
        for name in &names {
            let sym = table.intern(name).unwrap();
            if let Some(other) = seen.insert(sym, name.clone()) {
                prop_assert_eq!(&other, name, "two strings collapsed to one id");
            }
        }
    }
}
