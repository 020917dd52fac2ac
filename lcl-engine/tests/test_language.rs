//! End-to-end language-feature tests, backed by `.lcl` scripts.
//!
//! See scripts in [`./scripts`]. Mirrors the teacher's
//! `tests/language/*.scm` + `tests/test_language.rs` pairing.

use lcl_engine::{Error, Flow, Interpreter};

fn run(source: &str) -> (Interpreter, Flow) {
    let mut interp = Interpreter::new();
    interp.register_core();
    let flow = interp.eval_str(source).expect("evaluation");
    (interp, flow)
}

#[test]
fn basic_substitution() {
    let (interp, flow) = run(include_str!("scripts/basic_substitution.lcl"));
    assert_eq!(interp.get("x").unwrap().as_int().unwrap(), 10);
    match flow {
        Flow::Value(v) => assert_eq!(&*v.to_display_string(), ""),
        other => panic!("unexpected flow: {other:?}"),
    }
}

#[test]
fn arithmetic_and_nesting() {
    let (_interp, _flow) = run(include_str!("scripts/arithmetic_nesting.lcl"));
    // `puts` writes straight to stdout; the nested `+`/`*` evaluation is
    // exercised directly here instead of scraped from the process output.
    let mut interp = Interpreter::new();
    interp.register_core();
    let value = match interp.eval_str("+ 6 [* 7 8]").unwrap() {
        Flow::Value(v) => v,
        other => panic!("unexpected flow: {other:?}"),
    };
    assert_eq!(value.as_float().unwrap(), 62.0);
}

#[test]
fn lexical_closure_with_mutation() {
    let (mut interp, _flow) = run(include_str!("scripts/closure_counter.lcl"));
    let c = interp.get("c").unwrap();
    assert_eq!(interp.call(&c, &[]).unwrap().as_int().unwrap(), 4);
    assert_eq!(interp.call(&c, &[]).unwrap().as_int().unwrap(), 5);
}

#[test]
fn namespace_qualified_access() {
    let (interp, _flow) = run(include_str!("scripts/namespace_qualified.lcl"));
    assert_eq!(interp.get("a::b::x").unwrap().as_int().unwrap(), 42);
    assert!(interp.get("x").is_err());
}

#[test]
fn return_through_nested_eval() {
    let (_interp, flow) = run(include_str!("scripts/return_through_eval.lcl"));
    match flow {
        Flow::Value(v) => assert_eq!(v.as_int().unwrap(), 7),
        other => panic!("unexpected flow: {other:?}"),
    }
}

#[test]
fn list_copy_on_write() {
    let (interp, _flow) = run(include_str!("scripts/list_cow.lcl"));
    assert_eq!(interp.get("a").unwrap().cell_get().unwrap().list_len().unwrap(), 4);
    assert_eq!(interp.get("b").unwrap().list_len().unwrap(), 3);
}

#[test]
fn break_in_a_while() {
    let (interp, _flow) = run(include_str!("scripts/break_in_while.lcl"));
    assert_eq!(
        interp.get("i").unwrap().cell_get().unwrap().as_int().unwrap(),
        3
    );
}

#[test]
fn unterminated_brace_fails_at_parse_time() {
    let mut interp = Interpreter::new();
    interp.register_core();
    let err = interp
        .eval_str(include_str!("scripts/unterminated_brace.lcl"))
        .unwrap_err();
    match err {
        Error::Parse { message } => assert!(message.contains("line 1")),
        other => panic!("expected a parse error, got {other:?}"),
    }
}
