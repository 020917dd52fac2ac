//! Built-in command library (§4.6, spec.md §6).
//!
//! One Rust function per `c_*`/`s_*` handler in
//! `examples/original_source/src/lcl-stdlib.c`, registered the same way
//! `lcl_register_core` does — a single flat pass binding every name into
//! the global namespace (plus the `List`/`Dict`/`String` sub-namespaces).

mod arith;
mod bindings;
mod container;
mod control;
mod logic;
mod output;
mod procs;

use crate::error::{Error, Result};
use crate::interp::Interpreter;
use crate::program::Program;
use crate::scanner::parse_program;
use crate::value::Value;

pub fn register_core(interp: &mut Interpreter) {
    output::register(interp);
    arith::register(interp);
    logic::register(interp);
    bindings::register(interp);
    control::register(interp);
    procs::register(interp);
    container::register(interp);
}

/// Tcl-style truthiness (`lcl_value_is_true`): numeric types test non-zero;
/// strings that parse fully as a base-10 integer test by that integer; any
/// other non-empty string is true; the empty string is false.
pub(crate) fn truthy(v: &Value) -> bool {
    match v {
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::String(s) => {
            if s.is_empty() {
                false
            } else {
                match s.parse::<i64>() {
                    Ok(n) => n != 0,
                    Err(_) => true,
                }
            }
        }
        _ => true,
    }
}

/// Parses a script fragment extracted from a word's string form into a
/// `Program` for deferred evaluation. Every control-flow special form and
/// `eval`/`load`/`namespace eval` recompiles its body this way, matching
/// `lcl_program_compile` call sites in the reference stdlib.
pub(crate) fn compile_body(src: &str, label: &str) -> Result<Program> {
    parse_program(src, label)
}

pub(crate) fn arity_err(expected: impl Into<String>, found: usize) -> Error {
    Error::arity(expected, found)
}
