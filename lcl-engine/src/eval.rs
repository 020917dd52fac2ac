//! The evaluator (§4.4).
//!
//! `OK`/`ERR` are realized with `Result`; the other three return codes
//! (`RETURN`/`BREAK`/`CONTINUE`) live on the `Ok` side as [`Flow`], so `?`
//! still propagates errors through every function here exactly as the
//! reference design's "on any non-OK code, stop and propagate" requires.

use std::rc::Rc;

use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::handle::Handle;
use crate::interp::Interpreter;
use crate::program::{Command, Program, Word, WordPiece};
use crate::value::{NativeKind, NativeProc, UserProc, Value};

#[derive(Debug, Clone)]
pub enum Flow {
    /// Normal completion carrying a value (`OK`).
    Value(Value),
    /// Non-local exit from a user procedure (`RETURN`).
    Return(Value),
    /// Exit the innermost loop (`BREAK`).
    Break,
    /// Next iteration of the innermost loop (`CONTINUE`).
    Continue,
}

pub type EvalResult = std::result::Result<Flow, Error>;

/// Unwraps a plain value out of a `Flow`, short-circuiting (returning the
/// other flow unchanged to the *caller's* caller) on `Return`/`Break`/
/// `Continue`. Used at every point that needs a concrete `Value` to keep
/// working with (e.g. an `if` condition, a command's argument list).
macro_rules! value_or_propagate {
    ($flow:expr) => {
        match $flow {
            Flow::Value(v) => v,
            other => return Ok(other),
        }
    };
}
pub(crate) use value_or_propagate;

/// `eval_program` — iterate commands in order, enforcing max depth.
pub fn eval_program(interp: &mut Interpreter, program: &Program) -> EvalResult {
    interp.enter_depth()?;
    let outcome = run_commands(interp, program);
    interp.exit_depth();
    outcome
}

fn run_commands(interp: &mut Interpreter, program: &Program) -> EvalResult {
    let mut last = Flow::Value(Value::string(""));
    for command in &program.commands {
        match eval_command(interp, command) {
            Ok(Flow::Value(v)) => last = Flow::Value(v),
            Ok(other) => return Ok(other),
            Err(err) => {
                interp.record_error(Rc::from(program.file.as_str()), command.line);
                return Err(err);
            }
        }
    }
    Ok(last)
}

/// §4.4.2: preserves intrinsic value type when the word is a single
/// `VarRef` or `SubCommand` piece; otherwise falls through to
/// `eval_word_to_string`.
pub fn eval_word(interp: &mut Interpreter, word: &Word) -> EvalResult {
    if word.pieces.len() == 1 {
        match &word.pieces[0] {
            WordPiece::VarRef(name) => {
                let bound = interp.env.get_value(name)?;
                return Ok(Flow::Value(deref_one_cell(bound)?));
            }
            WordPiece::SubCommand(program) => {
                return eval_program(interp, program);
            }
            WordPiece::Literal(_) => {}
        }
    }
    eval_word_to_string(interp, word)
}

/// §4.4.2: always produces a `String`, concatenating the stringified form
/// of every piece.
pub fn eval_word_to_string(interp: &mut Interpreter, word: &Word) -> EvalResult {
    let mut buf = String::new();
    for piece in &word.pieces {
        match piece {
            WordPiece::Literal(s) => buf.push_str(s),
            WordPiece::VarRef(name) => {
                let bound = interp.env.get_value(name)?;
                buf.push_str(&deref_one_cell(bound)?.to_display_string());
            }
            WordPiece::SubCommand(program) => {
                let v = value_or_propagate!(eval_program(interp, program)?);
                buf.push_str(&v.to_display_string());
            }
        }
    }
    Ok(Flow::Value(Value::string(buf)))
}

fn deref_one_cell(v: Value) -> Result<Value> {
    match v {
        Value::Cell(_) => v.cell_get(),
        other => Ok(other),
    }
}

enum ResolvedCallee {
    /// Single-word non-callable fallback: the bare string/value itself.
    Literal(Value),
    Special(NativeProc),
    Callable(Value),
}

/// §4.4.3 steps 2-5: classify the evaluated first word of a command.
fn resolve_callee(interp: &Interpreter, callee: &Value, word_count: usize) -> Result<ResolvedCallee> {
    if callee.is_callable() {
        return Ok(ResolvedCallee::Callable(callee.clone()));
    }
    if let Value::NativeProc(np) = callee {
        if np.is_special_form() {
            return Ok(ResolvedCallee::Special(np.clone()));
        }
    }

    if let Value::String(name) = callee {
        match interp.env.get_value(name) {
            Ok(looked_up) => {
                if looked_up.is_callable() {
                    return Ok(ResolvedCallee::Callable(looked_up));
                }
                if let Value::NativeProc(np) = &looked_up {
                    if np.is_special_form() {
                        return Ok(ResolvedCallee::Special(np.clone()));
                    }
                }
                if word_count == 1 {
                    Ok(ResolvedCallee::Literal(looked_up))
                } else {
                    Err(Error::generic(format!("value bound to '{name}' is not callable")))
                }
            }
            Err(_) => {
                if word_count == 1 {
                    Ok(ResolvedCallee::Literal(callee.clone()))
                } else {
                    Err(Error::unbound(name.to_string()))
                }
            }
        }
    } else if word_count == 1 {
        Ok(ResolvedCallee::Literal(callee.clone()))
    } else {
        Err(Error::type_mismatch("callable", callee.type_name()))
    }
}

/// §4.4.3: evaluate and dispatch one command.
fn eval_command(interp: &mut Interpreter, command: &Command) -> EvalResult {
    if command.words.is_empty() {
        return Ok(Flow::Value(Value::string("")));
    }

    let callee = value_or_propagate!(eval_word(interp, &command.words[0])?);
    let rest = &command.words[1..];

    crate::trace!("dispatch {:?} ({} arg word(s))", callee.type_name(), rest.len());
    match resolve_callee(interp, &callee, command.words.len())? {
        ResolvedCallee::Literal(v) => Ok(Flow::Value(v)),
        ResolvedCallee::Special(native) => match native.kind {
            NativeKind::SpecialForm(func) => func(interp, rest),
            NativeKind::Proc(_) => unreachable!("special-form resolution only yields SpecialForm"),
        },
        ResolvedCallee::Callable(callable) => {
            let mut args = Vec::with_capacity(rest.len());
            for word in rest {
                args.push(value_or_propagate!(eval_word(interp, word)?));
            }
            call_value(interp, &callable, &args)
        }
    }
}

/// Calls a resolved callable (`UserProc` or `NativeProc::Proc`) with
/// already-evaluated arguments. Never called with a special form: the
/// dispatcher routes those to `func(interp, raw_words)` directly.
pub fn call_value(interp: &mut Interpreter, callee: &Value, args: &[Value]) -> EvalResult {
    match callee {
        Value::NativeProc(np) => match np.kind {
            NativeKind::Proc(f) => Ok(Flow::Value(f(interp, args)?)),
            NativeKind::SpecialForm(_) => Err(Error::generic(
                "special forms cannot be invoked with pre-evaluated arguments",
            )),
        },
        Value::UserProc(proc) => call_user_proc(interp, proc, args),
        _ => Err(Error::type_mismatch("proc", callee.type_name())),
    }
}

/// §4.5.2: call a user procedure.
fn call_user_proc(interp: &mut Interpreter, proc: &Rc<UserProc>, args: &[Value]) -> EvalResult {
    if args.len() != proc.params.len() {
        return Err(Error::arity(proc.params.len().to_string(), args.len()));
    }

    let mut frame = Frame::new(None);
    for upvalue in &proc.upvalues {
        frame.set_local(upvalue.name.clone(), upvalue.value.clone());
    }
    for (param, arg) in proc.params.iter().zip(args.iter()) {
        frame.set_local(param.clone(), arg.clone());
    }

    let saved_frame = interp.env.swap_frame(Handle::new(frame));
    let saved_ns = proc
        .namespace
        .as_ref()
        .map(|ns| interp.env.swap_namespace(ns.clone()));

    let result = eval_program(interp, &proc.body);

    interp.env.swap_frame(saved_frame);
    if let Some(saved_ns) = saved_ns {
        interp.env.swap_namespace(saved_ns);
    }

    match result {
        Ok(Flow::Return(v)) => Ok(Flow::Value(v)),
        other => other,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scanner::parse_program;

    #[test]
    fn basic_substitution() {
        let mut interp = Interpreter::new();
        interp.register_core();
        let program = parse_program("let x 10", "test").unwrap();
        interp.eval_program(&program).unwrap();
        assert_eq!(interp.get("x").unwrap().as_int().unwrap(), 10);
    }

    #[test]
    fn single_word_literal_yields_itself() {
        let mut interp = Interpreter::new();
        let program = parse_program("hello", "test").unwrap();
        let flow = interp.eval_program(&program).unwrap();
        match flow {
            Flow::Value(v) => assert_eq!(&*v.to_display_string(), "hello"),
            _ => panic!("expected a value"),
        }
    }

    #[test]
    fn depth_guard_rejects_runaway_recursion() {
        let mut interp = Interpreter::with_max_depth(8);
        interp.register_core();
        let program = parse_program(
            "proc loopy {} { loopy }\nloopy",
            "test",
        )
        .unwrap();
        let err = interp.eval_program(&program).unwrap_err();
        assert!(matches!(err, Error::DepthExceeded { .. }));
    }
}
