use super::{compile_body, truthy};
use crate::error::{Error, Result};
use crate::eval::{self, value_or_propagate, EvalResult, Flow};
use crate::interp::Interpreter;
use crate::program::Word;
use crate::value::Value;

pub fn register(interp: &mut Interpreter) {
    interp.register_special("if", if_);
    interp.register_special("while", while_);
    interp.register_special("for", for_);
    interp.register_special("foreach", foreach);
    interp.register_special("break", break_);
    interp.register_special("continue", continue_);
    interp.register_special("return", return_);
}

/// `if cond body [elseif cond body]... [else body]` (§4.6 `if`).
///
/// Every clause body is re-stringified and compiled as a fresh program and
/// run in the *current* frame — `if` never opens a new scope.
fn if_(interp: &mut Interpreter, args: &[Word]) -> EvalResult {
    if args.len() < 2 {
        return Err(Error::arity("2+", args.len()));
    }

    let mut i = 0;
    loop {
        if i >= args.len() {
            break;
        }
        if i > 0 {
            let keyword =
                value_or_propagate!(eval::eval_word_to_string(interp, &args[i])?).to_display_string();
            match keyword.as_ref() {
                "else" => {
                    if i + 1 >= args.len() {
                        return Err(Error::generic("'if': 'else' requires a body"));
                    }
                    return run_body(interp, &args[i + 1], "<if-else>");
                }
                "elseif" => {
                    i += 1;
                    if i + 1 >= args.len() {
                        return Err(Error::generic("'if': 'elseif' requires a condition and body"));
                    }
                }
                other => {
                    return Err(Error::generic(format!(
                        "'if': expected 'elseif' or 'else', found '{other}'"
                    )));
                }
            }
        }

        if i + 1 >= args.len() {
            break;
        }

        let cond = value_or_propagate!(eval::eval_word(interp, &args[i])?);
        if truthy(&cond) {
            return run_body(interp, &args[i + 1], "<if>");
        }
        i += 2;
    }

    Ok(Flow::Value(Value::string("")))
}

fn run_body(interp: &mut Interpreter, body: &Word, label: &str) -> EvalResult {
    let src = value_or_propagate!(eval::eval_word_to_string(interp, body)?).to_display_string();
    let program = compile_body(&src, label)?;
    eval::eval_program(interp, &program)
}

/// `while test body` (§4.6 `while`).
fn while_(interp: &mut Interpreter, args: &[Word]) -> EvalResult {
    if args.len() != 2 {
        return Err(Error::arity(2usize.to_string(), args.len()));
    }
    let test_word = &args[0];
    let body_src = value_or_propagate!(eval::eval_word_to_string(interp, &args[1])?).to_display_string();
    let body_prog = compile_body(&body_src, "<while>")?;

    let test_prog = if test_word.braced {
        let src =
            value_or_propagate!(eval::eval_word_to_string(interp, test_word)?).to_display_string();
        Some(compile_body(&src, "<while-test>")?)
    } else {
        None
    };

    let mut last = Value::string("");
    loop {
        let cond = match &test_prog {
            Some(p) => value_or_propagate!(eval::eval_program(interp, p)?),
            None => value_or_propagate!(eval::eval_word(interp, test_word)?),
        };
        if !truthy(&cond) {
            break;
        }

        match eval::eval_program(interp, &body_prog)? {
            Flow::Value(v) => last = v,
            Flow::Break => break,
            Flow::Continue => continue,
            Flow::Return(v) => return Ok(Flow::Return(v)),
        }
    }
    Ok(Flow::Value(last))
}

/// `for start test next body` (§4.6 `for`).
fn for_(interp: &mut Interpreter, args: &[Word]) -> EvalResult {
    if args.len() != 4 {
        return Err(Error::arity(4usize.to_string(), args.len()));
    }
    let start_src =
        value_or_propagate!(eval::eval_word_to_string(interp, &args[0])?).to_display_string();
    let start_prog = compile_body(&start_src, "<for-start>")?;
    let test_word = &args[1];
    let next_src =
        value_or_propagate!(eval::eval_word_to_string(interp, &args[2])?).to_display_string();
    let next_prog = compile_body(&next_src, "<for-next>")?;
    let body_src =
        value_or_propagate!(eval::eval_word_to_string(interp, &args[3])?).to_display_string();
    let body_prog = compile_body(&body_src, "<for-body>")?;

    let test_prog = if test_word.braced {
        let src =
            value_or_propagate!(eval::eval_word_to_string(interp, test_word)?).to_display_string();
        Some(compile_body(&src, "<for-test>")?)
    } else {
        None
    };

    match eval::eval_program(interp, &start_prog)? {
        Flow::Value(_) => {}
        other => return Ok(other),
    }

    let mut last = Value::string("");
    loop {
        let cond = match &test_prog {
            Some(p) => value_or_propagate!(eval::eval_program(interp, p)?),
            None => value_or_propagate!(eval::eval_word(interp, test_word)?),
        };
        if !truthy(&cond) {
            break;
        }

        match eval::eval_program(interp, &body_prog)? {
            Flow::Value(v) => {
                last = v;
                match eval::eval_program(interp, &next_prog)? {
                    Flow::Value(_) => {}
                    other => return Ok(other),
                }
            }
            Flow::Break => break,
            Flow::Continue => match eval::eval_program(interp, &next_prog)? {
                Flow::Value(_) | Flow::Continue => continue,
                other => return Ok(other),
            },
            Flow::Return(v) => return Ok(Flow::Return(v)),
        }
    }
    Ok(Flow::Value(last))
}

/// `foreach varname list body` (§4.6 `foreach`).
fn foreach(interp: &mut Interpreter, args: &[Word]) -> EvalResult {
    if args.len() != 3 {
        return Err(Error::arity(3usize.to_string(), args.len()));
    }
    let varname =
        value_or_propagate!(eval::eval_word_to_string(interp, &args[0])?).to_display_string();
    let list_val = value_or_propagate!(eval::eval_word(interp, &args[1])?);
    let items: Vec<Value> = if list_val.is_list() {
        list_val.list_items()?.to_vec()
    } else {
        words_to_list(&list_val.to_display_string())
    };
    let body_src =
        value_or_propagate!(eval::eval_word_to_string(interp, &args[2])?).to_display_string();
    let body_prog = compile_body(&body_src, "<foreach>")?;

    let mut last = Value::string("");
    for item in items {
        interp.env.let_binding(varname.as_ref(), item);
        match eval::eval_program(interp, &body_prog)? {
            Flow::Value(v) => last = v,
            Flow::Break => break,
            Flow::Continue => continue,
            Flow::Return(v) => return Ok(Flow::Return(v)),
        }
    }
    Ok(Flow::Value(last))
}

/// A bare whitespace split used as the "C-words" list fallback
/// (`lcl_list_new_from_cwords`): no quoting, no brace-awareness.
pub(crate) fn words_to_list(s: &str) -> Vec<Value> {
    s.split(|c: char| matches!(c, ' ' | '\t' | '\n' | '\r'))
        .filter(|w| !w.is_empty())
        .map(Value::string)
        .collect()
}

fn break_(_interp: &mut Interpreter, args: &[Word]) -> EvalResult {
    if !args.is_empty() {
        return Err(Error::arity(0usize.to_string(), args.len()));
    }
    Ok(Flow::Break)
}

fn continue_(_interp: &mut Interpreter, args: &[Word]) -> EvalResult {
    if !args.is_empty() {
        return Err(Error::arity(0usize.to_string(), args.len()));
    }
    Ok(Flow::Continue)
}

/// `return [value]` — 0 args returns an empty string, 1 arg returns that
/// value preserving type. Anything more is an arity error (a deliberate
/// tightening of the reference's silent-ignore behavior; see DESIGN.md).
fn return_(interp: &mut Interpreter, args: &[Word]) -> EvalResult {
    match args.len() {
        0 => Ok(Flow::Return(Value::string(""))),
        1 => {
            let v = value_or_propagate!(eval::eval_word(interp, &args[0])?);
            Ok(Flow::Return(v))
        }
        n => Err(Error::arity("0 or 1", n)),
    }
}

