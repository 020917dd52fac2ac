use std::rc::Rc;

use smol_str::SmolStr;

use super::control::words_to_list;
use super::compile_body;
use crate::error::{Error, Result};
use crate::eval::{self, value_or_propagate, EvalResult, Flow};
use crate::frame::Frame;
use crate::handle::Handle;
use crate::interp::Interpreter;
use crate::program::Word;
use crate::value::{UserProc, Value};

pub fn register(interp: &mut Interpreter) {
    interp.register_special("lambda", lambda);
    interp.register_special("proc", proc_);
    interp.register_special("eval", eval_);
    interp.register_special("load", load);
    interp.register_proc("subst", subst);
    interp.register_special("namespace", namespace);
}

/// `lambda params body` — builds an anonymous `UserProc` with a flat
/// closure over whatever free names currently resolve (§4.5.1).
fn lambda(interp: &mut Interpreter, args: &[Word]) -> EvalResult {
    if args.len() != 2 {
        return Err(Error::arity(2usize.to_string(), args.len()));
    }
    let proc = build_lambda(interp, &args[0], &args[1], "<lambda>")?;
    Ok(Flow::Value(Value::UserProc(Rc::new(proc))))
}

/// `proc name params body` — same construction as `lambda`, but named and
/// immediately bound into the current frame. Returns an empty string.
fn proc_(interp: &mut Interpreter, args: &[Word]) -> EvalResult {
    if args.len() != 3 {
        return Err(Error::arity(3usize.to_string(), args.len()));
    }
    let name = value_or_propagate!(eval::eval_word_to_string(interp, &args[0])?).to_display_string();
    let mut proc = build_lambda(interp, &args[1], &args[2], "<proc>")?;
    proc.name = SmolStr::new(name.as_ref());
    let value = Value::UserProc(Rc::new(proc));
    interp.env.let_binding(name.as_ref(), value);
    Ok(Flow::Value(Value::string("")))
}

fn build_lambda(interp: &mut Interpreter, params: &Word, body: &Word, label: &str) -> Result<UserProc> {
    let params_src =
        value_or_propagate_result(eval::eval_word_to_string(interp, params)?)?.to_display_string();
    let params: Vec<SmolStr> = words_to_list(&params_src)
        .into_iter()
        .map(|v| SmolStr::new(v.to_display_string().as_ref()))
        .collect();

    let body_src =
        value_or_propagate_result(eval::eval_word_to_string(interp, body)?)?.to_display_string();
    let body_program = compile_body(&body_src, label)?;

    let upvalues = crate::closure::build_upvalues(&interp.env, &body_program, &params);

    let namespace = if interp.env.current_ns.ptr_eq(&interp.env.global_ns) {
        None
    } else {
        Some(interp.env.current_ns.clone())
    };

    Ok(UserProc {
        name: SmolStr::default(),
        params,
        body: Rc::new(body_program),
        upvalues,
        namespace,
    })
}

/// `build_lambda` needs a `Value`, not a `Flow`. Its params/body words are
/// always stringified, so this only sees anything other than `Flow::Value`
/// if a subcommand embedded in that source text itself performed a
/// non-local exit (e.g. a literal `[return ...]` used while constructing
/// the param-list text) — a pathological case the reference never handles
/// specially either; treat it as a hard error rather than silently
/// dropping the flow.
fn value_or_propagate_result(flow: Flow) -> Result<Value> {
    match flow {
        Flow::Value(v) => Ok(v),
        _ => Err(Error::generic(
            "lambda/proc: params or body text triggered a non-local exit",
        )),
    }
}

/// `eval script...` — stringifies all arguments (joined by a single space
/// when more than one is given), compiles, and evaluates in the current
/// frame, letting `RETURN`/`BREAK`/`CONTINUE` propagate unconverted.
fn eval_(interp: &mut Interpreter, args: &[Word]) -> EvalResult {
    if args.is_empty() {
        return Err(Error::arity("1+", 0));
    }
    let src = if args.len() == 1 {
        value_or_propagate!(eval::eval_word_to_string(interp, &args[0])?).to_display_string().to_string()
    } else {
        let mut parts = Vec::with_capacity(args.len());
        for word in args {
            parts.push(
                value_or_propagate!(eval::eval_word_to_string(interp, word)?)
                    .to_display_string()
                    .to_string(),
            );
        }
        parts.join(" ")
    };
    let program = compile_body(&src, "<eval>")?;
    eval::eval_program(interp, &program)
}

/// `load path` — reads `path`, compiles it labeled with the path itself,
/// and evaluates it in the current frame.
fn load(interp: &mut Interpreter, args: &[Word]) -> EvalResult {
    if args.len() != 1 {
        return Err(Error::arity(1usize.to_string(), args.len()));
    }
    let path = value_or_propagate!(eval::eval_word_to_string(interp, &args[0])?).to_display_string();
    let src = std::fs::read_to_string(path.as_ref())
        .map_err(|e| Error::generic(format!("failed to read {path}: {e}")))?;
    let program = compile_body(&src, path.as_ref())?;
    eval::eval_program(interp, &program)
}

fn is_name_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_name_char(c: u8) -> bool {
    c == b'_' || c == b':' || c.is_ascii_alphanumeric()
}

fn utf8_char_len(lead: u8) -> usize {
    if lead & 0x80 == 0 {
        1
    } else if lead & 0xE0 == 0xC0 {
        2
    } else if lead & 0xF0 == 0xE0 {
        3
    } else if lead & 0xF8 == 0xF0 {
        4
    } else {
        1
    }
}

/// `subst string` — its own small substitution pass over the stringified
/// argument: backslash escapes, `$name`/`${name}` variable refs, and
/// `[...]` bracketed subcommand evaluation. Unlike `eval`/`load`, a nested
/// subcommand here that doesn't complete as a plain value (including a
/// `RETURN`) fails `subst` outright.
fn subst(interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::arity(1usize.to_string(), args.len()));
    }
    let src = args[0].to_display_string();
    let out = subst_string(interp, &src)?;
    Ok(Value::string(out))
}

fn subst_string(interp: &mut Interpreter, src: &str) -> Result<String> {
    let bytes = src.as_bytes();
    let mut i = 0usize;
    let mut out = String::new();

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                if let Some(&n) = bytes.get(i + 1) {
                    let rep = match n {
                        b'n' => Some('\n'),
                        b't' => Some('\t'),
                        b'r' => Some('\r'),
                        b'\\' => Some('\\'),
                        b'[' => Some('['),
                        b']' => Some(']'),
                        b'$' => Some('$'),
                        b'{' => Some('{'),
                        b'}' => Some('}'),
                        b'"' => Some('"'),
                        _ => None,
                    };
                    match rep {
                        Some(ch) => {
                            out.push(ch);
                            i += 2;
                        }
                        None => {
                            out.push('\\');
                            out.push(n as char);
                            i += 2;
                        }
                    }
                } else {
                    out.push('\\');
                    i += 1;
                }
            }
            b'$' => {
                if bytes.get(i + 1) == Some(&b'{') {
                    let name_start = i + 2;
                    let mut j = name_start;
                    while j < bytes.len() && bytes[j] != b'}' {
                        j += 1;
                    }
                    if j >= bytes.len() {
                        return Err(Error::UnterminatedSubstitution);
                    }
                    let name = std::str::from_utf8(&bytes[name_start..j])
                        .map_err(|_| Error::generic("subst: variable name is not valid UTF-8"))?;
                    out.push_str(&lookup_deref(interp, name)?);
                    i = j + 1;
                } else if bytes.get(i + 1).copied().map(is_name_start).unwrap_or(false) {
                    let name_start = i + 1;
                    let mut j = name_start + 1;
                    while j < bytes.len() && is_name_char(bytes[j]) {
                        j += 1;
                    }
                    let name = std::str::from_utf8(&bytes[name_start..j])
                        .map_err(|_| Error::generic("subst: variable name is not valid UTF-8"))?;
                    out.push_str(&lookup_deref(interp, name)?);
                    i = j;
                } else {
                    out.push('$');
                    i += 1;
                }
            }
            b'[' => {
                let mut depth = 1i32;
                let mut j = i + 1;
                loop {
                    if j >= bytes.len() {
                        return Err(Error::UnterminatedSubstitution);
                    }
                    match bytes[j] {
                        b'\\' if j + 1 < bytes.len() => {
                            j += 2;
                            continue;
                        }
                        b'[' => depth += 1,
                        b']' => {
                            depth -= 1;
                            if depth == 0 {
                                j += 1;
                                break;
                            }
                        }
                        _ => {}
                    }
                    j += 1;
                }
                let inner = std::str::from_utf8(&bytes[i + 1..j - 1])
                    .map_err(|_| Error::generic("subst: subcommand is not valid UTF-8"))?;
                let program = compile_body(inner, "<subst>")?;
                match eval::eval_program(interp, &program)? {
                    Flow::Value(v) => out.push_str(&v.to_display_string()),
                    _ => {
                        return Err(Error::generic(
                            "subst: nested evaluation did not complete normally",
                        ))
                    }
                }
                i = j;
            }
            b => {
                let len = utf8_char_len(b);
                let end = (i + len).min(bytes.len());
                if let Ok(s) = std::str::from_utf8(&bytes[i..end]) {
                    out.push_str(s);
                }
                i = end;
            }
        }
    }

    Ok(out)
}

fn lookup_deref(interp: &Interpreter, name: &str) -> Result<std::rc::Rc<str>> {
    let v = interp.env.get_value(name)?;
    let v = if v.is_cell() { v.cell_get()? } else { v };
    Ok(v.to_display_string())
}

/// `namespace eval path body` — the only subcommand `namespace` supports.
fn namespace(interp: &mut Interpreter, args: &[Word]) -> EvalResult {
    if args.is_empty() {
        return Err(Error::arity("3", 0));
    }
    let subcmd = value_or_propagate!(eval::eval_word_to_string(interp, &args[0])?).to_display_string();
    if subcmd.as_ref() != "eval" {
        return Err(Error::generic(format!(
            "namespace: unknown subcommand '{subcmd}'"
        )));
    }
    if args.len() != 3 {
        return Err(Error::arity(3usize.to_string(), args.len()));
    }
    let path = value_or_propagate!(eval::eval_word_to_string(interp, &args[1])?).to_display_string();
    let ns = resolve_or_create_ns_path(interp, &path)?;
    let body_src = value_or_propagate!(eval::eval_word_to_string(interp, &args[2])?).to_display_string();
    let program = compile_body(&body_src, "<namespace eval>")?;

    let new_frame = Frame::new_namespace(Some(interp.env.frame.clone()), ns.as_namespace_handle()?);
    let saved_frame = interp.env.swap_frame(Handle::new(new_frame));
    let result = eval::eval_program(interp, &program);
    interp.env.swap_frame(saved_frame);
    result
}

fn resolve_or_create_ns_path(interp: &mut Interpreter, path: &str) -> Result<Value> {
    match Value::split_qualified(path) {
        None => get_or_create_ns_segment(interp, path),
        Some((first, rest)) => {
            let mut current = get_or_create_ns_segment(interp, first)?;
            let mut remaining = rest;
            loop {
                match Value::split_qualified(remaining) {
                    Some((seg, tail)) => {
                        current = get_or_create_child(&current, seg)?;
                        remaining = tail;
                    }
                    None => return get_or_create_child(&current, remaining),
                }
            }
        }
    }
}

fn get_or_create_ns_segment(interp: &mut Interpreter, name: &str) -> Result<Value> {
    match interp.env.get_value(name) {
        Ok(v) if v.is_namespace() => Ok(v),
        Ok(v) => Err(Error::type_mismatch("namespace", v.type_name())),
        Err(_) => {
            let ns = Value::new_namespace(name);
            interp.env.let_binding(name, ns.clone());
            Ok(ns)
        }
    }
}

fn get_or_create_child(parent: &Value, name: &str) -> Result<Value> {
    if let Some(existing) = parent.ns_get(name)? {
        return if existing.is_namespace() {
            Ok(existing)
        } else {
            Err(Error::type_mismatch("namespace", existing.type_name()))
        };
    }
    let qname = format!("{}::{}", parent.ns_qname()?, name);
    let child = Value::new_namespace(qname);
    parent.ns_def(name, child.clone())?;
    Ok(child)
}
