use crate::error::{Error, Result};
use crate::eval::{self, value_or_propagate, EvalResult, Flow};
use crate::interp::Interpreter;
use crate::program::Word;
use crate::value::Value;

pub fn register(interp: &mut Interpreter) {
    interp.register_proc("let", let_);
    interp.register_proc("ref", ref_);
    interp.register_proc("getvar", getvar);
    interp.register_special("var", var);
    interp.register_special("set!", set_bang);
    interp.register_special("binding-cell", binding_cell);
    interp.register_special("same-binding?", same_binding);
}

/// `let name value` — binds `value` as-is into the current frame, returns it.
fn let_(interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity(2usize.to_string(), args.len()));
    }
    let name = args[0].to_display_string();
    interp.env.let_binding(name.as_ref(), args[1].clone());
    Ok(args[1].clone())
}

/// `ref value` — wraps `value` in a fresh `Cell`.
fn ref_(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::arity(1usize.to_string(), args.len()));
    }
    Ok(Value::new_cell(args[0].clone()))
}

/// `getvar name` — looks up `name`, dereferencing one `Cell` layer.
fn getvar(interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::arity(1usize.to_string(), args.len()));
    }
    let name = args[0].to_display_string();
    let bound = interp.env.get_value(&name)?;
    if bound.is_cell() {
        bound.cell_get()
    } else {
        Ok(bound)
    }
}

/// `var name value` — binds `value` wrapped in a `Cell`, returns empty string.
fn var(interp: &mut Interpreter, args: &[Word]) -> EvalResult {
    if args.len() != 2 {
        return Err(Error::arity(2usize.to_string(), args.len()));
    }
    let name = value_or_propagate!(eval::eval_word_to_string(interp, &args[0])?).to_display_string();
    let value = value_or_propagate!(eval::eval_word(interp, &args[1])?);
    interp.env.var_binding(name.as_ref(), value);
    Ok(Flow::Value(Value::string("")))
}

/// `set! name value` — assigns into an existing `Cell` binding.
fn set_bang(interp: &mut Interpreter, args: &[Word]) -> EvalResult {
    if args.len() != 2 {
        return Err(Error::arity(2usize.to_string(), args.len()));
    }
    let name = value_or_propagate!(eval::eval_word_to_string(interp, &args[0])?).to_display_string();
    let value = value_or_propagate!(eval::eval_word(interp, &args[1])?);
    interp.env.set_bang(&name, value.clone())?;
    Ok(Flow::Value(value))
}

/// `binding-cell name` — returns the raw binding, which must be a `Cell`.
fn binding_cell(interp: &mut Interpreter, args: &[Word]) -> EvalResult {
    if args.len() != 1 {
        return Err(Error::arity(1usize.to_string(), args.len()));
    }
    let name = value_or_propagate!(eval::eval_word_to_string(interp, &args[0])?).to_display_string();
    let binding = interp.env.get_value(&name)?;
    if !binding.is_cell() {
        return Err(Error::type_mismatch("cell", binding.type_name()));
    }
    Ok(Flow::Value(binding))
}

/// `same-binding? name1 name2` — pointer-equality of two raw `Cell` bindings.
fn same_binding(interp: &mut Interpreter, args: &[Word]) -> EvalResult {
    if args.len() != 2 {
        return Err(Error::arity(2usize.to_string(), args.len()));
    }
    let name1 = value_or_propagate!(eval::eval_word_to_string(interp, &args[0])?).to_display_string();
    let name2 = value_or_propagate!(eval::eval_word_to_string(interp, &args[1])?).to_display_string();
    let b1 = interp.env.get_value(&name1)?;
    let b2 = interp.env.get_value(&name2)?;
    let h1 = b1.as_cell_handle()?;
    let h2 = b2.as_cell_handle()?;
    Ok(Flow::Value(Value::Int(h1.ptr_eq(&h2) as i64)))
}
