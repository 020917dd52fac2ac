use crate::error::{Error, Result};
use crate::interp::Interpreter;
use crate::value::Value;

pub fn register(interp: &mut Interpreter) {
    interp.register_proc("+", add);
    interp.register_proc("-", sub);
    interp.register_proc("*", mul);
    interp.register_proc("/", div);
    interp.register_proc("%", modulo);
    interp.register_proc("<", lt);
    interp.register_proc("<=", le);
    interp.register_proc(">", gt);
    interp.register_proc(">=", ge);
    interp.register_proc("==", eq);
    interp.register_proc("!=", ne);
    interp.register_proc("same?", same);
    interp.register_proc("not-same?", not_same);
    interp.register_proc("cell?", is_cell);
}

/// `+ [n...]` — always accumulates and yields a `float` (`c_add`).
fn add(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let mut acc = 0.0;
    for a in args {
        acc += a.as_float()?;
    }
    Ok(Value::Float(acc))
}

/// `- a b...` — `a` minus every subsequent argument, as a `float`.
fn sub(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() < 2 {
        return Err(Error::arity("2+", args.len()));
    }
    let mut acc = args[0].as_float()?;
    for a in &args[1..] {
        acc -= a.as_float()?;
    }
    Ok(Value::Float(acc))
}

/// `* [n...]` — always accumulates and yields a `float` (`c_mul`).
fn mul(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let mut acc = 1.0;
    for a in args {
        acc *= a.as_float()?;
    }
    Ok(Value::Float(acc))
}

/// `/ a b` — float division, exactly two arguments.
fn div(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity(2usize.to_string(), args.len()));
    }
    let a = args[0].as_float()?;
    let b = args[1].as_float()?;
    if b == 0.0 {
        return Err(Error::DivideByZero);
    }
    Ok(Value::Float(a / b))
}

/// `% a b` — integer modulo, exactly two arguments.
fn modulo(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity(2usize.to_string(), args.len()));
    }
    let a = args[0].as_int()?;
    let b = args[1].as_int()?;
    if b == 0 {
        return Err(Error::DivideByZero);
    }
    Ok(Value::Int(a % b))
}

fn compare(args: &[Value], op: impl Fn(f64, f64) -> bool) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity(2usize.to_string(), args.len()));
    }
    let a = args[0].as_float()?;
    let b = args[1].as_float()?;
    Ok(Value::Int(op(a, b) as i64))
}

fn lt(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    compare(args, |a, b| a < b)
}
fn le(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    compare(args, |a, b| a <= b)
}
fn gt(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    compare(args, |a, b| a > b)
}
fn ge(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    compare(args, |a, b| a >= b)
}

fn eq(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity(2usize.to_string(), args.len()));
    }
    Ok(Value::Int(args[0].loose_eq(&args[1])? as i64))
}

fn ne(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity(2usize.to_string(), args.len()));
    }
    Ok(Value::Int(!args[0].loose_eq(&args[1])? as i64))
}

fn same(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity(2usize.to_string(), args.len()));
    }
    Ok(Value::Int(args[0].identical(&args[1]) as i64))
}

fn not_same(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity(2usize.to_string(), args.len()));
    }
    Ok(Value::Int(!args[0].identical(&args[1]) as i64))
}

fn is_cell(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::arity(1usize.to_string(), args.len()));
    }
    Ok(Value::Int(args[0].is_cell() as i64))
}
