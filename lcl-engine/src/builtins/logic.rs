use super::truthy;
use crate::error::{Error, Result};
use crate::interp::Interpreter;
use crate::value::Value;

pub fn register(interp: &mut Interpreter) {
    interp.register_proc("and", and);
    interp.register_proc("or", or);
    interp.register_proc("not", not);
}

fn and(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() < 2 {
        return Err(Error::arity("2+", args.len()));
    }
    Ok(Value::Int(args.iter().all(truthy) as i64))
}

fn or(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() < 2 {
        return Err(Error::arity("2+", args.len()));
    }
    Ok(Value::Int(args.iter().any(truthy) as i64))
}

fn not(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::arity(1usize.to_string(), args.len()));
    }
    Ok(Value::Int(!truthy(&args[0]) as i64))
}
