use crate::interp::Interpreter;
use crate::value::Value;

pub fn register(interp: &mut Interpreter) {
    interp.register_proc("puts", puts);
}

/// `puts [value...]` — joins all arguments with a single space and writes
/// them to stdout, always followed by a newline (`c_puts`).
fn puts(_interp: &mut Interpreter, args: &[Value]) -> crate::error::Result<Value> {
    let mut line = String::new();
    for (idx, arg) in args.iter().enumerate() {
        if idx > 0 {
            line.push(' ');
        }
        line.push_str(&arg.to_display_string());
    }
    println!("{line}");
    Ok(Value::string(""))
}
