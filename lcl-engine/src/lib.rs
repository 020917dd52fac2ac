mod builtins;
mod closure;
mod env;
pub mod error;
mod eval;
mod frame;
mod handle;
mod interp;
mod limits;
mod program;
mod scanner;
#[macro_use]
mod trace;
mod value;

pub use self::env::Environment;
pub use self::error::{Error, Result};
pub use self::eval::{Flow, EvalResult};
pub use self::handle::Handle;
pub use self::interp::Interpreter;
pub use self::program::{Command, Program, Word, WordPiece};
pub use self::scanner::parse_program;
pub use self::value::{NativeFn, NativeProc, SpecialFn, UserProc, Value};

/// Creates a new interpreter with the built-in command library registered.
pub fn new_interpreter() -> Interpreter {
    let mut interp = Interpreter::new();
    interp.register_core();
    interp
}
