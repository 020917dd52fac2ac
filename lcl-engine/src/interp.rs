//! The interpreter: one environment, last-result slot, error location,
//! call depth (§3.5).

use std::path::Path;
use std::rc::Rc;

use smol_str::SmolStr;

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::eval::{self, EvalResult, Flow};
use crate::limits::DEFAULT_MAX_DEPTH;
use crate::program::Program;
use crate::scanner::parse_program;
use crate::value::{NativeFn, NativeProc, SpecialFn, Value};

pub struct Interpreter {
    pub env: Environment,
    pub last_result: Value,
    err_file: Option<Rc<str>>,
    err_line: u32,
    depth: usize,
    max_depth: usize,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Interpreter {
            env: Environment::new(),
            last_result: Value::string(""),
            err_file: None,
            err_line: 0,
            depth: 0,
            max_depth,
        }
    }

    /// Registers the built-in command library (`lcl_register_core`).
    pub fn register_core(&mut self) {
        crate::builtins::register_core(self);
    }

    pub fn eval_str(&mut self, src: &str) -> EvalResult {
        let program = parse_program(src, "<string>")?;
        self.run(&program)
    }

    pub fn eval_file(&mut self, path: &Path) -> EvalResult {
        let src = std::fs::read_to_string(path)
            .map_err(|e| Error::generic(format!("failed to read {}: {e}", path.display())))?;
        let file: SmolStr = SmolStr::new(path.to_string_lossy().as_ref());
        let program = parse_program(&src, file)?;
        self.run(&program)
    }

    /// Evaluates an already-parsed program, converting a top-level `RETURN`
    /// to `OK` the same way a procedure call boundary would (§4.5.3).
    pub fn eval_program(&mut self, program: &Program) -> EvalResult {
        self.run(program)
    }

    fn run(&mut self, program: &Program) -> EvalResult {
        self.err_file = None;
        self.err_line = 0;
        let outcome = eval::eval_program(self, program);
        if let Ok(flow) = &outcome {
            if let Flow::Value(v) = flow {
                self.last_result = v.clone();
            }
        }
        match outcome {
            Ok(Flow::Return(v)) => Ok(Flow::Value(v)),
            other => other,
        }
    }

    pub fn define(&mut self, name: &str, value: Value) {
        self.env
            .global_ns
            .borrow_mut()
            .map
            .insert(SmolStr::new(name), value);
    }

    pub fn get(&self, name: &str) -> Result<Value> {
        self.env.get_value(name)
    }

    pub fn register_proc(&mut self, name: &str, f: NativeFn) {
        self.define(name, Value::NativeProc(NativeProc::new_proc(name, f)));
    }

    pub fn register_special(&mut self, name: &str, f: SpecialFn) {
        self.define(name, Value::NativeProc(NativeProc::new_special(name, f)));
    }

    /// Calls a callable value with already-evaluated arguments (§4.5.3).
    /// Special forms cannot be invoked this way.
    pub fn call(&mut self, callee: &Value, args: &[Value]) -> Result<Value> {
        match eval::call_value(self, callee, args)? {
            Flow::Value(v) => Ok(v),
            Flow::Return(v) => Ok(v),
            Flow::Break | Flow::Continue => {
                Err(Error::generic("break/continue escaped outside of a loop"))
            }
        }
    }

    pub fn error_location(&self) -> Option<(Rc<str>, u32)> {
        self.err_file.clone().map(|f| (f, self.err_line))
    }

    pub(crate) fn record_error(&mut self, file: Rc<str>, line: u32) {
        if self.err_file.is_none() {
            self.err_file = Some(file);
            self.err_line = line;
        }
    }

    pub(crate) fn enter_depth(&mut self) -> Result<()> {
        if self.depth >= self.max_depth {
            return Err(Error::DepthExceeded {
                max_depth: self.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn exit_depth(&mut self) {
        self.depth -= 1;
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
