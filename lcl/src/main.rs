use std::path::Path;
use std::process::ExitCode;

use lcl_engine::{Flow, Interpreter};

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let script = match args.next() {
        Some(path) => path,
        None => {
            eprintln!("usage: lcl <script>");
            return ExitCode::FAILURE;
        }
    };

    let mut interp = Interpreter::new();
    interp.register_core();

    match interp.eval_file(Path::new(&script)) {
        Ok(Flow::Value(_) | Flow::Return(_)) => ExitCode::SUCCESS,
        Ok(Flow::Break | Flow::Continue) => {
            eprintln!("error: {script}: break/continue escaped the top level");
            ExitCode::FAILURE
        }
        Err(err) => {
            match interp.error_location() {
                Some((file, line)) => eprintln!("error: {file}:{line}: {err}"),
                None => eprintln!("error: {script}: {err}"),
            }
            ExitCode::FAILURE
        }
    }
}
