//! Ad-hoc tracing, mirroring the teacher's lexer `trace!` macro
//! (`scheme-engine/src/lexer.rs`) but inert unless built with
//! `--cfg lcl_trace`, so ordinary builds pay nothing and release binaries
//! never write to stdout (which `puts` owns).

#[cfg(lcl_trace)]
#[macro_export]
macro_rules! trace {
    ($($arg:tt)+) => {
        eprintln!($($arg)+)
    };
}

#[cfg(not(lcl_trace))]
#[macro_export]
macro_rules! trace {
    ($($arg:tt)+) => {
        if false { eprintln!($($arg)+) }
    };
}
