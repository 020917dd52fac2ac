//! Parsed program tree.
//!
//! Source text is parsed once into an owned tree and never re-parsed by the
//! evaluator (a special form that wants to compile a string body, e.g.
//! `eval`, does so explicitly and gets a new tree).

use smol_str::SmolStr;

/// An ordered sequence of commands plus the source file label they came
/// from, used for error reporting.
#[derive(Debug, Clone)]
pub struct Program {
    pub file: SmolStr,
    pub commands: Vec<Command>,
}

impl Program {
    pub fn new(file: impl Into<SmolStr>, commands: Vec<Command>) -> Self {
        Program {
            file: file.into(),
            commands,
        }
    }
}

/// One command: a sequence of words plus the line it started on.
#[derive(Debug, Clone)]
pub struct Command {
    pub words: Vec<Word>,
    pub line: u32,
}

/// One whitespace-delimited argument, built from one or more pieces.
///
/// `quoted` and `braced` record the surface syntax so that callers that
/// care (e.g. `eval_word`, which prefers to preserve value identity for
/// bare single-piece words) can tell how the word was written.
#[derive(Debug, Clone)]
pub struct Word {
    pub pieces: Vec<WordPiece>,
    pub quoted: bool,
    pub braced: bool,
}

impl Word {
    pub fn literal(bytes: impl Into<String>, quoted: bool, braced: bool) -> Self {
        Word {
            pieces: vec![WordPiece::Literal(bytes.into())],
            quoted,
            braced,
        }
    }
}

#[derive(Debug, Clone)]
pub enum WordPiece {
    Literal(String),
    VarRef(SmolStr),
    SubCommand(Program),
}
