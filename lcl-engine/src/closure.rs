//! Flat-closure construction (§4.5.1).
//!
//! A `lambda`/`proc` body is scanned for every free `VarRef` name (recursing
//! into subcommands), excluding parameter names. Each name still bound in
//! the defining environment becomes an upvalue: the `Cell` itself if the
//! binding is mutable (`var`), or a plain captured value otherwise (`let`).
//! Names that don't resolve are left to be looked up dynamically at call
//! time — this is how globals and built-ins stay visible inside a closure
//! without being captured.
//!
//! No reference to the defining frame is ever retained. That snips the
//! frame -> cell -> proc -> frame cycle described in §9.

use std::collections::HashSet;

use smol_str::SmolStr;

use crate::env::Environment;
use crate::program::{Program, Word, WordPiece};
use crate::value::Upvalue;

pub fn collect_free_names(body: &Program, params: &[SmolStr], out: &mut HashSet<SmolStr>) {
    for command in &body.commands {
        for word in &command.words {
            collect_word(word, params, out);
        }
    }
}

fn collect_word(word: &Word, params: &[SmolStr], out: &mut HashSet<SmolStr>) {
    for piece in &word.pieces {
        match piece {
            WordPiece::Literal(_) => {}
            WordPiece::VarRef(name) => {
                if !params.iter().any(|p| p == name) {
                    out.insert(name.clone());
                }
            }
            WordPiece::SubCommand(program) => collect_free_names(program, params, out),
        }
    }
}

/// Builds the upvalue list for a new closure, per §4.5.1.
pub fn build_upvalues(env: &Environment, body: &Program, params: &[SmolStr]) -> Vec<Upvalue> {
    let mut names = HashSet::new();
    collect_free_names(body, params, &mut names);

    let mut upvalues = Vec::with_capacity(names.len());
    for name in names {
        if let Ok(value) = env.get_value(&name) {
            let is_cell = value.is_cell();
            upvalues.push(Upvalue {
                name,
                is_cell,
                value,
            });
        }
    }
    upvalues
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::program::{Command, Program};

    #[test]
    fn excludes_parameters() {
        let body = Program::new(
            "test",
            vec![Command {
                line: 1,
                words: vec![
                    Word::literal("puts", false, false),
                    Word {
                        pieces: vec![WordPiece::VarRef(SmolStr::new("x"))],
                        quoted: false,
                        braced: false,
                    },
                    Word {
                        pieces: vec![WordPiece::VarRef(SmolStr::new("y"))],
                        quoted: false,
                        braced: false,
                    },
                ],
            }],
        );
        let params = vec![SmolStr::new("x")];
        let mut out = HashSet::new();
        collect_free_names(&body, &params, &mut out);
        assert!(out.contains("y"));
        assert!(!out.contains("x"));
    }
}
