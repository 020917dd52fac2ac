//! Single-pass lexer/parser (§4.2).
//!
//! There is no separate token stream: `parse_command` walks the byte
//! stream directly, `scan_word` builds one `Word` at a time out of
//! `WordPiece`s. Byte-level scanning (rather than `char`-level) matches the
//! reference scanner; every delimiter it tests for is ASCII, so slicing at
//! the offsets this produces never lands inside a multi-byte UTF-8
//! sequence.

use smol_str::SmolStr;

use crate::error::{Error, Result};
use crate::program::{Command, Program, Word, WordPiece};

fn is_name_char(c: u8) -> bool {
    c == b'_' || c == b':' || c.is_ascii_alphanumeric()
}

fn is_name_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

#[derive(Default)]
struct WordBuilder {
    pieces: Vec<WordPiece>,
}

impl WordBuilder {
    fn push_lit(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(bytes).into_owned();
        if let Some(WordPiece::Literal(last)) = self.pieces.last_mut() {
            last.push_str(&text);
        } else {
            self.pieces.push(WordPiece::Literal(text));
        }
    }

    fn push_var(&mut self, name: &str) {
        self.pieces.push(WordPiece::VarRef(SmolStr::new(name)));
    }

    fn push_sub(&mut self, program: Program) {
        self.pieces.push(WordPiece::SubCommand(program));
    }

    fn finish(self, quoted: bool, braced: bool) -> Word {
        Word {
            pieces: self.pieces,
            quoted,
            braced,
        }
    }
}

struct Scanner<'src> {
    bytes: &'src [u8],
    pos: usize,
    line: u32,
    at_cmd_start: bool,
    file: SmolStr,
}

impl<'src> Scanner<'src> {
    fn new(source: &'src str, file: SmolStr) -> Self {
        Scanner {
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            at_cmd_start: true,
            file,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn parse_err(&self, message: impl Into<String>) -> Error {
        Error::parse(format!("{} (line {})", message.into(), self.line))
    }

    fn skip_cmd_ws_and_comments(&mut self) {
        loop {
            let Some(c) = self.peek() else { break };
            match c {
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'\n' => {
                    self.pos += 1;
                    self.line += 1;
                    self.at_cmd_start = true;
                }
                b'#' if self.at_cmd_start => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn skip_intra_ws(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                b' ' | b'\t' | b'\r' => self.pos += 1,
                _ => break,
            }
        }
    }

    fn scan_brace_word(&mut self) -> Result<Word> {
        let mut depth = 1i32;
        self.pos += 1;
        let start = self.pos;
        loop {
            let Some(c) = self.peek() else {
                return Err(self.parse_err("unterminated brace word"));
            };
            self.pos += 1;
            match c {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                b'\n' => self.line += 1,
                _ => {}
            }
        }
        let mut builder = WordBuilder::default();
        builder.push_lit(&self.bytes[start..self.pos - 1]);
        Ok(builder.finish(false, true))
    }

    fn scan_subcommand(&mut self) -> Result<Program> {
        let mut depth = 1i32;
        self.pos += 1;
        let begin = self.pos;
        loop {
            let Some(d) = self.peek() else {
                return Err(self.parse_err("unterminated subcommand"));
            };
            self.pos += 1;
            match d {
                b'\n' => self.line += 1,
                b'[' => depth += 1,
                b']' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                b'{' => {
                    let mut k = 1i32;
                    while k != 0 {
                        let Some(e) = self.peek() else {
                            return Err(self.parse_err("unbalanced brace inside subcommand"));
                        };
                        self.pos += 1;
                        match e {
                            b'{' => k += 1,
                            b'}' => k -= 1,
                            b'\n' => self.line += 1,
                            _ => {}
                        }
                    }
                }
                b'"' => {
                    while let Some(e) = self.peek() {
                        self.pos += 1;
                        if e == b'"' {
                            break;
                        }
                        if e == b'\\' && self.peek().is_some() {
                            self.pos += 1;
                        } else if e == b'\n' {
                            self.line += 1;
                        }
                    }
                }
                _ => {}
            }
        }
        let subsrc = std::str::from_utf8(&self.bytes[begin..self.pos - 1])
            .map_err(|_| self.parse_err("subcommand is not valid UTF-8"))?;
        parse_program(subsrc, self.file.clone())
    }

    fn scan_word(&mut self) -> Result<Option<Word>> {
        if self.peek() == Some(b'{') {
            return Ok(Some(self.scan_brace_word()?));
        }

        let mut in_quotes = false;
        let mut quoted = false;
        let mut builder = WordBuilder::default();

        if self.peek() == Some(b'"') {
            in_quotes = true;
            quoted = true;
            self.pos += 1;
        }

        let mut start = self.pos;

        loop {
            let Some(c) = self.peek() else { break };

            if !in_quotes && matches!(c, b' ' | b'\t' | b'\r' | b';' | b'\n') {
                break;
            }
            if !in_quotes && c == b']' {
                break;
            }

            if c == b'$' {
                if self.pos > start {
                    builder.push_lit(&self.bytes[start..self.pos]);
                }
                self.pos += 1;

                if self.peek() == Some(b'{') {
                    let name_start = self.pos + 1;
                    let mut j = name_start;
                    while j < self.bytes.len() && self.bytes[j] != b'}' {
                        if self.bytes[j] == b'\n' {
                            self.line += 1;
                        }
                        j += 1;
                    }
                    if j >= self.bytes.len() {
                        return Err(self.parse_err("unterminated ${...} variable reference"));
                    }
                    if j == name_start {
                        return Err(self.parse_err("empty ${} variable name"));
                    }
                    let name = std::str::from_utf8(&self.bytes[name_start..j])
                        .map_err(|_| self.parse_err("variable name is not valid UTF-8"))?;
                    builder.push_var(name);
                    self.pos = j + 1;
                    start = self.pos;
                } else if self.peek().map(is_name_start).unwrap_or(false) {
                    let name_start = self.pos;
                    let mut j = name_start + 1;
                    while j < self.bytes.len() && is_name_char(self.bytes[j]) {
                        j += 1;
                    }
                    let name = std::str::from_utf8(&self.bytes[name_start..j])
                        .map_err(|_| self.parse_err("variable name is not valid UTF-8"))?;
                    builder.push_var(name);
                    self.pos = j;
                    start = self.pos;
                } else {
                    builder.push_lit(b"$");
                    start = self.pos;
                }
                continue;
            }

            if c == b'[' {
                if self.pos > start {
                    builder.push_lit(&self.bytes[start..self.pos]);
                }
                let sub = self.scan_subcommand()?;
                builder.push_sub(sub);
                start = self.pos;
                continue;
            }

            if c == b'"' {
                if in_quotes {
                    if self.pos > start {
                        builder.push_lit(&self.bytes[start..self.pos]);
                    }
                    self.pos += 1;
                    in_quotes = false;
                    start = self.pos;
                    break;
                } else {
                    self.pos += 1;
                    in_quotes = true;
                    start = self.pos;
                    continue;
                }
            }

            if c == b'\\' && self.bytes.get(self.pos + 1) == Some(&b'\n') {
                if self.pos > start {
                    builder.push_lit(&self.bytes[start..self.pos]);
                }
                self.pos += 2;
                self.line += 1;
                start = self.pos;
                continue;
            }

            if c == b'\n' {
                self.line += 1;
            }
            self.pos += 1;
        }

        if self.pos > start {
            builder.push_lit(&self.bytes[start..self.pos]);
        }

        if in_quotes {
            return Err(self.parse_err("unterminated quoted word"));
        }

        let word = builder.finish(quoted, false);
        if word.pieces.is_empty() {
            Ok(None)
        } else {
            crate::trace!("scan_word -> {:?}", word.pieces);
            Ok(Some(word))
        }
    }

    fn parse_command(&mut self) -> Result<Option<Command>> {
        loop {
            self.skip_cmd_ws_and_comments();
            match self.peek() {
                None => return Ok(None),
                Some(b';') => {
                    self.pos += 1;
                    self.at_cmd_start = true;
                }
                Some(b'\n') => {
                    self.pos += 1;
                    self.line += 1;
                    self.at_cmd_start = true;
                }
                _ => break,
            }
        }

        let line = self.line;
        self.at_cmd_start = false;
        let mut words = Vec::new();
        let mut got = false;

        loop {
            match self.peek() {
                None => break,
                Some(b';') => {
                    self.pos += 1;
                    self.at_cmd_start = true;
                    break;
                }
                Some(b'\n') => {
                    self.pos += 1;
                    self.line += 1;
                    self.at_cmd_start = true;
                    break;
                }
                _ => {}
            }

            self.skip_intra_ws();
            match self.peek() {
                None => break,
                Some(b';') | Some(b'\n') => continue,
                _ => {}
            }

            match self.scan_word()? {
                Some(word) => {
                    words.push(word);
                    got = true;
                }
                None => break,
            }
        }

        self.at_cmd_start = true;
        if got {
            crate::trace!("parse_command -> {} word(s) at line {}", words.len(), line);
            Ok(Some(Command { words, line }))
        } else {
            Ok(None)
        }
    }
}

/// Parses `source` into an owned `Program`, labeling it with `file` for
/// error reporting.
pub fn parse_program(source: &str, file: impl Into<SmolStr>) -> Result<Program> {
    let file = file.into();
    let mut scanner = Scanner::new(source, file.clone());
    let mut commands = Vec::new();
    while let Some(command) = scanner.parse_command()? {
        commands.push(command);
    }
    Ok(Program::new(file, commands))
}

#[cfg(test)]
mod test {
    use super::*;

    fn words_of(program: &Program) -> Vec<&Command> {
        program.commands.iter().collect()
    }

    #[test]
    fn brace_word_is_verbatim_literal() {
        let program = parse_program("let s {oops works}", "test").unwrap();
        let cmd = &words_of(&program)[0];
        let word = &cmd.words[2];
        assert!(word.braced);
        match &word.pieces[..] {
            [WordPiece::Literal(s)] => assert_eq!(s, "oops works"),
            other => panic!("expected single literal piece, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_brace_is_parse_error() {
        let err = parse_program("let s {oops", "test").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn dollar_var_and_bracket_sub() {
        let program = parse_program("puts [+ $x 1]", "test").unwrap();
        let cmd = &words_of(&program)[0];
        assert_eq!(cmd.words.len(), 2);
        match &cmd.words[1].pieces[..] {
            [WordPiece::SubCommand(sub)] => {
                let inner = &sub.commands[0];
                assert_eq!(inner.words.len(), 3);
                match &inner.words[1].pieces[..] {
                    [WordPiece::VarRef(name)] => assert_eq!(name, "x"),
                    other => panic!("expected var ref, got {other:?}"),
                }
            }
            other => panic!("expected subcommand piece, got {other:?}"),
        }
    }

    #[test]
    fn comment_only_at_command_start() {
        let program = parse_program("# comment\nlet x 1", "test").unwrap();
        assert_eq!(program.commands.len(), 1);
        assert_eq!(program.commands[0].line, 2);
    }

    #[test]
    fn semicolon_separates_commands() {
        let program = parse_program("let x 1; let y 2", "test").unwrap();
        assert_eq!(program.commands.len(), 2);
    }
}
