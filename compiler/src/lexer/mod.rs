use alpha::{Cursor, CursorError, OpCode, Register};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

const TAG_DELIMITER: char = ':';
const CHAR_DELIMITER: char = '\'';
const BREAKPOINT: char = '*';
const BLOCK_SEPARATOR: char = ';';

/// Argument of an action as written in source, before tags are linked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    Literal(i64),
    Register(Register),
    Tag(String),
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Literal(value) => write!(f, "{}", value),
            Argument::Register(register) => write!(f, "{}", register.symbol()),
            Argument::Tag(name) => write!(f, ":{}:", name),
        }
    }
}

/// One unit of source: a tag definition or an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Tag {
        name: String,
        position: usize,
    },
    Action {
        opcode: OpCode,
        argument: Option<Argument>,
        breakpoint: bool,
        position: usize,
    },
}

fn strip_pattern() -> &'static Regex {
    static STRIP: OnceLock<Regex> = OnceLock::new();
    STRIP.get_or_init(|| Regex::new(r"#[^#]*#|\s+").expect("strip pattern is valid"))
}

/// Remove whitespace and `#...#` comments.
///
/// A comment runs from a `#` to the next `#` and may span lines. An unpaired
/// `#` is kept, and later fails to tokenize.
pub fn strip_source(source: &str) -> String {
    strip_pattern().replace_all(source, "").into_owned()
}

/// 1-based line and column in the unstripped source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Maps offsets in the stripped source back to where the character sits in
/// the text the user wrote
#[derive(Debug, Clone)]
pub struct SourceMap {
    locations: Vec<Location>,
    end: Location,
}

impl SourceMap {
    pub fn new(source: &str) -> Self {
        let mut removed = strip_pattern().find_iter(source).peekable();
        let mut locations = Vec::new();
        let mut line = 1;
        let mut column = 1;

        for (offset, c) in source.char_indices() {
            while removed.peek().map_or(false, |m| m.end() <= offset) {
                removed.next();
            }
            if removed.peek().map_or(true, |m| offset < m.start()) {
                locations.push(Location { line, column });
            }
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }

        Self {
            locations,
            end: Location { line, column },
        }
    }

    /// Location of the character at `position` in the stripped source.
    /// Offsets past the end map to just after the last character.
    pub fn locate(&self, position: usize) -> Location {
        self.locations.get(position).copied().unwrap_or(self.end)
    }
}

/// Characters that can never appear inside a mnemonic
fn is_terminator(c: char) -> bool {
    c.is_ascii_digit()
        || Register::from_symbol(c).is_some()
        || matches!(c, BREAKPOINT | TAG_DELIMITER | CHAR_DELIMITER | BLOCK_SEPARATOR | '-')
}

/// Splits stripped Alpha source into blocks.
///
/// Positions in errors and blocks are character offsets into the stripped
/// source, not the original text. `SourceMap` turns them into lines and columns.
pub struct Lexer {
    cursor: Cursor<char>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        let stripped: Vec<char> = strip_source(source).chars().collect();
        Self {
            cursor: Cursor::new(stripped),
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Block>, LexerError> {
        let mut blocks = Vec::new();
        while !self.is_at_end() {
            blocks.push(self.next_block()?);
        }
        Ok(blocks)
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor.at_end()
    }

    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Read exactly one block
    pub fn next_block(&mut self) -> Result<Block, LexerError> {
        let position = self.cursor.position();

        if self.cursor.peek() == Some(&TAG_DELIMITER) {
            self.cursor.read()?;
            let name = self.read_delimited(TAG_DELIMITER)?;
            return Ok(Block::Tag { name, position });
        }

        let opcode = self.read_mnemonic()?;
        let argument = if opcode.takes_operand() {
            Some(self.read_argument()?)
        } else {
            None
        };
        let breakpoint = self.read_breakpoint();
        if self.cursor.peek() == Some(&BLOCK_SEPARATOR) {
            self.cursor.read()?;
        }

        Ok(Block::Action {
            opcode,
            argument,
            breakpoint,
            position,
        })
    }

    /// Longest match with backtrack.
    ///
    /// Characters are taken while some mnemonic could still continue the
    /// candidate. The cursor is then rolled back to the end of the longest
    /// exact match seen along the way.
    fn read_mnemonic(&mut self) -> Result<OpCode, LexerError> {
        let position = self.cursor.position();
        let mut candidate = String::new();
        let mut taken = 0;
        let mut best: Option<(OpCode, usize)> = None;

        while let Some(&c) = self.cursor.peek() {
            if is_terminator(c) {
                break;
            }
            self.cursor.read()?;
            candidate.push(c);
            taken += 1;

            if let Some(opcode) = OpCode::from_mnemonic(&candidate) {
                best = Some((opcode, taken));
            }

            let continuations = OpCode::continuations(&candidate);
            match self.cursor.peek() {
                Some(next) if continuations.contains(next) => continue,
                _ => break,
            }
        }

        match best {
            Some((opcode, matched)) => {
                self.cursor.unread_by(taken - matched);
                tracing::trace!(%candidate, %opcode, position, "mnemonic");
                Ok(opcode)
            }
            None => Err(LexerError::InvalidMnemonic {
                text: self.invalid_mnemonic_text(candidate),
                position,
            }),
        }
    }

    /// The text to name in an invalid mnemonic error: the candidate plus the
    /// rest of its run of mnemonic characters, or the single offending
    /// character when the block opens with a terminator.
    fn invalid_mnemonic_text(&mut self, mut text: String) -> String {
        if text.is_empty() {
            if let Some(&c) = self.cursor.peek() {
                text.push(c);
            }
            return text;
        }
        while let Some(&c) = self.cursor.peek() {
            if is_terminator(c) {
                break;
            }
            text.push(c);
            let _ = self.cursor.read();
        }
        text
    }

    fn read_argument(&mut self) -> Result<Argument, LexerError> {
        match self.cursor.peek().copied() {
            Some(c) if c.is_ascii_digit() || c == '-' => Ok(Argument::Literal(self.read_number()?)),
            Some(CHAR_DELIMITER) => Ok(Argument::Literal(self.read_char_literal()?)),
            Some(TAG_DELIMITER) => {
                self.cursor.read()?;
                Ok(Argument::Tag(self.read_delimited(TAG_DELIMITER)?))
            }
            _ => Ok(Argument::Register(self.read_register()?)),
        }
    }

    /// Optional `-` followed by digits
    fn read_number(&mut self) -> Result<i64, LexerError> {
        let position = self.cursor.position();
        let mut text = String::new();

        if self.cursor.peek() == Some(&'-') {
            text.push(*self.cursor.read()?);
        }
        while let Some(&c) = self.cursor.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            text.push(c);
            self.cursor.read()?;
        }

        text.parse::<i64>()
            .map_err(|_| LexerError::InvalidNumber { text, position })
    }

    /// `'c'` as the character's code point. The closing quote is skipped unchecked.
    fn read_char_literal(&mut self) -> Result<i64, LexerError> {
        self.cursor.read()?;
        let c = *self.cursor.read()?;
        self.cursor.read()?;
        Ok(c as i64)
    }

    fn read_register(&mut self) -> Result<Register, LexerError> {
        let position = self.cursor.position();
        let symbol = *self.cursor.read()?;
        Register::from_symbol(symbol).ok_or(LexerError::InvalidRegister { symbol, position })
    }

    /// Read up to, not including, `delimiter` and consume the delimiter
    fn read_delimited(&mut self, delimiter: char) -> Result<String, LexerError> {
        let position = self.cursor.position();
        let mut value = String::new();
        while let Ok(&c) = self.cursor.read() {
            if c == delimiter {
                return Ok(value);
            }
            value.push(c);
        }
        Err(LexerError::UnterminatedDelimiter { delimiter, position })
    }

    fn read_breakpoint(&mut self) -> bool {
        if self.cursor.peek() == Some(&BREAKPOINT) {
            let _ = self.cursor.read();
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexerError {
    #[error("Invalid mnemonic '{text}' at position {position}")]
    InvalidMnemonic { text: String, position: usize },

    #[error("Invalid register '{symbol}' at position {position}")]
    InvalidRegister { symbol: char, position: usize },

    #[error("Could not find closing '{delimiter}' for text starting at position {position}")]
    UnterminatedDelimiter { delimiter: char, position: usize },

    #[error("Invalid number '{text}' at position {position}")]
    InvalidNumber { text: String, position: usize },

    #[error("Unexpected end of source: {0}")]
    OutOfBounds(#[from] CursorError),
}

impl LexerError {
    /// Offset in the stripped source where the error was detected
    pub fn position(&self) -> usize {
        match self {
            LexerError::InvalidMnemonic { position, .. }
            | LexerError::InvalidRegister { position, .. }
            | LexerError::UnterminatedDelimiter { position, .. }
            | LexerError::InvalidNumber { position, .. } => *position,
            LexerError::OutOfBounds(CursorError::OutOfBounds { index, .. }) => *index,
        }
    }
}
