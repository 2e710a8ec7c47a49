//! Lexer (tokenizer) for Em source code
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the
//! parser. Scanning is line-oriented: the lexer walks each line of a
//! [`SourceBuffer`], alternating between skipping whitespace and reading a
//! token. Alphanumeric runs accumulate in a scratch buffer tagged with a
//! partial kind (numeric or alphanumeric) and are classified against the
//! keyword and data-type tables when they close; symbols are matched greedily
//! with one or two characters of lookahead.
//!
//! The only preprocessor directive is `#import "path"`, which recursively
//! lexes the named file and appends its tokens to the current sequence.
//! Imported tokens keep the file name they originated from, so diagnostics
//! point at the right file across inclusion boundaries.

use super::ast::SourceLoc;
use super::source::SourceBuffer;
use super::stream::TokenStream;
use crate::error::CompileError;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

/// Token kinds with stable numeric discriminants.
///
/// The ranges are load-bearing: literals occupy `4..=7`, unary operators
/// `200..300`, binary operators `300` and above. The non-context-free `*`
/// and `&` sit at `400` and above; with no pointer syntax in the language
/// they always resolve to multiplication and bitwise-and at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TokenKind {
    Identifier = 0,
    Keyword = 1,
    DataType = 2,

    // Literals
    NumericLiteral = 4,
    CharLiteral = 5,
    StringLiteral = 6,
    BoolLiteral = 7,

    // Brackets
    LeftBrace = 10,   // {
    RightBrace = 11,  // }
    LeftParen = 12,   // (
    RightParen = 13,  // )
    LeftSquare = 14,  // [ (reserved, no grammar)
    RightSquare = 15, // ]

    // Punctuation
    Separator = 20, // ,
    Delimiter = 21, // ;
    Dot = 22,       // .

    // Unary operators
    Not = 200,       // !
    BitNot = 201,    // ~
    Increment = 202, // ++
    Decrement = 203, // --

    // Binary operators
    Plus = 300,      // +
    Minus = 301,     // -
    Divide = 302,    // /
    Mod = 303,       // %
    PlusEq = 304,    // +=
    MinusEq = 305,   // -=
    MultiplyEq = 306, // *=
    DivideEq = 307,  // /=
    ModEq = 308,     // %=
    Less = 309,      // <
    Greater = 310,   // >
    LessEq = 311,    // <=
    GreaterEq = 312, // >=
    Assign = 313,    // =
    Equal = 314,     // ==
    NotEq = 315,     // !=
    And = 316,       // &&
    Or = 317,        // ||
    Xor = 318,       // ^
    AndEq = 319,     // &&=
    OrEq = 320,      // ||=
    XorEq = 321,     // ^=
    BitOr = 322,     // |
    BitOrEq = 323,   // |=
    BitAndEq = 324,  // &=
    Lshift = 325,    // <<
    Rshift = 326,    // >>
    LshiftEq = 327,  // <<=
    RshiftEq = 328,  // >>=

    // Non-context-free (interpreted at parse time)
    Star = 400,      // *
    Ampersand = 401, // &
}

impl TokenKind {
    pub fn is_literal(self) -> bool {
        (4..=7).contains(&(self as u16))
    }

    pub fn is_unary_op(self) -> bool {
        (200..300).contains(&(self as u16))
    }

    pub fn is_binary_op(self) -> bool {
        self as u16 >= 300
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TokenKind::Identifier => "identifier",
            TokenKind::Keyword => "keyword",
            TokenKind::DataType => "data type",
            TokenKind::NumericLiteral => "numeric literal",
            TokenKind::CharLiteral => "char literal",
            TokenKind::StringLiteral => "string literal",
            TokenKind::BoolLiteral => "bool literal",
            TokenKind::LeftBrace => "'{'",
            TokenKind::RightBrace => "'}'",
            TokenKind::LeftParen => "'('",
            TokenKind::RightParen => "')'",
            TokenKind::LeftSquare => "'['",
            TokenKind::RightSquare => "']'",
            TokenKind::Separator => "','",
            TokenKind::Delimiter => "';'",
            TokenKind::Dot => "'.'",
            TokenKind::Not => "'!'",
            TokenKind::BitNot => "'~'",
            TokenKind::Increment => "'++'",
            TokenKind::Decrement => "'--'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Divide => "'/'",
            TokenKind::Mod => "'%'",
            TokenKind::PlusEq => "'+='",
            TokenKind::MinusEq => "'-='",
            TokenKind::MultiplyEq => "'*='",
            TokenKind::DivideEq => "'/='",
            TokenKind::ModEq => "'%='",
            TokenKind::Less => "'<'",
            TokenKind::Greater => "'>'",
            TokenKind::LessEq => "'<='",
            TokenKind::GreaterEq => "'>='",
            TokenKind::Assign => "'='",
            TokenKind::Equal => "'=='",
            TokenKind::NotEq => "'!='",
            TokenKind::And => "'&&'",
            TokenKind::Or => "'||'",
            TokenKind::Xor => "'^'",
            TokenKind::AndEq => "'&&='",
            TokenKind::OrEq => "'||='",
            TokenKind::XorEq => "'^='",
            TokenKind::BitOr => "'|'",
            TokenKind::BitOrEq => "'|='",
            TokenKind::BitAndEq => "'&='",
            TokenKind::Lshift => "'<<'",
            TokenKind::Rshift => "'>>'",
            TokenKind::LshiftEq => "'<<='",
            TokenKind::RshiftEq => "'>>='",
            TokenKind::Star => "'*'",
            TokenKind::Ampersand => "'&'",
        };
        f.write_str(text)
    }
}

/// A single lexical unit: the original lexeme, its classified kind, and the
/// source position it came from. Immutable after lexing.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub lexeme: String,
    pub kind: TokenKind,
    pub loc: SourceLoc,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::Identifier => write!(f, "identifier '{}'", self.lexeme),
            TokenKind::Keyword => write!(f, "keyword '{}'", self.lexeme),
            TokenKind::DataType => write!(f, "type '{}'", self.lexeme),
            TokenKind::NumericLiteral => write!(f, "literal {}", self.lexeme),
            TokenKind::CharLiteral => write!(f, "char literal '{}'", self.lexeme),
            TokenKind::StringLiteral => write!(f, "string literal \"{}\"", self.lexeme),
            TokenKind::BoolLiteral => write!(f, "literal {}", self.lexeme),
            kind => kind.fmt(f),
        }
    }
}

/// Keywords of the language. Data types are classified separately.
const KEYWORDS: [&str; 7] = ["if", "else", "for", "while", "return", "break", "continue"];

/// Base type names.
const DATA_TYPES: [&str; 6] = ["void", "bool", "int", "float", "char", "string"];

/// Lexer error type. All variants are fatal.
#[derive(Debug, Error)]
pub enum LexError {
    #[error("SYNTAX ERROR: Invalid token. Identifiers cannot start with numeric characters.")]
    BadNumericPrefix { loc: SourceLoc },

    #[error("SYNTAX ERROR: Invalid character literal")]
    BadCharLiteral { loc: SourceLoc },

    #[error("SYNTAX ERROR: Invalid character literal. Closing quote not found.")]
    UnterminatedChar { loc: SourceLoc },

    #[error("SYNTAX ERROR: Invalid character '\\t' in string literal")]
    TabInStringLiteral { loc: SourceLoc },

    #[error("SYNTAX ERROR: Invalid string literal. Closing quote not found.")]
    UnterminatedString { loc: SourceLoc },

    #[error("SYNTAX ERROR: Invalid token encountered.")]
    UnknownSymbol { loc: SourceLoc },

    #[error("SYNTAX ERROR: Invalid preprocessor directive encountered.")]
    UnknownDirective { loc: SourceLoc },

    #[error("SYNTAX ERROR: import file path not specified.")]
    MissingImportPath { loc: SourceLoc },

    #[error("SYNTAX ERROR: Invalid string provided for import file path.")]
    BadImportPath { loc: SourceLoc },
}

impl LexError {
    pub fn loc(&self) -> &SourceLoc {
        match self {
            LexError::BadNumericPrefix { loc }
            | LexError::BadCharLiteral { loc }
            | LexError::UnterminatedChar { loc }
            | LexError::TabInStringLiteral { loc }
            | LexError::UnterminatedString { loc }
            | LexError::UnknownSymbol { loc }
            | LexError::UnknownDirective { loc }
            | LexError::MissingImportPath { loc }
            | LexError::BadImportPath { loc } => loc,
        }
    }
}

/// Partial kind of the scratch buffer while an alphanumeric run accumulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PartialToken {
    Numeric,
    Alnum,
}

/// Lexer for a translation unit. Owns the token sequence, including tokens
/// merged from imported files, and the post-inclusion effective line count.
#[derive(Debug)]
pub struct Lexer {
    tokens: Vec<Token>,
    file_name: Rc<str>,
    total_lines: u32,
}

impl Lexer {
    /// Lex a file from disk, resolving `#import` directives recursively.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Lexer, CompileError> {
        let path = path.as_ref();
        let buffer = SourceBuffer::read(path).map_err(|source| CompileError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_buffer(buffer)
    }

    /// Lex in-memory text. Relative `#import` paths resolve against the
    /// parent directory of `file_name`.
    pub fn from_text(file_name: &str, text: &str) -> Result<Lexer, CompileError> {
        Self::from_buffer(SourceBuffer::from_text(file_name, text))
    }

    fn from_buffer(buffer: SourceBuffer) -> Result<Lexer, CompileError> {
        let mut lexer = Lexer {
            tokens: Vec::new(),
            file_name: buffer.file_name().clone(),
            total_lines: 0,
        };

        let mut in_comment = false;
        for (line_num, line) in buffer.lines() {
            in_comment = lexer.scan_line(line, line_num, in_comment)?;
        }
        lexer.total_lines += buffer.line_count();

        Ok(lexer)
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// A fresh cursor over the token sequence.
    pub fn stream(&self) -> TokenStream<'_> {
        TokenStream::new(&self.tokens)
    }

    pub fn file_name(&self) -> &Rc<str> {
        &self.file_name
    }

    /// Effective line count after inclusion: the lines of this file plus
    /// those of every file it transitively imported.
    pub fn total_lines(&self) -> u32 {
        self.total_lines
    }

    fn loc(&self, line: u32, column: usize) -> SourceLoc {
        SourceLoc {
            file: self.file_name.clone(),
            line,
            column: column as u32,
        }
    }

    fn push(&mut self, lexeme: impl Into<String>, kind: TokenKind, line: u32, column: usize) {
        self.tokens.push(Token {
            lexeme: lexeme.into(),
            kind,
            loc: self.loc(line, column),
        });
    }

    /// Close the scratch buffer: classify its contents and emit the token.
    fn push_word(&mut self, curr: &mut String, ptok: PartialToken, line: u32, column: usize) {
        let lexeme = std::mem::take(curr);
        let kind = match ptok {
            PartialToken::Numeric => TokenKind::NumericLiteral,
            PartialToken::Alnum => {
                if lexeme == "true" || lexeme == "false" {
                    TokenKind::BoolLiteral
                } else if KEYWORDS.contains(&lexeme.as_str()) {
                    TokenKind::Keyword
                } else if DATA_TYPES.contains(&lexeme.as_str()) {
                    TokenKind::DataType
                } else {
                    TokenKind::Identifier
                }
            }
        };
        self.push(lexeme, kind, line, column);
    }

    /// Generate tokens for one line. Returns whether the lexer is inside a
    /// multi-line comment at the start of the next line.
    fn scan_line(
        &mut self,
        line: &str,
        line_num: u32,
        mut in_comment: bool,
    ) -> Result<bool, CompileError> {
        let chars: Vec<char> = line.chars().collect();
        let mut pos = 0usize;

        let mut curr = String::new();
        let mut curr_start = 0usize;
        let mut ptok = PartialToken::Alnum;

        loop {
            if in_comment {
                // Keep reading until the closing '*/'.
                match chars.get(pos).copied() {
                    None => return Ok(true),
                    Some('*') if chars.get(pos + 1) == Some(&'/') => {
                        in_comment = false;
                        pos += 2;
                    }
                    Some(_) => pos += 1,
                }
                continue;
            }

            let Some(&c) = chars.get(pos) else {
                // End of line terminates any pending run.
                if !curr.is_empty() {
                    self.push_word(&mut curr, ptok, line_num, curr_start);
                }
                return Ok(false);
            };

            // Whitespace terminates any pending run.
            if c == ' ' || c == '\t' {
                if !curr.is_empty() {
                    self.push_word(&mut curr, ptok, line_num, curr_start);
                }
                pos += 1;
                continue;
            }

            // A single '.' extends a pending numeric literal into a float.
            if c == '.' && !curr.is_empty() && ptok == PartialToken::Numeric && !curr.contains('.')
            {
                curr.push(c);
                pos += 1;
                continue;
            }

            if c.is_ascii_digit() {
                if curr.is_empty() {
                    ptok = PartialToken::Numeric;
                    curr_start = pos;
                }
                curr.push(c);
                pos += 1;
                continue;
            }

            if c.is_ascii_alphabetic() || c == '_' {
                // Identifiers cannot start with a digit-only prefix.
                if !curr.is_empty() && ptok == PartialToken::Numeric {
                    return Err(LexError::BadNumericPrefix {
                        loc: self.loc(line_num, pos),
                    }
                    .into());
                }
                if curr.is_empty() {
                    curr_start = pos;
                }
                ptok = PartialToken::Alnum;
                curr.push(c);
                pos += 1;
                continue;
            }

            // (c) is a symbol, a quote, or a directive marker. Whatever was
            // accumulating is a complete token of its own.
            if !curr.is_empty() {
                self.push_word(&mut curr, ptok, line_num, curr_start);
            }

            if c == '#' {
                self.handle_directive(&chars, pos + 1, line_num)?;
                // The rest of the line after a directive is ignored.
                return Ok(false);
            }

            pos = self.scan_symbol(&chars, pos, line_num, &mut in_comment)?;
            if pos == usize::MAX {
                // Line comment: the remaining line is discarded.
                return Ok(in_comment);
            }
        }
    }

    /// Match a symbol token greedily at `pos`. Returns the position after the
    /// symbol, or `usize::MAX` when a `//` comment consumed the rest of the
    /// line.
    fn scan_symbol(
        &mut self,
        chars: &[char],
        pos: usize,
        line: u32,
        in_comment: &mut bool,
    ) -> Result<usize, CompileError> {
        use TokenKind::*;

        let c = chars[pos];
        let next = chars.get(pos + 1).copied();

        let consumed = match c {
            '{' => {
                self.push("{", LeftBrace, line, pos);
                1
            }
            '}' => {
                self.push("}", RightBrace, line, pos);
                1
            }
            '(' => {
                self.push("(", LeftParen, line, pos);
                1
            }
            ')' => {
                self.push(")", RightParen, line, pos);
                1
            }
            '[' => {
                self.push("[", LeftSquare, line, pos);
                1
            }
            ']' => {
                self.push("]", RightSquare, line, pos);
                1
            }
            ',' => {
                self.push(",", Separator, line, pos);
                1
            }
            ';' => {
                self.push(";", Delimiter, line, pos);
                1
            }
            '.' => {
                self.push(".", Dot, line, pos);
                1
            }
            '~' => {
                self.push("~", BitNot, line, pos);
                1
            }
            '\'' => return self.scan_char_literal(chars, pos, line),
            '"' => return self.scan_string_literal(chars, pos, line),
            '!' => match next {
                Some('=') => {
                    self.push("!=", NotEq, line, pos);
                    2
                }
                _ => {
                    self.push("!", Not, line, pos);
                    1
                }
            },
            '+' => match next {
                Some('=') => {
                    self.push("+=", PlusEq, line, pos);
                    2
                }
                Some('+') => {
                    self.push("++", Increment, line, pos);
                    2
                }
                _ => {
                    self.push("+", Plus, line, pos);
                    1
                }
            },
            '-' => match next {
                Some('=') => {
                    self.push("-=", MinusEq, line, pos);
                    2
                }
                Some('-') => {
                    self.push("--", Decrement, line, pos);
                    2
                }
                _ => {
                    self.push("-", Minus, line, pos);
                    1
                }
            },
            '*' => match next {
                Some('=') => {
                    self.push("*=", MultiplyEq, line, pos);
                    2
                }
                _ => {
                    self.push("*", Star, line, pos);
                    1
                }
            },
            '/' => match next {
                Some('=') => {
                    self.push("/=", DivideEq, line, pos);
                    2
                }
                Some('/') => return Ok(usize::MAX),
                Some('*') => {
                    *in_comment = true;
                    2
                }
                _ => {
                    self.push("/", Divide, line, pos);
                    1
                }
            },
            '%' => match next {
                Some('=') => {
                    self.push("%=", ModEq, line, pos);
                    2
                }
                _ => {
                    self.push("%", Mod, line, pos);
                    1
                }
            },
            '<' => match next {
                Some('=') => {
                    self.push("<=", LessEq, line, pos);
                    2
                }
                Some('<') => match chars.get(pos + 2).copied() {
                    Some('=') => {
                        self.push("<<=", LshiftEq, line, pos);
                        3
                    }
                    _ => {
                        self.push("<<", Lshift, line, pos);
                        2
                    }
                },
                _ => {
                    self.push("<", Less, line, pos);
                    1
                }
            },
            '>' => match next {
                Some('=') => {
                    self.push(">=", GreaterEq, line, pos);
                    2
                }
                Some('>') => match chars.get(pos + 2).copied() {
                    Some('=') => {
                        self.push(">>=", RshiftEq, line, pos);
                        3
                    }
                    _ => {
                        self.push(">>", Rshift, line, pos);
                        2
                    }
                },
                _ => {
                    self.push(">", Greater, line, pos);
                    1
                }
            },
            '=' => match next {
                Some('=') => {
                    self.push("==", Equal, line, pos);
                    2
                }
                _ => {
                    self.push("=", Assign, line, pos);
                    1
                }
            },
            '&' => match next {
                Some('=') => {
                    self.push("&=", BitAndEq, line, pos);
                    2
                }
                Some('&') => match chars.get(pos + 2).copied() {
                    Some('=') => {
                        self.push("&&=", AndEq, line, pos);
                        3
                    }
                    _ => {
                        self.push("&&", And, line, pos);
                        2
                    }
                },
                _ => {
                    self.push("&", Ampersand, line, pos);
                    1
                }
            },
            '|' => match next {
                Some('=') => {
                    self.push("|=", BitOrEq, line, pos);
                    2
                }
                Some('|') => match chars.get(pos + 2).copied() {
                    Some('=') => {
                        self.push("||=", OrEq, line, pos);
                        3
                    }
                    _ => {
                        self.push("||", Or, line, pos);
                        2
                    }
                },
                _ => {
                    self.push("|", BitOr, line, pos);
                    1
                }
            },
            '^' => match next {
                Some('=') => {
                    self.push("^=", XorEq, line, pos);
                    2
                }
                _ => {
                    self.push("^", Xor, line, pos);
                    1
                }
            },
            _ => {
                return Err(LexError::UnknownSymbol {
                    loc: self.loc(line, pos),
                }
                .into())
            }
        };

        Ok(pos + consumed)
    }

    /// Character literals are a single opaque byte between quotes; there are
    /// no escape sequences.
    fn scan_char_literal(
        &mut self,
        chars: &[char],
        pos: usize,
        line: u32,
    ) -> Result<usize, CompileError> {
        let value = match chars.get(pos + 1).copied() {
            None | Some('\t') => {
                return Err(LexError::BadCharLiteral {
                    loc: self.loc(line, pos + 1),
                }
                .into())
            }
            Some(c) => c,
        };

        match chars.get(pos + 2).copied() {
            Some('\'') => {}
            _ => {
                return Err(LexError::UnterminatedChar {
                    loc: self.loc(line, pos + 2),
                }
                .into())
            }
        }

        self.push(value.to_string(), TokenKind::CharLiteral, line, pos);
        Ok(pos + 3)
    }

    /// String literals are opaque byte runs between quotes; no escapes, and
    /// tabs are illegal inside them.
    fn scan_string_literal(
        &mut self,
        chars: &[char],
        pos: usize,
        line: u32,
    ) -> Result<usize, CompileError> {
        let mut literal = String::new();
        let mut i = pos + 1;

        loop {
            match chars.get(i).copied() {
                None => {
                    return Err(LexError::UnterminatedString {
                        loc: self.loc(line, pos),
                    }
                    .into())
                }
                Some('"') => break,
                Some('\t') => {
                    return Err(LexError::TabInStringLiteral {
                        loc: self.loc(line, i),
                    }
                    .into())
                }
                Some(c) => {
                    literal.push(c);
                    i += 1;
                }
            }
        }

        self.push(literal, TokenKind::StringLiteral, line, pos);
        Ok(i + 1)
    }

    /// Handle a preprocessor directive beginning right after a `#`. The only
    /// recognized directive is `import`; everything else (including
    /// `#define`) is an error.
    fn handle_directive(
        &mut self,
        chars: &[char],
        mut pos: usize,
        line: u32,
    ) -> Result<(), CompileError> {
        let name_start = pos;
        let mut name = String::new();
        while let Some(&c) = chars.get(pos) {
            if c == ' ' || c == '\t' {
                break;
            }
            name.push(c);
            pos += 1;
        }

        if name != "import" {
            return Err(LexError::UnknownDirective {
                loc: self.loc(line, name_start),
            }
            .into());
        }

        while matches!(chars.get(pos).copied(), Some(' ' | '\t')) {
            pos += 1;
        }

        if chars.get(pos) != Some(&'"') {
            return Err(LexError::MissingImportPath {
                loc: self.loc(line, pos),
            }
            .into());
        }
        pos += 1;

        let mut import_path = String::new();
        loop {
            match chars.get(pos).copied() {
                None => {
                    return Err(LexError::BadImportPath {
                        loc: self.loc(line, pos),
                    }
                    .into())
                }
                Some('"') => break,
                Some(c) => {
                    import_path.push(c);
                    pos += 1;
                }
            }
        }

        // Tokenize the imported file and append its tokens. They keep the
        // file name they came from, so later diagnostics stay accurate.
        let resolved = self.resolve_import(&import_path);
        let imported = Lexer::from_file(resolved)?;
        self.tokens.extend(imported.tokens);
        self.total_lines += imported.total_lines;

        Ok(())
    }

    /// Relative import paths resolve against the importing file's directory.
    fn resolve_import(&self, import_path: &str) -> PathBuf {
        let path = Path::new(import_path);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match Path::new(self.file_name.as_ref()).parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        Lexer::from_text("test.em", source)
            .expect("lexing failed")
            .tokens()
            .to_vec()
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_tokens() {
        let tokens = lex("int main() { return 0; }");

        assert_eq!(tokens[0].kind, TokenKind::DataType);
        assert_eq!(tokens[0].lexeme, "int");
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].lexeme, "main");
        assert_eq!(tokens[2].kind, TokenKind::LeftParen);
        assert_eq!(tokens[3].kind, TokenKind::RightParen);
        assert_eq!(tokens[4].kind, TokenKind::LeftBrace);
        assert_eq!(tokens[5].kind, TokenKind::Keyword);
        assert_eq!(tokens[5].lexeme, "return");
        assert_eq!(tokens[6].kind, TokenKind::NumericLiteral);
        assert_eq!(tokens[7].kind, TokenKind::Delimiter);
        assert_eq!(tokens[8].kind, TokenKind::RightBrace);
    }

    #[test]
    fn test_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("++ -- += -= == != && || <<= >>= &&= ||= & | ^"),
            vec![
                Increment, Decrement, PlusEq, MinusEq, Equal, NotEq, And, Or, LshiftEq, RshiftEq,
                AndEq, OrEq, Ampersand, BitOr, Xor
            ]
        );
    }

    #[test]
    fn test_adjacent_tokens_without_spaces() {
        let tokens = lex("x==30");
        assert_eq!(tokens[0].lexeme, "x");
        assert_eq!(tokens[1].kind, TokenKind::Equal);
        assert_eq!(tokens[2].lexeme, "30");
    }

    #[test]
    fn test_float_literal() {
        let tokens = lex("3.25");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::NumericLiteral);
        assert_eq!(tokens[0].lexeme, "3.25");
    }

    #[test]
    fn test_bool_literals() {
        let tokens = lex("true false");
        assert_eq!(tokens[0].kind, TokenKind::BoolLiteral);
        assert_eq!(tokens[1].kind, TokenKind::BoolLiteral);
    }

    #[test]
    fn test_comments() {
        let tokens = lex("int x; // comment\nint y; /* block\ncomment */ int z;");
        let idents: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Identifier)
            .map(|t| t.lexeme.as_str())
            .collect();
        assert_eq!(idents, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_string_literal_is_opaque() {
        let tokens = lex(r#""hello\nworld""#);
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        // No escape processing: the backslash is kept as-is.
        assert_eq!(tokens[0].lexeme, "hello\\nworld");
    }

    #[test]
    fn test_char_literal() {
        let tokens = lex("'A'");
        assert_eq!(tokens[0].kind, TokenKind::CharLiteral);
        assert_eq!(tokens[0].lexeme, "A");
    }

    #[test]
    fn test_identifier_with_numeric_prefix_is_error() {
        let err = Lexer::from_text("test.em", "int 3abc;").unwrap_err();
        assert!(matches!(
            err,
            CompileError::Lex(LexError::BadNumericPrefix { .. })
        ));
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let err = Lexer::from_text("test.em", "string s = \"oops;").unwrap_err();
        assert!(matches!(
            err,
            CompileError::Lex(LexError::UnterminatedString { .. })
        ));
    }

    #[test]
    fn test_tab_in_string_is_error() {
        let err = Lexer::from_text("test.em", "string s = \"a\tb\";").unwrap_err();
        assert!(matches!(
            err,
            CompileError::Lex(LexError::TabInStringLiteral { .. })
        ));
    }

    #[test]
    fn test_unknown_directive_is_error() {
        let err = Lexer::from_text("test.em", "#define X 1").unwrap_err();
        assert!(matches!(
            err,
            CompileError::Lex(LexError::UnknownDirective { .. })
        ));
    }

    #[test]
    fn test_token_positions() {
        let tokens = lex("int x;\nx = 3;");
        assert_eq!(tokens[0].loc.line, 1);
        assert_eq!(tokens[0].loc.column, 0);
        assert_eq!(tokens[1].loc.column, 4);
        assert_eq!(tokens[3].loc.line, 2);
        assert_eq!(tokens[4].loc.column, 2);
    }

    #[test]
    fn test_kind_ranges() {
        assert!(TokenKind::NumericLiteral.is_literal());
        assert!(TokenKind::BoolLiteral.is_literal());
        assert!(!TokenKind::Identifier.is_literal());

        assert!(TokenKind::Not.is_unary_op());
        assert!(TokenKind::Decrement.is_unary_op());
        assert!(!TokenKind::Plus.is_unary_op());

        assert!(TokenKind::Plus.is_binary_op());
        assert!(TokenKind::RshiftEq.is_binary_op());
        assert!(TokenKind::Star.is_binary_op());
        assert!(TokenKind::Ampersand.is_binary_op());
        assert!(!TokenKind::Not.is_binary_op());
        assert!(!TokenKind::LeftParen.is_binary_op());
    }
}
