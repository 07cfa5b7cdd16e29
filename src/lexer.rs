use std::fmt;

use log::trace;

use crate::error::Error;


#[derive(Clone, Copy, Hash, Debug, Eq, PartialEq)]
pub enum TokenClass {
    IntegerConst,
    RealConst,
    Id,
    Program,
    Procedure,
    Var,
    Integer,
    Real,
    IntDiv,
    Begin,
    End,
    If,
    Else,
    While,
    Assign,
    Lte,
    Gte,
    Plus,
    Minus,
    Times,
    FloatDiv,
    LParen,
    RParen,
    Dot,
    Semicolon,
    Comma,
    Colon,
    Eq,
    Lt,
    Gt,
    EOF,
}

impl fmt::Display for TokenClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use TokenClass::*;

        let s = match self {
            IntegerConst => "integer constant",
            RealConst => "real constant",
            Id => "identifier",
            Program => "PROGRAM",
            Procedure => "PROCEDURE",
            Var => "VAR",
            Integer => "INTEGER",
            Real => "REAL",
            IntDiv => "DIV",
            Begin => "BEGIN",
            End => "END",
            If => "IF",
            Else => "ELSE",
            While => "WHILE",
            Assign => "':='",
            Lte => "'<='",
            Gte => "'>='",
            Plus => "'+'",
            Minus => "'-'",
            Times => "'*'",
            FloatDiv => "'/'",
            LParen => "'('",
            RParen => "')'",
            Dot => "'.'",
            Semicolon => "';'",
            Comma => "','",
            Colon => "':'",
            Eq => "'='",
            Lt => "'<'",
            Gt => "'>'",
            EOF => "end of input",
        };
        f.write_str(s)
    }
}

/// 1-based line and column of the first character of a token.
#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, Clone, Copy)]
pub struct Position(pub u64, pub u64);

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}, column {}", self.0, self.1)
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Token<'a>(pub TokenClass, pub &'a str, pub Position);

impl<'a> Token<'a> {
    pub fn class(&self) -> TokenClass  { self.0 }
    pub fn text(&self) -> &'a str      { self.1 }
    pub fn position(&self) -> Position { self.2 }
}

const RESERVED_WORDS: &[(&str, TokenClass)] = &[
    ("PROGRAM", TokenClass::Program),
    ("PROCEDURE", TokenClass::Procedure),
    ("VAR", TokenClass::Var),
    ("INTEGER", TokenClass::Integer),
    ("REAL", TokenClass::Real),
    ("DIV", TokenClass::IntDiv),
    ("BEGIN", TokenClass::Begin),
    ("END", TokenClass::End),
    ("IF", TokenClass::If),
    ("ELSE", TokenClass::Else),
    ("WHILE", TokenClass::While),
];

fn reserved_word(word: &str) -> Option<TokenClass> {
    let canonical = word.to_ascii_uppercase();
    RESERVED_WORDS.iter()
        .find(|(w, _)| *w == canonical)
        .map(|&(_, tc)| tc)
}

fn single_char_operator(c: char) -> Option<TokenClass> {
    let tc = match c {
        '+' => TokenClass::Plus,
        '-' => TokenClass::Minus,
        '*' => TokenClass::Times,
        '/' => TokenClass::FloatDiv,
        '(' => TokenClass::LParen,
        ')' => TokenClass::RParen,
        '.' => TokenClass::Dot,
        ';' => TokenClass::Semicolon,
        ',' => TokenClass::Comma,
        ':' => TokenClass::Colon,
        '=' => TokenClass::Eq,
        '<' => TokenClass::Lt,
        '>' => TokenClass::Gt,
        _ => return None,
    };
    Some(tc)
}

fn double_char_operator(first: char, second: Option<char>) -> Option<TokenClass> {
    match (first, second?) {
        (':', '=') => Some(TokenClass::Assign),
        ('<', '=') => Some(TokenClass::Lte),
        ('>', '=') => Some(TokenClass::Gte),
        _ => None,
    }
}

/// Produces tokens on demand; keeps returning EOF once the input is used up.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: u64,
    col: u64,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Lexer<'a> {
        Lexer { input, pos: 0, line: 1, col: 1 }
    }

    /// The raw character right after the last token handed out, without
    /// skipping whitespace or comments.
    pub fn current_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().nth(1)
    }

    fn position(&self) -> Position {
        Position(self.line, self.col)
    }

    fn advance(&mut self) {
        if let Some(c) = self.current_char() {
            self.pos += c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
    }

    fn advance_while<F>(&mut self, pred: F) where F: Fn(char) -> bool {
        while self.current_char().map_or(false, &pred) {
            self.advance();
        }
    }

    fn skip_comment(&mut self) -> Result<(), Error> {
        let start = self.position();
        self.advance();
        loop {
            match self.current_char() {
                None => return Err(Error::Lexical { chr: '{', position: start }),
                Some('}') => {
                    self.advance();
                    return Ok(());
                }
                Some(_) => self.advance(),
            }
        }
    }

    fn skip_trivia(&mut self) -> Result<(), Error> {
        loop {
            match self.current_char() {
                Some(c) if c.is_whitespace() => self.advance_while(char::is_whitespace),
                Some('{') => self.skip_comment()?,
                _ => return Ok(()),
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token<'a>, Error> {
        self.skip_trivia()?;

        let start = self.pos;
        let position = self.position();

        let chr = match self.current_char() {
            Some(c) => c,
            None => return Ok(Token(TokenClass::EOF, "", position)),
        };

        let tc = if chr.is_ascii_alphabetic() || chr == '_' {
            self.advance_while(|c| c.is_ascii_alphanumeric() || c == '_');
            reserved_word(&self.input[start..self.pos]).unwrap_or(TokenClass::Id)
        } else if chr.is_ascii_digit() {
            self.advance_while(|c| c.is_ascii_digit());
            let fraction = self.current_char() == Some('.')
                && self.peek_char().map_or(false, |c| c.is_ascii_digit());
            if fraction {
                self.advance();
                self.advance_while(|c| c.is_ascii_digit());
                TokenClass::RealConst
            } else {
                TokenClass::IntegerConst
            }
        } else if let Some(tc) = double_char_operator(chr, self.peek_char()) {
            self.advance();
            self.advance();
            tc
        } else if let Some(tc) = single_char_operator(chr) {
            self.advance();
            tc
        } else {
            return Err(Error::Lexical { chr, position });
        };

        let token = Token(tc, &self.input[start..self.pos], position);
        trace!("token {:?}", token);
        Ok(token)
    }
}

pub fn lex(input: &str) -> Result<Vec<Token<'_>>, Error> {
    let mut lexer = Lexer::new(input);
    let mut tokenized_input = Vec::new();

    loop {
        let token = lexer.next_token()?;
        let done = token.class() == TokenClass::EOF;
        tokenized_input.push(token);
        if done {
            return Ok(tokenized_input);
        }
    }
}


#[cfg(test)]
mod test {
    use crate::error::Error;
    use super::{Token, TokenClass, Position, Lexer, lex};

    #[test]
    fn sequence() {
        assert_eq!(lex("PROGRAM p; BEGIN a := 10 DIV 3 END."), Ok(vec![
            Token(TokenClass::Program,      "PROGRAM", Position(1, 1)),
            Token(TokenClass::Id,           "p",       Position(1, 9)),
            Token(TokenClass::Semicolon,    ";",       Position(1, 10)),
            Token(TokenClass::Begin,        "BEGIN",   Position(1, 12)),
            Token(TokenClass::Id,           "a",       Position(1, 18)),
            Token(TokenClass::Assign,       ":=",      Position(1, 20)),
            Token(TokenClass::IntegerConst, "10",      Position(1, 23)),
            Token(TokenClass::IntDiv,       "DIV",     Position(1, 26)),
            Token(TokenClass::IntegerConst, "3",       Position(1, 30)),
            Token(TokenClass::End,          "END",     Position(1, 32)),
            Token(TokenClass::Dot,          ".",       Position(1, 35)),
            Token(TokenClass::EOF,          "",        Position(1, 36)),
        ]));
    }

    #[test]
    fn reserved_words_ignore_case() {
        assert_eq!(lex("begin BeGiN Foo div x1 _y"), Ok(vec![
            Token(TokenClass::Begin,  "begin", Position(1, 1)),
            Token(TokenClass::Begin,  "BeGiN", Position(1, 7)),
            Token(TokenClass::Id,     "Foo",   Position(1, 13)),
            Token(TokenClass::IntDiv, "div",   Position(1, 17)),
            Token(TokenClass::Id,     "x1",    Position(1, 21)),
            Token(TokenClass::Id,     "_y",    Position(1, 24)),
            Token(TokenClass::EOF,    "",      Position(1, 26)),
        ]));
    }

    #[test]
    fn numbers_and_operators() {
        assert_eq!(lex("1.5 12 7. a<=b>=c:=d"), Ok(vec![
            Token(TokenClass::RealConst,    "1.5", Position(1, 1)),
            Token(TokenClass::IntegerConst, "12",  Position(1, 5)),
            Token(TokenClass::IntegerConst, "7",   Position(1, 8)),
            Token(TokenClass::Dot,          ".",   Position(1, 9)),
            Token(TokenClass::Id,           "a",   Position(1, 11)),
            Token(TokenClass::Lte,          "<=",  Position(1, 12)),
            Token(TokenClass::Id,           "b",   Position(1, 14)),
            Token(TokenClass::Gte,          ">=",  Position(1, 15)),
            Token(TokenClass::Id,           "c",   Position(1, 17)),
            Token(TokenClass::Assign,       ":=",  Position(1, 18)),
            Token(TokenClass::Id,           "d",   Position(1, 20)),
            Token(TokenClass::EOF,          "",    Position(1, 21)),
        ]));
    }

    #[test]
    fn comments_and_newlines() {
        assert_eq!(lex("{ head }\nx {a}{b} := 1 { multi\nline }\n."), Ok(vec![
            Token(TokenClass::Id,           "x",  Position(2, 1)),
            Token(TokenClass::Assign,       ":=", Position(2, 10)),
            Token(TokenClass::IntegerConst, "1",  Position(2, 13)),
            Token(TokenClass::Dot,          ".",  Position(4, 1)),
            Token(TokenClass::EOF,          "",   Position(4, 2)),
        ]));
    }

    #[test]
    fn errors() {
        assert_eq!(
            lex("a := 1 ? 2"),
            Err(Error::Lexical { chr: '?', position: Position(1, 8) }));
        assert_eq!(
            lex("x { oops"),
            Err(Error::Lexical { chr: '{', position: Position(1, 3) }));
    }

    #[test]
    fn eof_repeats() {
        let mut lexer = Lexer::new("x");
        assert_eq!(lexer.next_token().map(|t| t.class()), Ok(TokenClass::Id));
        assert_eq!(lexer.next_token().map(|t| t.class()), Ok(TokenClass::EOF));
        assert_eq!(lexer.next_token().map(|t| t.class()), Ok(TokenClass::EOF));
    }

    #[test]
    fn raw_lookahead() {
        let mut lexer = Lexer::new("foo(1)");
        lexer.next_token().unwrap();
        assert_eq!(lexer.current_char(), Some('('));

        let mut lexer = Lexer::new("foo (1)");
        lexer.next_token().unwrap();
        assert_eq!(lexer.current_char(), Some(' '));
    }
}
