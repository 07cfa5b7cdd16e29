use thiserror::Error;

use crate::lexer::{Position, TokenClass};


#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("invalid character {chr:?} at {position}")]
    Lexical { chr: char, position: Position },

    #[error("unexpected token: expected {expected}, got {found} at {position}")]
    Syntax { expected: String, found: TokenClass, position: Position },

    #[error("invalid number literal {literal} at {position}")]
    InvalidNumber { literal: String, position: Position },

    #[error("nesting deeper than {limit} levels at {position}")]
    Nesting { limit: usize, position: Position },

    #[error("{message} at {position}")]
    Semantic { message: String, position: Position },

    /// A name was read at runtime before anything was assigned to it.
    #[error("name error: {name} is undefined at {position}")]
    Name { name: String, position: Position },

    #[error("{message} at {position}")]
    Runtime { message: String, position: Position },
}

impl Error {
    pub fn syntax(expected: impl Into<String>, found: TokenClass, position: Position) -> Error {
        Error::Syntax { expected: expected.into(), found, position }
    }

    pub fn semantic(message: impl Into<String>, position: Position) -> Error {
        Error::Semantic { message: message.into(), position }
    }

    pub fn runtime(message: impl Into<String>, position: Position) -> Error {
        Error::Runtime { message: message.into(), position }
    }

    pub fn position(&self) -> Position {
        match self {
            Error::Lexical { position, .. }
            | Error::Syntax { position, .. }
            | Error::InvalidNumber { position, .. }
            | Error::Nesting { position, .. }
            | Error::Semantic { position, .. }
            | Error::Name { position, .. }
            | Error::Runtime { position, .. } => *position,
        }
    }
}
