#![deny(warnings)]

pub mod lexer;
pub mod ast;
pub mod error;
pub mod parser;
pub mod notation;
pub mod sem;
pub mod interpreter;

use ast::Number;
use error::Error;
use interpreter::{ActivationRecord, Interpreter};
use lexer::{Lexer, TokenClass};


/// What a piece of source evaluated to: a whole program leaves its frame,
/// a bare expression leaves a number.
#[derive(Debug, PartialEq, Clone)]
pub enum Outcome {
    Program(ActivationRecord),
    Value(Number),
}

pub fn run_with(interpreter: &Interpreter, source: &str) -> Result<ActivationRecord, Error> {
    let program = parser::parse(source)?;
    sem::analyze(&program)?;
    interpreter.interpret(&program)
}

/// Parses, checks and runs a whole program.
pub fn run(source: &str) -> Result<ActivationRecord, Error> {
    run_with(&Interpreter::new(), source)
}

/// Evaluates a single arithmetic expression.
pub fn calc(source: &str) -> Result<Number, Error> {
    Interpreter::new().evaluate(&parser::parse_expression(source)?)
}

pub fn evaluate_source_with(interpreter: &Interpreter, source: &str) -> Result<Outcome, Error> {
    let first = Lexer::new(source).next_token()?;
    if first.class() == TokenClass::Program {
        run_with(interpreter, source).map(Outcome::Program)
    } else {
        let expr = parser::parse_expression(source)?;
        interpreter.evaluate(&expr).map(Outcome::Value)
    }
}

/// Runs `source` as a program when it starts with PROGRAM, otherwise as an
/// expression.
pub fn evaluate_source(source: &str) -> Result<Outcome, Error> {
    evaluate_source_with(&Interpreter::new(), source)
}
