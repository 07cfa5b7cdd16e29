use crate::ast::*;
use crate::error::Error;
use crate::lexer::{Lexer, Position, Token, TokenClass};

// Grammar:
// program      -> PROGRAM id ; block .
// block        -> declarations compound
// declarations -> ( VAR (vardecl ;)+ | PROCEDURE id params? ; block ; )*
// vardecl      -> id (, id)* : type
// params       -> ( param (; param)* )
// param        -> id (, id)* : type
// type         -> INTEGER | REAL
// compound     -> BEGIN statement (; statement)* END
// statement    -> compound | if | while | call | assign | <empty>
// if           -> IF ( expr ) statement (ELSE statement)?
// while        -> WHILE ( expr ) statement
// call         -> id ( (expr (, expr)*)? )
// assign       -> id := expr
// expr         -> rel ((= | >= | <= | > | <) rel)*
// rel          -> term ((+ | -) term)*
// term         -> factor ((* | DIV | /) factor)*
// factor       -> (+ | -) factor | int | real | ( expr ) | id

const RELATIONAL_OPS: &[(TokenClass, BinOp)] = &[
    (TokenClass::Eq, BinOp::Eq),
    (TokenClass::Gte, BinOp::Gte),
    (TokenClass::Lte, BinOp::Lte),
    (TokenClass::Gt, BinOp::Gt),
    (TokenClass::Lt, BinOp::Lt),
];

const ADDITIVE_OPS: &[(TokenClass, BinOp)] = &[
    (TokenClass::Plus, BinOp::Plus),
    (TokenClass::Minus, BinOp::Minus),
];

const MULTIPLICATIVE_OPS: &[(TokenClass, BinOp)] = &[
    (TokenClass::Times, BinOp::Times),
    (TokenClass::IntDiv, BinOp::IntDiv),
    (TokenClass::FloatDiv, BinOp::FloatDiv),
];

/// Deepest nesting of parentheses, signs, operator chains, statements and
/// procedures accepted; every later pass recurses over the same tree.
pub const MAX_NESTING: usize = 256;

const EXPRESSION_START: &[TokenClass] = &[
    TokenClass::Plus,
    TokenClass::Minus,
    TokenClass::IntegerConst,
    TokenClass::RealConst,
    TokenClass::LParen,
    TokenClass::Id,
];

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current_token: Token<'a>,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Result<Parser<'a>, Error> {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token()?;
        Ok(Parser { lexer, current_token, depth: 0 })
    }

    pub fn parse(mut self) -> Result<Program, Error> {
        let program = self.program()?;
        self.eat(TokenClass::EOF)?;
        Ok(program)
    }

    pub fn parse_expression(mut self) -> Result<Expr, Error> {
        let expr = self.expr()?;
        self.eat(TokenClass::EOF)?;
        Ok(expr)
    }

    fn error(&self, expected: impl Into<String>) -> Error {
        Error::syntax(expected, self.current_token.class(), self.current_token.position())
    }

    fn at(&self, tc: TokenClass) -> bool {
        self.current_token.class() == tc
    }

    fn eat(&mut self, expected: TokenClass) -> Result<Token<'a>, Error> {
        let token = self.current_token;
        if token.class() != expected {
            return Err(self.error(expected.to_string()));
        }
        self.current_token = self.lexer.next_token()?;
        Ok(token)
    }

    fn enter(&mut self, position: Position) -> Result<(), Error> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(Error::Nesting { limit: MAX_NESTING, position });
        }
        Ok(())
    }

    fn leave(&mut self, levels: usize) {
        self.depth -= levels;
    }

    fn operator(
        &mut self,
        table: &[(TokenClass, BinOp)]
    ) -> Result<Option<(BinOp, Position)>, Error> {
        let tc = self.current_token.class();
        match table.iter().find(|(t, _)| *t == tc) {
            Some(&(t, op)) => {
                let token = self.eat(t)?;
                Ok(Some((op, token.position())))
            }
            None => Ok(None),
        }
    }

    fn program(&mut self) -> Result<Program, Error> {
        self.eat(TokenClass::Program)?;
        let name = self.eat(TokenClass::Id)?.text().to_string();
        self.eat(TokenClass::Semicolon)?;
        let block = self.block()?;
        self.eat(TokenClass::Dot)?;
        Ok(Program { name, block })
    }

    fn block(&mut self) -> Result<Block, Error> {
        let declarations = self.declarations()?;
        let body = self.compound_statement()?;
        Ok(Block { declarations, body })
    }

    fn declarations(&mut self) -> Result<Vec<Declaration>, Error> {
        let mut declarations = Vec::new();

        loop {
            match self.current_token.class() {
                TokenClass::Var => {
                    self.eat(TokenClass::Var)?;
                    loop {
                        let decls = self.variable_declaration()?;
                        declarations.extend(decls.into_iter().map(Declaration::Var));
                        self.eat(TokenClass::Semicolon)?;
                        if !self.at(TokenClass::Id) {
                            break;
                        }
                    }
                }
                TokenClass::Procedure => {
                    let decl = self.procedure_declaration()?;
                    declarations.push(Declaration::Procedure(decl));
                }
                _ => return Ok(declarations),
            }
        }
    }

    fn variable_declaration(&mut self) -> Result<Vec<VarDecl>, Error> {
        let vars = self.variable_list()?;
        self.eat(TokenClass::Colon)?;
        let type_spec = self.type_spec()?;
        Ok(vars.into_iter().map(|var| VarDecl { var, type_spec }).collect())
    }

    fn variable_list(&mut self) -> Result<Vec<Var>, Error> {
        let mut vars = vec![self.variable()?];
        while self.at(TokenClass::Comma) {
            self.eat(TokenClass::Comma)?;
            vars.push(self.variable()?);
        }
        Ok(vars)
    }

    fn procedure_declaration(&mut self) -> Result<ProcedureDecl, Error> {
        let keyword = self.eat(TokenClass::Procedure)?;
        self.enter(keyword.position())?;
        let name = self.eat(TokenClass::Id)?;
        let params = if self.at(TokenClass::LParen) {
            self.formal_parameter_list()?
        } else {
            Vec::new()
        };
        self.eat(TokenClass::Semicolon)?;
        let block = self.block()?;
        self.eat(TokenClass::Semicolon)?;
        self.leave(1);

        Ok(ProcedureDecl {
            name: name.text().to_string(),
            params,
            block,
            position: name.position(),
        })
    }

    fn formal_parameter_list(&mut self) -> Result<Vec<Param>, Error> {
        self.eat(TokenClass::LParen)?;
        let mut params = self.formal_parameters()?;
        while self.at(TokenClass::Semicolon) {
            self.eat(TokenClass::Semicolon)?;
            params.extend(self.formal_parameters()?);
        }
        self.eat(TokenClass::RParen)?;
        Ok(params)
    }

    fn formal_parameters(&mut self) -> Result<Vec<Param>, Error> {
        let vars = self.variable_list()?;
        self.eat(TokenClass::Colon)?;
        let type_spec = self.type_spec()?;
        Ok(vars.into_iter().map(|var| Param { var, type_spec }).collect())
    }

    fn type_spec(&mut self) -> Result<TypeSpec, Error> {
        match self.current_token.class() {
            TokenClass::Integer => {
                self.eat(TokenClass::Integer)?;
                Ok(TypeSpec::Integer)
            }
            TokenClass::Real => {
                self.eat(TokenClass::Real)?;
                Ok(TypeSpec::Real)
            }
            _ => Err(self.error("type name")),
        }
    }

    fn compound_statement(&mut self) -> Result<Vec<Statement>, Error> {
        self.eat(TokenClass::Begin)?;
        let statements = self.statement_list()?;
        self.eat(TokenClass::End)?;
        Ok(statements)
    }

    fn statement_list(&mut self) -> Result<Vec<Statement>, Error> {
        let mut statements = vec![self.statement()?];
        while self.at(TokenClass::Semicolon) {
            self.eat(TokenClass::Semicolon)?;
            statements.push(self.statement()?);
        }
        Ok(statements)
    }

    fn statement(&mut self) -> Result<Statement, Error> {
        let token = self.current_token;
        match token.class() {
            TokenClass::Begin | TokenClass::If | TokenClass::While => {
                self.enter(token.position())?;
                let statement = match token.class() {
                    TokenClass::Begin => Statement::Compound(self.compound_statement()?),
                    TokenClass::If => self.if_statement()?,
                    _ => self.while_statement()?,
                };
                self.leave(1);
                Ok(statement)
            }
            // only a '(' glued to the name makes a call; `x (1)` is not one
            TokenClass::Id if self.lexer.current_char() == Some('(') => {
                Ok(Statement::ProcedureCall(self.procedure_call()?))
            }
            TokenClass::Id => self.assignment_statement(),
            _ => Ok(Statement::NoOp),
        }
    }

    fn condition(&mut self) -> Result<Expr, Error> {
        self.eat(TokenClass::LParen)?;
        let cond = self.expr()?;
        self.eat(TokenClass::RParen)?;
        Ok(cond)
    }

    fn if_statement(&mut self) -> Result<Statement, Error> {
        self.eat(TokenClass::If)?;
        let cond = self.condition()?;
        let cons = self.statement()?;
        let alt = if self.at(TokenClass::Else) {
            self.eat(TokenClass::Else)?;
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Statement::If(cond, Box::new(cons), alt))
    }

    fn while_statement(&mut self) -> Result<Statement, Error> {
        self.eat(TokenClass::While)?;
        let cond = self.condition()?;
        let body = self.statement()?;
        Ok(Statement::While(cond, Box::new(body)))
    }

    fn procedure_call(&mut self) -> Result<ProcedureCall, Error> {
        let name = self.eat(TokenClass::Id)?;
        self.eat(TokenClass::LParen)?;

        let mut args = Vec::new();
        if EXPRESSION_START.contains(&self.current_token.class()) {
            args.push(self.expr()?);
            while self.at(TokenClass::Comma) {
                self.eat(TokenClass::Comma)?;
                args.push(self.expr()?);
            }
        }
        self.eat(TokenClass::RParen)?;

        Ok(ProcedureCall {
            name: name.text().to_string(),
            args,
            position: name.position(),
        })
    }

    fn assignment_statement(&mut self) -> Result<Statement, Error> {
        let var = self.variable()?;
        self.eat(TokenClass::Assign)?;
        let expr = self.expr()?;
        Ok(Statement::Assign(var, expr))
    }

    fn variable(&mut self) -> Result<Var, Error> {
        let token = self.eat(TokenClass::Id)?;
        Ok(Var { name: token.text().to_string(), position: token.position() })
    }

    fn expr(&mut self) -> Result<Expr, Error> {
        let mut node = self.rel()?;
        let mut chain = 0;
        while let Some((op, position)) = self.operator(RELATIONAL_OPS)? {
            self.enter(position)?;
            chain += 1;
            node = Expr::binop(op, node, self.rel()?, position);
        }
        self.leave(chain);
        Ok(node)
    }

    fn rel(&mut self) -> Result<Expr, Error> {
        let mut node = self.term()?;
        let mut chain = 0;
        while let Some((op, position)) = self.operator(ADDITIVE_OPS)? {
            self.enter(position)?;
            chain += 1;
            node = Expr::binop(op, node, self.term()?, position);
        }
        self.leave(chain);
        Ok(node)
    }

    fn term(&mut self) -> Result<Expr, Error> {
        let mut node = self.factor()?;
        let mut chain = 0;
        while let Some((op, position)) = self.operator(MULTIPLICATIVE_OPS)? {
            self.enter(position)?;
            chain += 1;
            node = Expr::binop(op, node, self.factor()?, position);
        }
        self.leave(chain);
        Ok(node)
    }

    fn factor(&mut self) -> Result<Expr, Error> {
        let token = self.current_token;
        let invalid = || Error::InvalidNumber {
            literal: token.text().to_string(),
            position: token.position(),
        };

        match token.class() {
            TokenClass::Plus | TokenClass::Minus => {
                let op = if token.class() == TokenClass::Plus {
                    UnaryOp::Plus
                } else {
                    UnaryOp::Minus
                };
                self.eat(token.class())?;
                self.enter(token.position())?;
                let operand = self.factor()?;
                self.leave(1);
                Ok(Expr::unary(op, operand, token.position()))
            }
            TokenClass::IntegerConst => {
                self.eat(TokenClass::IntegerConst)?;
                token.text().parse::<i64>().map(Expr::integer).map_err(|_| invalid())
            }
            TokenClass::RealConst => {
                self.eat(TokenClass::RealConst)?;
                token.text().parse::<f64>().map(Expr::real).map_err(|_| invalid())
            }
            TokenClass::LParen => {
                self.eat(TokenClass::LParen)?;
                self.enter(token.position())?;
                let expr = self.expr()?;
                self.leave(1);
                self.eat(TokenClass::RParen)?;
                Ok(expr)
            }
            TokenClass::Id => Ok(Expr::Var(self.variable()?)),
            _ => Err(self.error("expression")),
        }
    }
}

pub fn parse(input: &str) -> Result<Program, Error> {
    Parser::new(input)?.parse()
}

pub fn parse_expression(input: &str) -> Result<Expr, Error> {
    Parser::new(input)?.parse_expression()
}
