use crate::lexer::Position;


#[derive(Debug, PartialEq, Copy, Clone)]
pub enum BinOp {
    Plus,
    Minus,
    Times,
    IntDiv,
    FloatDiv,
    Eq,
    Gte,
    Lte,
    Gt,
    Lt,
}

#[derive(Debug, PartialEq, Copy, Clone)]
pub enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Debug, PartialEq, Copy, Clone)]
pub enum Number {
    Integer(i64),
    Real(f64),
}

#[derive(Debug, PartialEq, Copy, Clone)]
pub enum TypeSpec {
    Integer,
    Real,
}

impl TypeSpec {
    pub fn name(&self) -> &'static str {
        match self {
            TypeSpec::Integer => "INTEGER",
            TypeSpec::Real => "REAL",
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Var {
    pub name: String,
    pub position: Position,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expr {
    Num(Number),
    /// Operator position is kept for runtime errors.
    BinOp(BinOp, Box<Expr>, Box<Expr>, Position),
    UnaryOp(UnaryOp, Box<Expr>, Position),
    Var(Var),
}

impl Expr {
    pub fn integer(i: i64) -> Expr {
        Expr::Num(Number::Integer(i))
    }
    pub fn real(x: f64) -> Expr {
        Expr::Num(Number::Real(x))
    }
    pub fn binop(op: BinOp, l: Expr, r: Expr, position: Position) -> Expr {
        Expr::BinOp(op, Box::new(l), Box::new(r), position)
    }
    pub fn unary(op: UnaryOp, e: Expr, position: Position) -> Expr {
        Expr::UnaryOp(op, Box::new(e), position)
    }
    pub fn var(name: &str, position: Position) -> Expr {
        Expr::Var(Var { name: name.to_string(), position })
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct ProcedureCall {
    pub name: String,
    pub args: Vec<Expr>,
    pub position: Position,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Statement {
    Compound(Vec<Statement>),
    Assign(Var, Expr),
    If(Expr, Box<Statement>, Option<Box<Statement>>),
    While(Expr, Box<Statement>),
    ProcedureCall(ProcedureCall),
    NoOp,
}

#[derive(Debug, PartialEq, Clone)]
pub struct VarDecl {
    pub var: Var,
    pub type_spec: TypeSpec,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Param {
    pub var: Var,
    pub type_spec: TypeSpec,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ProcedureDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub block: Block,
    pub position: Position,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Declaration {
    Var(VarDecl),
    Procedure(ProcedureDecl),
}

#[derive(Debug, PartialEq, Clone)]
pub struct Block {
    pub declarations: Vec<Declaration>,
    pub body: Vec<Statement>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Program {
    pub name: String,
    pub block: Block,
}

impl Block {
    pub fn variables(&self) -> impl Iterator<Item = &VarDecl> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Var(v) => Some(v),
            Declaration::Procedure(_) => None,
        })
    }

    pub fn procedures(&self) -> impl Iterator<Item = &ProcedureDecl> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Procedure(p) => Some(p),
            Declaration::Var(_) => None,
        })
    }
}
