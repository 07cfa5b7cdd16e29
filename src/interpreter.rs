use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use log::{debug, trace};

use crate::ast::*;
use crate::error::Error;
use crate::lexer::Position;


pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;
pub const MAX_CALL_DEPTH_LIMIT: usize = 4096;

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Integer(i) => i as f64,
            Number::Real(x) => x,
        }
    }

    /// Conditions are numbers; anything but zero counts as true.
    pub fn is_true(self) -> bool {
        match self {
            Number::Integer(i) => i != 0,
            Number::Real(x) => x != 0.0,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Number::Integer(i) => write!(f, "{}", i),
            Number::Real(x) => write!(f, "{:?}", x),
        }
    }
}

fn bool_number(b: bool) -> Number {
    Number::Integer(if b { 1 } else { 0 })
}

fn compare(l: Number, r: Number) -> Option<Ordering> {
    match (l, r) {
        (Number::Integer(a), Number::Integer(b)) => Some(a.cmp(&b)),
        _ => l.as_f64().partial_cmp(&r.as_f64()),
    }
}

fn int_div(l: Number, r: Number, position: Position) -> Result<Number, Error> {
    let overflow = || Error::runtime("integer overflow", position);
    match (l, r) {
        (Number::Integer(_), Number::Integer(0)) =>
            Err(Error::runtime("division by zero", position)),
        (Number::Integer(a), Number::Integer(b)) =>
            a.checked_div(b).map(Number::Integer).ok_or_else(overflow),
        _ => {
            let divisor = r.as_f64();
            if divisor == 0.0 {
                return Err(Error::runtime("division by zero", position));
            }
            let q = (l.as_f64() / divisor).trunc();
            if q.is_finite() && q >= i64::MIN as f64 && q < i64::MAX as f64 {
                Ok(Number::Integer(q as i64))
            } else {
                Err(overflow())
            }
        }
    }
}

fn binary_op(op: BinOp, l: Number, r: Number, position: Position) -> Result<Number, Error> {
    let overflow = || Error::runtime("integer overflow", position);

    match op {
        BinOp::Plus | BinOp::Minus | BinOp::Times => match (l, r) {
            (Number::Integer(a), Number::Integer(b)) => {
                let result = match op {
                    BinOp::Plus => a.checked_add(b),
                    BinOp::Minus => a.checked_sub(b),
                    _ => a.checked_mul(b),
                };
                result.map(Number::Integer).ok_or_else(overflow)
            }
            _ => {
                let (a, b) = (l.as_f64(), r.as_f64());
                Ok(Number::Real(match op {
                    BinOp::Plus => a + b,
                    BinOp::Minus => a - b,
                    _ => a * b,
                }))
            }
        },
        BinOp::FloatDiv => Ok(Number::Real(l.as_f64() / r.as_f64())),
        BinOp::IntDiv => int_div(l, r, position),
        BinOp::Eq => Ok(bool_number(compare(l, r) == Some(Ordering::Equal))),
        BinOp::Lt => Ok(bool_number(compare(l, r) == Some(Ordering::Less))),
        BinOp::Gt => Ok(bool_number(compare(l, r) == Some(Ordering::Greater))),
        BinOp::Lte => Ok(bool_number(matches!(
            compare(l, r), Some(Ordering::Less) | Some(Ordering::Equal)))),
        BinOp::Gte => Ok(bool_number(matches!(
            compare(l, r), Some(Ordering::Greater) | Some(Ordering::Equal)))),
    }
}

fn unary_op(op: UnaryOp, n: Number, position: Position) -> Result<Number, Error> {
    match (op, n) {
        (UnaryOp::Plus, n) => Ok(n),
        (UnaryOp::Minus, Number::Integer(i)) => i.checked_neg()
            .map(Number::Integer)
            .ok_or_else(|| Error::runtime("integer overflow", position)),
        (UnaryOp::Minus, Number::Real(x)) => Ok(Number::Real(-x)),
    }
}


#[derive(Debug, PartialEq, Copy, Clone)]
pub enum FrameKind {
    Program,
    Procedure,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            FrameKind::Program => "PROGRAM",
            FrameKind::Procedure => "PROCEDURE",
        })
    }
}

/// Storage for one running program or procedure body. Variables are
/// declared up front and hold `None` until the first assignment.
#[derive(Debug, PartialEq, Clone)]
pub struct ActivationRecord {
    pub name: String,
    pub kind: FrameKind,
    pub nesting_level: usize,
    members: BTreeMap<String, Option<Number>>,
    // index of the frame the procedure was declared in
    access_link: Option<usize>,
}

impl ActivationRecord {
    fn new(
        name: &str,
        kind: FrameKind,
        nesting_level: usize,
        access_link: Option<usize>
    ) -> ActivationRecord {
        ActivationRecord {
            name: name.to_string(),
            kind,
            nesting_level,
            members: BTreeMap::new(),
            access_link,
        }
    }

    pub fn get(&self, name: &str) -> Option<Number> {
        self.members.get(name).copied().flatten()
    }

    pub fn declares(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    /// Variables in name order, unassigned ones as `None`.
    pub fn members(&self) -> impl Iterator<Item = (&str, Option<Number>)> {
        self.members.iter().map(|(k, v)| (k.as_str(), *v))
    }

    fn declare(&mut self, name: &str) {
        self.members.entry(name.to_string()).or_insert(None);
    }

    fn set(&mut self, name: &str, value: Number) {
        self.members.insert(name.to_string(), Some(value));
    }
}

impl fmt::Display for ActivationRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)?;
        for (name, value) in self.members() {
            match value {
                Some(v) => write!(f, "\n  {} = {}", name, v)?,
                None => write!(f, "\n  {} = <unassigned>", name)?,
            }
        }
        Ok(())
    }
}


/// Frames and the procedures each frame's block declares, pushed and popped
/// together.
struct CallStack<'a> {
    records: Vec<ActivationRecord>,
    procedures: Vec<HashMap<&'a str, &'a ProcedureDecl>>,
    max_depth: usize,
}

impl<'a> CallStack<'a> {
    fn new(max_depth: usize) -> CallStack<'a> {
        CallStack { records: Vec::new(), procedures: Vec::new(), max_depth }
    }

    fn push(&mut self, mut record: ActivationRecord, block: &'a Block) {
        for v in block.variables() {
            record.declare(&v.var.name);
        }
        let procedures = block.procedures().map(|p| (p.name.as_str(), p)).collect();

        debug!("ENTER: {} {} (level {})", record.kind, record.name, record.nesting_level);
        self.records.push(record);
        self.procedures.push(procedures);
    }

    fn pop(&mut self) -> Option<ActivationRecord> {
        self.procedures.pop();
        let record = self.records.pop();
        if let Some(r) = &record {
            debug!("LEAVE: {} {}", r.kind, r.name);
        }
        record
    }

    /// Nearest frame declaring `name`, following access links from the top.
    fn owner(&self, name: &str) -> Option<usize> {
        let mut frame = self.records.len().checked_sub(1);
        while let Some(i) = frame {
            if self.records[i].declares(name) {
                return Some(i);
            }
            frame = self.records[i].access_link;
        }
        None
    }

    fn lookup(&self, var: &Var) -> Result<Number, Error> {
        self.owner(&var.name)
            .and_then(|i| self.records[i].get(&var.name))
            .ok_or_else(|| Error::Name { name: var.name.clone(), position: var.position })
    }

    fn assign(&mut self, name: &str, value: Number) {
        let target = self.owner(name).or_else(|| self.records.len().checked_sub(1));
        if let Some(i) = target {
            self.records[i].set(name, value);
        }
    }

    fn procedure(&self, name: &str) -> Option<(usize, &'a ProcedureDecl)> {
        let mut frame = self.records.len().checked_sub(1);
        while let Some(i) = frame {
            trace!("lookup: {} in {}", name, self.records[i].name);
            if let Some(&decl) = self.procedures[i].get(name) {
                return Some((i, decl));
            }
            frame = self.records[i].access_link;
        }
        None
    }

    fn block(&mut self, block: &'a Block) -> Result<(), Error> {
        for s in &block.body {
            self.statement(s)?;
        }
        Ok(())
    }

    fn statement(&mut self, s: &'a Statement) -> Result<(), Error> {
        match s {
            Statement::Compound(stmts) => {
                for s in stmts {
                    self.statement(s)?;
                }
            }
            Statement::Assign(var, e) => {
                let value = self.expr(e)?;
                self.assign(&var.name, value);
            }
            Statement::If(cond, cons, alt) => {
                if self.expr(cond)?.is_true() {
                    self.statement(cons)?;
                } else if let Some(alt) = alt {
                    self.statement(alt)?;
                }
            }
            Statement::While(cond, body) => {
                while self.expr(cond)?.is_true() {
                    self.statement(body)?;
                }
            }
            Statement::ProcedureCall(call) => self.call(call)?,
            Statement::NoOp => {}
        }
        Ok(())
    }

    fn call(&mut self, call: &'a ProcedureCall) -> Result<(), Error> {
        // both hold after analysis; checked again for unanalysed trees
        let (declared_in, decl) = self.procedure(&call.name).ok_or_else(|| Error::runtime(
            format!("undefined procedure '{}'", call.name),
            call.position))?;

        if decl.params.len() != call.args.len() {
            return Err(Error::runtime(
                format!(
                    "procedure {} requires {} arguments, {} given",
                    call.name, decl.params.len(), call.args.len()),
                call.position));
        }
        if self.records.len() >= self.max_depth {
            return Err(Error::runtime(
                format!("maximum call depth of {} exceeded", self.max_depth),
                call.position));
        }

        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            args.push(self.expr(arg)?);
        }

        debug!("call: {}({:?})", call.name, args);

        let level = self.records[declared_in].nesting_level + 1;
        let mut record = ActivationRecord::new(
            &decl.name, FrameKind::Procedure, level, Some(declared_in));
        for (param, value) in decl.params.iter().zip(args) {
            record.set(&param.var.name, value);
        }

        self.push(record, &decl.block);
        let result = self.block(&decl.block);
        self.pop();
        result
    }

    fn expr(&self, e: &Expr) -> Result<Number, Error> {
        match e {
            Expr::Num(n) => Ok(*n),
            Expr::BinOp(op, l, r, position) =>
                binary_op(*op, self.expr(l)?, self.expr(r)?, *position),
            Expr::UnaryOp(op, operand, position) =>
                unary_op(*op, self.expr(operand)?, *position),
            Expr::Var(v) => self.lookup(v),
        }
    }
}


/// Tree-walking evaluator. Programs must pass `sem::analyze` first.
#[derive(Debug, Clone)]
pub struct Interpreter {
    max_call_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Interpreter {
        Interpreter::new()
    }
}

impl Interpreter {
    pub fn new() -> Interpreter {
        Interpreter { max_call_depth: DEFAULT_MAX_CALL_DEPTH }
    }

    pub fn with_max_call_depth(max_call_depth: usize) -> Interpreter {
        Interpreter { max_call_depth }
    }

    /// Runs the program and returns its frame as it was when the body
    /// finished.
    pub fn interpret(&self, p: &Program) -> Result<ActivationRecord, Error> {
        let mut stack = CallStack::new(self.max_call_depth);
        let record = ActivationRecord::new(&p.name, FrameKind::Program, 1, None);
        stack.push(record, &p.block);
        stack.block(&p.block)?;
        stack.pop().ok_or_else(|| Error::runtime(
            format!("activation record of {} is missing", p.name),
            Position(1, 1)))
    }

    /// Evaluates a standalone expression; there are no variables in scope.
    pub fn evaluate(&self, e: &Expr) -> Result<Number, Error> {
        CallStack::new(self.max_call_depth).expr(e)
    }
}
