//! Alternative renderings of parsed expressions: LISP-style prefix and
//! reverse Polish postfix.

use crate::ast::{BinOp, Expr, UnaryOp};


pub fn operator_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Plus => "+",
        BinOp::Minus => "-",
        BinOp::Times => "*",
        BinOp::IntDiv => "DIV",
        BinOp::FloatDiv => "/",
        BinOp::Eq => "=",
        BinOp::Gte => ">=",
        BinOp::Lte => "<=",
        BinOp::Gt => ">",
        BinOp::Lt => "<",
    }
}

fn write_prefix(out: &mut String, e: &Expr) {
    match e {
        Expr::Num(n) => out.push_str(&n.to_string()),
        Expr::Var(v) => out.push_str(&v.name),
        Expr::UnaryOp(op, operand, _) => {
            out.push_str(match op {
                UnaryOp::Plus => "(+ ",
                UnaryOp::Minus => "(- ",
            });
            write_prefix(out, operand);
            out.push(')');
        }
        Expr::BinOp(op, l, r, _) => {
            out.push('(');
            out.push_str(operator_symbol(*op));
            out.push(' ');
            write_prefix(out, l);
            out.push(' ');
            write_prefix(out, r);
            out.push(')');
        }
    }
}

fn write_postfix(out: &mut Vec<String>, e: &Expr) {
    match e {
        Expr::Num(n) => out.push(n.to_string()),
        Expr::Var(v) => out.push(v.name.clone()),
        Expr::UnaryOp(UnaryOp::Plus, operand, _) => write_postfix(out, operand),
        Expr::UnaryOp(UnaryOp::Minus, operand, _) => {
            write_postfix(out, operand);
            out.push("neg".to_string());
        }
        Expr::BinOp(op, l, r, _) => {
            write_postfix(out, l);
            write_postfix(out, r);
            out.push(operator_symbol(*op).to_string());
        }
    }
}

/// `(2 + 3 * 5)` becomes `(+ 2 (* 3 5))`.
pub fn to_prefix(e: &Expr) -> String {
    let mut out = String::new();
    write_prefix(&mut out, e);
    out
}

/// `(5 + 3) * 12 / 3` becomes `5 3 + 12 * 3 /`. Unary minus is written as
/// the `neg` operator; unary plus disappears.
pub fn to_postfix(e: &Expr) -> String {
    let mut out = Vec::new();
    write_postfix(&mut out, e);
    out.join(" ")
}
