use crate::diagnostic::Span;
use crate::value::Value;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Eq,
    NotEq,
    Greater,
    Less,
    GreaterEq,
    LessEq,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Value),
    Identifier(Rc<str>),
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Lambda {
        params: Vec<Rc<str>>,
        body: Box<Expr>,
    },
    /// A call site names its callee; the name resolves at evaluation time, so
    /// definitions may appear after call sites that reference them.
    Call {
        name: Rc<str>,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Function {
        name: Rc<str>,
        params: Vec<Rc<str>>,
        body: Expr,
        span: Span,
    },
    Assign {
        name: Rc<str>,
        value: Expr,
        span: Span,
    },
    Expr(Expr),
}
