use crate::ast::Expr;
use crate::interpreter::Environment;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Str(Rc<str>),
    Closure(Rc<Closure>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(left_int), Value::Int(right_int)) => left_int == right_int,
            (Value::Bool(left_bool), Value::Bool(right_bool)) => left_bool == right_bool,
            (Value::Str(left_str), Value::Str(right_str)) => left_str == right_str,
            (Value::Closure(left_fn), Value::Closure(right_fn)) => Rc::ptr_eq(left_fn, right_fn),
            _ => false,
        }
    }
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        if let Value::Int(int_value) = self {
            Some(*int_value)
        } else {
            None
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Bool(bool_value) = self {
            Some(*bool_value)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Value::Str(string_ref) = self {
            Some(string_ref.as_ref())
        } else {
            None
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Bool(_) => "boolean",
            Value::Str(_) => "string",
            Value::Closure(_) => "function",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(int_value) => write!(f, "{}", int_value),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Str(string_ref) => write!(f, "'{}'", string_ref),
            Value::Closure(closure) => {
                write!(f, "<function/{}>", closure.params.len())
            }
        }
    }
}

/// A function value: parameters, an unevaluated body, and the environment
/// chain live at the definition site. Free variables in the body resolve
/// through that chain, not the caller's.
pub struct Closure {
    pub params: Vec<Rc<str>>,
    pub body: Expr,
    pub env: Rc<Environment>,
}

// Hand-written: a recursive function's captured environment holds the closure
// itself, so deriving Debug through `env` would never terminate.
impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("params", &self.params)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}
