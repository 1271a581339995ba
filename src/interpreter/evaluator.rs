use crate::ast::{BinaryOp, Expr, ExprKind, Stmt, UnaryOp};
use crate::diagnostic::Span;
use crate::value::{Closure, Value};
use super::environment::Environment;
use super::error::RuntimeError;
use super::parser::TokenParser;
use std::rc::Rc;

/// Tree-walking evaluator. One instance owns one top-level environment; a
/// REPL keeps a single instance alive so definitions persist across inputs.
pub struct Interpreter {
    env: Rc<Environment>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            env: Rc::new(Environment::new()),
        }
    }

    /// Evaluates statements in order in the shared top-level environment.
    /// The program's value is the value of its last statement; definitions
    /// and assignments produce no value.
    pub fn run(&mut self, statements: &[Stmt]) -> Result<Option<Value>, RuntimeError> {
        let mut last_value = None;
        for statement in statements {
            last_value = self.execute_statement(statement)?;
        }
        Ok(last_value)
    }

    fn execute_statement(&mut self, statement: &Stmt) -> Result<Option<Value>, RuntimeError> {
        match statement {
            Stmt::Function { name, params, body, span } => {
                let closure = Closure {
                    params: params.clone(),
                    body: body.clone(),
                    env: Rc::clone(&self.env),
                };
                // The closure captures the scope its own binding lands in,
                // which is what makes the name visible inside its body.
                if !self.env.define(name, Value::Closure(Rc::new(closure))) {
                    return Err(RuntimeError::redefinition(name.as_ref(), *span));
                }
                Ok(None)
            }
            Stmt::Assign { name, value, span } => {
                let val = self.evaluate(value)?;
                if !self.env.define(name, val) {
                    return Err(RuntimeError::redefinition(name.as_ref(), *span));
                }
                Ok(None)
            }
            Stmt::Expr(expr) => Ok(Some(self.evaluate(expr)?)),
        }
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match &expr.kind {
            ExprKind::Literal(value) => Ok(value.clone()),

            ExprKind::Identifier(name) => self
                .env
                .get(name)
                .ok_or_else(|| RuntimeError::undefined_variable(name.as_ref(), expr.span)),

            ExprKind::Unary { op: UnaryOp::Not, expr: operand } => {
                match self.evaluate(operand)? {
                    Value::Bool(b) => Ok(Value::Bool(!b)),
                    other => Err(RuntimeError::type_error(
                        format!("`!` expects a boolean, got {}", other.type_name()),
                        expr.span,
                    )),
                }
            }

            ExprKind::Binary { left, op: BinaryOp::And, right } => {
                match self.evaluate(left)? {
                    // Short-circuit: the right operand is never evaluated.
                    Value::Bool(false) => Ok(Value::Bool(false)),
                    Value::Bool(true) => match self.evaluate(right)? {
                        Value::Bool(b) => Ok(Value::Bool(b)),
                        other => Err(RuntimeError::type_error(
                            format!(
                                "`&&` expects a boolean right operand, got {}",
                                other.type_name()
                            ),
                            right.span,
                        )),
                    },
                    other => Err(RuntimeError::type_error(
                        format!(
                            "`&&` expects a boolean left operand, got {}",
                            other.type_name()
                        ),
                        left.span,
                    )),
                }
            }

            ExprKind::Binary { left, op: BinaryOp::Or, right } => {
                match self.evaluate(left)? {
                    // Short-circuit: the right operand is never evaluated.
                    Value::Bool(true) => Ok(Value::Bool(true)),
                    // A false left operand yields the right operand verbatim,
                    // whatever its type; `(n == 0) || (n * fact(n - 1))`
                    // returns an integer on the recursive path.
                    Value::Bool(false) => self.evaluate(right),
                    other => Err(RuntimeError::type_error(
                        format!(
                            "`||` expects a boolean left operand, got {}",
                            other.type_name()
                        ),
                        left.span,
                    )),
                }
            }

            ExprKind::Binary { left, op, right } => {
                let left_value = self.evaluate(left)?;
                let right_value = self.evaluate(right)?;
                eval_binary_op(&left_value, *op, &right_value, expr.span)
            }

            ExprKind::Lambda { params, body } => {
                // Captured at the point of definition, not the point of call.
                let closure = Closure {
                    params: params.clone(),
                    body: body.as_ref().clone(),
                    env: Rc::clone(&self.env),
                };
                Ok(Value::Closure(Rc::new(closure)))
            }

            ExprKind::Call { name, args } => self.call_function(name, args, expr.span),
        }
    }

    fn call_function(
        &mut self,
        name: &str,
        args: &[Expr],
        span: Span,
    ) -> Result<Value, RuntimeError> {
        let callee = self
            .env
            .get(name)
            .ok_or_else(|| RuntimeError::undefined_variable(name, span))?;
        let closure = match callee {
            Value::Closure(closure) => closure,
            other => {
                return Err(RuntimeError::type_error(
                    format!("`{}` is a {}, not a function", name, other.type_name()),
                    span,
                ));
            }
        };

        // Arguments evaluate left to right in the caller's environment.
        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.evaluate(arg)?);
        }

        if arg_values.len() != closure.params.len() {
            return Err(RuntimeError::arity_mismatch(
                name,
                closure.params.len(),
                arg_values.len(),
                span,
            ));
        }

        // The frame chains to the environment captured at definition time,
        // not the caller's: lexical scoping, not dynamic.
        let frame = Rc::new(Environment::with_parent(Rc::clone(&closure.env)));
        for (param, value) in closure.params.iter().zip(arg_values) {
            if !frame.define(param, value) {
                return Err(RuntimeError::redefinition(param.as_ref(), span));
            }
        }

        let saved = std::mem::replace(&mut self.env, frame);
        let result = self.evaluate(&closure.body);
        self.env = saved;
        result
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Integers for arithmetic. Booleans count as 0/1; the recursive
/// short-circuit idiom `(n == 0) || (n * fact(n - 1))` depends on it.
fn arith_operand(value: &Value) -> Option<i64> {
    match value {
        Value::Int(int_value) => Some(*int_value),
        Value::Bool(bool_value) => Some(*bool_value as i64),
        _ => None,
    }
}

fn op_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
        BinaryOp::Eq => "==",
        BinaryOp::NotEq => "!=",
        BinaryOp::Greater => ">",
        BinaryOp::Less => "<",
        BinaryOp::GreaterEq => ">=",
        BinaryOp::LessEq => "<=",
    }
}

/// Strict binary operators; `&&`/`||` never reach here because they must
/// not evaluate their right operand eagerly. Division truncates toward zero
/// and `%` takes the dividend's sign (`i64` semantics).
fn eval_binary_op(
    left: &Value,
    op: BinaryOp,
    right: &Value,
    span: Span,
) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            let (left_int, right_int) = match (arith_operand(left), arith_operand(right)) {
                (Some(l), Some(r)) => (l, r),
                _ => {
                    return Err(RuntimeError::type_error(
                        format!(
                            "`{}` expects integer operands, got {} and {}",
                            op_symbol(op),
                            left.type_name(),
                            right.type_name()
                        ),
                        span,
                    ));
                }
            };
            match op {
                BinaryOp::Add => Ok(Value::Int(left_int + right_int)),
                BinaryOp::Sub => Ok(Value::Int(left_int - right_int)),
                BinaryOp::Mul => Ok(Value::Int(left_int * right_int)),
                BinaryOp::Div => {
                    if right_int == 0 {
                        Err(RuntimeError::division_by_zero(span))
                    } else {
                        Ok(Value::Int(left_int / right_int))
                    }
                }
                BinaryOp::Mod => {
                    if right_int == 0 {
                        Err(RuntimeError::division_by_zero(span))
                    } else {
                        Ok(Value::Int(left_int % right_int))
                    }
                }
                _ => unreachable!(),
            }
        }

        BinaryOp::Eq => Ok(Value::Bool(values_equal(left, right, span)?)),
        BinaryOp::NotEq => Ok(Value::Bool(!values_equal(left, right, span)?)),

        BinaryOp::Greater | BinaryOp::Less | BinaryOp::GreaterEq | BinaryOp::LessEq => {
            match (left, right) {
                (Value::Int(left_int), Value::Int(right_int)) => {
                    let result = match op {
                        BinaryOp::Greater => left_int > right_int,
                        BinaryOp::Less => left_int < right_int,
                        BinaryOp::GreaterEq => left_int >= right_int,
                        BinaryOp::LessEq => left_int <= right_int,
                        _ => unreachable!(),
                    };
                    Ok(Value::Bool(result))
                }
                _ => Err(RuntimeError::type_error(
                    format!(
                        "`{}` expects integer operands, got {} and {}",
                        op_symbol(op),
                        left.type_name(),
                        right.type_name()
                    ),
                    span,
                )),
            }
        }

        BinaryOp::And | BinaryOp::Or => unreachable!("logical operators are evaluated lazily"),
    }
}

/// Structural equality between values of the same runtime type; comparing
/// across types is a type error, not `false`.
fn values_equal(left: &Value, right: &Value, span: Span) -> Result<bool, RuntimeError> {
    if std::mem::discriminant(left) != std::mem::discriminant(right) {
        return Err(RuntimeError::type_error(
            format!(
                "cannot compare {} with {}",
                left.type_name(),
                right.type_name()
            ),
            span,
        ));
    }
    Ok(left == right)
}

/// Tokenizes and parses a full program, mapping stage errors to strings.
pub fn parse_program(source: &str) -> Result<Vec<Stmt>, String> {
    let tokens = crate::lexer::tokenize(source).map_err(|e| e.to_string())?;
    let mut parser = TokenParser::from_lexer_output(tokens, source.len());
    parser.parse().map_err(|e| e.to_string())
}

/// One-shot pipeline: tokenize, parse, and evaluate in a fresh environment.
pub fn parse_and_run(source: &str) -> Result<Option<Value>, String> {
    let statements = parse_program(source)?;
    let mut interpreter = Interpreter::new();
    interpreter.run(&statements).map_err(|e| e.to_string())
}
