use crate::diagnostic::{Diagnostic, Label, Span};

/// Evaluation failures. Each aborts the enclosing program immediately; none
/// are caught and retried internally.
#[derive(Debug, Clone)]
pub enum RuntimeError {
    UndefinedVariable { name: String, span: Span },
    TypeError { message: String, span: Span },
    DivisionByZero { span: Span },
    ArityMismatch { name: String, expected: usize, found: usize, span: Span },
    Redefinition { name: String, span: Span },
}

impl RuntimeError {
    pub fn undefined_variable(name: impl Into<String>, span: Span) -> Self {
        Self::UndefinedVariable { name: name.into(), span }
    }

    pub fn type_error(message: impl Into<String>, span: Span) -> Self {
        Self::TypeError { message: message.into(), span }
    }

    pub fn division_by_zero(span: Span) -> Self {
        Self::DivisionByZero { span }
    }

    pub fn arity_mismatch(name: impl Into<String>, expected: usize, found: usize, span: Span) -> Self {
        Self::ArityMismatch { name: name.into(), expected, found, span }
    }

    pub fn redefinition(name: impl Into<String>, span: Span) -> Self {
        Self::Redefinition { name: name.into(), span }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::UndefinedVariable { span, .. } => *span,
            Self::TypeError { span, .. } => *span,
            Self::DivisionByZero { span } => *span,
            Self::ArityMismatch { span, .. } => *span,
            Self::Redefinition { span, .. } => *span,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::UndefinedVariable { name, span } => {
                Diagnostic::error(format!("undefined variable `{}`", name))
                    .with_code("E0201")
                    .with_label(Label::primary(*span, "not found in this scope"))
            }
            Self::TypeError { message, span } => {
                Diagnostic::error(format!("type error: {}", message))
                    .with_code("E0202")
                    .with_label(Label::primary(*span, ""))
            }
            Self::DivisionByZero { span } => Diagnostic::error("division by zero")
                .with_code("E0203")
                .with_label(Label::primary(*span, "division by zero here")),
            Self::ArityMismatch { name, expected, found, span } => {
                Diagnostic::error(format!(
                    "function `{}` expects {} argument{}, got {}",
                    name,
                    expected,
                    if *expected == 1 { "" } else { "s" },
                    found
                ))
                .with_code("E0204")
                .with_label(Label::primary(*span, "wrong number of arguments"))
            }
            Self::Redefinition { name, span } => {
                Diagnostic::error(format!("`{}` is already bound in this scope", name))
                    .with_code("E0205")
                    .with_label(Label::primary(*span, "bindings are immutable"))
                    .with_help("a nested call scope may shadow the name instead")
            }
        }
    }
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeError::UndefinedVariable { name, .. } => {
                write!(f, "Undefined variable: {}", name)
            }
            RuntimeError::TypeError { message, .. } => write!(f, "Type error: {}", message),
            RuntimeError::DivisionByZero { .. } => write!(f, "Division by zero"),
            RuntimeError::ArityMismatch { name, expected, found, .. } => write!(
                f,
                "Arity mismatch: {} expects {} arguments, got {}",
                name, expected, found
            ),
            RuntimeError::Redefinition { name, .. } => {
                write!(f, "Redefinition of immutable binding: {}", name)
            }
        }
    }
}

impl std::error::Error for RuntimeError {}
