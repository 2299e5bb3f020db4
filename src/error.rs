use std::fmt;

/// Errors surfaced by the interpreter, one variant per error kind.
/// Every error unwinds to the nearest top-level driver (the REPL or `load`);
/// there is no language-level catch form.
#[derive(Debug, Clone)]
pub enum LispError {
    /// The reader could not complete a form.
    Parse(String),

    /// The evaluator could not resolve a symbol.
    Unbound(String),

    /// An operand or argument has the wrong variant.
    Type(String),

    /// Wrong number of arguments, including special-form shape violations.
    Arity(String),

    /// The head of an application is not callable.
    NotCallable(String),

    /// Divide by zero, improper apply/macro list, and similar.
    Runtime(String),

    /// Cons-cell arena capacity exceeded.
    HeapOverflow,
}

impl fmt::Display for LispError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LispError::Parse(msg) => write!(f, "Parse error: {}", msg),
            LispError::Unbound(name) => write!(f, "Unresolvable symbol: {}", name),
            LispError::Type(msg) => write!(f, "Type error: {}", msg),
            LispError::Arity(msg) => write!(f, "Invalid arguments: {}", msg),
            LispError::NotCallable(msg) => write!(f, "Not callable: {}", msg),
            LispError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
            LispError::HeapOverflow => write!(f, "Error: heap capacity exceeded"),
        }
    }
}

impl std::error::Error for LispError {}

pub type Result<T> = std::result::Result<T, LispError>;
