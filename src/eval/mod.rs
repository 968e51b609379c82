//! Interface to the Lisp evaluator.
//!
//! The evaluator itself lives outside this crate. What it shares with the
//! reader is the object model (see [`crate::data`]) and the calling
//! convention for builtins, declared here.

use crate::data::{Expr, Storage, TypeMismatch};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The program did something wrong, e.g. called a function with the wrong arguments.
    UserError(String),
    /// The interpreter did something wrong.
    Fault(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UserError(e) => write!(f, "error: {e}"),
            Error::Fault(e) => write!(f, "internal fault: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<TypeMismatch> for Error {
    fn from(value: TypeMismatch) -> Self {
        Error::Fault(value.to_string())
    }
}

/// A Builtin is a native procedure: it takes its (evaluated) argument list
/// and the current environment, and produces a value.
pub type Builtin =
    for<'a> fn(store: &'a Storage, args: Expr<'a>, env: Expr<'a>) -> Result<Expr<'a>, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Tag;

    #[test]
    fn type_mismatch_is_a_fault() {
        let err: Error = TypeMismatch {
            expected: Tag::Cons,
            found: Tag::Atom,
        }
        .into();
        assert_eq!(
            err,
            Error::Fault("type mismatch: expected cons, found atom".to_owned())
        );
        assert_eq!(
            err.to_string(),
            "internal fault: type mismatch: expected cons, found atom"
        );
    }
}
