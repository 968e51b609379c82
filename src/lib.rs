//! Reader for a minimal Lisp: turns a character stream into a tree of atoms and cons cells.
//!

pub mod data;
pub mod eval;
pub mod reader;

pub use data::{Expr, Object, Ptr, Storage};
pub use reader::{parse_body, parse_one, ReadErr, ReadResult, Reader};
