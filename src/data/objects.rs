use std::fmt::{Debug, Display};

use crate::eval::Builtin;

use super::{Bind, Storage, StoredPair, StoredPtr, StoredValue, Tag};

/// A Lisp expression, as returned by the reader.
///
/// `None` is the empty list `()`. It is not an atom and has no storage slot.
pub type Expr<'a> = Option<Ptr<'a>>;

/// Enum for a Lisp object.
#[derive(Debug, Clone, Copy)]
pub enum Object<'a> {
    Atom(Symbol<'a>),
    Cons(Pair<'a>),
    Builtin(Builtin),
    Closure(Lambda<'a>),
}

/// An ID for a stored object: a combination of index and type-tag,
/// bound to the store that holds it.
#[derive(Clone, Copy)]
pub struct Ptr<'a> {
    pub(super) raw: StoredPtr,
    store: &'a Storage,
}

impl PartialEq for Ptr<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw && core::ptr::eq(self.store, other.store)
    }
}

impl Eq for Ptr<'_> {}

impl Display for Ptr<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.raw, f)
    }
}

impl Debug for Ptr<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Id")
            .field("idx", &self.idx())
            .field("tag", &self.tag())
            .finish()
    }
}

/// Error for an accessor called on the wrong kind of object.
///
/// This is a contract violation by the caller, not a problem with the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMismatch {
    pub expected: Tag,
    pub found: Tag,
}

impl Display for TypeMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "type mismatch: expected {}, found {}", self.expected, self.found)
    }
}

impl std::error::Error for TypeMismatch {}

impl<'a> Ptr<'a> {
    pub fn get(&self) -> Object<'a> {
        self.store.get(*self)
    }

    /// The store this pointer is bound to.
    pub fn store(&self) -> &'a Storage {
        self.store
    }

    #[inline]
    pub fn tag(&self) -> Tag {
        self.raw.tag()
    }

    #[inline]
    pub(super) fn idx(&self) -> usize {
        self.raw.idx()
    }

    #[inline]
    pub fn is_atom(&self) -> bool {
        self.tag() == Tag::Atom
    }
    #[inline]
    pub fn is_cons(&self) -> bool {
        self.tag() == Tag::Cons
    }
    #[inline]
    pub fn is_builtin(&self) -> bool {
        self.tag() == Tag::Builtin
    }
    #[inline]
    pub fn is_closure(&self) -> bool {
        self.tag() == Tag::Closure
    }

    fn expect_tag(&self, expected: Tag) -> Result<(), TypeMismatch> {
        let found = self.tag();
        if found == expected {
            Ok(())
        } else {
            Err(TypeMismatch { expected, found })
        }
    }

    pub fn as_symbol(&self) -> Result<Symbol<'a>, TypeMismatch> {
        self.expect_tag(Tag::Atom)?;
        Ok(self.store.bind(self.idx()))
    }

    /// The name of an atom.
    pub fn atom_name(&self) -> Result<String, TypeMismatch> {
        Ok(self.as_symbol()?.name())
    }

    pub fn as_pair(&self) -> Result<Pair<'a>, TypeMismatch> {
        self.expect_tag(Tag::Cons)?;
        Ok(self
            .get()
            .as_pair()
            .expect("cons-tagged pointers always resolve to pairs"))
    }

    /// The first element of a cons cell.
    pub fn head(&self) -> Result<Expr<'a>, TypeMismatch> {
        Ok(self.as_pair()?.car)
    }

    /// The rest of a cons cell; `None` at the end of a list.
    pub fn tail(&self) -> Result<Expr<'a>, TypeMismatch> {
        Ok(self.as_pair()?.cdr)
    }

    pub fn as_builtin(&self) -> Result<Builtin, TypeMismatch> {
        self.expect_tag(Tag::Builtin)?;
        Ok(self
            .get()
            .as_builtin()
            .expect("builtin-tagged pointers always resolve to builtins"))
    }

    pub fn as_closure(&self) -> Result<Lambda<'a>, TypeMismatch> {
        self.expect_tag(Tag::Closure)?;
        Ok(self
            .get()
            .as_closure()
            .expect("closure-tagged pointers always resolve to closures"))
    }
}

impl<'a> Object<'a> {
    pub(super) fn tag(&self) -> Tag {
        match self {
            Object::Atom(_) => Tag::Atom,
            Object::Cons(_) => Tag::Cons,
            Object::Builtin(_) => Tag::Builtin,
            Object::Closure(_) => Tag::Closure,
        }
    }

    pub fn as_symbol(&self) -> Option<Symbol<'a>> {
        match self {
            Object::Atom(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_pair(&self) -> Option<Pair<'a>> {
        match self {
            Object::Cons(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_builtin(&self) -> Option<Builtin> {
        match self {
            Object::Builtin(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_closure(&self) -> Option<Lambda<'a>> {
        match self {
            Object::Closure(l) => Some(*l),
            _ => None,
        }
    }
}

/// Writes "()" for the empty list, or the pointer otherwise.
fn fmt_expr(e: &Expr<'_>, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match e {
        Some(p) => Display::fmt(p, f),
        None => f.write_str("()"),
    }
}

impl Display for Object<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Object::Atom(s) => f.write_str(&s.name()),
            // As with the store's debug output, we render the pointers, not the objects.
            Object::Cons(Pair { car, cdr }) => {
                f.write_str("(")?;
                fmt_expr(car, f)?;
                f.write_str(" . ")?;
                fmt_expr(cdr, f)?;
                f.write_str(")")
            }
            Object::Builtin(_) => f.write_str("#<builtin>"),
            Object::Closure(Lambda { params, body }) => {
                f.write_str("#<lambda ")?;
                fmt_expr(params, f)?;
                f.write_str(" ")?;
                fmt_expr(body, f)?;
                f.write_str(">")
            }
        }
    }
}

impl<'a> From<Pair<'a>> for Object<'a> {
    fn from(value: Pair<'a>) -> Self {
        Object::Cons(value)
    }
}

impl<'a> From<Symbol<'a>> for Object<'a> {
    fn from(value: Symbol<'a>) -> Self {
        Object::Atom(value)
    }
}

impl<'a> From<Lambda<'a>> for Object<'a> {
    fn from(value: Lambda<'a>) -> Self {
        Object::Closure(value)
    }
}

impl From<Builtin> for Object<'_> {
    fn from(value: Builtin) -> Self {
        Object::Builtin(value)
    }
}

/// A cons cell.
///
/// Either side may be the empty list: `(())` has an empty head,
/// and the last cell of a proper list has an empty tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair<'a> {
    pub car: Expr<'a>,
    pub cdr: Expr<'a>,
}

impl<'a> Pair<'a> {
    pub fn cons(car: Expr<'a>, cdr: Expr<'a>) -> Self {
        Self { car, cdr }
    }
}

/// A user-defined procedure: a parameter list and a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lambda<'a> {
    pub params: Expr<'a>,
    pub body: Expr<'a>,
}

/// An interned atom name.
#[derive(Clone, Copy)]
pub struct Symbol<'a> {
    symbol: string_interner::DefaultSymbol,
    store: &'a Storage,
}

impl Symbol<'_> {
    pub fn name(&self) -> String {
        self.store.resolve(self.symbol)
    }

    pub(super) fn idx(&self) -> usize {
        string_interner::Symbol::to_usize(self.symbol)
    }

    pub(super) fn store(&self) -> &Storage {
        self.store
    }

    /// Whether the two symbols spell the same name.
    /// Symbols from the same store compare by identity.
    pub fn same_name(&self, other: &Symbol<'_>) -> bool {
        if core::ptr::eq(self.store, other.store) {
            self.symbol == other.symbol
        } else {
            self.name() == other.name()
        }
    }
}

impl Debug for Symbol<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Symbol").field(&self.name()).finish()
    }
}

impl<'a> Bind<'a> for Ptr<'a> {
    type Free = StoredPtr;

    fn bind(store: &'a Storage, raw: Self::Free) -> Self {
        Self { raw, store }
    }
}

impl<'a> Bind<'a> for Symbol<'a> {
    type Free = usize;

    fn bind(store: &'a Storage, idx: Self::Free) -> Self {
        let symbol =
            <string_interner::DefaultSymbol as string_interner::Symbol>::try_from_usize(idx)
                .expect("atom pointers always hold a valid symbol index");
        Self { symbol, store }
    }
}

fn bind_expr(store: &Storage, raw: Option<StoredPtr>) -> Expr<'_> {
    raw.map(|raw| store.bind(raw))
}

impl<'a> Bind<'a> for Pair<'a> {
    type Free = StoredPair;

    fn bind(store: &'a Storage, raw: Self::Free) -> Self {
        Self {
            car: bind_expr(store, raw.car),
            cdr: bind_expr(store, raw.cdr),
        }
    }
}

impl<'a> Bind<'a> for Lambda<'a> {
    type Free = StoredPair;

    fn bind(store: &'a Storage, raw: Self::Free) -> Self {
        Self {
            params: bind_expr(store, raw.car),
            body: bind_expr(store, raw.cdr),
        }
    }
}

impl<'a> Bind<'a> for Object<'a> {
    type Free = (StoredPtr, StoredValue);

    fn bind(store: &'a Storage, (ptr, value): Self::Free) -> Self {
        match (ptr.tag(), value) {
            (Tag::Cons, StoredValue::Pair(p)) => Object::Cons(Pair::bind(store, p)),
            (Tag::Closure, StoredValue::Pair(p)) => Object::Closure(Lambda::bind(store, p)),
            (Tag::Builtin, StoredValue::Builtin(f)) => Object::Builtin(f),
            (tag, _) => panic!("pointer tag {tag} does not match the stored value"),
        }
    }
}
