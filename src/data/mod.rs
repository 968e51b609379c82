//! Lisp data types and allocators.
//!
//! The store is an arena: cons cells, closures, and builtins live in a growable
//! vector and are addressed by `Ptr`s, which carry the type of the object.
//! The arena can grow but not shrink piecewise; it is freed in bulk with
//! [`Storage::reset`], once no pointers are outstanding.
//!
//! Atoms are interned, and perpetual: an atom pointer holds the index of its
//! name in the symbol table, so equal names give identical pointers and
//! atoms take no space in the arena.
//!
//! The empty list is not an object. It is the `None` of an [`Expr`].

mod list;
mod objects;
mod tag;

pub use list::{structurally_equal, ListIter};
pub use objects::*;
pub use tag::Tag;

use std::cell::{Cell, RefCell};
use std::cmp::max;

use crate::eval::Builtin;

/// Storage allows representing all objects read in a session.
#[derive(Default)]
pub struct Storage {
    objects: RefCell<Vec<StoredValue>>,

    symbols: RefCell<string_interner::DefaultStringInterner>,

    high_water: Cell<StorageStats>,
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct StorageStats {
    pub objects: usize,
    pub symbols: usize,
}

impl StorageStats {
    fn max(&self, other: &StorageStats) -> StorageStats {
        StorageStats {
            objects: max(self.objects, other.objects),
            symbols: max(self.symbols, other.symbols),
        }
    }
}

/// A mark in the arena, for discarding objects allocated after it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Checkpoint {
    objects: usize,
}

/// Bind is a trait for binding stored types to the storage that holds them:
/// applying the Storage object lifetime to the underlying object.
trait Bind<'a> {
    type Free;

    fn bind(store: &'a Storage, free: Self::Free) -> Self;
}

mod regex {
    use regex::Regex;
    use std::sync::OnceLock;

    pub(super) fn atom() -> &'static Regex {
        static ATOM: OnceLock<Regex> = OnceLock::new();
        ATOM.get_or_init(|| {
            // One or more characters, none of them whitespace (with vertical tab) or a paren.
            Regex::new(r"\A[^ \t\n\r\x0B\x0C()]+\z").expect("could not compile regex for atom")
        })
    }
}

/// Reports whether `name` can be the name of an atom:
/// non-empty, with no ASCII whitespace, vertical tab, or parentheses.
pub fn is_atom_name(name: &str) -> bool {
    regex::atom().is_match(name)
}

impl Storage {
    fn bind<'a, T: Bind<'a>>(&'a self, raw: T::Free) -> T {
        T::bind(self, raw)
    }

    pub fn current_stats(&self) -> StorageStats {
        StorageStats {
            objects: self.objects.borrow().len(),
            symbols: self.symbols.borrow().len(),
        }
    }

    pub fn max_stats(&self) -> StorageStats {
        self.current_stats().max(&self.high_water.get())
    }

    fn record_high_water(&self) {
        let stats = self.max_stats();
        self.high_water.set(stats);
    }

    /// Add an atom to the symbol table,
    /// or return the pointer to this atom if already present.
    pub fn put_atom(&self, name: &str) -> Ptr<'_> {
        debug_assert!(is_atom_name(name), "invalid atom name {name:?}");
        let symbol = self.symbols.borrow_mut().get_or_intern(name);
        let idx = string_interner::Symbol::to_usize(symbol);
        self.bind(StoredPtr::new(idx, Tag::Atom))
    }

    /// Allocate a cons cell.
    pub fn put_cons<'a>(&'a self, head: Expr<'a>, tail: Expr<'a>) -> Ptr<'a> {
        self.put(Pair::cons(head, tail))
    }

    pub fn put_builtin(&self, f: Builtin) -> Ptr<'_> {
        self.put(f)
    }

    pub fn put_closure<'a>(&'a self, params: Expr<'a>, body: Expr<'a>) -> Ptr<'a> {
        self.put(Lambda { params, body })
    }

    /// Stores the Lisp object in storage.
    pub fn put<'a>(&'a self, value: impl Into<Object<'a>>) -> Ptr<'a> {
        let object: Object<'a> = value.into();
        let stored = match object {
            // Interned already; no slot needed.
            Object::Atom(s) => {
                assert!(
                    core::ptr::eq(s.store(), self),
                    "symbol {s:?} belongs to a different store"
                );
                return self.bind(StoredPtr::new(s.idx(), Tag::Atom));
            }
            Object::Cons(Pair { car, cdr }) => StoredValue::Pair(StoredPair {
                car: self.unbind(car),
                cdr: self.unbind(cdr),
            }),
            Object::Closure(Lambda { params, body }) => StoredValue::Pair(StoredPair {
                car: self.unbind(params),
                cdr: self.unbind(body),
            }),
            Object::Builtin(f) => StoredValue::Builtin(f),
        };
        let mut objects = self.objects.borrow_mut();
        let slot = objects.len();
        objects.push(stored);
        self.bind(StoredPtr::new(slot, object.tag()))
    }

    /// Strip the lifetime from a pointer that is about to be stored.
    fn unbind(&self, e: Expr<'_>) -> Option<StoredPtr> {
        e.map(|p| {
            assert!(
                core::ptr::eq(p.store(), self),
                "pointer {p} belongs to a different store"
            );
            p.raw
        })
    }

    pub fn get<'a>(&'a self, ptr: Ptr<'a>) -> Object<'a> {
        if ptr.is_atom() {
            return Object::Atom(self.bind(ptr.idx()));
        }
        let objects = self.objects.borrow();
        let idx = ptr.idx();
        assert!(
            idx < objects.len(),
            "pointer {ptr} is past the end of the arena ({} objects)",
            objects.len()
        );
        let stored = objects[idx];
        drop(objects);
        self.bind((ptr.raw, stored))
    }

    fn resolve(&self, symbol: string_interner::DefaultSymbol) -> String {
        self.symbols
            .borrow()
            .resolve(symbol)
            .expect("all atoms bound to this store should be present in the symbol table")
            .to_owned()
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            objects: self.objects.borrow().len(),
        }
    }

    /// Discard every object allocated since the checkpoint.
    ///
    /// Pointers to those objects must not be used afterwards.
    pub(crate) fn rollback(&self, mark: Checkpoint) {
        self.record_high_water();
        let mut objects = self.objects.borrow_mut();
        if objects.len() > mark.objects {
            tracing::trace!(
                "rolling back {} objects to checkpoint",
                objects.len() - mark.objects
            );
            objects.truncate(mark.objects);
        }
    }

    /// Free all objects in bulk, e.g. at the end of a read session.
    ///
    /// Interned atom names are kept.
    pub fn reset(&mut self) {
        self.record_high_water();
        tracing::trace!("resetting store with stats: {:?}", self.current_stats());
        self.objects.get_mut().clear();
    }
}

#[derive(Clone, Copy)]
enum StoredValue {
    /// Representation for a cons cell or closure; the pointer tag says which.
    Pair(StoredPair),
    Builtin(Builtin),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct StoredPair {
    car: Option<StoredPtr>,
    cdr: Option<StoredPtr>,
}

/// A "raw" pointer, without lifetime data.
/// This is the internal type for Storage; outside of storage,
/// the Ptr type provides a lifetime bound.
#[derive(Clone, Copy, Hash, PartialEq, Eq)]
struct StoredPtr {
    combined_tag: u32,
}

impl StoredPtr {
    /// Largest index that fits alongside the tag.
    const MAX_IDX: usize = (u32::MAX >> Tag::BITS) as usize;

    fn new(idx: usize, tag: Tag) -> Self {
        assert!(idx <= Self::MAX_IDX, "storage exhausted: index {idx} is too large");
        StoredPtr {
            combined_tag: ((idx as u32) << Tag::BITS) | tag as u32,
        }
    }

    fn tag(&self) -> Tag {
        ((self.combined_tag & Tag::MASK) as u8).into()
    }

    fn idx(&self) -> usize {
        (self.combined_tag >> Tag::BITS) as usize
    }
}

impl std::fmt::Display for StoredPtr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.tag().short_name(), self.idx())
    }
}

impl std::fmt::Debug for StoredPtr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval;

    #[test]
    fn put_again() {
        let store = Storage::default();

        let a = store.put_atom("definition");
        let b = store.put_atom("lambda");
        let a2 = store.put_atom("definition");
        assert_eq!(a, a2);
        assert_ne!(a, b);

        // Atoms are not stored in the arena.
        assert_eq!(store.current_stats().objects, 0);
        assert_eq!(store.current_stats().symbols, 2);
    }

    #[test]
    fn atom_name_is_case_sensitive() {
        let store = Storage::default();
        let lower = store.put_atom("lambda");
        let upper = store.put_atom("LAMBDA");
        assert_ne!(lower, upper);
        assert_eq!(upper.atom_name().unwrap(), "LAMBDA");
    }

    #[test]
    fn cons_accessors() {
        let store = Storage::default();
        let a = store.put_atom("a");
        let b = store.put_atom("b");
        let rest = store.put_cons(Some(b), None);
        let list = store.put_cons(Some(a), Some(rest));

        assert_eq!(list.head(), Ok(Some(a)));
        assert_eq!(list.tail(), Ok(Some(rest)));
        assert_eq!(rest.tail(), Ok(None));
        assert_eq!(store.current_stats().objects, 2);
    }

    #[test]
    fn accessor_on_wrong_variant() {
        let store = Storage::default();
        let a = store.put_atom("a");
        let cell = store.put_cons(Some(a), None);

        assert_eq!(
            a.head(),
            Err(TypeMismatch {
                expected: Tag::Cons,
                found: Tag::Atom
            })
        );
        let err = cell.atom_name().unwrap_err();
        assert_eq!(err.expected, Tag::Atom);
        assert_eq!(err.found, Tag::Cons);
        assert!(cell.as_closure().is_err());
        assert!(cell.as_builtin().is_err());
    }

    fn builtin_first<'a>(
        _store: &'a Storage,
        args: Expr<'a>,
        _env: Expr<'a>,
    ) -> Result<Expr<'a>, eval::Error> {
        let args = args.ok_or_else(|| eval::Error::UserError("first of ()".to_owned()))?;
        Ok(args.head()?)
    }

    #[test]
    fn store_and_call_builtin() {
        let store = Storage::default();
        let f = store.put_builtin(builtin_first);
        let a = store.put_atom("a");
        let args = store.put_cons(Some(a), None);

        assert!(f.is_builtin());
        let got = (f.as_builtin().unwrap())(&store, Some(args), None).unwrap();
        assert_eq!(got, Some(a));

        match (f.as_builtin().unwrap())(&store, Some(a), None) {
            Err(eval::Error::Fault(_)) => (),
            v => panic!("unexpected result: {v:?}"),
        }
    }

    #[test]
    fn store_closure() {
        let store = Storage::default();
        let x = store.put_atom("x");
        let params = store.put_cons(Some(x), None);
        let f = store.put_closure(Some(params), Some(x));

        let Lambda { params: p, body } = f.as_closure().unwrap();
        assert_eq!(p, Some(params));
        assert_eq!(body, Some(x));
        assert_eq!(f.to_string(), "fun#1");
    }

    #[test]
    fn pointer_display() {
        let store = Storage::default();
        let a = store.put_atom("a");
        let b = store.put_atom("b");
        let cell = store.put_cons(Some(b), None);
        assert_eq!(a.to_string(), "sym#0");
        assert_eq!(b.to_string(), "sym#1");
        assert_eq!(cell.to_string(), "obj#0");
        assert_eq!(cell.get().to_string(), "(sym#1 . ())");
        assert_eq!(b.get().to_string(), "b");
    }

    #[test]
    fn rollback_discards_objects() {
        let store = Storage::default();
        let a = store.put_atom("a");
        let kept = store.put_cons(Some(a), None);

        let mark = store.checkpoint();
        let b = store.put_atom("b");
        let one = store.put_cons(Some(b), None);
        let _ = store.put_cons(Some(a), Some(one));
        assert_eq!(store.current_stats().objects, 3);

        store.rollback(mark);
        assert_eq!(store.current_stats().objects, 1);
        assert_eq!(store.max_stats().objects, 3);
        // Symbols are perpetual.
        assert_eq!(store.current_stats().symbols, 2);
        assert_eq!(kept.head(), Ok(Some(a)));
    }

    #[test]
    fn reset_frees_objects() {
        let mut store = Storage::default();
        {
            let a = store.put_atom("a");
            let _ = store.put_cons(Some(a), None);
            let _ = store.put_cons(None, None);
        }
        store.reset();
        assert_eq!(store.current_stats().objects, 0);
        assert_eq!(store.max_stats().objects, 2);

        // Same atom, same pointer, across the reset.
        let a = store.put_atom("a");
        assert_eq!(a.to_string(), "sym#0");
    }

    #[test]
    #[should_panic(expected = "different store")]
    fn reject_foreign_pointer() {
        let one = Storage::default();
        let two = Storage::default();
        let a = one.put_atom("a");
        let _ = two.put_cons(Some(a), None);
    }

    #[test]
    fn atom_names() {
        for name in ["hello", "tree->list", "+", "1.5", "λ", "a\"b", "\u{a0}"] {
            assert!(is_atom_name(name), "rejected atom name {name:?}");
        }
        for name in ["", "a b", "(", ")", "a(b", "tab\there", "line\n", "cr\r", "v\x0Btab"] {
            assert!(!is_atom_name(name), "accepted atom name {name:?}");
        }
    }
}
