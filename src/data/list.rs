//! Utility functions over lists.
//!
//! - Walk the elements of a list.
//! - Compare two trees by structure.

use super::{Expr, Object, Pair, TypeMismatch};

/// Iterator over the elements of a list.
///
/// Yields a `TypeMismatch` (and then stops) if the list ends in something
/// other than a cons cell or the empty list, i.e. is improper.
pub struct ListIter<'a> {
    next: Expr<'a>,
}

impl<'a> ListIter<'a> {
    pub fn new(list: Expr<'a>) -> Self {
        ListIter { next: list }
    }
}

impl<'a> Iterator for ListIter<'a> {
    type Item = Result<Expr<'a>, TypeMismatch>;

    fn next(&mut self) -> Option<Self::Item> {
        let ptr = self.next?;
        match ptr.as_pair() {
            Ok(Pair { car, cdr }) => {
                self.next = cdr;
                Some(Ok(car))
            }
            Err(e) => {
                self.next = None;
                Some(Err(e))
            }
        }
    }
}

/// Whether two trees have the same shape and the same atoms.
///
/// Atoms compare by name, so the trees may come from different stores.
/// Builtins compare by function address.
pub fn structurally_equal(a: Expr<'_>, b: Expr<'_>) -> bool {
    // Explicit stack: lists may be far longer than the call stack is deep.
    let mut pending = vec![(a, b)];
    while let Some(next) = pending.pop() {
        let (a, b) = match next {
            (None, None) => continue,
            (Some(a), Some(b)) => (a.get(), b.get()),
            _ => return false,
        };
        match (a, b) {
            (Object::Atom(x), Object::Atom(y)) => {
                if !x.same_name(&y) {
                    return false;
                }
            }
            (Object::Cons(x), Object::Cons(y)) => {
                pending.push((x.cdr, y.cdr));
                pending.push((x.car, y.car));
            }
            (Object::Closure(x), Object::Closure(y)) => {
                pending.push((x.body, y.body));
                pending.push((x.params, y.params));
            }
            (Object::Builtin(x), Object::Builtin(y)) => {
                if x as usize != y as usize {
                    return false;
                }
            }
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Ptr, Storage, Tag};

    fn list<'a>(store: &'a Storage, names: &[&str]) -> Expr<'a> {
        names.iter().rev().fold(None, |cdr, name| {
            let car = store.put_atom(name);
            Some(store.put_cons(Some(car), cdr))
        })
    }

    #[test]
    fn get_list() {
        let store = Storage::default();
        let head = list(&store, &["a", "b", "c"]);

        let got: Vec<String> = ListIter::new(head)
            .map(|e| e.unwrap().unwrap().atom_name().unwrap())
            .collect();
        assert_eq!(got, ["a", "b", "c"]);
    }

    #[test]
    fn empty_list_has_no_elements() {
        assert_eq!(ListIter::new(None).count(), 0);
    }

    #[test]
    fn improper_list() {
        let store = Storage::default();
        let a = store.put_atom("a");
        let b = store.put_atom("b");
        let dotted = store.put_cons(Some(a), Some(b));

        let got: Vec<_> = ListIter::new(Some(dotted)).collect();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0], Ok(Some(a)));
        assert_eq!(
            got[1],
            Err(TypeMismatch {
                expected: Tag::Cons,
                found: Tag::Atom
            })
        );
    }

    #[test]
    fn equal_across_stores() {
        let one = Storage::default();
        let two = Storage::default();
        // Different interning order, so different pointers.
        let _ = two.put_atom("zzz");

        assert!(structurally_equal(
            list(&one, &["a", "b"]),
            list(&two, &["a", "b"])
        ));
        assert!(!structurally_equal(
            list(&one, &["a", "b"]),
            list(&two, &["a", "c"])
        ));
        assert!(!structurally_equal(
            list(&one, &["a", "b"]),
            list(&two, &["a"])
        ));
        assert!(!structurally_equal(list(&one, &["a"]), None));
        assert!(structurally_equal(None, None));
    }

    #[test]
    fn nested_empty_list_differs_from_atom() {
        let store = Storage::default();
        let nil_head: Ptr = store.put_cons(None, None);
        let atom_head = list(&store, &["nil"]);
        assert!(!structurally_equal(Some(nil_head), atom_head));
    }

    #[test]
    fn long_list_is_not_recursive() {
        let store = Storage::default();
        let names: Vec<String> = (0..100_000).map(|i| format!("x{i}")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let a = list(&store, &names);
        let b = list(&store, &names);
        assert_ne!(a, b);
        assert!(structurally_equal(a, b));
    }
}
