//! Tags for Lisp object pointers.
//!
//! This is kept as a separate module so the u8 repr is not exposed.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Tag {
    Atom = Self::ATOM,
    Cons = Self::CONS,
    Builtin = Self::BUILTIN,
    Closure = Self::CLOSURE,
}

impl Tag {
    const ATOM: u8 = 0;
    const CONS: u8 = 1;
    const BUILTIN: u8 = 2;
    const CLOSURE: u8 = 3;

    /// Number of low bits of a stored pointer that hold the tag.
    pub(super) const BITS: u32 = 2;
    pub(super) const MASK: u32 = (1 << Self::BITS) - 1;

    /// Short name, used when rendering pointers.
    pub fn short_name(&self) -> &'static str {
        match self {
            Tag::Atom => "sym",
            Tag::Cons => "obj",
            Tag::Builtin => "sys",
            Tag::Closure => "fun",
        }
    }
}

impl From<u8> for Tag {
    fn from(value: u8) -> Self {
        match value {
            Self::ATOM => Tag::Atom,
            Self::CONS => Tag::Cons,
            Self::BUILTIN => Tag::Builtin,
            Self::CLOSURE => Tag::Closure,
            v => unreachable!("invalid tag value {v}"),
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Tag::Atom => "atom",
            Tag::Cons => "cons",
            Tag::Builtin => "builtin",
            Tag::Closure => "closure",
        };
        f.write_str(name)
    }
}
