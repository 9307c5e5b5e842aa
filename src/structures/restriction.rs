//! Server-side filter expressions.
//!
//! A [`Restriction`] is a tree of predicates evaluated by the server when loading a
//! table. Each node serializes as a one-byte type discriminant followed by its fields,
//! children in pre-order. [`Restriction::Null`] means "no filter" and serializes to
//! nothing at all, so callers use [`Restriction::is_null`] to decide whether a filter is
//! attached to a request.
//!
//! # Example
//! ```rust
//! use exmdb::structures::{Op, Restriction, TaggedPropval};
//!
//! let name = TaggedPropval::new(0x3001001F, "devicedata").unwrap();
//! let filter = Restriction::property(Op::Eq, 0, name);
//! assert!(!filter.is_null());
//! ```
use super::{TaggedPropval, ValueError};
use crate::codec::{Buffer, Push, SerializationError};

/// Fuzzy level flags of content restrictions.
pub mod fuzzy {
    pub const FULLSTRING: u32 = 0;
    pub const SUBSTRING: u32 = 1;
    pub const PREFIX: u32 = 2;

    pub const IGNORECASE: u32 = 1 << 16;
    pub const IGNORENONSPACE: u32 = 1 << 17;
    pub const LOOSE: u32 = 1 << 18;
}

mod header {
    pub(crate) const AND: u8 = 0x00;
    pub(crate) const OR: u8 = 0x01;
    pub(crate) const NOT: u8 = 0x02;
    pub(crate) const CONTENT: u8 = 0x03;
    pub(crate) const PROPERTY: u8 = 0x04;
    pub(crate) const PROPCOMP: u8 = 0x05;
    pub(crate) const BITMASK: u8 = 0x06;
    pub(crate) const SIZE: u8 = 0x07;
    pub(crate) const EXIST: u8 = 0x08;
    pub(crate) const SUBOBJECT: u8 = 0x09;
    pub(crate) const COMMENT: u8 = 0x0a;
    pub(crate) const COUNT: u8 = 0x0b;
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Op {
    Lt = 0x00,
    Le = 0x01,
    Gt = 0x02,
    Ge = 0x03,
    Eq = 0x04,
    Ne = 0x05,
    Re = 0x06,
    Member = 0x64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Restriction<'a> {
    /// No filter.
    #[default]
    Null,
    And(Vec<Restriction<'a>>),
    Or(Vec<Restriction<'a>>),
    Not(Box<Restriction<'a>>),
    Content {
        fuzzy_level: u32,
        proptag: u32,
        propval: TaggedPropval<'a>,
    },
    Property {
        op: Op,
        proptag: u32,
        propval: TaggedPropval<'a>,
    },
    PropComp {
        op: Op,
        proptag1: u32,
        proptag2: u32,
    },
    BitMask {
        /// Match if all bits are set, otherwise if any is.
        all: bool,
        proptag: u32,
        mask: u32,
    },
    Size {
        op: Op,
        proptag: u32,
        size: u32,
    },
    Exist {
        proptag: u32,
    },
    SubObject {
        subobject: u32,
        restriction: Box<Restriction<'a>>,
    },
    Comment {
        propvals: Vec<TaggedPropval<'a>>,
        restriction: Option<Box<Restriction<'a>>>,
    },
    Count {
        count: u32,
        restriction: Box<Restriction<'a>>,
    },
}

impl<'a> Restriction<'a> {
    pub fn null() -> Self {
        Self::Null
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn and(restrictions: Vec<Restriction<'a>>) -> Self {
        Self::And(restrictions)
    }

    pub fn or(restrictions: Vec<Restriction<'a>>) -> Self {
        Self::Or(restrictions)
    }

    pub fn not(restriction: Restriction<'a>) -> Self {
        Self::Not(Box::new(restriction))
    }

    /// String match on a property. A `proptag` of 0 uses the tag of `propval`.
    pub fn content(fuzzy_level: u32, proptag: u32, propval: TaggedPropval<'a>) -> Self {
        Self::Content {
            fuzzy_level,
            proptag: if proptag != 0 { proptag } else { propval.tag() },
            propval,
        }
    }

    /// Compare a property against a value. A `proptag` of 0 uses the tag of `propval`.
    pub fn property(op: Op, proptag: u32, propval: TaggedPropval<'a>) -> Self {
        Self::Property {
            op,
            proptag: if proptag != 0 { proptag } else { propval.tag() },
            propval,
        }
    }

    pub fn propcomp(op: Op, proptag1: u32, proptag2: u32) -> Self {
        Self::PropComp {
            op,
            proptag1,
            proptag2,
        }
    }

    pub fn bitmask(all: bool, proptag: u32, mask: u32) -> Self {
        Self::BitMask { all, proptag, mask }
    }

    pub fn size(op: Op, proptag: u32, size: u32) -> Self {
        Self::Size { op, proptag, size }
    }

    pub fn exist(proptag: u32) -> Self {
        Self::Exist { proptag }
    }

    pub fn subobject(subobject: u32, restriction: Restriction<'a>) -> Self {
        Self::SubObject {
            subobject,
            restriction: Box::new(restriction),
        }
    }

    /// Annotate a restriction with 1 to 255 opaque propvals.
    ///
    /// A null `restriction` is treated the same as none.
    pub fn comment(
        propvals: Vec<TaggedPropval<'a>>,
        restriction: Option<Restriction<'a>>,
    ) -> Result<Self, ValueError> {
        if propvals.is_empty() || propvals.len() > u8::MAX as usize {
            return Err(ValueError::CommentCount(propvals.len()));
        }
        Ok(Self::Comment {
            propvals,
            restriction: restriction.filter(|r| !r.is_null()).map(Box::new),
        })
    }

    pub fn count(count: u32, restriction: Restriction<'a>) -> Self {
        Self::Count {
            count,
            restriction: Box::new(restriction),
        }
    }
}

impl Push for Op {
    fn push_into(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        buf.push(&(*self as u8))
    }
}

impl Push for Restriction<'_> {
    fn push_into(&self, buf: &mut Buffer) -> Result<(), SerializationError> {
        match self {
            Self::Null => Ok(()),
            Self::And(children) => {
                buf.push(&header::AND)?;
                buf.push_list32(children)
            }
            Self::Or(children) => {
                buf.push(&header::OR)?;
                buf.push_list32(children)
            }
            Self::Not(child) => buf.push(&(header::NOT, &**child)),
            Self::Content {
                fuzzy_level,
                proptag,
                propval,
            } => buf.push(&(header::CONTENT, fuzzy_level, proptag, propval)),
            Self::Property {
                op,
                proptag,
                propval,
            } => buf.push(&(header::PROPERTY, op, proptag, propval)),
            Self::PropComp {
                op,
                proptag1,
                proptag2,
            } => buf.push(&(header::PROPCOMP, op, proptag1, proptag2)),
            Self::BitMask { all, proptag, mask } => {
                buf.push(&(header::BITMASK, !all, proptag, mask))
            }
            Self::Size { op, proptag, size } => buf.push(&(header::SIZE, op, proptag, size)),
            Self::Exist { proptag } => buf.push(&(header::EXIST, proptag)),
            Self::SubObject {
                subobject,
                restriction,
            } => buf.push(&(header::SUBOBJECT, subobject, &**restriction)),
            Self::Comment {
                propvals,
                restriction,
            } => {
                let count = u8::try_from(propvals.len())
                    .ok()
                    .filter(|&c| c > 0)
                    .ok_or(SerializationError::Invalid {
                        what: "comment restriction",
                        reason: format!("{} propvals, expected 1 to 255", propvals.len()),
                    })?;
                buf.push(&(header::COMMENT, count))?;
                propvals.iter().try_for_each(|tp| buf.push(tp))?;
                match restriction.as_deref().filter(|r| !r.is_null()) {
                    Some(child) => buf.push(&(1u8, child)),
                    None => buf.push(&0u8),
                }
            }
            Self::Count { count, restriction } => {
                buf.push(&(header::COUNT, count, &**restriction))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISPLAYNAME: u32 = 0x3001001F;

    fn encode(res: &Restriction<'_>) -> Vec<u8> {
        let mut buf = Buffer::new();
        buf.push(res).unwrap();
        buf.as_bytes().to_vec()
    }

    fn devicedata() -> TaggedPropval<'static> {
        TaggedPropval::new(DISPLAYNAME, "devicedata").unwrap()
    }

    #[test]
    fn null_writes_nothing() {
        let res = Restriction::null();
        assert!(res.is_null());
        assert!(encode(&res).is_empty());
        assert!(Restriction::default().is_null());
        assert!(!Restriction::exist(DISPLAYNAME).is_null());
    }

    #[test]
    fn proptag_inference() {
        let inferred = Restriction::property(Op::Eq, 0, devicedata());
        let explicit = Restriction::property(Op::Eq, DISPLAYNAME, devicedata());
        assert_eq!(encode(&inferred), encode(&explicit));
    }

    #[test]
    fn content_layout() {
        let res = Restriction::content(fuzzy::FULLSTRING, 0, devicedata());

        let mut expected = vec![0x03, 0, 0, 0, 0, 0x1F, 0x00, 0x01, 0x30, 0x1F, 0x00, 0x01, 0x30];
        expected.extend_from_slice(b"devicedata\0");
        assert_eq!(encode(&res), expected);
    }

    #[test]
    fn nested_layout() {
        let res = Restriction::and(vec![
            Restriction::not(Restriction::exist(0x0E070003)),
            Restriction::bitmask(true, 0x0E070003, 0x10),
            Restriction::size(Op::Gt, 0x0E080003, 100),
        ]);
        assert_eq!(
            encode(&res),
            vec![
                0x00, 3, 0, 0, 0, // and, 3 children
                0x02, 0x08, 0x03, 0x00, 0x07, 0x0E, // not exist
                0x06, 0x00, 0x03, 0x00, 0x07, 0x0E, 0x10, 0, 0, 0, // bitmask all
                0x07, 0x02, 0x03, 0x00, 0x08, 0x0E, 100, 0, 0, 0, // size gt
            ]
        );
    }

    #[test]
    fn subobject_and_count() {
        let res = Restriction::subobject(
            0x0E12000D,
            Restriction::count(5, Restriction::propcomp(Op::Member, 1, 2)),
        );
        assert_eq!(
            encode(&res),
            vec![
                0x09, 0x0D, 0x00, 0x12, 0x0E, 0x0b, 5, 0, 0, 0, 0x05, 0x64, 1, 0, 0, 0, 2, 0, 0, 0,
            ]
        );
    }

    #[test]
    fn comment_child_presence() {
        let with_null = Restriction::comment(vec![devicedata()], Some(Restriction::null())).unwrap();
        let without = Restriction::comment(vec![devicedata()], None).unwrap();
        assert_eq!(encode(&with_null), encode(&without));
        assert_eq!(encode(&without).last(), Some(&0));

        let with_child =
            Restriction::comment(vec![devicedata()], Some(Restriction::exist(7))).unwrap();
        let bytes = encode(&with_child);
        assert_eq!(&bytes[bytes.len() - 6..], &[1, 0x08, 7, 0, 0, 0]);
        assert_eq!(bytes[1], 1);
    }

    #[test]
    fn comment_count_bounds() {
        assert!(matches!(
            Restriction::comment(vec![], None),
            Err(ValueError::CommentCount(0))
        ));
        assert!(matches!(
            Restriction::comment(vec![devicedata(); 256], None),
            Err(ValueError::CommentCount(256))
        ));
        assert!(Restriction::comment(vec![devicedata(); 255], None).is_ok());

        let mut buf = Buffer::new();
        let bypassed = Restriction::Comment {
            propvals: vec![],
            restriction: None,
        };
        assert!(matches!(
            buf.push(&bypassed),
            Err(SerializationError::Invalid { .. })
        ));
    }

    #[test]
    fn clone_is_deep() {
        let original = Restriction::not(Restriction::property(Op::Ne, 0, devicedata()));
        let copy = original.clone();
        drop(original);
        assert_eq!(encode(&copy)[..2], [0x02, 0x04]);
    }
}
