//! Host-side values exchanged with the bridge

use crate::error::{BridgeError, BridgeResult};
use crate::registry::HandleId;
use crate::types::{CompareOp, GcMode, LuaType};
use std::fmt;
use std::os::raw::c_int;

/// A host value.
///
/// Strings, userdata and bytecode always travel as [`Term::Binary`] so that
/// embedded zero bytes survive the crossing.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// Signed integer
    Integer(i64),
    /// Double precision float
    Float(f64),
    /// Boolean
    Boolean(bool),
    /// Exact-length byte sequence
    Binary(Vec<u8>),
    /// Symbolic name (type names, gc modes, comparison operators)
    Atom(String),
    /// Reference to a VM created by the bridge
    Handle(HandleId),
}

impl Term {
    /// Create an atom
    pub fn atom(name: impl Into<String>) -> Self {
        Term::Atom(name.into())
    }

    /// Create a binary from anything byte-like
    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Term::Binary(bytes.into())
    }

    /// Short name of the term's kind, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Term::Integer(_) => "integer",
            Term::Float(_) => "float",
            Term::Boolean(_) => "boolean",
            Term::Binary(_) => "binary",
            Term::Atom(_) => "atom",
            Term::Handle(_) => "handle",
        }
    }

    /// Get as integer if this is an integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Term::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as float; integers widen
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Term::Float(f) => Some(*f),
            Term::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as boolean; integers follow the C convention (non-zero is true)
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Term::Boolean(b) => Some(*b),
            Term::Integer(i) => Some(*i != 0),
            _ => None,
        }
    }

    /// Get the bytes of a binary
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Term::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Get the name of an atom
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Term::Atom(name) => Some(name),
            _ => None,
        }
    }

    /// Get the handle id
    pub fn as_handle(&self) -> Option<HandleId> {
        match self {
            Term::Handle(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<i64> for Term {
    fn from(i: i64) -> Self {
        Term::Integer(i)
    }
}

impl From<i32> for Term {
    fn from(i: i32) -> Self {
        Term::Integer(i64::from(i))
    }
}

impl From<usize> for Term {
    fn from(n: usize) -> Self {
        Term::Integer(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Term {
    fn from(f: f64) -> Self {
        Term::Float(f)
    }
}

impl From<bool> for Term {
    fn from(b: bool) -> Self {
        Term::Boolean(b)
    }
}

impl From<Vec<u8>> for Term {
    fn from(bytes: Vec<u8>) -> Self {
        Term::Binary(bytes)
    }
}

impl From<&[u8]> for Term {
    fn from(bytes: &[u8]) -> Self {
        Term::Binary(bytes.to_vec())
    }
}

impl From<HandleId> for Term {
    fn from(id: HandleId) -> Self {
        Term::Handle(id)
    }
}

impl From<LuaType> for Term {
    fn from(ty: LuaType) -> Self {
        Term::atom(ty.name())
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Integer(i) => write!(f, "{}", i),
            Term::Float(fl) => write!(f, "{}", fl),
            Term::Boolean(b) => write!(f, "{}", b),
            Term::Binary(bytes) => write!(f, "<<\"{}\">>", String::from_utf8_lossy(bytes)),
            Term::Atom(name) => write!(f, "{}", name),
            Term::Handle(id) => write!(f, "#Handle<{}>", id),
        }
    }
}

// ============================================================================
// Argument decoding
// ============================================================================

/// Positional view over the arguments of one call.
///
/// Position 0 is the handle; operation arguments start at 1.
pub(crate) struct Args<'a> {
    terms: &'a [Term],
}

impl<'a> Args<'a> {
    pub(crate) fn new(terms: &'a [Term]) -> Self {
        Self { terms }
    }

    fn get(&self, position: usize, expected: &'static str) -> BridgeResult<&'a Term> {
        self.terms
            .get(position)
            .ok_or(BridgeError::bad_argument(position, expected))
    }

    /// A C `int`, used for stack indices and counts
    pub(crate) fn int(&self, position: usize) -> BridgeResult<c_int> {
        const EXPECTED: &str = "32-bit integer";
        let value = self
            .get(position, EXPECTED)?
            .as_integer()
            .ok_or(BridgeError::bad_argument(position, EXPECTED))?;
        c_int::try_from(value).map_err(|_| BridgeError::bad_argument(position, EXPECTED))
    }

    pub(crate) fn integer(&self, position: usize) -> BridgeResult<i64> {
        self.get(position, "integer")?
            .as_integer()
            .ok_or(BridgeError::bad_argument(position, "integer"))
    }

    pub(crate) fn number(&self, position: usize) -> BridgeResult<f64> {
        self.get(position, "number")?
            .as_float()
            .ok_or(BridgeError::bad_argument(position, "number"))
    }

    pub(crate) fn boolean(&self, position: usize) -> BridgeResult<bool> {
        self.get(position, "boolean")?
            .as_boolean()
            .ok_or(BridgeError::bad_argument(position, "boolean"))
    }

    pub(crate) fn binary(&self, position: usize) -> BridgeResult<&'a [u8]> {
        self.get(position, "binary")?
            .as_binary()
            .ok_or(BridgeError::bad_argument(position, "binary"))
    }

    /// A garbage-collector mode, given by name or by its numeric code
    pub(crate) fn gc_mode(&self, position: usize) -> BridgeResult<GcMode> {
        const EXPECTED: &str = "gc mode";
        match self.get(position, EXPECTED)? {
            Term::Atom(name) => name.parse().ok(),
            Term::Integer(code) => c_int::try_from(*code).ok().and_then(GcMode::from_code),
            _ => None,
        }
        .ok_or(BridgeError::bad_argument(position, EXPECTED))
    }

    /// A comparison operator, given by name or by its numeric code
    pub(crate) fn compare_op(&self, position: usize) -> BridgeResult<CompareOp> {
        const EXPECTED: &str = "comparison operator";
        match self.get(position, EXPECTED)? {
            Term::Atom(name) => name.parse().ok(),
            Term::Integer(code) => c_int::try_from(*code).ok().and_then(CompareOp::from_code),
            _ => None,
        }
        .ok_or(BridgeError::bad_argument(position, EXPECTED))
    }
}
