//! The uniform result convention.
//!
//! Every operation answers with exactly one of four shapes, so the host can
//! tell "done", "done with a value", "failed" and "yielded" apart without
//! looking at anything but the shape.

use crate::error::BridgeError;
use crate::term::Term;
use std::fmt;

/// Why an operation failed
#[derive(Debug, Clone, PartialEq)]
pub enum Reason {
    /// Message bytes, exactly as produced.
    ///
    /// VM error objects are arbitrary Lua strings and need not be UTF-8.
    Message(Vec<u8>),
    /// Raw VM status code, when the VM left no string to report
    Code(i32),
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Message(message) => write!(f, "{}", String::from_utf8_lossy(message)),
            Reason::Code(code) => write!(f, "status {}", code),
        }
    }
}

/// Result of one bridge operation
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Success with nothing to report
    Ok,
    /// Success with a value
    Value(Term),
    /// Failure
    Error(Reason),
    /// The VM reported a yield
    Yield,
}

impl Reply {
    /// Wrap a value
    pub fn value(value: impl Into<Term>) -> Self {
        Reply::Value(value.into())
    }

    /// Failure with a message
    pub fn message(message: impl Into<Vec<u8>>) -> Self {
        Reply::Error(Reason::Message(message.into()))
    }

    /// Check for either success shape
    pub fn is_ok(&self) -> bool {
        matches!(self, Reply::Ok | Reply::Value(_))
    }

    /// Check for failure
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// The value of a `Value` reply
    pub fn as_value(&self) -> Option<&Term> {
        match self {
            Reply::Value(term) => Some(term),
            _ => None,
        }
    }

    /// The reason of an `Error` reply
    pub fn as_reason(&self) -> Option<&Reason> {
        match self {
            Reply::Error(reason) => Some(reason),
            _ => None,
        }
    }
}

impl From<BridgeError> for Reply {
    fn from(err: BridgeError) -> Self {
        Reply::Error(err.reason())
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ok => write!(f, "ok"),
            Reply::Value(term) => write!(f, "{{ok, {}}}", term),
            Reply::Error(reason) => write!(f, "{{error, {}}}", reason),
            Reply::Yield => write!(f, "yield"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_shapes() {
        assert!(Reply::Ok.is_ok());
        assert!(Reply::value(3i64).is_ok());
        assert!(Reply::message("boom").is_error());
        assert!(!Reply::Yield.is_ok());
        assert!(!Reply::Yield.is_error());
        assert_eq!(Reply::value(true).as_value(), Some(&Term::Boolean(true)));
    }

    #[test]
    fn test_reply_from_error() {
        let reply = Reply::from(BridgeError::NotAResource);
        assert_eq!(
            reply.as_reason(),
            Some(&Reason::Message(
                b"First argument is not a Lua VM instance".to_vec()
            ))
        );

        let reply = Reply::from(BridgeError::Runtime {
            status: 2,
            message: None,
        });
        assert_eq!(reply, Reply::Error(Reason::Code(2)));
    }

    #[test]
    fn test_reply_display() {
        assert_eq!(Reply::Ok.to_string(), "ok");
        assert_eq!(Reply::value(7i64).to_string(), "{ok, 7}");
        assert_eq!(Reply::Error(Reason::Code(4)).to_string(), "{error, status 4}");
        assert_eq!(Reply::message("boom").to_string(), "{error, boom}");
    }

    #[test]
    fn test_message_keeps_every_byte() {
        let reply = Reply::message(vec![0xff, 0x00, 0xfe]);
        assert_eq!(
            reply.as_reason(),
            Some(&Reason::Message(vec![0xff, 0x00, 0xfe]))
        );
    }
}
