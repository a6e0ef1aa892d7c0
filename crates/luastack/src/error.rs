//! Error types for bridge operations

use crate::reply::Reason;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Broad classification of a [`BridgeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The handle is unknown, forged, or already closed
    Resource,
    /// A positional precondition on the stack slot failed
    Type,
    /// The value at an index cannot become the requested host type
    Conversion,
    /// The VM reported a failure from a call, load, or dump
    Runtime,
    /// The host or the VM ran out of memory
    Allocation,
    /// The host passed malformed arguments
    Argument,
    /// Stack index or stack capacity violation
    Stack,
}

/// Errors produced by bridge operations.
///
/// Every variant maps onto a [`Reason`] so it can travel back to the host
/// as a plain value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    /// The handle argument does not resolve to a registered VM
    #[error("First argument is not a Lua VM instance")]
    NotAResource,

    /// The handle resolved, but its VM has already been closed
    #[error("Lua VM is not initialized")]
    NotInitialized,

    /// The slot does not hold the type the operation indexes into.
    /// The message is the name of the type actually found.
    #[error("{found}")]
    TypeMismatch {
        /// Type the operation requires
        expected: &'static str,
        /// Type found in the slot
        found: &'static str,
    },

    /// The value cannot be converted; the message is the type found
    #[error("{found}")]
    NotConvertible {
        /// Type found in the slot
        found: &'static str,
    },

    /// Userdata whose raw length is zero cannot be told apart from a failed read
    #[error("userdata at index {0} has no raw length")]
    EmptyUserdata(i32),

    /// The VM failed a protected call, load, or dump
    #[error("{}", describe_runtime(.status, .message))]
    Runtime {
        /// Raw VM status code
        status: i32,
        /// String error object, when the VM left one on the stack
        message: Option<Vec<u8>>,
    },

    /// Allocation failure
    #[error("{0}")]
    Allocation(&'static str),

    /// Argument of the wrong kind or out of range
    #[error("argument {position}: expected {expected}")]
    BadArgument {
        /// Position in the argument list, the handle being 0
        position: usize,
        /// Description of what was expected
        expected: &'static str,
    },

    /// No operation with this name
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// Wrong number of arguments for the operation
    #[error("{op} expects {expected} arguments, got {got}")]
    Arity {
        /// Operation name
        op: &'static str,
        /// Expected argument count, handle included
        expected: usize,
        /// Supplied argument count
        got: usize,
    },

    /// Index does not address a slot of the current stack
    #[error("invalid stack index {0}")]
    InvalidIndex(i32),

    /// Fewer values on the stack than the operation consumes
    #[error("stack underflow: need {needed} values, have {available}")]
    StackUnderflow {
        /// Values the operation consumes
        needed: i32,
        /// Values currently on the stack
        available: i32,
    },

    /// The VM refused to grow the stack
    #[error("stack overflow")]
    StackOverflow,
}

fn describe_runtime(status: &i32, message: &Option<Vec<u8>>) -> String {
    match message {
        Some(message) => String::from_utf8_lossy(message).into_owned(),
        None => format!("Lua VM error (status {status})"),
    }
}

impl BridgeError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::NotAResource | BridgeError::NotInitialized => ErrorKind::Resource,
            BridgeError::TypeMismatch { .. } => ErrorKind::Type,
            BridgeError::NotConvertible { .. } | BridgeError::EmptyUserdata(_) => {
                ErrorKind::Conversion
            }
            BridgeError::Runtime { .. } => ErrorKind::Runtime,
            BridgeError::Allocation(_) => ErrorKind::Allocation,
            BridgeError::BadArgument { .. }
            | BridgeError::UnknownOperation(_)
            | BridgeError::Arity { .. } => ErrorKind::Argument,
            BridgeError::InvalidIndex(_)
            | BridgeError::StackUnderflow { .. }
            | BridgeError::StackOverflow => ErrorKind::Stack,
        }
    }

    /// The reason carried back to the host.
    ///
    /// Runtime failures carry the VM's message bytes untouched, or the raw
    /// VM status code when there was no string error object. Everything else
    /// is a message.
    pub fn reason(&self) -> Reason {
        match self {
            BridgeError::Runtime {
                status,
                message: None,
            } => Reason::Code(*status),
            BridgeError::Runtime {
                message: Some(message),
                ..
            } => Reason::Message(message.clone()),
            other => Reason::Message(other.to_string().into_bytes()),
        }
    }

    pub(crate) fn bad_argument(position: usize, expected: &'static str) -> Self {
        BridgeError::BadArgument { position, expected }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_errors_name_the_found_type() {
        let err = BridgeError::TypeMismatch {
            expected: "table",
            found: "number",
        };
        assert_eq!(err.kind(), ErrorKind::Type);
        assert_eq!(err.reason(), Reason::Message(b"number".to_vec()));
    }

    #[test]
    fn test_runtime_reason_falls_back_to_code() {
        let err = BridgeError::Runtime {
            status: 2,
            message: None,
        };
        assert_eq!(err.reason(), Reason::Code(2));
        assert_eq!(err.to_string(), "Lua VM error (status 2)");

        let err = BridgeError::Runtime {
            status: 3,
            message: Some(b"[string \"1+\"]:1: unexpected symbol".to_vec()),
        };
        assert_eq!(
            err.reason(),
            Reason::Message(b"[string \"1+\"]:1: unexpected symbol".to_vec())
        );

        let err = BridgeError::Runtime {
            status: 2,
            message: Some(vec![0xff, 0xfe]),
        };
        assert_eq!(err.reason(), Reason::Message(vec![0xff, 0xfe]));
    }

    #[test]
    fn test_resource_errors() {
        assert_eq!(BridgeError::NotAResource.kind(), ErrorKind::Resource);
        assert_eq!(BridgeError::NotInitialized.kind(), ErrorKind::Resource);
        assert_eq!(
            BridgeError::NotAResource.to_string(),
            "First argument is not a Lua VM instance"
        );
    }
}
