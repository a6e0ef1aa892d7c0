//! C FFI bindings for the luastack bridge
//!
//! This module provides a C-compatible API over the operation table.
//! The API follows these principles:
//! - ABI-stable (uses only C-compatible types)
//! - VMs are named by integer handles, never by pointers
//! - One process-wide bridge, configured once with `luastack_init()`
//! - Error handling via out-parameters for lifecycle calls, tagged replies
//!   for operations
//! - Every buffer handed to C is owned by the reply that carries it

use luastack::{Bridge, BridgeConfig, BridgeError, HandleId, Reason, Reply, Term};
use once_cell::sync::OnceCell;
use std::ffi::{CStr, CString};
use std::fmt::Display;
use std::os::raw::{c_char, c_int};
use std::ptr;

// ============================================================================
// C Types
// ============================================================================

/// No value (error replies that only carry a status code)
pub const LS_TERM_NONE: u32 = 0;
/// `integer` holds the value
pub const LS_TERM_INTEGER: u32 = 1;
/// `number` holds the value
pub const LS_TERM_FLOAT: u32 = 2;
/// `integer` holds 0 or 1
pub const LS_TERM_BOOLEAN: u32 = 3;
/// `data`/`len` hold the bytes
pub const LS_TERM_BINARY: u32 = 4;
/// `data`/`len` hold the name
pub const LS_TERM_ATOM: u32 = 5;
/// `integer` holds the handle
pub const LS_TERM_HANDLE: u32 = 6;

/// Success with nothing to report
pub const LS_OK: c_int = 0;
/// Success; `value` holds the result
pub const LS_VALUE: c_int = 1;
/// Failure; `value` holds the message, or `code` the VM status
pub const LS_ERROR: c_int = 2;
/// The VM reported a yield
pub const LS_YIELD: c_int = 3;

/// Tagged host value
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LsTerm {
    /// One of the `LS_TERM_*` constants
    pub tag: u32,
    pub integer: i64,
    pub number: f64,
    pub data: *mut u8,
    pub len: usize,
}

/// Result of `luastack_call()`
#[repr(C)]
#[derive(Debug)]
pub struct LsReply {
    /// One of `LS_OK`, `LS_VALUE`, `LS_ERROR`, `LS_YIELD`
    pub status: c_int,
    pub value: LsTerm,
    /// Raw VM status for errors without a message, 0 otherwise
    pub code: c_int,
}

/// Error information
#[repr(C)]
pub struct LsError {
    message: *mut c_char,
}

static BRIDGE: OnceCell<Bridge> = OnceCell::new();

fn bridge() -> &'static Bridge {
    BRIDGE.get_or_init(Bridge::default)
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert Rust string to C string (caller must free)
unsafe fn rust_to_c_string(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(c_str) => c_str.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Set error out-parameter
unsafe fn set_error(error_out: *mut *mut LsError, error: impl Display) {
    if !error_out.is_null() {
        let message = rust_to_c_string(&error.to_string());
        *error_out = Box::into_raw(Box::new(LsError { message }));
    }
}

impl LsTerm {
    const fn empty() -> Self {
        LsTerm {
            tag: LS_TERM_NONE,
            integer: 0,
            number: 0.0,
            data: ptr::null_mut(),
            len: 0,
        }
    }

    /// Term owning a copy of `bytes`
    fn owned_bytes(tag: u32, bytes: &[u8]) -> Self {
        let data = if bytes.is_empty() {
            ptr::null_mut()
        } else {
            Box::into_raw(bytes.to_vec().into_boxed_slice()) as *mut u8
        };
        LsTerm {
            tag,
            data,
            len: bytes.len(),
            ..LsTerm::empty()
        }
    }

    fn from_term(term: &Term) -> Self {
        match term {
            Term::Integer(i) => LsTerm {
                tag: LS_TERM_INTEGER,
                integer: *i,
                ..LsTerm::empty()
            },
            Term::Float(f) => LsTerm {
                tag: LS_TERM_FLOAT,
                number: *f,
                ..LsTerm::empty()
            },
            Term::Boolean(b) => LsTerm {
                tag: LS_TERM_BOOLEAN,
                integer: i64::from(*b),
                ..LsTerm::empty()
            },
            Term::Binary(bytes) => LsTerm::owned_bytes(LS_TERM_BINARY, bytes),
            Term::Atom(name) => LsTerm::owned_bytes(LS_TERM_ATOM, name.as_bytes()),
            Term::Handle(id) => LsTerm {
                tag: LS_TERM_HANDLE,
                integer: id.as_u64() as i64,
                ..LsTerm::empty()
            },
        }
    }

    /// Decode a caller-owned term
    ///
    /// # Safety
    /// `data` must be valid for `len` bytes when the tag carries bytes
    unsafe fn to_term(self, position: usize) -> Result<Term, BridgeError> {
        let bytes = || {
            if self.len == 0 {
                Ok(Vec::new())
            } else if self.data.is_null() {
                Err(BridgeError::BadArgument {
                    position,
                    expected: "non-null data",
                })
            } else {
                Ok(std::slice::from_raw_parts(self.data, self.len).to_vec())
            }
        };
        Ok(match self.tag {
            LS_TERM_INTEGER => Term::Integer(self.integer),
            LS_TERM_FLOAT => Term::Float(self.number),
            LS_TERM_BOOLEAN => Term::Boolean(self.integer != 0),
            LS_TERM_BINARY => Term::Binary(bytes()?),
            LS_TERM_ATOM => Term::Atom(String::from_utf8_lossy(&bytes()?).into_owned()),
            LS_TERM_HANDLE => Term::Handle(HandleId::from_raw(self.integer as u64)),
            _ => {
                return Err(BridgeError::BadArgument {
                    position,
                    expected: "known term tag",
                })
            }
        })
    }
}

impl LsReply {
    fn from_reply(reply: &Reply) -> Self {
        let (status, value, code) = match reply {
            Reply::Ok => (LS_OK, LsTerm::empty(), 0),
            Reply::Value(term) => (LS_VALUE, LsTerm::from_term(term), 0),
            Reply::Error(Reason::Message(message)) => (
                LS_ERROR,
                LsTerm::owned_bytes(LS_TERM_BINARY, message),
                0,
            ),
            Reply::Error(Reason::Code(code)) => (LS_ERROR, LsTerm::empty(), *code),
            Reply::Yield => (LS_YIELD, LsTerm::empty(), 0),
        };
        LsReply {
            status,
            value,
            code,
        }
    }
}

// ============================================================================
// Bridge Lifecycle Functions
// ============================================================================

/// Configure the process-wide bridge
///
/// Must run before any other call; later calls fail.
///
/// # Arguments
/// * `config_toml` - Null-terminated TOML configuration, or NULL for defaults
/// * `error` - Optional pointer to receive error information
///
/// # Returns
/// * 0 on success
/// * -1 on failure (check error parameter)
///
/// # Safety
/// `config_toml` must be NULL or a valid null-terminated string
#[no_mangle]
pub unsafe extern "C" fn luastack_init(
    config_toml: *const c_char,
    error: *mut *mut LsError,
) -> c_int {
    let config = if config_toml.is_null() {
        BridgeConfig::default()
    } else {
        let text = match CStr::from_ptr(config_toml).to_str() {
            Ok(text) => text,
            Err(_) => {
                set_error(error, "Invalid UTF-8 in configuration");
                return -1;
            }
        };
        match BridgeConfig::from_toml_str(text) {
            Ok(config) => config,
            Err(e) => {
                set_error(error, e);
                return -1;
            }
        }
    };

    match BRIDGE.set(Bridge::new(config)) {
        Ok(()) => {
            tracing::debug!("Bridge initialized");
            0
        }
        Err(_) => {
            set_error(error, "Bridge already initialized");
            -1
        }
    }
}

/// Create a new Lua VM
///
/// # Arguments
/// * `error` - Optional pointer to receive error information
///
/// # Returns
/// * Non-zero handle on success
/// * 0 on failure (check error parameter)
///
/// # Safety
/// The VM must be closed with `luastack_close()`
///
/// # Example (C)
/// ```c
/// LsError* error = NULL;
/// uint64_t vm = luastack_newstate(&error);
/// if (vm == 0) {
///     fprintf(stderr, "Failed to create VM: %s\n", luastack_error_message(error));
///     luastack_error_free(error);
///     return 1;
/// }
/// // Use VM...
/// luastack_close(vm, NULL);
/// ```
#[no_mangle]
pub unsafe extern "C" fn luastack_newstate(error: *mut *mut LsError) -> u64 {
    match bridge().create() {
        Ok(id) => id.as_u64(),
        Err(e) => {
            set_error(error, e);
            0
        }
    }
}

/// Close a Lua VM
///
/// # Arguments
/// * `vm` - Handle returned by `luastack_newstate()`
/// * `error` - Optional pointer to receive error information
///
/// # Returns
/// * 0 on success
/// * -1 if the handle is unknown or already closed
///
/// # Safety
/// `error` must be NULL or a valid pointer
#[no_mangle]
pub unsafe extern "C" fn luastack_close(vm: u64, error: *mut *mut LsError) -> c_int {
    match bridge().close(HandleId::from_raw(vm)) {
        Ok(()) => 0,
        Err(e) => {
            set_error(error, e);
            -1
        }
    }
}

// ============================================================================
// Operation Dispatch
// ============================================================================

/// Run one operation
///
/// # Arguments
/// * `op` - Null-terminated operation name (e.g. "pushstring")
/// * `args` - Arguments, the VM handle first
/// * `nargs` - Number of arguments
/// * `reply` - Receives the result; free it with `luastack_reply_free()`
///
/// # Returns
/// * The reply status (`LS_OK`, `LS_VALUE`, `LS_ERROR`, `LS_YIELD`)
/// * -1 if `reply` is NULL
///
/// # Safety
/// - `op` must be a valid null-terminated string
/// - `args` must point to `nargs` terms whose byte payloads are valid
///
/// # Example (C)
/// ```c
/// LsTerm args[2] = {
///     { .tag = LS_TERM_HANDLE, .integer = vm },
///     { .tag = LS_TERM_INTEGER, .integer = -1 },
/// };
/// LsReply reply;
/// if (luastack_call("tostring", args, 2, &reply) == LS_VALUE) {
///     fwrite(reply.value.data, 1, reply.value.len, stdout);
/// }
/// luastack_reply_free(&reply);
/// ```
#[no_mangle]
pub unsafe extern "C" fn luastack_call(
    op: *const c_char,
    args: *const LsTerm,
    nargs: usize,
    reply: *mut LsReply,
) -> c_int {
    if reply.is_null() {
        return -1;
    }

    let result = decode_call(op, args, nargs)
        .map(|(name, terms)| bridge().call(&name, &terms))
        .unwrap_or_else(Reply::from);

    let out = LsReply::from_reply(&result);
    let status = out.status;
    ptr::write(reply, out);
    status
}

unsafe fn decode_call(
    op: *const c_char,
    args: *const LsTerm,
    nargs: usize,
) -> Result<(String, Vec<Term>), BridgeError> {
    if op.is_null() {
        return Err(BridgeError::UnknownOperation(String::new()));
    }
    let name = CStr::from_ptr(op).to_string_lossy().into_owned();
    if nargs > 0 && args.is_null() {
        return Err(BridgeError::NotAResource);
    }

    let terms = if nargs == 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(args, nargs)
            .iter()
            .enumerate()
            .map(|(position, term)| term.to_term(position))
            .collect::<Result<Vec<_>, _>>()?
    };
    Ok((name, terms))
}

/// Free the payload of a reply
///
/// # Arguments
/// * `reply` - Reply filled by `luastack_call()` (may be NULL)
///
/// # Safety
/// - Reply must have been filled by `luastack_call()`
/// - Calling it twice on the same reply is safe; the payload is cleared
#[no_mangle]
pub unsafe extern "C" fn luastack_reply_free(reply: *mut LsReply) {
    if reply.is_null() {
        return;
    }

    let value = &mut (*reply).value;
    if matches!(value.tag, LS_TERM_BINARY | LS_TERM_ATOM) && !value.data.is_null() {
        let slice = ptr::slice_from_raw_parts_mut(value.data, value.len);
        drop(Box::from_raw(slice));
    }
    *value = LsTerm::empty();
}

// ============================================================================
// Error Functions
// ============================================================================

/// Get error message
///
/// # Arguments
/// * `error` - Pointer to LsError (may be NULL)
///
/// # Returns
/// * Null-terminated error message string
/// * NULL if error is NULL
///
/// # Safety
/// - Returned string is valid until `luastack_error_free()` is called
/// - Do not free the returned string directly
#[no_mangle]
pub unsafe extern "C" fn luastack_error_message(error: *const LsError) -> *const c_char {
    if error.is_null() {
        return ptr::null();
    }

    (*error).message
}

/// Free an error
///
/// # Arguments
/// * `error` - Pointer to LsError (may be NULL)
///
/// # Safety
/// - Error pointer must be valid (created by this API)
/// - Error must not be used after this call
#[no_mangle]
pub unsafe extern "C" fn luastack_error_free(error: *mut LsError) {
    if error.is_null() {
        return;
    }

    if !(*error).message.is_null() {
        let _ = CString::from_raw((*error).message);
    }

    let _ = Box::from_raw(error);
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Get the bridge version string
///
/// # Returns
/// * Null-terminated version string (e.g., "0.2.0")
///
/// # Safety
/// - The returned string is a static string and must not be freed
#[no_mangle]
pub unsafe extern "C" fn luastack_version() -> *const c_char {
    static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr() as *const c_char
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(vm: u64) -> LsTerm {
        LsTerm {
            tag: LS_TERM_HANDLE,
            integer: vm as i64,
            ..LsTerm::empty()
        }
    }

    fn integer(i: i64) -> LsTerm {
        LsTerm {
            tag: LS_TERM_INTEGER,
            integer: i,
            ..LsTerm::empty()
        }
    }

    fn binary(bytes: &[u8]) -> LsTerm {
        LsTerm {
            tag: LS_TERM_BINARY,
            data: bytes.as_ptr() as *mut u8,
            len: bytes.len(),
            ..LsTerm::empty()
        }
    }

    unsafe fn call(op: &CStr, args: &[LsTerm]) -> LsReply {
        let mut reply = LsReply::from_reply(&Reply::Ok);
        luastack_call(op.as_ptr(), args.as_ptr(), args.len(), &mut reply);
        reply
    }

    unsafe fn payload(reply: &LsReply) -> Vec<u8> {
        std::slice::from_raw_parts(reply.value.data, reply.value.len).to_vec()
    }

    #[test]
    fn test_vm_lifecycle() {
        unsafe {
            let mut error: *mut LsError = ptr::null_mut();

            let vm = luastack_newstate(&mut error as *mut *mut LsError);
            assert_ne!(vm, 0);
            assert!(error.is_null());

            assert_eq!(luastack_close(vm, &mut error as *mut *mut LsError), 0);
            assert!(error.is_null());

            assert_eq!(luastack_close(vm, &mut error as *mut *mut LsError), -1);
            assert!(!error.is_null());
            let message = CStr::from_ptr(luastack_error_message(error));
            assert_eq!(
                message.to_str().unwrap(),
                "First argument is not a Lua VM instance"
            );
            luastack_error_free(error);
        }
    }

    #[test]
    fn test_binary_round_trip() {
        unsafe {
            let vm = luastack_newstate(ptr::null_mut());
            let data = b"zero\0bytes\0kept";

            let mut reply = call(c"pushstring", &[handle(vm), binary(data)]);
            assert_eq!(reply.status, LS_OK);
            luastack_reply_free(&mut reply);

            let mut reply = call(c"tostring", &[handle(vm), integer(-1)]);
            assert_eq!(reply.status, LS_VALUE);
            assert_eq!(reply.value.tag, LS_TERM_BINARY);
            assert_eq!(payload(&reply), data.to_vec());
            luastack_reply_free(&mut reply);
            assert!(reply.value.data.is_null());
            luastack_reply_free(&mut reply);

            luastack_close(vm, ptr::null_mut());
        }
    }

    #[test]
    fn test_load_and_call() {
        unsafe {
            let vm = luastack_newstate(ptr::null_mut());

            let mut reply = call(
                c"loadbuffer",
                &[handle(vm), binary(b"return 1+2"), binary(b"")],
            );
            assert_eq!(reply.status, LS_OK);
            luastack_reply_free(&mut reply);

            let mut reply = call(c"pcall", &[handle(vm), integer(0), integer(1)]);
            assert_eq!(reply.status, LS_OK);
            luastack_reply_free(&mut reply);

            let reply = call(c"tointeger", &[handle(vm), integer(-1)]);
            assert_eq!(reply.status, LS_VALUE);
            assert_eq!(reply.value.tag, LS_TERM_INTEGER);
            assert_eq!(reply.value.integer, 3);

            let mut reply = call(c"type", &[handle(vm), integer(-1)]);
            assert_eq!(reply.value.tag, LS_TERM_ATOM);
            assert_eq!(payload(&reply), b"number".to_vec());
            luastack_reply_free(&mut reply);

            luastack_close(vm, ptr::null_mut());
        }
    }

    #[test]
    fn test_error_replies() {
        unsafe {
            let vm = luastack_newstate(ptr::null_mut());

            let mut reply = call(c"getfield", &[handle(vm), integer(1), binary(b"k")]);
            assert_eq!(reply.status, LS_ERROR);
            assert_eq!(payload(&reply), b"none".to_vec());
            luastack_reply_free(&mut reply);

            let mut reply = call(c"loadbuffer", &[handle(vm), binary(b"error({})"), binary(b"")]);
            luastack_reply_free(&mut reply);
            let reply = call(c"pcall", &[handle(vm), integer(0), integer(0)]);
            assert_eq!(reply.status, LS_ERROR);
            assert_eq!(reply.value.tag, LS_TERM_NONE);
            assert_eq!(reply.code, 2);

            let mut reply = call(c"gettop", &[handle(u64::MAX)]);
            assert_eq!(reply.status, LS_ERROR);
            assert_eq!(
                payload(&reply),
                b"First argument is not a Lua VM instance".to_vec()
            );
            luastack_reply_free(&mut reply);

            let bad_tag = LsTerm {
                tag: 99,
                ..LsTerm::empty()
            };
            let mut reply = call(c"pushinteger", &[handle(vm), bad_tag]);
            assert_eq!(reply.status, LS_ERROR);
            luastack_reply_free(&mut reply);

            luastack_close(vm, ptr::null_mut());
        }
    }

    #[test]
    fn test_null_reply_pointer() {
        unsafe {
            let result = luastack_call(c"gettop".as_ptr(), ptr::null(), 0, ptr::null_mut());
            assert_eq!(result, -1);
        }
    }

    #[test]
    fn test_init_after_use_fails() {
        unsafe {
            bridge();
            let mut error: *mut LsError = ptr::null_mut();
            assert_eq!(luastack_init(ptr::null(), &mut error as *mut *mut LsError), -1);
            assert!(!error.is_null());
            luastack_error_free(error);

            let mut error: *mut LsError = ptr::null_mut();
            assert_eq!(
                luastack_init(c"no_such_key = 1".as_ptr(), &mut error as *mut *mut LsError),
                -1
            );
            let message = CStr::from_ptr(luastack_error_message(error));
            assert!(message.to_str().unwrap().starts_with("Invalid configuration"));
            luastack_error_free(error);
        }
    }

    #[test]
    fn test_version() {
        unsafe {
            let version = luastack_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert_eq!(version_str, luastack::VERSION);
        }
    }
}
