//! Running primitives that can raise under `lua_pcall`.
//!
//! A Lua error raised outside a protected call aborts the whole process.
//! Primitives that may run metamethods (or otherwise raise) are therefore
//! executed inside a small C function called through `lua_pcall`; the values
//! they work on are copied in as arguments.

use crate::error::{BridgeError, BridgeResult};
use crate::state::LuaVm;
use mlua_sys as ffi;
use std::os::raw::{c_char, c_int};
use std::ptr;

/// One argument of a protected call
pub(crate) enum Operand<'a> {
    /// Copy of the value at an absolute (or pseudo) index
    Slot(c_int),
    Integer(ffi::lua_Integer),
    Bytes(&'a [u8]),
    /// The global table
    Globals,
}

impl Operand<'_> {
    unsafe fn push(&self, state: *mut ffi::lua_State) {
        match self {
            Operand::Slot(idx) => ffi::lua_pushvalue(state, *idx),
            Operand::Integer(i) => ffi::lua_pushinteger(state, *i),
            Operand::Bytes(bytes) => {
                ffi::lua_pushlstring(state, bytes.as_ptr() as *const c_char, bytes.len());
            }
            Operand::Globals => {
                ffi::lua_rawgeti(
                    state,
                    ffi::LUA_REGISTRYINDEX,
                    ffi::LUA_RIDX_GLOBALS as ffi::lua_Integer,
                );
            }
        }
    }
}

impl LuaVm {
    /// Call `f` with `operands` under `lua_pcall`.
    ///
    /// The top `consumed` stack values are removed whether the call succeeds
    /// or not; on success the results of `f` take their place and their count
    /// is returned. `Slot` operands must already be absolute.
    pub(crate) fn protected(
        &mut self,
        f: ffi::lua_CFunction,
        operands: &[Operand<'_>],
        consumed: c_int,
    ) -> BridgeResult<c_int> {
        self.require_operands(consumed)?;
        let nargs = operands.len() as c_int;
        self.ensure_space(nargs + 1)?;

        let state = self.state();
        let base = self.top() - consumed;
        unsafe {
            ffi::lua_pushcfunction(state, f);
            for operand in operands {
                operand.push(state);
            }
            let status = ffi::lua_pcall(state, nargs, ffi::LUA_MULTRET, 0);
            if status != ffi::LUA_OK {
                let err = self.runtime_error(status);
                ffi::lua_settop(state, base);
                return Err(err);
            }

            let results = self.top() - base - consumed;
            if consumed > 0 {
                // Move the results below the consumed operands, then drop those.
                ffi::lua_rotate(state, base + 1, -consumed);
                ffi::lua_settop(state, base + results);
            }
            Ok(results)
        }
    }

    /// Turn a failed status into an error, popping a string error object.
    ///
    /// Other error objects stay on the stack and only the status travels.
    pub(crate) fn runtime_error(&self, status: c_int) -> BridgeError {
        let state = self.state();
        unsafe {
            if self.top() > 0 && ffi::lua_isstring(state, -1) != 0 {
                let message = self.bytes_at(-1);
                ffi::lua_pop(state, 1);
                return BridgeError::Runtime { status, message };
            }
        }
        BridgeError::Runtime {
            status,
            message: None,
        }
    }
}

// ============================================================================
// Trampolines
// ============================================================================
//
// Each receives its operands as arguments 1..n and performs one primitive.

/// (t, k) -> t[k]
pub(crate) unsafe extern "C-unwind" fn index_table(state: *mut ffi::lua_State) -> c_int {
    ffi::lua_gettable(state, 1);
    1
}

/// (t, k, v): t[k] = v
pub(crate) unsafe extern "C-unwind" fn assign_table(state: *mut ffi::lua_State) -> c_int {
    ffi::lua_settable(state, 1);
    0
}

/// (t, k, v): rawset(t, k, v); raises on nil or NaN keys
pub(crate) unsafe extern "C-unwind" fn raw_assign_table(state: *mut ffi::lua_State) -> c_int {
    ffi::lua_rawset(state, 1);
    0
}

/// (a, b, op) -> boolean
pub(crate) unsafe extern "C-unwind" fn compare_values(state: *mut ffi::lua_State) -> c_int {
    let op = ffi::lua_tointegerx(state, 3, ptr::null_mut()) as c_int;
    let result = ffi::lua_compare(state, 1, 2, op);
    ffi::lua_pushboolean(state, result);
    1
}

/// (v1, ..., vn) -> v1 .. ... .. vn
pub(crate) unsafe extern "C-unwind" fn concat_values(state: *mut ffi::lua_State) -> c_int {
    let n = ffi::lua_gettop(state);
    ffi::lua_concat(state, n);
    1
}

/// (v) -> #v
pub(crate) unsafe extern "C-unwind" fn length_of(state: *mut ffi::lua_State) -> c_int {
    ffi::lua_len(state, 1);
    1
}

/// (t, k) -> k', v  or nothing at the end of the traversal
pub(crate) unsafe extern "C-unwind" fn next_entry(state: *mut ffi::lua_State) -> c_int {
    if ffi::lua_next(state, 1) != 0 {
        2
    } else {
        0
    }
}

/// (mode, data) -> lua_gc result
pub(crate) unsafe extern "C-unwind" fn collect_garbage(state: *mut ffi::lua_State) -> c_int {
    let mode = ffi::lua_tointegerx(state, 1, ptr::null_mut()) as c_int;
    let data = ffi::lua_tointegerx(state, 2, ptr::null_mut()) as c_int;
    let result = ffi::lua_gc(state, mode, data);
    ffi::lua_pushinteger(state, ffi::lua_Integer::from(result));
    1
}

/// (e): raises e
pub(crate) unsafe extern "C-unwind" fn raise(state: *mut ffi::lua_State) -> c_int {
    ffi::lua_error(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;

    #[test]
    fn test_protected_replaces_consumed_operands() {
        let mut vm = LuaVm::new(&BridgeConfig::default()).unwrap();
        vm.push_integer(10).unwrap();
        vm.push_string(b"a").unwrap();
        vm.push_string(b"b").unwrap();

        let results = vm
            .protected(concat_values, &[Operand::Slot(2), Operand::Slot(3)], 2)
            .unwrap();
        assert_eq!(results, 1);
        assert_eq!(vm.top(), 2);
        assert_eq!(vm.to_string(-1).unwrap(), b"ab".to_vec());
        assert_eq!(vm.to_integer(1).unwrap(), 10);
    }

    #[test]
    fn test_protected_error_pops_operands_and_message() {
        let mut vm = LuaVm::new(&BridgeConfig::default()).unwrap();
        vm.push_integer(10).unwrap();
        vm.push_string(b"boom").unwrap();

        let err = vm.protected(raise, &[Operand::Slot(2)], 1).unwrap_err();
        assert_eq!(
            err,
            BridgeError::Runtime {
                status: ffi::LUA_ERRRUN,
                message: Some(b"boom".to_vec())
            }
        );
        assert_eq!(vm.top(), 1);
    }

    #[test]
    fn test_runtime_error_leaves_non_string_objects() {
        let mut vm = LuaVm::new(&BridgeConfig::default()).unwrap();
        vm.push_boolean(true).unwrap();
        let err = vm.runtime_error(ffi::LUA_ERRRUN);
        assert_eq!(
            err,
            BridgeError::Runtime {
                status: ffi::LUA_ERRRUN,
                message: None
            }
        );
        assert_eq!(vm.top(), 1);
    }
}
