//! Basic stack manipulation

use crate::error::{BridgeError, BridgeResult};
use crate::state::LuaVm;
use mlua_sys as ffi;
use std::os::raw::c_int;

impl LuaVm {
    /// Absolute form of an acceptable index; pseudo and absolute indices
    /// come back unchanged
    pub fn absindex(&self, idx: c_int) -> c_int {
        if idx > 0 || idx <= ffi::LUA_REGISTRYINDEX {
            return idx;
        }
        unsafe { ffi::lua_absindex(self.state(), idx) }
    }

    /// Index of the top element, equal to the number of values on the stack
    pub fn gettop(&self) -> c_int {
        self.top()
    }

    /// Set the stack top; new slots are filled with nil, extra ones dropped.
    ///
    /// Positive indices above the top grow the stack; a negative index may
    /// reach at most one below the bottom (which empties it).
    pub fn settop(&mut self, idx: c_int) -> BridgeResult<()> {
        let top = self.top();
        if idx >= 0 {
            self.ensure_space(idx - top)?;
        } else if idx < -(top + 1) {
            return Err(BridgeError::InvalidIndex(idx));
        }
        unsafe { ffi::lua_settop(self.state(), idx) };
        Ok(())
    }

    /// Push a copy of the value at `idx`
    pub fn pushvalue(&mut self, idx: c_int) -> BridgeResult<()> {
        let idx = self.require_slot(idx)?;
        self.ensure_space(1)?;
        unsafe { ffi::lua_pushvalue(self.state(), idx) };
        Ok(())
    }

    /// Rotate the values between `idx` and the top by `n` positions,
    /// towards the top for positive `n`
    pub fn rotate(&mut self, idx: c_int, n: c_int) -> BridgeResult<()> {
        let start = self.stack_position(idx)?;
        let segment = self.top() - start + 1;
        if n.unsigned_abs() > segment.unsigned_abs() {
            return Err(BridgeError::bad_argument(2, "rotation within the segment"));
        }
        unsafe { ffi::lua_rotate(self.state(), start, n) };
        Ok(())
    }

    /// Copy the value at `from` into the slot `to`, replacing it
    pub fn copy(&mut self, from: c_int, to: c_int) -> BridgeResult<()> {
        let from = self.require_slot(from)?;
        let to = self.stack_position(to)?;
        unsafe { ffi::lua_copy(self.state(), from, to) };
        Ok(())
    }

    /// Make sure the stack has room for `n` more values
    pub fn checkstack(&mut self, n: c_int) -> BridgeResult<bool> {
        if n < 0 {
            return Err(BridgeError::bad_argument(1, "non-negative integer"));
        }
        Ok(unsafe { ffi::lua_checkstack(self.state(), n) } != 0)
    }

    /// Absolute position of a real stack slot; pseudo indices are refused
    fn stack_position(&self, idx: c_int) -> BridgeResult<c_int> {
        if idx == ffi::LUA_REGISTRYINDEX {
            return Err(BridgeError::InvalidIndex(idx));
        }
        self.absolute_slot(idx)
    }
}
