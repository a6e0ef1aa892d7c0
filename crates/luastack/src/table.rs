//! Table, metatable and user value access.
//!
//! Reads push the value found and report its type; writes consume the
//! value (and key) from the top of the stack. Accesses that may run
//! metamethods go through [`LuaVm::protected`].

use crate::error::{BridgeError, BridgeResult};
use crate::protect::{assign_table, index_table, next_entry, raw_assign_table, Operand};
use crate::state::LuaVm;
use crate::types::LuaType;
use mlua_sys as ffi;
use std::os::raw::c_int;

impl LuaVm {
    // ========================================================================
    // Reads
    // ========================================================================

    /// Push the global `name`
    pub fn getglobal(&mut self, name: &[u8]) -> BridgeResult<LuaType> {
        self.protected(index_table, &[Operand::Globals, Operand::Bytes(name)], 0)?;
        Ok(self.type_at(-1))
    }

    /// Pop a key and push `t[key]` for the table at `idx`
    pub fn gettable(&mut self, idx: c_int) -> BridgeResult<LuaType> {
        let table = self.expect_table(idx)?;
        self.require_operands(1)?;
        let key = self.top();
        self.protected(index_table, &[Operand::Slot(table), Operand::Slot(key)], 1)?;
        Ok(self.type_at(-1))
    }

    /// Push `t[key]` for a string key
    pub fn getfield(&mut self, idx: c_int, key: &[u8]) -> BridgeResult<LuaType> {
        let table = self.expect_table(idx)?;
        self.protected(index_table, &[Operand::Slot(table), Operand::Bytes(key)], 0)?;
        Ok(self.type_at(-1))
    }

    /// Push `t[i]`
    pub fn geti(&mut self, idx: c_int, i: i64) -> BridgeResult<LuaType> {
        let table = self.expect_table(idx)?;
        self.protected(index_table, &[Operand::Slot(table), Operand::Integer(i)], 0)?;
        Ok(self.type_at(-1))
    }

    /// Like `gettable` but without metamethods
    pub fn rawget(&mut self, idx: c_int) -> BridgeResult<LuaType> {
        let table = self.expect_table(idx)?;
        self.require_operands(1)?;
        let tag = unsafe { ffi::lua_rawget(self.state(), table) };
        Ok(LuaType::from_tag(tag))
    }

    /// Like `geti` but without metamethods
    pub fn rawgeti(&mut self, idx: c_int, i: i64) -> BridgeResult<LuaType> {
        let table = self.expect_table(idx)?;
        self.ensure_space(1)?;
        let tag = unsafe { ffi::lua_rawgeti(self.state(), table, i) };
        Ok(LuaType::from_tag(tag))
    }

    /// Push a new table with preallocated array and hash parts
    pub fn createtable(&mut self, narr: c_int, nrec: c_int) -> BridgeResult<()> {
        if narr < 0 {
            return Err(BridgeError::bad_argument(1, "non-negative integer"));
        }
        if nrec < 0 {
            return Err(BridgeError::bad_argument(2, "non-negative integer"));
        }
        self.ensure_space(1)?;
        unsafe { ffi::lua_createtable(self.state(), narr, nrec) };
        Ok(())
    }

    /// Push the metatable of the value at `idx`, if it has one.
    ///
    /// Nothing is pushed when the result is `false`.
    pub fn getmetatable(&mut self, idx: c_int) -> BridgeResult<bool> {
        let Some(idx) = self.slot(idx) else {
            return Ok(false);
        };
        self.ensure_space(1)?;
        Ok(unsafe { ffi::lua_getmetatable(self.state(), idx) } != 0)
    }

    /// Push the user value of the full userdata at `idx`
    pub fn getuservalue(&mut self, idx: c_int) -> BridgeResult<LuaType> {
        let udata = self.expect_userdata(idx)?;
        self.ensure_space(1)?;
        let tag = unsafe { ffi::lua_getuservalue(self.state(), udata) };
        Ok(LuaType::from_tag(tag))
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Pop a value and assign it to the global `name`
    pub fn setglobal(&mut self, name: &[u8]) -> BridgeResult<()> {
        self.require_operands(1)?;
        let value = self.top();
        self.protected(
            assign_table,
            &[Operand::Globals, Operand::Bytes(name), Operand::Slot(value)],
            1,
        )?;
        Ok(())
    }

    /// Pop a value and then a key, and assign `t[key] = value`
    pub fn settable(&mut self, idx: c_int) -> BridgeResult<()> {
        let table = self.expect_table(idx)?;
        self.require_operands(2)?;
        let value = self.top();
        self.protected(
            assign_table,
            &[
                Operand::Slot(table),
                Operand::Slot(value - 1),
                Operand::Slot(value),
            ],
            2,
        )?;
        Ok(())
    }

    /// Pop a value and assign it to `t[key]` for a string key
    pub fn setfield(&mut self, idx: c_int, key: &[u8]) -> BridgeResult<()> {
        let table = self.expect_table(idx)?;
        self.require_operands(1)?;
        let value = self.top();
        self.protected(
            assign_table,
            &[Operand::Slot(table), Operand::Bytes(key), Operand::Slot(value)],
            1,
        )?;
        Ok(())
    }

    /// Pop a value and assign it to `t[i]`
    pub fn seti(&mut self, idx: c_int, i: i64) -> BridgeResult<()> {
        let table = self.expect_table(idx)?;
        self.require_operands(1)?;
        let value = self.top();
        self.protected(
            assign_table,
            &[Operand::Slot(table), Operand::Integer(i), Operand::Slot(value)],
            1,
        )?;
        Ok(())
    }

    /// Like `settable` but without metamethods; nil and NaN keys are errors
    pub fn rawset(&mut self, idx: c_int) -> BridgeResult<()> {
        let table = self.expect_table(idx)?;
        self.require_operands(2)?;
        let value = self.top();
        self.protected(
            raw_assign_table,
            &[
                Operand::Slot(table),
                Operand::Slot(value - 1),
                Operand::Slot(value),
            ],
            2,
        )?;
        Ok(())
    }

    /// Like `seti` but without metamethods
    pub fn rawseti(&mut self, idx: c_int, i: i64) -> BridgeResult<()> {
        let table = self.expect_table(idx)?;
        self.require_operands(1)?;
        unsafe { ffi::lua_rawseti(self.state(), table, i) };
        Ok(())
    }

    /// Pop a table (or nil) and make it the metatable of the value at `idx`
    pub fn setmetatable(&mut self, idx: c_int) -> BridgeResult<bool> {
        let target = self.absolute_slot(idx)?;
        self.require_operands(1)?;
        let found = self.type_at(-1);
        if !matches!(found, LuaType::Table | LuaType::Nil) {
            return Err(BridgeError::TypeMismatch {
                expected: "table or nil",
                found: found.name(),
            });
        }
        Ok(unsafe { ffi::lua_setmetatable(self.state(), target) } != 0)
    }

    /// Pop a value and make it the user value of the full userdata at `idx`
    pub fn setuservalue(&mut self, idx: c_int) -> BridgeResult<()> {
        let udata = self.expect_userdata(idx)?;
        self.require_operands(1)?;
        unsafe { ffi::lua_setuservalue(self.state(), udata) };
        Ok(())
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Pop a key and push the next key-value pair of the table at `idx`.
    ///
    /// Returns `false`, with nothing pushed, once the traversal is over.
    pub fn next(&mut self, idx: c_int) -> BridgeResult<bool> {
        let table = self.expect_table(idx)?;
        self.require_operands(1)?;
        let key = self.top();
        let results =
            self.protected(next_entry, &[Operand::Slot(table), Operand::Slot(key)], 1)?;
        Ok(results == 2)
    }
}
