//! Operators with metamethod fallbacks, and garbage-collector control

use crate::error::{BridgeError, BridgeResult};
use crate::protect::{collect_garbage, concat_values, length_of, Operand};
use crate::state::LuaVm;
use crate::types::GcMode;
use mlua_sys as ffi;
use std::os::raw::c_int;

impl LuaVm {
    /// Pop `n` values and push their concatenation.
    ///
    /// `n == 0` pushes the empty string; `n == 1` leaves the value alone.
    pub fn concat(&mut self, n: c_int) -> BridgeResult<()> {
        if n < 0 {
            return Err(BridgeError::bad_argument(1, "non-negative integer"));
        }
        self.require_operands(n)?;
        let top = self.top();
        let operands: Vec<Operand<'_>> = (top - n + 1..=top).map(Operand::Slot).collect();
        self.protected(concat_values, &operands, n)?;
        Ok(())
    }

    /// Push the length of the value at `idx`, honouring `__len`
    pub fn len(&mut self, idx: c_int) -> BridgeResult<()> {
        let idx = self.absolute_slot(idx)?;
        self.protected(length_of, &[Operand::Slot(idx)], 0)?;
        Ok(())
    }

    /// Run a collector command and return its raw result.
    ///
    /// Finalizers may run during a collection, so this is protected too.
    pub fn gc(&mut self, mode: GcMode, data: c_int) -> BridgeResult<c_int> {
        self.protected(
            collect_garbage,
            &[
                Operand::Integer(ffi::lua_Integer::from(mode.code())),
                Operand::Integer(ffi::lua_Integer::from(data)),
            ],
            0,
        )?;
        let result = self.to_integer(-1);
        unsafe { ffi::lua_pop(self.state(), 1) };
        Ok(result? as c_int)
    }
}
