//! Calling functions, loading chunks, dumping bytecode, raising errors

use crate::error::{BridgeError, BridgeResult};
use crate::protect::{raise, Operand};
use crate::state::LuaVm;
use crate::types::LuaType;
use crate::writer::{write_chunk, DumpWriter};
use mlua_sys as ffi;
use std::ffi::CString;
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;

/// How a protected call finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The function returned; its results are on the stack
    Done,
    /// The VM reported a yield
    Yielded,
}

impl LuaVm {
    /// Call the function below the top `nargs` values in protected mode.
    ///
    /// `nresults` of `-1` keeps every result. On failure a string error
    /// object is popped and returned as the message; any other error object
    /// stays on the stack and only the status is reported.
    pub fn pcall(&mut self, nargs: c_int, nresults: c_int) -> BridgeResult<Completion> {
        if nargs < 0 {
            return Err(BridgeError::bad_argument(1, "non-negative integer"));
        }
        if nresults < ffi::LUA_MULTRET {
            return Err(BridgeError::bad_argument(2, "integer not below -1"));
        }
        self.require_operands(nargs.saturating_add(1))?;
        self.ensure_space(nresults)?;

        let status = unsafe { ffi::lua_pcall(self.state(), nargs, nresults, 0) };
        match status {
            ffi::LUA_OK => Ok(Completion::Done),
            ffi::LUA_YIELD => Ok(Completion::Yielded),
            status => Err(self.runtime_error(status)),
        }
    }

    /// Load a chunk (source or precompiled) and push it as a function.
    ///
    /// An empty `name` leaves the chunk unnamed, so the VM derives one.
    pub fn loadbuffer(&mut self, chunk: &[u8], name: &[u8]) -> BridgeResult<()> {
        let name = if name.is_empty() {
            None
        } else {
            Some(
                CString::new(name)
                    .map_err(|_| BridgeError::bad_argument(2, "chunk name without NUL bytes"))?,
            )
        };
        self.ensure_space(1)?;

        let status = unsafe {
            ffi::luaL_loadbufferx(
                self.state(),
                chunk.as_ptr() as *const c_char,
                chunk.len(),
                name.as_ref().map_or(ptr::null(), |name| name.as_ptr()),
                ptr::null(),
            )
        };
        self.load_status(status)
    }

    /// Load the file at `path` and push it as a function
    pub fn loadfile(&mut self, path: &[u8]) -> BridgeResult<()> {
        let path = CString::new(path)
            .map_err(|_| BridgeError::bad_argument(1, "path without NUL bytes"))?;
        self.ensure_space(1)?;

        let status = unsafe { ffi::luaL_loadfilex(self.state(), path.as_ptr(), ptr::null()) };
        self.load_status(status)
    }

    fn load_status(&self, status: c_int) -> BridgeResult<()> {
        if status == ffi::LUA_OK {
            Ok(())
        } else {
            Err(self.runtime_error(status))
        }
    }

    /// Serialize the Lua function on top of the stack to bytecode.
    ///
    /// The function stays on the stack. `strip` drops debug information.
    pub fn dump(&mut self, strip: bool) -> BridgeResult<Vec<u8>> {
        let found = self.type_at(-1);
        if found != LuaType::Function {
            return Err(BridgeError::TypeMismatch {
                expected: "function",
                found: found.name(),
            });
        }

        let mut writer = DumpWriter::with_block_size(self.dump_block_size());
        let status = unsafe {
            ffi::lua_dump(
                self.state(),
                write_chunk,
                &mut writer as *mut DumpWriter as *mut c_void,
                c_int::from(strip),
            )
        };
        if status != 0 {
            return Err(BridgeError::Runtime {
                status,
                message: None,
            });
        }
        Ok(writer.finish())
    }

    /// Pop the top value and raise it as an error.
    ///
    /// Never returns `Ok`; the raised value comes back as the error.
    pub fn error(&mut self) -> BridgeResult<()> {
        self.require_operands(1)?;
        let value = self.top();
        self.protected(raise, &[Operand::Slot(value)], 1)?;
        Ok(())
    }
}
