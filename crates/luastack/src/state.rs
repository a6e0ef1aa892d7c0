//! Ownership of one Lua VM: the main state plus the execution thread.
//!
//! All stack operations run on the execution thread; the main state exists
//! only to own the global state and to be closed.

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::extension;
use crate::types::LuaType;
use mlua_sys as ffi;
use std::os::raw::c_int;
use std::ptr::NonNull;

/// A live Lua VM.
///
/// Both pointers are valid for as long as the value exists; dropping it
/// closes the VM, which also frees the execution thread.
pub struct LuaVm {
    main: NonNull<ffi::lua_State>,
    thread: NonNull<ffi::lua_State>,
    dump_block_size: usize,
}

// A Lua state may move between threads as long as it is never used from two
// at once; the registry serialises access behind a mutex.
unsafe impl Send for LuaVm {}

impl LuaVm {
    /// Create a VM: new state, libraries, execution thread.
    ///
    /// # Returns
    /// * `Ok(LuaVm)` - Live VM
    /// * `Err(BridgeError::Allocation)` - The VM could not allocate its state
    pub fn new(config: &BridgeConfig) -> BridgeResult<Self> {
        const NO_STATE: &str = "Could not initialize the Lua VM";

        let main = NonNull::new(unsafe { ffi::luaL_newstate() })
            .ok_or(BridgeError::Allocation(NO_STATE))?;

        unsafe {
            if config.open_stdlib {
                ffi::luaL_openlibs(main.as_ptr());
            }
            if let Some(name) = config.extension_name() {
                extension::open(main.as_ptr(), name);
            }

            // The thread stays on the main stack, which keeps it reachable.
            match NonNull::new(ffi::lua_newthread(main.as_ptr())) {
                Some(thread) => Ok(Self {
                    main,
                    thread,
                    dump_block_size: config.dump_block_size,
                }),
                None => {
                    ffi::lua_close(main.as_ptr());
                    Err(BridgeError::Allocation(NO_STATE))
                }
            }
        }
    }

    /// The execution thread every operation runs on
    pub(crate) fn state(&self) -> *mut ffi::lua_State {
        self.thread.as_ptr()
    }

    pub(crate) fn dump_block_size(&self) -> usize {
        self.dump_block_size
    }

    // ========================================================================
    // Index helpers
    // ========================================================================

    /// Number of values on the execution thread's stack
    pub(crate) fn top(&self) -> c_int {
        unsafe { ffi::lua_gettop(self.state()) }
    }

    /// `Some(idx)` when `idx` addresses an existing slot or the registry.
    ///
    /// Upvalue pseudo indices are meaningless outside a running C function
    /// and are rejected along with 0 and anything past the top.
    pub(crate) fn slot(&self, idx: c_int) -> Option<c_int> {
        if idx == ffi::LUA_REGISTRYINDEX {
            return Some(idx);
        }
        let top = self.top();
        let valid = (idx > 0 && idx <= top) || (idx < 0 && idx >= -top);
        valid.then_some(idx)
    }

    pub(crate) fn require_slot(&self, idx: c_int) -> BridgeResult<c_int> {
        self.slot(idx).ok_or(BridgeError::InvalidIndex(idx))
    }

    /// Like `require_slot` but resolved to a position that stays valid while
    /// more values are pushed
    pub(crate) fn absolute_slot(&self, idx: c_int) -> BridgeResult<c_int> {
        let idx = self.require_slot(idx)?;
        Ok(unsafe { ffi::lua_absindex(self.state(), idx) })
    }

    /// Type at `idx`, `None` for anything that is not a slot
    pub(crate) fn type_at(&self, idx: c_int) -> LuaType {
        match self.slot(idx) {
            Some(idx) => LuaType::from_tag(unsafe { ffi::lua_type(self.state(), idx) }),
            None => LuaType::None,
        }
    }

    /// Absolute position of the table at `idx`, or a type error naming what is there
    pub(crate) fn expect_table(&self, idx: c_int) -> BridgeResult<c_int> {
        self.expect(idx, LuaType::Table, "table")
    }

    /// Absolute position of the full userdata at `idx`
    pub(crate) fn expect_userdata(&self, idx: c_int) -> BridgeResult<c_int> {
        self.expect(idx, LuaType::Userdata, "userdata")
    }

    fn expect(&self, idx: c_int, ty: LuaType, expected: &'static str) -> BridgeResult<c_int> {
        let found = self.type_at(idx);
        if found != ty {
            return Err(BridgeError::TypeMismatch {
                expected,
                found: found.name(),
            });
        }
        self.absolute_slot(idx)
    }

    /// Fail unless at least `n` values are on the stack
    pub(crate) fn require_operands(&self, n: c_int) -> BridgeResult<()> {
        let available = self.top();
        if available < n {
            return Err(BridgeError::StackUnderflow {
                needed: n,
                available,
            });
        }
        Ok(())
    }

    /// Make room for `n` more values
    pub(crate) fn ensure_space(&self, n: c_int) -> BridgeResult<()> {
        if n <= 0 {
            return Ok(());
        }
        if unsafe { ffi::lua_checkstack(self.state(), n) } == 0 {
            return Err(BridgeError::StackOverflow);
        }
        Ok(())
    }

    /// Copy the bytes of the string (or number) at `idx`, if it is one.
    ///
    /// Numbers are converted in place, as `lua_tolstring` does.
    pub(crate) fn bytes_at(&self, idx: c_int) -> Option<Vec<u8>> {
        let idx = self.slot(idx)?;
        let mut len = 0usize;
        unsafe {
            let ptr = ffi::lua_tolstring(self.state(), idx, &mut len);
            if ptr.is_null() {
                return None;
            }
            Some(std::slice::from_raw_parts(ptr as *const u8, len).to_vec())
        }
    }

    // ========================================================================
    // Whole-VM queries
    // ========================================================================

    /// VM version number (503 for Lua 5.3)
    pub fn version(&self) -> f64 {
        unsafe { *ffi::lua_version(self.state()) }
    }
}

impl Drop for LuaVm {
    fn drop(&mut self) {
        unsafe { ffi::lua_close(self.main.as_ptr()) }
    }
}

impl std::fmt::Debug for LuaVm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LuaVm")
            .field("main", &self.main)
            .field("thread", &self.thread)
            .field("top", &self.top())
            .finish()
    }
}
