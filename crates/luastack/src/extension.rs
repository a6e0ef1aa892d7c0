//! Host library opened into every VM.
//!
//! Installs a global table (named by the configuration, `host` by default)
//! with:
//!
//! - `log(message [, level])` - emit a `tracing` event under the
//!   `luastack::script` target; `level` is `trace`, `debug`, `info`
//!   (default), `warn` or `error`
//! - `version` - the bridge version string

use mlua_sys as ffi;
use std::os::raw::{c_char, c_int};
use std::str::FromStr;
use tracing::Level;

/// Target of events emitted by scripts
pub const SCRIPT_TARGET: &str = "luastack::script";

/// Create the host table and bind it to the global `name`.
///
/// # Safety
/// `state` must be a live Lua state with room for four more values.
pub(crate) unsafe fn open(state: *mut ffi::lua_State, name: &str) {
    ffi::lua_createtable(state, 0, 2);
    ffi::lua_pushcfunction(state, host_log);
    ffi::lua_setfield(state, -2, c"log".as_ptr());
    let version = crate::VERSION;
    ffi::lua_pushlstring(state, version.as_ptr() as *const c_char, version.len());
    ffi::lua_setfield(state, -2, c"version".as_ptr());

    ffi::lua_rawgeti(
        state,
        ffi::LUA_REGISTRYINDEX,
        ffi::LUA_RIDX_GLOBALS as ffi::lua_Integer,
    );
    ffi::lua_pushlstring(state, name.as_ptr() as *const c_char, name.len());
    ffi::lua_pushvalue(state, -3);
    ffi::lua_rawset(state, -3);
    ffi::lua_pop(state, 2);
}

unsafe fn lossy(ptr: *const c_char, len: usize) -> String {
    let bytes = std::slice::from_raw_parts(ptr as *const u8, len);
    String::from_utf8_lossy(bytes).into_owned()
}

/// `host.log(message [, level])`
unsafe extern "C-unwind" fn host_log(state: *mut ffi::lua_State) -> c_int {
    let mut len = 0usize;
    let message = ffi::luaL_checklstring(state, 1, &mut len);
    let message_len = len;
    let level = ffi::luaL_optlstring(state, 2, c"info".as_ptr(), &mut len);
    let level = match std::str::from_utf8(std::slice::from_raw_parts(level as *const u8, len))
        .ok()
        .and_then(|name| Level::from_str(name).ok())
    {
        Some(level) => level,
        None => return ffi::luaL_argerror(state, 2, c"invalid log level".as_ptr()),
    };

    let message = lossy(message, message_len);
    match level {
        Level::ERROR => tracing::error!(target: SCRIPT_TARGET, "{}", message),
        Level::WARN => tracing::warn!(target: SCRIPT_TARGET, "{}", message),
        Level::INFO => tracing::info!(target: SCRIPT_TARGET, "{}", message),
        Level::DEBUG => tracing::debug!(target: SCRIPT_TARGET, "{}", message),
        _ => tracing::trace!(target: SCRIPT_TARGET, "{}", message),
    }
    0
}

#[cfg(test)]
mod tests {
    use crate::config::BridgeConfig;
    use crate::state::LuaVm;
    use crate::types::LuaType;

    fn run(vm: &mut LuaVm, source: &[u8]) -> crate::error::BridgeResult<()> {
        vm.loadbuffer(source, b"")?;
        vm.pcall(0, 1).map(|_| ())
    }

    #[test]
    fn test_host_table_is_installed() {
        let mut vm = LuaVm::new(&BridgeConfig::default()).unwrap();
        run(&mut vm, b"return host.version").unwrap();
        assert_eq!(
            vm.to_string(-1).unwrap(),
            env!("CARGO_PKG_VERSION").as_bytes().to_vec()
        );
        assert_eq!(vm.gettop(), 1);
    }

    #[test]
    fn test_log_accepts_levels() {
        let mut vm = LuaVm::new(&BridgeConfig::default()).unwrap();
        run(
            &mut vm,
            b"host.log('plain') host.log('loud', 'warn') host.log('quiet', 'TRACE')",
        )
        .unwrap();
    }

    #[test]
    fn test_log_rejects_bad_arguments() {
        let mut vm = LuaVm::new(&BridgeConfig::default()).unwrap();
        assert!(run(&mut vm, b"host.log('x', 'loudest')").is_err());
        assert!(run(&mut vm, b"host.log({})").is_err());
    }

    #[test]
    fn test_custom_name_and_disabled() {
        let config = BridgeConfig {
            extension: Some("bridge".to_string()),
            ..Default::default()
        };
        let mut vm = LuaVm::new(&config).unwrap();
        assert_eq!(vm.getglobal(b"bridge").unwrap(), LuaType::Table);
        assert_eq!(vm.getglobal(b"host").unwrap(), LuaType::Nil);

        let mut vm = LuaVm::new(&BridgeConfig::bare()).unwrap();
        assert_eq!(vm.getglobal(b"host").unwrap(), LuaType::Nil);
    }
}
