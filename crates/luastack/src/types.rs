//! VM-level enumerations: value types, gc modes, comparison operators

use mlua_sys as ffi;
use std::os::raw::c_int;
use strum::{EnumIter, EnumString, IntoStaticStr};

/// Pseudo index of the registry table, the only pseudo index operations accept
pub const REGISTRY_INDEX: c_int = ffi::LUA_REGISTRYINDEX;

/// Type of a value on the Lua stack, as reported by `lua_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LuaType {
    /// Index does not address a value
    None,
    Nil,
    Boolean,
    LightUserdata,
    Number,
    String,
    Table,
    Function,
    Userdata,
    Thread,
}

impl LuaType {
    /// Decode a `lua_type` tag
    pub fn from_tag(tag: c_int) -> Self {
        match tag {
            ffi::LUA_TNIL => LuaType::Nil,
            ffi::LUA_TBOOLEAN => LuaType::Boolean,
            ffi::LUA_TLIGHTUSERDATA => LuaType::LightUserdata,
            ffi::LUA_TNUMBER => LuaType::Number,
            ffi::LUA_TSTRING => LuaType::String,
            ffi::LUA_TTABLE => LuaType::Table,
            ffi::LUA_TFUNCTION => LuaType::Function,
            ffi::LUA_TUSERDATA => LuaType::Userdata,
            ffi::LUA_TTHREAD => LuaType::Thread,
            _ => LuaType::None,
        }
    }

    /// Canonical type name, matching `lua_typename` (light userdata reports
    /// `"userdata"`) and `"none"` for an empty slot
    pub fn name(self) -> &'static str {
        match self {
            LuaType::None => "none",
            LuaType::Nil => "nil",
            LuaType::Boolean => "boolean",
            LuaType::LightUserdata | LuaType::Userdata => "userdata",
            LuaType::Number => "number",
            LuaType::String => "string",
            LuaType::Table => "table",
            LuaType::Function => "function",
            LuaType::Thread => "thread",
        }
    }
}

/// Type predicates answered by the `is*` operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCheck {
    /// Number, or a string convertible to one
    Number,
    /// Number with an integer representation
    Integer,
    /// String, or a number (convertible to a string)
    String,
    CFunction,
    /// Full or light userdata
    Userdata,
    LightUserdata,
    Table,
    Function,
    Nil,
    Boolean,
    Thread,
    None,
    NoneOrNil,
}

/// Garbage-collector control modes accepted by `lua_gc`
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum GcMode {
    Stop,
    Restart,
    Collect,
    Count,
    CountB,
    Step,
    SetPause,
    SetStepMul,
    IsRunning,
}

impl GcMode {
    /// The `LUA_GC*` constant
    pub fn code(self) -> c_int {
        match self {
            GcMode::Stop => ffi::LUA_GCSTOP,
            GcMode::Restart => ffi::LUA_GCRESTART,
            GcMode::Collect => ffi::LUA_GCCOLLECT,
            GcMode::Count => ffi::LUA_GCCOUNT,
            GcMode::CountB => ffi::LUA_GCCOUNTB,
            GcMode::Step => ffi::LUA_GCSTEP,
            GcMode::SetPause => ffi::LUA_GCSETPAUSE,
            GcMode::SetStepMul => ffi::LUA_GCSETSTEPMUL,
            GcMode::IsRunning => ffi::LUA_GCISRUNNING,
        }
    }

    /// Decode a `LUA_GC*` constant
    pub fn from_code(code: c_int) -> Option<Self> {
        use strum::IntoEnumIterator;
        GcMode::iter().find(|mode| mode.code() == code)
    }
}

/// Comparison operators accepted by `lua_compare`
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum CompareOp {
    Eq,
    Lt,
    Le,
}

impl CompareOp {
    /// The `LUA_OP*` constant
    pub fn code(self) -> c_int {
        match self {
            CompareOp::Eq => ffi::LUA_OPEQ,
            CompareOp::Lt => ffi::LUA_OPLT,
            CompareOp::Le => ffi::LUA_OPLE,
        }
    }

    /// Decode a `LUA_OP*` constant
    pub fn from_code(code: c_int) -> Option<Self> {
        match code {
            ffi::LUA_OPEQ => Some(CompareOp::Eq),
            ffi::LUA_OPLT => Some(CompareOp::Lt),
            ffi::LUA_OPLE => Some(CompareOp::Le),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(LuaType::from_tag(ffi::LUA_TNONE), LuaType::None);
        assert_eq!(LuaType::from_tag(ffi::LUA_TNONE).name(), "none");
        assert_eq!(LuaType::from_tag(ffi::LUA_TLIGHTUSERDATA).name(), "userdata");
        assert_eq!(LuaType::from_tag(ffi::LUA_TTABLE).name(), "table");
    }

    #[test]
    fn test_gc_mode_names_and_codes() {
        assert_eq!("collect".parse::<GcMode>().unwrap(), GcMode::Collect);
        assert_eq!("isrunning".parse::<GcMode>().unwrap(), GcMode::IsRunning);
        assert_eq!("countb".parse::<GcMode>().unwrap(), GcMode::CountB);
        assert_eq!(GcMode::from_code(ffi::LUA_GCCOUNT), Some(GcMode::Count));
        assert_eq!(GcMode::from_code(42), None);
    }

    #[test]
    fn test_compare_ops() {
        assert_eq!("lt".parse::<CompareOp>().unwrap(), CompareOp::Lt);
        assert_eq!(CompareOp::from_code(CompareOp::Le.code()), Some(CompareOp::Le));
        assert!("ge".parse::<CompareOp>().is_err());
    }
}
