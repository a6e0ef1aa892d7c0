//! Value conversion between host terms and the VM stack.
//!
//! Host to VM: integers, floats, booleans, byte strings and userdata blocks
//! are pushed byte-exact. VM to host: numbers, integers, strings and userdata
//! are copied out with their exact length. Failed conversions name the type
//! that was actually found.

use crate::error::{BridgeError, BridgeResult};
use crate::protect::{compare_values, Operand};
use crate::state::LuaVm;
use crate::types::{CompareOp, LuaType, TypeCheck};
use mlua_sys as ffi;
use std::os::raw::{c_char, c_int};

impl LuaVm {
    // ========================================================================
    // Host -> VM
    // ========================================================================

    pub fn push_nil(&mut self) -> BridgeResult<()> {
        self.ensure_space(1)?;
        unsafe { ffi::lua_pushnil(self.state()) };
        Ok(())
    }

    pub fn push_integer(&mut self, n: i64) -> BridgeResult<()> {
        self.ensure_space(1)?;
        unsafe { ffi::lua_pushinteger(self.state(), n) };
        Ok(())
    }

    pub fn push_number(&mut self, n: f64) -> BridgeResult<()> {
        self.ensure_space(1)?;
        unsafe { ffi::lua_pushnumber(self.state(), n) };
        Ok(())
    }

    pub fn push_boolean(&mut self, b: bool) -> BridgeResult<()> {
        self.ensure_space(1)?;
        unsafe { ffi::lua_pushboolean(self.state(), c_int::from(b)) };
        Ok(())
    }

    /// Push a byte string; embedded zero bytes are kept
    pub fn push_string(&mut self, bytes: &[u8]) -> BridgeResult<()> {
        self.ensure_space(1)?;
        unsafe {
            ffi::lua_pushlstring(self.state(), bytes.as_ptr() as *const c_char, bytes.len());
        }
        Ok(())
    }

    /// Allocate a full userdata of `bytes.len()` bytes and copy `bytes` into it
    pub fn new_userdata(&mut self, bytes: &[u8]) -> BridgeResult<()> {
        self.ensure_space(1)?;
        unsafe {
            let block = ffi::lua_newuserdata(self.state(), bytes.len()) as *mut u8;
            if block.is_null() {
                return Err(BridgeError::Allocation("Not enough memory"));
            }
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), block, bytes.len());
        }
        Ok(())
    }

    // ========================================================================
    // Type queries
    // ========================================================================

    /// Type of the value at `idx`; `None` for an invalid index
    pub fn type_of(&self, idx: c_int) -> LuaType {
        self.type_at(idx)
    }

    /// Answer an `is*` predicate; invalid indices hold "none"
    pub fn is(&self, idx: c_int, check: TypeCheck) -> bool {
        let Some(idx) = self.slot(idx) else {
            return matches!(check, TypeCheck::None | TypeCheck::NoneOrNil);
        };
        let state = self.state();
        let ty = self.type_at(idx);
        unsafe {
            match check {
                TypeCheck::Number => ffi::lua_isnumber(state, idx) != 0,
                TypeCheck::Integer => ffi::lua_isinteger(state, idx) != 0,
                TypeCheck::String => ffi::lua_isstring(state, idx) != 0,
                TypeCheck::CFunction => ffi::lua_iscfunction(state, idx) != 0,
                TypeCheck::Userdata => ffi::lua_isuserdata(state, idx) != 0,
                TypeCheck::LightUserdata => ty == LuaType::LightUserdata,
                TypeCheck::Table => ty == LuaType::Table,
                TypeCheck::Function => ty == LuaType::Function,
                TypeCheck::Nil => ty == LuaType::Nil,
                TypeCheck::Boolean => ty == LuaType::Boolean,
                TypeCheck::Thread => ty == LuaType::Thread,
                TypeCheck::None => ty == LuaType::None,
                TypeCheck::NoneOrNil => matches!(ty, LuaType::None | LuaType::Nil),
            }
        }
    }

    // ========================================================================
    // VM -> Host
    // ========================================================================

    /// The number at `idx` (strings convertible to numbers included)
    pub fn to_number(&self, idx: c_int) -> BridgeResult<f64> {
        if let Some(slot) = self.slot(idx) {
            let mut isnum = 0;
            let n = unsafe { ffi::lua_tonumberx(self.state(), slot, &mut isnum) };
            if isnum != 0 {
                return Ok(n);
            }
        }
        Err(self.not_convertible(idx))
    }

    /// The integer at `idx`; floats with an exact integer value convert
    pub fn to_integer(&self, idx: c_int) -> BridgeResult<i64> {
        if let Some(slot) = self.slot(idx) {
            let mut isnum = 0;
            let n = unsafe { ffi::lua_tointegerx(self.state(), slot, &mut isnum) };
            if isnum != 0 {
                return Ok(n);
            }
        }
        Err(self.not_convertible(idx))
    }

    /// Truthiness of the value at `idx`; invalid indices are false
    pub fn to_boolean(&self, idx: c_int) -> bool {
        match self.slot(idx) {
            Some(slot) => unsafe { ffi::lua_toboolean(self.state(), slot) != 0 },
            None => false,
        }
    }

    /// Exact-length copy of the string at `idx`.
    ///
    /// A number is converted to a string in place, as the VM does.
    pub fn to_string(&self, idx: c_int) -> BridgeResult<Vec<u8>> {
        self.bytes_at(idx).ok_or_else(|| self.not_convertible(idx))
    }

    /// Copy of the raw bytes of the userdata at `idx`.
    ///
    /// Zero raw length is an error: it cannot be told apart from a failed
    /// inspection.
    pub fn to_userdata(&self, idx: c_int) -> BridgeResult<Vec<u8>> {
        if !matches!(
            self.type_at(idx),
            LuaType::Userdata | LuaType::LightUserdata
        ) {
            return Err(self.not_convertible(idx));
        }
        let state = self.state();
        unsafe {
            let len = ffi::lua_rawlen(state, idx);
            let block = ffi::lua_touserdata(state, idx) as *const u8;
            if len == 0 || block.is_null() {
                return Err(BridgeError::EmptyUserdata(idx));
            }
            Ok(std::slice::from_raw_parts(block, len).to_vec())
        }
    }

    /// Raw length: string length, table border, userdata size; 0 otherwise
    pub fn raw_len(&self, idx: c_int) -> usize {
        match self.slot(idx) {
            Some(slot) => unsafe { ffi::lua_rawlen(self.state(), slot) },
            None => 0,
        }
    }

    /// Primitive equality, without metamethods
    pub fn raw_equal(&self, idx1: c_int, idx2: c_int) -> bool {
        match (self.slot(idx1), self.slot(idx2)) {
            (Some(a), Some(b)) => unsafe { ffi::lua_rawequal(self.state(), a, b) != 0 },
            _ => false,
        }
    }

    /// Compare two values, running `__eq`/`__lt`/`__le` metamethods.
    ///
    /// Invalid indices compare false, as in the VM.
    pub fn compare(&mut self, idx1: c_int, idx2: c_int, op: CompareOp) -> BridgeResult<bool> {
        let (Some(_), Some(_)) = (self.slot(idx1), self.slot(idx2)) else {
            return Ok(false);
        };
        let a = self.absolute_slot(idx1)?;
        let b = self.absolute_slot(idx2)?;
        self.protected(
            compare_values,
            &[
                Operand::Slot(a),
                Operand::Slot(b),
                Operand::Integer(ffi::lua_Integer::from(op.code())),
            ],
            0,
        )?;
        let result = self.to_boolean(-1);
        unsafe { ffi::lua_pop(self.state(), 1) };
        Ok(result)
    }

    fn not_convertible(&self, idx: c_int) -> BridgeError {
        BridgeError::NotConvertible {
            found: self.type_at(idx).name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;

    fn vm() -> LuaVm {
        LuaVm::new(&BridgeConfig::default()).unwrap()
    }

    #[test]
    fn test_string_round_trip_keeps_zero_bytes() {
        let mut vm = vm();
        let payload = b"\0head\0\xffmiddle\0tail\0".to_vec();
        vm.push_string(&payload).unwrap();
        assert_eq!(vm.to_string(-1).unwrap(), payload);
        assert_eq!(vm.raw_len(-1), payload.len());
    }

    #[test]
    fn test_empty_string_round_trip() {
        let mut vm = vm();
        vm.push_string(b"").unwrap();
        assert_eq!(vm.to_string(-1).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_integer_round_trip_extremes() {
        let mut vm = vm();
        for n in [0, 1, -1, i64::MAX, i64::MIN, 1 << 53, -(1 << 53) - 1] {
            vm.push_integer(n).unwrap();
            assert_eq!(vm.to_integer(-1).unwrap(), n);
            assert!(vm.is(-1, TypeCheck::Integer));
        }
    }

    #[test]
    fn test_number_conversion() {
        let mut vm = vm();
        vm.push_number(2.5).unwrap();
        assert_eq!(vm.to_number(-1).unwrap(), 2.5);
        assert_eq!(
            vm.to_integer(-1),
            Err(BridgeError::NotConvertible { found: "number" })
        );

        vm.push_string(b"42").unwrap();
        assert_eq!(vm.to_number(-1).unwrap(), 42.0);
        assert_eq!(vm.to_integer(-1).unwrap(), 42);
    }

    #[test]
    fn test_conversion_errors_name_actual_type() {
        let mut vm = vm();
        vm.push_boolean(true).unwrap();
        assert_eq!(
            vm.to_number(-1),
            Err(BridgeError::NotConvertible { found: "boolean" })
        );
        assert_eq!(
            vm.to_string(-1),
            Err(BridgeError::NotConvertible { found: "boolean" })
        );
        assert_eq!(
            vm.to_integer(5),
            Err(BridgeError::NotConvertible { found: "none" })
        );
    }

    #[test]
    fn test_userdata_round_trip() {
        let mut vm = vm();
        let payload = b"\x01\x00\x02\x00".to_vec();
        vm.new_userdata(&payload).unwrap();
        assert_eq!(vm.type_of(-1), LuaType::Userdata);
        assert!(vm.is(-1, TypeCheck::Userdata));
        assert!(!vm.is(-1, TypeCheck::LightUserdata));
        assert_eq!(vm.to_userdata(-1).unwrap(), payload);
    }

    #[test]
    fn test_zero_length_userdata_is_an_error() {
        let mut vm = vm();
        vm.new_userdata(b"").unwrap();
        assert_eq!(vm.to_userdata(-1), Err(BridgeError::EmptyUserdata(-1)));

        vm.push_integer(3).unwrap();
        assert_eq!(
            vm.to_userdata(-1),
            Err(BridgeError::NotConvertible { found: "number" })
        );
    }

    #[test]
    fn test_predicates_on_invalid_index() {
        let vm = vm();
        assert!(vm.is(1, TypeCheck::None));
        assert!(vm.is(1, TypeCheck::NoneOrNil));
        assert!(!vm.is(1, TypeCheck::Nil));
        assert!(!vm.is(1, TypeCheck::Number));
        assert_eq!(vm.type_of(1), LuaType::None);
        assert!(!vm.to_boolean(1));
        assert_eq!(vm.raw_len(1), 0);
    }

    #[test]
    fn test_predicates() {
        let mut vm = vm();
        vm.push_string(b"12").unwrap();
        assert!(vm.is(-1, TypeCheck::String));
        assert!(vm.is(-1, TypeCheck::Number));
        assert!(!vm.is(-1, TypeCheck::Integer));

        vm.push_nil().unwrap();
        assert!(vm.is(-1, TypeCheck::Nil));
        assert!(vm.is(-1, TypeCheck::NoneOrNil));
        assert!(!vm.to_boolean(-1));
    }

    #[test]
    fn test_raw_equal_and_compare() {
        let mut vm = vm();
        vm.push_integer(1).unwrap();
        vm.push_number(1.0).unwrap();
        vm.push_integer(2).unwrap();

        assert!(vm.raw_equal(1, 2));
        assert!(!vm.raw_equal(1, 3));
        assert!(!vm.raw_equal(1, 9));

        assert!(vm.compare(1, 3, CompareOp::Lt).unwrap());
        assert!(vm.compare(1, 2, CompareOp::Le).unwrap());
        assert!(!vm.compare(3, 1, CompareOp::Lt).unwrap());
        assert!(!vm.compare(1, 9, CompareOp::Eq).unwrap());
        assert_eq!(vm.top(), 3);
    }

    #[test]
    fn test_compare_error_is_reported() {
        let mut vm = vm();
        vm.push_integer(1).unwrap();
        vm.push_boolean(true).unwrap();

        let err = vm.compare(1, 2, CompareOp::Lt).unwrap_err();
        match err {
            BridgeError::Runtime {
                message: Some(message),
                ..
            } => assert!(String::from_utf8_lossy(&message).contains("attempt to compare")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(vm.top(), 2);
    }
}
