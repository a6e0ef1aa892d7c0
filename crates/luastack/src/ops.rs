//! The operation table.
//!
//! Each [`Op`] forwards to exactly one VM primitive. Names are the
//! lowercase variant names (`"pushstring"`, `"rawgeti"`, ...); arities
//! count the handle argument.

use crate::call::Completion;
use crate::error::{BridgeError, BridgeResult};
use crate::reply::Reply;
use crate::state::LuaVm;
use crate::term::Args;
use crate::types::{GcMode, TypeCheck};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// A bridge operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Op {
    // Lifecycle
    NewState,
    Close,
    Version,

    // Stack manipulation
    AbsIndex,
    GetTop,
    SetTop,
    PushValue,
    Rotate,
    Copy,
    CheckStack,

    // Type predicates
    IsNumber,
    IsInteger,
    IsString,
    IsCFunction,
    IsUserdata,
    IsLightUserdata,
    IsTable,
    IsFunction,
    IsNil,
    IsBoolean,
    IsThread,
    IsNone,
    IsNoneOrNil,

    // VM -> host
    Type,
    ToNumber,
    ToInteger,
    ToBoolean,
    ToString,
    ToUserdata,
    RawLen,
    RawEqual,
    Compare,

    // Host -> VM
    PushNil,
    PushInteger,
    PushNumber,
    PushString,
    PushBoolean,

    // Reads
    GetGlobal,
    GetTable,
    GetField,
    GetI,
    RawGet,
    RawGetI,
    CreateTable,
    NewUserdata,
    GetMetatable,
    GetUserValue,

    // Writes
    SetGlobal,
    SetTable,
    SetField,
    SetI,
    RawSet,
    RawSetI,
    SetMetatable,
    SetUserValue,

    // Calls, chunks, misc
    Pcall,
    LoadBuffer,
    LoadFile,
    Dump,
    Gc,
    Error,
    Next,
    Concat,
    Len,
}

impl Op {
    /// Name of the operation
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Look an operation up by name
    pub fn from_name(name: &str) -> BridgeResult<Self> {
        name.parse()
            .map_err(|_| BridgeError::UnknownOperation(name.to_string()))
    }

    /// Number of arguments, handle included (`newstate` takes none)
    pub fn arity(self) -> usize {
        match self {
            Op::NewState => 0,

            Op::Close
            | Op::Version
            | Op::GetTop
            | Op::PushNil
            | Op::Error => 1,

            Op::AbsIndex
            | Op::SetTop
            | Op::PushValue
            | Op::CheckStack
            | Op::IsNumber
            | Op::IsInteger
            | Op::IsString
            | Op::IsCFunction
            | Op::IsUserdata
            | Op::IsLightUserdata
            | Op::IsTable
            | Op::IsFunction
            | Op::IsNil
            | Op::IsBoolean
            | Op::IsThread
            | Op::IsNone
            | Op::IsNoneOrNil
            | Op::Type
            | Op::ToNumber
            | Op::ToInteger
            | Op::ToBoolean
            | Op::ToString
            | Op::ToUserdata
            | Op::RawLen
            | Op::PushInteger
            | Op::PushNumber
            | Op::PushString
            | Op::PushBoolean
            | Op::GetGlobal
            | Op::GetTable
            | Op::RawGet
            | Op::NewUserdata
            | Op::GetMetatable
            | Op::GetUserValue
            | Op::SetGlobal
            | Op::SetTable
            | Op::RawSet
            | Op::SetMetatable
            | Op::SetUserValue
            | Op::LoadFile
            | Op::Dump
            | Op::Next
            | Op::Concat
            | Op::Len => 2,

            Op::Rotate
            | Op::Copy
            | Op::RawEqual
            | Op::GetField
            | Op::GetI
            | Op::RawGetI
            | Op::CreateTable
            | Op::SetField
            | Op::SetI
            | Op::RawSetI
            | Op::Pcall
            | Op::LoadBuffer
            | Op::Gc => 3,

            Op::Compare => 4,
        }
    }

    /// Fail unless `got` arguments match the arity
    pub fn check_arity(self, got: usize) -> BridgeResult<()> {
        let expected = self.arity();
        if got != expected {
            return Err(BridgeError::Arity {
                op: self.name(),
                expected,
                got,
            });
        }
        Ok(())
    }
}

/// Run `op` against a live VM.
///
/// Arguments have already passed the arity check; position 0 is the
/// handle. `newstate` and `close` act on the registry, not on a VM, and
/// are refused here.
pub(crate) fn apply(vm: &mut LuaVm, op: Op, args: &Args<'_>) -> BridgeResult<Reply> {
    let reply = match op {
        Op::NewState | Op::Close => {
            return Err(BridgeError::UnknownOperation(op.to_string()));
        }
        Op::Version => Reply::value(vm.version()),

        // Stack manipulation
        Op::AbsIndex => Reply::value(vm.absindex(args.int(1)?)),
        Op::GetTop => Reply::value(vm.gettop()),
        Op::SetTop => {
            vm.settop(args.int(1)?)?;
            Reply::Ok
        }
        Op::PushValue => {
            vm.pushvalue(args.int(1)?)?;
            Reply::Ok
        }
        Op::Rotate => {
            vm.rotate(args.int(1)?, args.int(2)?)?;
            Reply::Ok
        }
        Op::Copy => {
            vm.copy(args.int(1)?, args.int(2)?)?;
            Reply::Ok
        }
        Op::CheckStack => Reply::value(vm.checkstack(args.int(1)?)?),

        // Type predicates
        Op::IsNumber => Reply::value(vm.is(args.int(1)?, TypeCheck::Number)),
        Op::IsInteger => Reply::value(vm.is(args.int(1)?, TypeCheck::Integer)),
        Op::IsString => Reply::value(vm.is(args.int(1)?, TypeCheck::String)),
        Op::IsCFunction => Reply::value(vm.is(args.int(1)?, TypeCheck::CFunction)),
        Op::IsUserdata => Reply::value(vm.is(args.int(1)?, TypeCheck::Userdata)),
        Op::IsLightUserdata => Reply::value(vm.is(args.int(1)?, TypeCheck::LightUserdata)),
        Op::IsTable => Reply::value(vm.is(args.int(1)?, TypeCheck::Table)),
        Op::IsFunction => Reply::value(vm.is(args.int(1)?, TypeCheck::Function)),
        Op::IsNil => Reply::value(vm.is(args.int(1)?, TypeCheck::Nil)),
        Op::IsBoolean => Reply::value(vm.is(args.int(1)?, TypeCheck::Boolean)),
        Op::IsThread => Reply::value(vm.is(args.int(1)?, TypeCheck::Thread)),
        Op::IsNone => Reply::value(vm.is(args.int(1)?, TypeCheck::None)),
        Op::IsNoneOrNil => Reply::value(vm.is(args.int(1)?, TypeCheck::NoneOrNil)),

        // VM -> host
        Op::Type => Reply::value(vm.type_of(args.int(1)?)),
        Op::ToNumber => Reply::value(vm.to_number(args.int(1)?)?),
        Op::ToInteger => Reply::value(vm.to_integer(args.int(1)?)?),
        Op::ToBoolean => Reply::value(vm.to_boolean(args.int(1)?)),
        Op::ToString => Reply::value(vm.to_string(args.int(1)?)?),
        Op::ToUserdata => Reply::value(vm.to_userdata(args.int(1)?)?),
        Op::RawLen => Reply::value(vm.raw_len(args.int(1)?)),
        Op::RawEqual => Reply::value(vm.raw_equal(args.int(1)?, args.int(2)?)),
        Op::Compare => Reply::value(vm.compare(
            args.int(1)?,
            args.int(2)?,
            args.compare_op(3)?,
        )?),

        // Host -> VM
        Op::PushNil => {
            vm.push_nil()?;
            Reply::Ok
        }
        Op::PushInteger => {
            vm.push_integer(args.integer(1)?)?;
            Reply::Ok
        }
        Op::PushNumber => {
            vm.push_number(args.number(1)?)?;
            Reply::Ok
        }
        Op::PushString => {
            vm.push_string(args.binary(1)?)?;
            Reply::Ok
        }
        Op::PushBoolean => {
            vm.push_boolean(args.boolean(1)?)?;
            Reply::Ok
        }

        // Reads
        Op::GetGlobal => Reply::value(vm.getglobal(args.binary(1)?)?),
        Op::GetTable => Reply::value(vm.gettable(args.int(1)?)?),
        Op::GetField => Reply::value(vm.getfield(args.int(1)?, args.binary(2)?)?),
        Op::GetI => Reply::value(vm.geti(args.int(1)?, args.integer(2)?)?),
        Op::RawGet => Reply::value(vm.rawget(args.int(1)?)?),
        Op::RawGetI => Reply::value(vm.rawgeti(args.int(1)?, args.integer(2)?)?),
        Op::CreateTable => {
            vm.createtable(args.int(1)?, args.int(2)?)?;
            Reply::Ok
        }
        Op::NewUserdata => {
            vm.new_userdata(args.binary(1)?)?;
            Reply::Ok
        }
        Op::GetMetatable => Reply::value(vm.getmetatable(args.int(1)?)?),
        Op::GetUserValue => Reply::value(vm.getuservalue(args.int(1)?)?),

        // Writes
        Op::SetGlobal => {
            vm.setglobal(args.binary(1)?)?;
            Reply::Ok
        }
        Op::SetTable => {
            vm.settable(args.int(1)?)?;
            Reply::Ok
        }
        Op::SetField => {
            vm.setfield(args.int(1)?, args.binary(2)?)?;
            Reply::Ok
        }
        Op::SetI => {
            vm.seti(args.int(1)?, args.integer(2)?)?;
            Reply::Ok
        }
        Op::RawSet => {
            vm.rawset(args.int(1)?)?;
            Reply::Ok
        }
        Op::RawSetI => {
            vm.rawseti(args.int(1)?, args.integer(2)?)?;
            Reply::Ok
        }
        Op::SetMetatable => Reply::value(vm.setmetatable(args.int(1)?)?),
        Op::SetUserValue => {
            vm.setuservalue(args.int(1)?)?;
            Reply::Ok
        }

        // Calls, chunks, misc
        Op::Pcall => match vm.pcall(args.int(1)?, args.int(2)?)? {
            Completion::Done => Reply::Ok,
            Completion::Yielded => Reply::Yield,
        },
        Op::LoadBuffer => {
            vm.loadbuffer(args.binary(1)?, args.binary(2)?)?;
            Reply::Ok
        }
        Op::LoadFile => {
            vm.loadfile(args.binary(1)?)?;
            Reply::Ok
        }
        Op::Dump => Reply::value(vm.dump(args.boolean(1)?)?),
        Op::Gc => {
            let mode = args.gc_mode(1)?;
            let result = vm.gc(mode, args.int(2)?)?;
            match mode {
                GcMode::Stop | GcMode::Restart | GcMode::Collect | GcMode::Step => Reply::Ok,
                GcMode::IsRunning => Reply::value(result != 0),
                GcMode::Count | GcMode::CountB | GcMode::SetPause | GcMode::SetStepMul => {
                    Reply::value(result)
                }
            }
        }
        Op::Error => {
            vm.error()?;
            Reply::Ok
        }
        Op::Next => Reply::value(vm.next(args.int(1)?)?),
        Op::Concat => {
            vm.concat(args.int(1)?)?;
            Reply::Ok
        }
        Op::Len => {
            vm.len(args.int(1)?)?;
            Reply::Ok
        }

    };
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_names_round_trip() {
        for op in Op::iter() {
            assert_eq!(Op::from_name(op.name()).unwrap(), op);
            assert_eq!(op.to_string(), op.name());
        }
    }

    #[test]
    fn test_selected_names() {
        assert_eq!(Op::NewState.name(), "newstate");
        assert_eq!(Op::IsNoneOrNil.name(), "isnoneornil");
        assert_eq!(Op::RawGetI.name(), "rawgeti");
        assert_eq!(Op::GetUserValue.name(), "getuservalue");
        assert_eq!(Op::LoadBuffer.name(), "loadbuffer");
        assert_eq!(Op::Gc.name(), "gc");
    }

    #[test]
    fn test_unknown_operation() {
        assert_eq!(
            Op::from_name("lua_close"),
            Err(BridgeError::UnknownOperation("lua_close".to_string()))
        );
    }

    #[test]
    fn test_arity() {
        assert_eq!(Op::NewState.arity(), 0);
        assert_eq!(Op::GetTop.arity(), 1);
        assert_eq!(Op::PushString.arity(), 2);
        assert_eq!(Op::LoadBuffer.arity(), 3);
        assert_eq!(Op::Compare.arity(), 4);
        assert_eq!(
            Op::Pcall.check_arity(2),
            Err(BridgeError::Arity {
                op: "pcall",
                expected: 3,
                got: 2
            })
        );
    }

    #[test]
    fn test_operation_count() {
        assert_eq!(Op::iter().count(), 64);
    }
}
