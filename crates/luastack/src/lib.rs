//! Lua stack bridge
//!
//! Exposes the low-level stack API of an embedded Lua 5.3 VM as atomic
//! operations a host can call one at a time:
//! - Opaque, validated VM handles ([`HandleId`], [`HandleRegistry`])
//! - Lossless value marshalling between host [`Term`]s and stack values
//! - A uniform [`Reply`]: ok, ok with a value, error with a reason, or yield
//! - Growable buffer for streaming bytecode out of the VM ([`DumpWriter`])
//!
//! ```ignore
//! let bridge = Bridge::default();
//! let vm = Term::Handle(bridge.create()?);
//! bridge.call("loadbuffer", &[vm.clone(), Term::binary("return 1 + 2"), Term::binary("")]);
//! bridge.call("pcall", &[vm.clone(), 0.into(), 1.into()]);
//! assert_eq!(bridge.call("tointeger", &[vm, (-1).into()]), Reply::value(3));
//! ```

#![warn(rust_2018_idioms)]

pub mod bridge;
pub mod call;
pub mod config;
pub mod error;
pub mod extension;
pub mod ops;
pub mod registry;
pub mod reply;
pub mod state;
pub mod term;
pub mod types;
pub mod writer;

mod marshal;
mod meta;
mod protect;
mod stack;
mod table;

pub use bridge::Bridge;
pub use call::Completion;
pub use config::{BridgeConfig, ConfigError};
pub use error::{BridgeError, BridgeResult, ErrorKind};
pub use ops::Op;
pub use registry::{HandleId, HandleRegistry, VmResource};
pub use reply::{Reason, Reply};
pub use state::LuaVm;
pub use term::Term;
pub use types::{CompareOp, GcMode, LuaType, TypeCheck, REGISTRY_INDEX};
pub use writer::DumpWriter;

/// Bridge version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
