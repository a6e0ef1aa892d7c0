//! Entry point for hosts
//!
//! A [`Bridge`] owns the handle registry and the configuration applied to
//! every VM it creates. Operations are called by [`Op`] or by name with a
//! list of [`Term`] arguments, the handle first, and always answer with a
//! [`Reply`]. Nothing here panics or unwinds into the caller.

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::ops::{self, Op};
use crate::registry::{HandleId, HandleRegistry};
use crate::reply::Reply;
use crate::state::LuaVm;
use crate::term::{Args, Term};

/// The bridge: configuration plus the set of live VMs
#[derive(Debug, Default)]
pub struct Bridge {
    config: BridgeConfig,
    registry: HandleRegistry,
}

impl Bridge {
    /// Create a bridge with no VMs
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            registry: HandleRegistry::new(),
        }
    }

    /// Configuration used for new VMs
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The registry of live VMs
    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    /// Create a VM and return its handle
    pub fn create(&self) -> BridgeResult<HandleId> {
        let vm = LuaVm::new(&self.config)?;
        let id = self.registry.register(vm);
        tracing::debug!(handle = %id, "Created Lua VM");
        Ok(id)
    }

    /// Close a VM; its handle is invalid afterwards
    pub fn close(&self, id: HandleId) -> BridgeResult<()> {
        self.registry.close(id)?;
        tracing::debug!(handle = %id, "Closed Lua VM");
        Ok(())
    }

    /// Run `f` with exclusive access to the VM behind `id`
    pub fn with_vm<T>(
        &self,
        id: HandleId,
        f: impl FnOnce(&mut LuaVm) -> BridgeResult<T>,
    ) -> BridgeResult<T> {
        self.registry.with_vm(id, f)
    }

    /// Call an operation by name
    pub fn call(&self, name: &str, args: &[Term]) -> Reply {
        match Op::from_name(name) {
            Ok(op) => self.invoke(op, args),
            Err(err) => err.into(),
        }
    }

    /// Call an operation
    pub fn invoke(&self, op: Op, args: &[Term]) -> Reply {
        tracing::trace!(op = op.name(), nargs = args.len(), "Dispatching operation");
        match self.dispatch(op, args) {
            Ok(reply) => reply,
            Err(err) => {
                if matches!(err, BridgeError::Runtime { .. }) {
                    tracing::debug!(op = op.name(), error = %err, "Lua VM reported an error");
                }
                err.into()
            }
        }
    }

    fn dispatch(&self, op: Op, args: &[Term]) -> BridgeResult<Reply> {
        if op == Op::NewState {
            op.check_arity(args.len())?;
            return Ok(Reply::value(self.create()?));
        }

        // The handle is validated before anything else about the call.
        let id = args
            .first()
            .and_then(Term::as_handle)
            .ok_or(BridgeError::NotAResource)?;
        let resource = self.registry.get(id)?;
        op.check_arity(args.len())?;

        if op == Op::Close {
            self.close(id)?;
            return Ok(Reply::Ok);
        }

        let args = Args::new(args);
        resource.with_vm(|vm| ops::apply(vm, op, &args))
    }
}
