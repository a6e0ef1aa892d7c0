//! VM resource management
//!
//! The host never sees a pointer: it holds a [`HandleId`], which resolves
//! through the [`HandleRegistry`] to a reference-counted [`VmResource`].
//! A resource is either live (it owns a [`LuaVm`]) or dead; closing a handle
//! takes the VM out, closes it, and unregisters the id. Ids are never reused
//! within a process, so a stale or forged id simply fails to resolve.

use crate::error::{BridgeError, BridgeResult};
use crate::state::LuaVm;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Opaque identifier of a VM created by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    /// Allocate a fresh id
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        HandleId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Rebuild an id from its raw value, e.g. one that crossed a C boundary.
    ///
    /// The result is only meaningful if the registry knows it.
    pub fn from_raw(raw: u64) -> Self {
        HandleId(raw)
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry entry for one VM: live while it holds the VM, dead afterwards
pub struct VmResource {
    id: HandleId,
    vm: Mutex<Option<LuaVm>>,
}

impl VmResource {
    fn new(vm: LuaVm) -> Self {
        Self {
            id: HandleId::next(),
            vm: Mutex::new(Some(vm)),
        }
    }

    /// The handle this resource is registered under
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Check whether the VM is still open
    pub fn is_live(&self) -> bool {
        self.vm.lock().is_some()
    }

    /// Run `f` with exclusive access to the live VM
    pub fn with_vm<T>(&self, f: impl FnOnce(&mut LuaVm) -> BridgeResult<T>) -> BridgeResult<T> {
        let mut guard = self.vm.lock();
        let vm = guard.as_mut().ok_or(BridgeError::NotInitialized)?;
        f(vm)
    }

    /// Take the VM out, leaving the resource dead
    fn take(&self) -> Option<LuaVm> {
        self.vm.lock().take()
    }
}

impl fmt::Debug for VmResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VmResource")
            .field("id", &self.id)
            .field("live", &self.is_live())
            .finish()
    }
}

/// Registry of all live VMs
#[derive(Debug, Default)]
pub struct HandleRegistry {
    resources: RwLock<HashMap<HandleId, Arc<VmResource>>>,
}

impl HandleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a VM and return its new handle
    pub fn register(&self, vm: LuaVm) -> HandleId {
        let resource = Arc::new(VmResource::new(vm));
        let id = resource.id();
        self.resources.write().insert(id, resource);
        id
    }

    /// Resolve a handle
    pub fn get(&self, id: HandleId) -> BridgeResult<Arc<VmResource>> {
        self.resources
            .read()
            .get(&id)
            .cloned()
            .ok_or(BridgeError::NotAResource)
    }

    /// Resolve a handle and run `f` on its VM
    pub fn with_vm<T>(
        &self,
        id: HandleId,
        f: impl FnOnce(&mut LuaVm) -> BridgeResult<T>,
    ) -> BridgeResult<T> {
        self.get(id)?.with_vm(f)
    }

    /// Unregister a handle and close its VM.
    ///
    /// Waits for an operation in progress on the same handle to finish.
    pub fn close(&self, id: HandleId) -> BridgeResult<()> {
        let resource = self
            .resources
            .write()
            .remove(&id)
            .ok_or(BridgeError::NotAResource)?;
        match resource.take() {
            Some(vm) => {
                drop(vm);
                Ok(())
            }
            None => Err(BridgeError::NotInitialized),
        }
    }

    /// Number of live VMs
    pub fn len(&self) -> usize {
        self.resources.read().len()
    }

    /// Check whether no VM is registered
    pub fn is_empty(&self) -> bool {
        self.resources.read().is_empty()
    }

    /// Handles of all live VMs
    pub fn ids(&self) -> Vec<HandleId> {
        self.resources.read().keys().copied().collect()
    }
}
