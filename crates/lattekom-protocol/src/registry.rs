//! Correlation of replies with the calls that caused them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::call::{RpcCall, SealedCall};
use crate::diagnostics::{default_diagnostics, Diagnostics};
use crate::error::{ProtocolError, ProtocolResult};
use crate::reply::RpcReply;

/// Hands out call ids and holds calls until their reply arrives.
///
/// One registry belongs to one connection. Calls are independent of each
/// other; the registry only owns the id-to-call map.
pub struct CallRegistry {
    next_id: AtomicU32,
    pending: Mutex<HashMap<u32, Arc<SealedCall>>>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl Default for CallRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CallRegistry {
    /// Creates a registry whose first id is 1.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU32::new(1),
            pending: Mutex::new(HashMap::new()),
            diagnostics: default_diagnostics(),
        }
    }

    /// Sink handed to every call built by [`call`](Self::call).
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Reserves the next id.
    ///
    /// Ids wrap around after `u32::MAX`; 0 is never handed out.
    pub fn next_id(&self) -> u32 {
        loop {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            if id != 0 {
                return id;
            }
        }
    }

    /// Starts a call for `op` with a fresh id.
    pub fn call(&self, op: u32) -> RpcCall {
        RpcCall::new(self.next_id(), op).with_diagnostics(Arc::clone(&self.diagnostics))
    }

    /// Seals `call` and records it as in flight.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::DuplicateCall`] if a call with the same id is still
    /// waiting for its reply.
    pub fn register(&self, call: RpcCall) -> ProtocolResult<Arc<SealedCall>> {
        let mut pending = self.pending();
        if pending.contains_key(&call.id()) {
            return Err(ProtocolError::DuplicateCall { id: call.id() });
        }
        let sealed = Arc::new(call.seal());
        pending.insert(sealed.id(), Arc::clone(&sealed));
        debug!(call_id = sealed.id(), op = sealed.op(), "call in flight");
        Ok(sealed)
    }

    /// Gives `call` a fresh id, then registers it.
    pub fn register_with_new_id(&self, mut call: RpcCall) -> ProtocolResult<Arc<SealedCall>> {
        call.set_id(self.next_id());
        self.register(call)
    }

    /// Attaches `reply` to its call and stops tracking it.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnknownCall`] if no call with the reply's id is in
    /// flight.
    pub fn complete(&self, reply: RpcReply) -> ProtocolResult<Arc<SealedCall>> {
        let id = reply.id;
        let call = self
            .pending()
            .remove(&id)
            .ok_or(ProtocolError::UnknownCall { id })?;
        call.attach_reply(reply)?;
        debug!(call_id = id, op = call.op(), "call completed");
        Ok(call)
    }

    /// In-flight call with `id`.
    pub fn get(&self, id: u32) -> Option<Arc<SealedCall>> {
        self.pending().get(&id).cloned()
    }

    pub fn pending_count(&self) -> usize {
        self.pending().len()
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<u32, Arc<SealedCall>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
