//! Outbound calls.
//!
//! A call goes through three states:
//!
//! ```text
//! Building --(sent)--> InFlight --(attach_reply)--> Completed
//! ```
//!
//! [`RpcCall`] is the building form: parameters can be appended, replaced
//! and removed. [`RpcCall::seal`] consumes it into a [`SealedCall`] whose
//! parameters are frozen and whose frame is encoded once. Either form
//! accepts exactly one reply; the reply slot is a one-time publish, so a
//! sealed call can be shared between the thread that sent it and the one
//! that receives the reply.
//!
//! Frame layout:
//!
//! ```text
//! <id> <op>[ <param>]*\n
//! ```

use std::any::Any;
use std::fmt;
use std::io::{self, Write};
use std::ops::Deref;
use std::sync::{Arc, OnceLock};

use crate::diagnostics::{default_diagnostics, CallFailure, Diagnostics};
use crate::error::{ProtocolError, ProtocolResult};
use crate::reply::RpcReply;
use crate::token::Token;

/// Local bookkeeping value attached to a call. Never sent.
pub type AuxValue = Box<dyn Any + Send + Sync>;

/// An outbound request: id, operation number and positional parameters.
pub struct RpcCall {
    id: u32,
    op: u32,
    parameters: Vec<Token>,
    aux: Vec<AuxValue>,
    reply: OnceLock<RpcReply>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl RpcCall {
    /// Creates an empty call. `op` is not validated.
    pub fn new(id: u32, op: u32) -> Self {
        Self {
            id,
            op,
            parameters: Vec::new(),
            aux: Vec::new(),
            reply: OnceLock::new(),
            diagnostics: default_diagnostics(),
        }
    }

    /// Routes failure and frame reports to `diagnostics`.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn op(&self) -> u32 {
        self.op
    }

    pub(crate) fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    /// Appends a parameter and returns the call, for chaining.
    ///
    /// ```rust
    /// use lattekom_protocol::RpcCall;
    ///
    /// let call = RpcCall::new(5, 10).add(42).add("hi");
    /// assert_eq!(call.encode(), b"5 10 42 2Hhi\n");
    /// ```
    #[must_use]
    pub fn add(mut self, token: impl Into<Token>) -> Self {
        self.push(token);
        self
    }

    /// Appends a parameter in place.
    pub fn push(&mut self, token: impl Into<Token>) -> &mut Self {
        self.parameters.push(token.into());
        self
    }

    /// Parameter at `index`.
    pub fn parameter(&self, index: usize) -> ProtocolResult<&Token> {
        self.parameters
            .get(index)
            .ok_or_else(|| self.out_of_range(index))
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Parameters in wire order.
    pub fn parameters(&self) -> std::slice::Iter<'_, Token> {
        self.parameters.iter()
    }

    /// Replaces the parameter at `index`, returning the old one.
    pub fn set_parameter(
        &mut self,
        index: usize,
        token: impl Into<Token>,
    ) -> ProtocolResult<Token> {
        let err = self.out_of_range(index);
        let slot = self.parameters.get_mut(index).ok_or(err)?;
        Ok(std::mem::replace(slot, token.into()))
    }

    /// Removes the parameter at `index`, shifting later ones down.
    pub fn remove_parameter(&mut self, index: usize) -> ProtocolResult<Token> {
        if index >= self.parameters.len() {
            return Err(self.out_of_range(index));
        }
        Ok(self.parameters.remove(index))
    }

    /// Removes the final parameter.
    pub fn remove_last(&mut self) -> ProtocolResult<Token> {
        self.parameters.pop().ok_or(ProtocolError::NoParameters)
    }

    fn out_of_range(&self, index: usize) -> ProtocolError {
        ProtocolError::ParameterOutOfRange {
            index,
            len: self.parameters.len(),
        }
    }

    /// Attaches a bookkeeping value.
    pub fn add_aux(&mut self, value: impl Any + Send + Sync) -> &mut Self {
        self.aux.push(Box::new(value));
        self
    }

    /// Chaining form of [`add_aux`](Self::add_aux).
    #[must_use]
    pub fn with_aux(mut self, value: impl Any + Send + Sync) -> Self {
        self.add_aux(value);
        self
    }

    /// Aux value at `index` as a `T`.
    ///
    /// Unlike [`parameter`](Self::parameter) this never fails: an index past
    /// the end or a value of another type gives `None`.
    pub fn aux<T: Any>(&self, index: usize) -> Option<&T> {
        self.aux.get(index)?.downcast_ref()
    }

    /// Untyped aux value at `index`.
    pub fn aux_value(&self, index: usize) -> Option<&(dyn Any + Send + Sync)> {
        self.aux.get(index).map(|value| &**value)
    }

    pub fn aux_count(&self) -> usize {
        self.aux.len()
    }

    /// Aux values in insertion order.
    pub fn aux_items(&self) -> impl Iterator<Item = &(dyn Any + Send + Sync)> {
        self.aux.iter().map(|value| &**value)
    }

    /// Encodes the call as one newline-terminated frame.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = format!("{} {}", self.id, self.op).into_bytes();
        for parameter in &self.parameters {
            out.push(b' ');
            parameter.write_to(&mut out);
        }
        out.push(b'\n');
        out
    }

    /// Writes the encoded frame to `writer`.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.encode())
    }

    /// Stores the server's reply. A failed reply is reported to the call's
    /// diagnostics sink and otherwise left for the caller to inspect.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::ReplyMismatch`] if the reply answers another call,
    /// [`ProtocolError::ReplyAlreadyAttached`] if one is already stored. The
    /// stored reply is left untouched in both cases.
    pub fn attach_reply(&self, reply: RpcReply) -> ProtocolResult<&RpcReply> {
        if reply.id != self.id {
            return Err(ProtocolError::ReplyMismatch {
                call: self.id,
                reply: reply.id,
            });
        }
        let already_attached = || ProtocolError::ReplyAlreadyAttached { id: self.id };
        self.reply.set(reply).map_err(|_| already_attached())?;
        let reply = self.reply.get().ok_or_else(already_attached)?;

        if !reply.success {
            self.diagnostics.call_failed(&CallFailure {
                id: self.id,
                op: self.op,
                error_code: reply.error_code(),
            });
        }
        Ok(reply)
    }

    /// The attached reply, or `None` while the call is in flight.
    pub fn reply(&self) -> Option<&RpcReply> {
        self.reply.get()
    }

    pub fn is_completed(&self) -> bool {
        self.reply.get().is_some()
    }

    pub(crate) fn report_frame(&self, frame: &[u8]) {
        self.diagnostics.frame_written(self.id, self.op, frame);
    }

    /// Freezes the parameters and encodes the frame once.
    pub fn seal(self) -> SealedCall {
        let frame = self.encode();
        SealedCall { call: self, frame }
    }
}

impl fmt::Debug for RpcCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcCall")
            .field("id", &self.id)
            .field("op", &self.op)
            .field("parameters", &self.parameters)
            .field("aux", &self.aux.len())
            .field("reply", &self.reply.get())
            .finish()
    }
}

impl fmt::Display for RpcCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RpcCall(id: {}; op: {}; parameters: {})",
            self.id,
            self.op,
            self.parameters.len()
        )
    }
}

/// A call whose parameters can no longer change.
///
/// Dereferences to [`RpcCall`] for read access and reply attachment.
#[derive(Debug)]
pub struct SealedCall {
    call: RpcCall,
    frame: Vec<u8>,
}

impl SealedCall {
    /// Encoded frame, computed at sealing time.
    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    /// Unwraps back into a mutable call, keeping any attached reply.
    pub fn into_inner(self) -> RpcCall {
        self.call
    }
}

impl Deref for SealedCall {
    type Target = RpcCall;

    fn deref(&self) -> &RpcCall {
        &self.call
    }
}

impl fmt::Display for SealedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.call.fmt(f)
    }
}
