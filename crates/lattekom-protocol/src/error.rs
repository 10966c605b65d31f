//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while building, framing or correlating calls.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Parameter index does not name an existing position.
    #[error("parameter index {index} out of range (call has {len})")]
    ParameterOutOfRange { index: usize, len: usize },

    /// `remove_last` on a call without parameters.
    #[error("call has no parameters")]
    NoParameters,

    /// A call already holds its reply.
    #[error("call #{id} already has a reply attached")]
    ReplyAlreadyAttached { id: u32 },

    /// Reply id does not match the call it was attached to.
    #[error("reply #{reply} attached to call #{call}")]
    ReplyMismatch { call: u32, reply: u32 },

    /// A call with this id is already in flight.
    #[error("call #{id} is already in flight")]
    DuplicateCall { id: u32 },

    /// No in-flight call carries this id.
    #[error("no call in flight with id #{id}")]
    UnknownCall { id: u32 },

    /// Server message did not follow the token grammar.
    #[error("malformed message at byte {offset}: {reason}")]
    Malformed { offset: usize, reason: &'static str },

    /// Buffered server message exceeds the configured limit.
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Stream closed in the middle of a message.
    #[error("connection closed mid-message ({buffered} bytes buffered)")]
    UnexpectedEof { buffered: usize },

    /// IO error during read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    pub(crate) fn malformed(offset: usize, reason: &'static str) -> Self {
        Self::Malformed { offset, reason }
    }
}
