//! Client side of LysKOM Protocol A.
//!
//! Protocol A is a line-oriented ASCII protocol. A client sends calls:
//!
//! ```text
//! <id> <op>[ <param>]*\n
//! ```
//!
//! and the server answers each one with a reply carrying the same id,
//! possibly interleaved with asynchronous messages.
//!
//! # Building and sending a call
//!
//! ```rust
//! use lattekom_protocol::{CallRegistry, CallWriter, Token};
//!
//! let registry = CallRegistry::new();
//! let call = registry
//!     .call(86)
//!     .add("Subject\nBody")
//!     .add(Token::array([Token::integer(0), Token::integer(6)]));
//! let call = registry.register(call).unwrap();
//!
//! let mut writer = CallWriter::new(Vec::new());
//! writer.write_sealed(&call).unwrap();
//! assert_eq!(writer.into_inner(), b"1 86 12HSubject\nBody 2 {0 6}\n");
//! ```
//!
//! # Receiving the reply
//!
//! ```rust
//! use lattekom_protocol::{CallRegistry, Message, ReplyReader};
//!
//! let registry = CallRegistry::new();
//! let call = registry.register(registry.call(35)).unwrap();
//!
//! let mut reader = ReplyReader::new(&b"=1 4711\n"[..]);
//! if let Some(Message::Reply(reply)) = reader.read_message().unwrap() {
//!     registry.complete(reply).unwrap();
//! }
//! assert!(call.reply().unwrap().success);
//! ```

mod call;
mod decode;
mod diagnostics;
mod error;
mod framing;
mod registry;
mod reply;
mod token;

#[cfg(test)]
mod proptest_wire;

pub use call::{AuxValue, RpcCall, SealedCall};
pub use decode::{decode_message, Message, MAX_NESTING};
pub use diagnostics::{CallFailure, Diagnostics, MemoryDiagnostics, TracingDiagnostics};
pub use error::{ProtocolError, ProtocolResult};
pub use framing::{CallWriter, ReplyReader};
pub use registry::CallRegistry;
pub use reply::{ErrorCode, RpcReply};
pub use token::{Hollerith, Token};

/// Default cap on a single buffered server message (1 MB).
pub const MAX_MESSAGE_SIZE: usize = lattekom_core::config::DEFAULT_MAX_MESSAGE_SIZE;
