//! Stream adapters for calls and server messages.
//!
//! Outbound frames are newline-terminated lines (see [`RpcCall::encode`]);
//! inbound messages are decoded with [`decode_message`](crate::decode_message)
//! from an internal buffer that grows until a full message is available.
//! Decoding is retried only once enough bytes for progress have arrived, so a
//! long Hollerith string is scanned once rather than once per read.

use std::io::{ErrorKind, Read, Write};

use lattekom_core::WireSettings;
use tracing::debug;

use crate::call::{RpcCall, SealedCall};
use crate::decode::{decode_partial, Decoded, Message};
use crate::error::{ProtocolError, ProtocolResult};
use crate::MAX_MESSAGE_SIZE;

const READ_CHUNK: usize = 4096;

/// Writes call frames to a byte stream.
pub struct CallWriter<W> {
    writer: W,
    trace_frames: bool,
}

impl<W: Write> CallWriter<W> {
    /// Creates a CallWriter wrapping the given writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            trace_frames: false,
        }
    }

    /// Creates a CallWriter configured from `settings`.
    pub fn from_settings(writer: W, settings: &WireSettings) -> Self {
        Self::new(writer).with_trace(settings.trace_frames)
    }

    /// Reports every written frame to the call's diagnostics sink.
    #[must_use]
    pub fn with_trace(mut self, trace_frames: bool) -> Self {
        self.trace_frames = trace_frames;
        self
    }

    /// Encodes and writes a single call.
    pub fn write_call(&mut self, call: &RpcCall) -> ProtocolResult<()> {
        let frame = call.encode();
        self.write_frame(call, &frame)
    }

    /// Writes the frame cached in a sealed call.
    pub fn write_sealed(&mut self, call: &SealedCall) -> ProtocolResult<()> {
        self.write_frame(call, call.frame())
    }

    fn write_frame(&mut self, call: &RpcCall, frame: &[u8]) -> ProtocolResult<()> {
        self.writer.write_all(frame)?;
        if self.trace_frames {
            call.report_frame(frame);
        }
        Ok(())
    }

    /// Flushes the underlying writer.
    pub fn flush(&mut self) -> ProtocolResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Returns a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Returns a mutable reference to the underlying writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Unwraps this CallWriter, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Reads server messages from a byte stream.
pub struct ReplyReader<R> {
    reader: R,
    buffer: Vec<u8>,
    /// Buffer length below which decoding cannot make progress.
    need: usize,
    max_message_size: usize,
}

impl<R: Read> ReplyReader<R> {
    /// Creates a ReplyReader wrapping the given reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            need: 0,
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }

    /// Creates a ReplyReader configured from `settings`.
    pub fn from_settings(reader: R, settings: &WireSettings) -> Self {
        Self::new(reader).with_max_message_size(settings.max_message_size)
    }

    /// Caps how many bytes one message may occupy.
    #[must_use]
    pub fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = max;
        self
    }

    /// Reads the next complete message.
    ///
    /// Returns `Ok(None)` if the stream ends cleanly between messages.
    /// Returns an error if it ends mid-message, if the message is malformed,
    /// or if it outgrows the size limit.
    ///
    /// A malformed message is discarded up to the next newline at or after
    /// the offending byte, so the following call resumes with the next line.
    pub fn read_message(&mut self) -> ProtocolResult<Option<Message>> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if self.buffer.len() >= self.need {
                match decode_partial(&self.buffer) {
                    Ok(Decoded::Complete(message, used)) => {
                        self.buffer.drain(..used);
                        self.need = 0;
                        if used > self.max_message_size {
                            return Err(ProtocolError::MessageTooLarge {
                                size: used,
                                max: self.max_message_size,
                            });
                        }
                        return Ok(Some(message));
                    }
                    Ok(Decoded::Incomplete { need }) => self.need = need,
                    Err(err) => {
                        self.resync(&err);
                        return Err(err);
                    }
                }
            }

            let size = self.buffer.len().max(self.need);
            if size > self.max_message_size {
                return Err(ProtocolError::MessageTooLarge {
                    size,
                    max: self.max_message_size,
                });
            }

            let read = match self.reader.read(&mut chunk) {
                Ok(read) => read,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };
            if read == 0 {
                if self.buffer.iter().all(u8::is_ascii_whitespace) {
                    return Ok(None);
                }
                debug!(buffered = self.buffer.len(), "stream closed mid-message");
                return Err(ProtocolError::UnexpectedEof {
                    buffered: self.buffer.len(),
                });
            }
            self.buffer.extend_from_slice(&chunk[..read]);
        }
    }

    fn resync(&mut self, err: &ProtocolError) {
        let from = match err {
            ProtocolError::Malformed { offset, .. } => (*offset).min(self.buffer.len()),
            _ => 0,
        };
        let skip = match self.buffer[from..].iter().position(|&b| b == b'\n') {
            Some(newline) => from + newline + 1,
            None => self.buffer.len(),
        };
        debug!(skipped = skip, "discarding malformed input");
        self.buffer.drain(..skip);
        self.need = 0;
    }

    /// Bytes received but not yet part of a complete message.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Returns a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Returns a mutable reference to the underlying reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Unwraps this ReplyReader, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemoryDiagnostics;
    use crate::reply::RpcReply;
    use crate::token::Token;
    use std::io::Cursor;

    /// Hands out at most `step` bytes per read.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn writer_sends_frames_in_order() {
        let mut writer = CallWriter::new(Vec::new());
        writer.write_call(&RpcCall::new(1, 62).add(6).add("pw")).unwrap();
        writer.write_sealed(&RpcCall::new(2, 35).seal()).unwrap();
        writer.flush().unwrap();

        assert_eq!(writer.into_inner(), b"1 62 6 2Hpw\n2 35\n");
    }

    #[test]
    fn writer_traces_when_enabled() {
        let sink = MemoryDiagnostics::new();
        let settings = WireSettings {
            trace_frames: true,
            ..WireSettings::default()
        };
        let mut writer = CallWriter::from_settings(Vec::new(), &settings);
        let call = RpcCall::new(4, 25).add(100).with_diagnostics(sink.clone());
        writer.write_call(&call).unwrap();

        assert_eq!(sink.frames(), vec![b"4 25 100\n".to_vec()]);
    }

    #[test]
    fn writer_is_quiet_by_default() {
        let sink = MemoryDiagnostics::new();
        let mut writer = CallWriter::new(Vec::new());
        writer
            .write_call(&RpcCall::new(4, 25).with_diagnostics(sink.clone()))
            .unwrap();
        assert!(sink.frames().is_empty());
    }

    #[test]
    fn reader_single_message() {
        let mut reader = ReplyReader::new(Cursor::new(b"=3 1Hx\n".to_vec()));
        let message = reader.read_message().unwrap();
        assert_eq!(
            message,
            Some(Message::Reply(RpcReply::success(3, vec![Token::hollerith("x")])))
        );
        assert!(reader.read_message().unwrap().is_none());
    }

    #[test]
    fn reader_empty_stream() {
        let mut reader = ReplyReader::new(Cursor::new(Vec::new()));
        assert!(reader.read_message().unwrap().is_none());
    }

    #[test]
    fn reader_reassembles_split_messages() {
        let data = b"=1 12Hsplit\nacross 2 {1 2}\n%2 9 33\n";
        let mut reader = ReplyReader::new(Trickle { data, step: 3 });

        let Some(Message::Reply(first)) = reader.read_message().unwrap() else {
            panic!("expected first reply");
        };
        assert_eq!(first.parameters[0], Token::hollerith("split\nacross"));

        let Some(Message::Reply(second)) = reader.read_message().unwrap() else {
            panic!("expected second reply");
        };
        assert_eq!(second, RpcReply::failure(2, 9, 33));

        assert!(reader.read_message().unwrap().is_none());
        assert!(reader.buffered().is_empty());
    }

    #[test]
    fn reader_eof_mid_message() {
        let mut reader = ReplyReader::new(Cursor::new(b"=1 5Hab".to_vec()));
        assert!(matches!(
            reader.read_message(),
            Err(ProtocolError::UnexpectedEof { buffered: 7 })
        ));
    }

    #[test]
    fn reader_rejects_oversized_message() {
        let mut data = b"=1 100H".to_vec();
        data.extend_from_slice(&[b'a'; 100]);
        data.push(b'\n');

        let mut reader = ReplyReader::new(Cursor::new(data)).with_max_message_size(16);
        assert!(matches!(
            reader.read_message(),
            Err(ProtocolError::MessageTooLarge { max: 16, .. })
        ));
    }

    #[test]
    fn reader_rejects_oversized_partial_message() {
        let data = b"=1 4000000H".to_vec();
        let mut reader = ReplyReader::new(Trickle { data: &data, step: 4 })
            .with_max_message_size(8);
        assert!(matches!(
            reader.read_message(),
            Err(ProtocolError::MessageTooLarge { max: 8, .. })
        ));
    }

    #[test]
    fn reader_reports_malformed_input() {
        let mut reader = ReplyReader::new(Cursor::new(b"garbage\n".to_vec()));
        assert!(matches!(
            reader.read_message(),
            Err(ProtocolError::Malformed { offset: 0, .. })
        ));
    }

    #[test]
    fn reader_resumes_after_malformed_line() {
        let data = b"=1 abc\n=2 7\n".to_vec();
        let mut reader = ReplyReader::new(Cursor::new(data));

        assert!(matches!(
            reader.read_message(),
            Err(ProtocolError::Malformed { .. })
        ));
        assert_eq!(
            reader.read_message().unwrap(),
            Some(Message::Reply(RpcReply::success(2, vec![Token::integer(7)])))
        );
        assert!(reader.read_message().unwrap().is_none());
    }

    #[test]
    fn reader_rejects_deep_nesting() {
        let mut data = b"=1 ".to_vec();
        data.extend(b"1 {".repeat(20_000));
        data.push(b'\n');

        let mut reader = ReplyReader::new(Cursor::new(data));
        assert!(matches!(
            reader.read_message(),
            Err(ProtocolError::Malformed { .. })
        ));
        assert!(reader.buffered().is_empty());
    }

    /// Replays a fixed sequence of read results.
    struct Scripted(Vec<std::io::Result<Vec<u8>>>);

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.0.is_empty() {
                return Ok(0);
            }
            let bytes = self.0.remove(0)?;
            buf[..bytes.len()].copy_from_slice(&bytes);
            Ok(bytes.len())
        }
    }

    #[test]
    fn reader_retries_interrupted_reads() {
        let interrupted = || std::io::Error::from(ErrorKind::Interrupted);
        let mut reader = ReplyReader::new(Scripted(vec![
            Err(interrupted()),
            Ok(b"=5 ".to_vec()),
            Err(interrupted()),
            Ok(b"1\n".to_vec()),
        ]));

        assert_eq!(
            reader.read_message().unwrap(),
            Some(Message::Reply(RpcReply::success(5, vec![Token::integer(1)])))
        );
    }

    #[test]
    fn reader_propagates_other_io_errors() {
        let mut reader = ReplyReader::new(Scripted(vec![Err(std::io::Error::from(
            ErrorKind::ConnectionReset,
        ))]));
        assert!(matches!(reader.read_message(), Err(ProtocolError::Io(_))));
    }

    #[test]
    fn reader_waits_for_hollerith_end() {
        let mut reader = ReplyReader::new(Scripted(vec![Ok(b"=1 10Hab".to_vec())]));
        assert!(matches!(
            reader.read_message(),
            Err(ProtocolError::UnexpectedEof { buffered: 8 })
        ));
        assert_eq!(reader.need, 16);
    }

    #[test]
    fn reader_decodes_long_hollerith_across_reads() {
        let payload = vec![b'z'; 3 * READ_CHUNK + 17];
        let mut data = format!("=9 {}H", payload.len()).into_bytes();
        data.extend_from_slice(&payload);
        data.extend_from_slice(b" 3\n");

        let mut reader = ReplyReader::new(Trickle {
            data: &data,
            step: 1000,
        });
        let Some(Message::Reply(reply)) = reader.read_message().unwrap() else {
            panic!("expected reply");
        };
        assert_eq!(reply.parameters[0].as_bytes(), Some(payload.as_slice()));
        assert_eq!(reply.parameters[1], Token::integer(3));
    }
}
