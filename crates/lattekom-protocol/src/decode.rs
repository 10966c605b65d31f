//! Incremental decoding of server messages.
//!
//! The server sends three kinds of lines:
//!
//! ```text
//! =<id>[ <token>]*\n          reply to a successful call
//! %<id> <code> <status>\n     reply to a failed call
//! %%<text>\n                  protocol error (the server could not parse a call)
//! :<n> <async-no>[ <token>]*\n asynchronous message
//! ```
//!
//! Hollerith payloads may contain newlines, so a message only ends at a
//! newline that sits between tokens. [`decode_message`] works on whatever has
//! been buffered so far and reports `Ok(None)` until a full message is there.

use crate::error::{ProtocolError, ProtocolResult};
use crate::reply::RpcReply;
use crate::token::{Hollerith, Token};

/// One complete message from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Reply to an earlier call.
    Reply(RpcReply),
    /// The server rejected a frame it could not parse.
    ProtocolError(Vec<u8>),
    /// Server-initiated message. Parameters are tokenized, not interpreted.
    Async { number: i64, parameters: Vec<Token> },
}

/// Deepest array nesting accepted from the server.
pub const MAX_NESTING: usize = 64;

/// Decodes the first complete message in `data`.
///
/// Returns the message and the number of bytes it used, or `None` when
/// `data` ends before the message does. Leading blank space is skipped and
/// counted as used.
pub fn decode_message(data: &[u8]) -> ProtocolResult<Option<(Message, usize)>> {
    match decode_partial(data)? {
        Decoded::Complete(message, used) => Ok(Some((message, used))),
        Decoded::Incomplete { .. } => Ok(None),
    }
}

/// Outcome of one decoding attempt.
pub(crate) enum Decoded {
    Complete(Message, usize),
    /// Decoding cannot progress before `data` holds at least `need` bytes.
    Incomplete { need: usize },
}

pub(crate) fn decode_partial(data: &[u8]) -> ProtocolResult<Decoded> {
    let mut cursor = Cursor { data, pos: 0 };
    match cursor.message() {
        Ok(message) => Ok(Decoded::Complete(message, cursor.pos)),
        Err(Stop::Incomplete { need }) => Ok(Decoded::Incomplete { need }),
        Err(Stop::Malformed(offset, reason)) => Err(ProtocolError::malformed(offset, reason)),
    }
}

#[derive(Clone, Copy)]
enum Stop {
    Incomplete { need: usize },
    Malformed(usize, &'static str),
}

type Step<T> = Result<T, Stop>;

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Step<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(Stop::Incomplete { need: self.pos + 1 })
    }

    fn bump(&mut self) -> Step<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Ok(byte)
    }

    fn fail<T>(&self, reason: &'static str) -> Step<T> {
        Err(Stop::Malformed(self.pos, reason))
    }

    fn skip_spaces(&mut self) -> Step<()> {
        while self.peek()? == b' ' {
            self.pos += 1;
        }
        Ok(())
    }

    fn message(&mut self) -> Step<Message> {
        while matches!(self.peek()?, b' ' | b'\r' | b'\n') {
            self.pos += 1;
        }
        let start = self.pos;

        match self.bump()? {
            b'=' => {
                let id = self.call_id()?;
                let parameters = self.tokens_to_eol()?;
                Ok(Message::Reply(RpcReply::success(id, parameters)))
            }
            b'%' if self.peek()? == b'%' => {
                self.pos += 1;
                let start = self.pos;
                let end = match self.data[start..].iter().position(|&b| b == b'\n') {
                    Some(offset) => start + offset,
                    None => {
                        return Err(Stop::Incomplete {
                            need: self.data.len() + 1,
                        });
                    }
                };
                self.pos = end + 1;
                Ok(Message::ProtocolError(self.data[start..end].to_vec()))
            }
            b'%' => {
                let id = self.call_id()?;
                let parameters = self.tokens_to_eol()?;
                Ok(Message::Reply(RpcReply {
                    id,
                    success: false,
                    parameters,
                }))
            }
            b':' => {
                let mut tokens = self.tokens_to_eol()?.into_iter();
                let count = tokens.next().as_ref().and_then(Token::as_integer);
                let number = tokens.next().as_ref().and_then(Token::as_integer);
                let (Some(count), Some(number)) = (count, number) else {
                    return Err(Stop::Malformed(start, "async message without count and number"));
                };
                let parameters: Vec<Token> = tokens.collect();
                if usize::try_from(count).ok() != Some(parameters.len()) {
                    return Err(Stop::Malformed(start, "async parameter count does not match"));
                }
                Ok(Message::Async { number, parameters })
            }
            _ => {
                self.pos -= 1;
                self.fail("expected '=', '%' or ':'")
            }
        }
    }

    fn call_id(&mut self) -> Step<u32> {
        let start = self.pos;
        let digits = self.digits()?;
        if digits.is_empty() {
            return self.fail("missing call id");
        }
        parse_ascii(digits).ok_or(Stop::Malformed(start, "call id out of range"))
    }

    fn digits(&mut self) -> Step<&'a [u8]> {
        let data = self.data;
        let start = self.pos;
        while self.peek()?.is_ascii_digit() {
            self.pos += 1;
        }
        Ok(&data[start..self.pos])
    }

    fn tokens_to_eol(&mut self) -> Step<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_spaces()?;
            match self.peek()? {
                b'\n' => {
                    self.pos += 1;
                    return Ok(tokens);
                }
                b'\r' => {
                    self.pos += 1;
                    if self.peek()? != b'\n' {
                        return self.fail("stray carriage return");
                    }
                    self.pos += 1;
                    return Ok(tokens);
                }
                _ => tokens.push(self.token(0)?),
            }
        }
    }

    fn token(&mut self, depth: usize) -> Step<Token> {
        let start = self.pos;
        let negative = self.peek()? == b'-';
        if negative {
            self.pos += 1;
        }
        let digits = self.digits()?;
        if digits.is_empty() {
            return Err(Stop::Malformed(start, "expected a token"));
        }
        let digits_end = self.pos;

        match self.peek()? {
            b'H' if !negative => {
                let too_long = Stop::Malformed(start, "hollerith length out of range");
                let len: usize = parse_ascii(digits).ok_or(too_long)?;
                self.pos += 1;
                let end = self.pos.checked_add(len).ok_or(too_long)?;
                let bytes = self
                    .data
                    .get(self.pos..end)
                    .ok_or(Stop::Incomplete { need: end })?;
                self.pos = end;
                Ok(Token::Hollerith(Hollerith::new(bytes)))
            }
            b' ' => {
                self.skip_spaces()?;
                match self.peek()? {
                    b'{' if !negative => {
                        if depth >= MAX_NESTING {
                            return Err(Stop::Malformed(start, "array nesting too deep"));
                        }
                        self.pos += 1;
                        let count: usize = parse_ascii(digits)
                            .ok_or(Stop::Malformed(start, "array count out of range"))?;
                        self.array_body(start, count, depth + 1)
                    }
                    b'*' if !negative => {
                        self.pos += 1;
                        Ok(Token::Array(Vec::new()))
                    }
                    _ => {
                        // the space belonged to the enclosing sequence
                        self.pos = digits_end;
                        integer(&self.data[start..digits_end], start)
                    }
                }
            }
            b'\n' | b'\r' | b'}' => integer(&self.data[start..digits_end], start),
            _ => self.fail("unexpected byte after number"),
        }
    }

    fn array_body(&mut self, start: usize, count: usize, depth: usize) -> Step<Token> {
        let mut items = Vec::new();
        loop {
            self.skip_spaces()?;
            if self.peek()? == b'}' {
                self.pos += 1;
                break;
            }
            items.push(self.token(depth)?);
        }
        if items.len() != count {
            return Err(Stop::Malformed(start, "array count does not match elements"));
        }
        Ok(Token::Array(items))
    }
}

fn parse_ascii<T: std::str::FromStr>(digits: &[u8]) -> Option<T> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}

fn integer(text: &[u8], start: usize) -> Step<Token> {
    parse_ascii(text)
        .map(Token::Integer)
        .ok_or(Stop::Malformed(start, "integer out of range"))
}
