//! Property-based tests for token encoding.
//!
//! Each property is checked against the decoder as well, so encoder and
//! decoder have to agree on every generated value.

use proptest::prelude::*;

use crate::decode::{decode_message, Message};
use crate::reply::RpcReply;
use crate::token::Token;

/// Strategy for arbitrary byte payloads, including empty ones and bytes
/// that look like framing (spaces, newlines, braces).
fn payload() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..48)
}

/// Strategy for tokens, with arrays nested a few levels deep.
fn token() -> impl Strategy<Value = Token> {
    let leaf = prop_oneof![
        any::<i64>().prop_map(Token::Integer),
        payload().prop_map(|bytes| Token::Hollerith(bytes.into())),
    ];
    leaf.prop_recursive(4, 64, 6, |inner| {
        prop::collection::vec(inner, 0..6).prop_map(Token::Array)
    })
}

/// Decodes `token` as the only parameter of a success reply.
fn decode_single(token: &Token) -> Token {
    let mut line = b"=1 ".to_vec();
    token.write_to(&mut line);
    line.push(b'\n');

    let (message, used) = decode_message(&line)
        .expect("well-formed line")
        .expect("complete line");
    assert_eq!(used, line.len());
    match message {
        Message::Reply(RpcReply { mut parameters, .. }) if parameters.len() == 1 => {
            parameters.remove(0)
        }
        other => panic!("unexpected message {other:?}"),
    }
}

proptest! {
    /// Property: integers are canonical decimal text and decode to themselves.
    #[test]
    fn prop_integer_roundtrip(n in any::<i64>()) {
        let token = Token::integer(n);
        let wire = String::from_utf8(token.encode()).unwrap();

        let digits = wire.strip_prefix('-').unwrap_or(&wire);
        prop_assert_eq!(wire.starts_with('-'), n < 0);
        prop_assert!(digits.bytes().all(|b| b.is_ascii_digit()));
        prop_assert!(digits == "0" || !digits.starts_with('0'));
        prop_assert!(!wire.starts_with('+'));

        prop_assert_eq!(decode_single(&token), token);
    }

    /// Property: a Hollerith string is its byte count, `H`, then the bytes.
    #[test]
    fn prop_hollerith_length_prefix(bytes in payload()) {
        let token = Token::hollerith(bytes.clone());

        let mut expected = format!("{}H", bytes.len()).into_bytes();
        expected.extend_from_slice(&bytes);
        prop_assert_eq!(token.encode(), expected);

        prop_assert_eq!(decode_single(&token), token);
    }

    /// Property: an array is its count, ` {`, space-joined elements, `}`.
    #[test]
    fn prop_array_join_form(items in prop::collection::vec(token(), 0..8)) {
        let encoded: Vec<Vec<u8>> = items.iter().map(Token::encode).collect();
        let mut expected = format!("{} {{", items.len()).into_bytes();
        expected.extend(encoded.join(&b' '));
        expected.push(b'}');

        let token = Token::array(items);
        prop_assert_eq!(token.encode(), expected);
        prop_assert_eq!(token.encode(), token.encode());

        prop_assert_eq!(decode_single(&token), token);
    }
}
