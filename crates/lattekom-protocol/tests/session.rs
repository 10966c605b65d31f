//! End-to-end exchange over in-memory streams.

use std::io::Cursor;
use std::sync::Arc;

use lattekom_core::ClientConfig;
use lattekom_protocol::{
    CallFailure, CallRegistry, CallWriter, ErrorCode, MemoryDiagnostics, Message, ReplyReader,
    Token,
};

#[test]
fn calls_and_replies_correlate() {
    let config = ClientConfig::from_toml_str("[wire]\ntrace_frames = true\n").unwrap();
    let sink = MemoryDiagnostics::new();
    let registry = CallRegistry::new().with_diagnostics(sink.clone());

    let login = registry
        .register(registry.call(62).add(6).add("secret").add(false))
        .unwrap();
    let get_text = registry
        .register(registry.call(25).add(4711).add(0).add(32766))
        .unwrap();

    let mut writer = CallWriter::from_settings(Vec::new(), &config.wire);
    writer.write_sealed(&login).unwrap();
    writer.write_sealed(&get_text).unwrap();
    let sent = writer.into_inner();
    assert_eq!(sent, b"1 62 6 6Hsecret 0\n2 25 4711 0 32766\n");
    assert_eq!(sink.frames().len(), 2);

    // the server answers out of order and slips in an async message
    let incoming = b"%2 14 4711\n:2 5 6 4Hnick\n=1\n".to_vec();
    let mut reader = ReplyReader::from_settings(Cursor::new(incoming), &config.wire);

    let mut async_numbers = Vec::new();
    while let Some(message) = reader.read_message().unwrap() {
        match message {
            Message::Reply(reply) => {
                registry.complete(reply).unwrap();
            }
            Message::Async { number, .. } => async_numbers.push(number),
            Message::ProtocolError(text) => panic!("protocol error: {text:?}"),
        }
    }

    assert_eq!(async_numbers, vec![5]);
    assert_eq!(registry.pending_count(), 0);

    assert!(login.reply().unwrap().success);
    let failed = get_text.reply().unwrap();
    assert!(!failed.success);
    assert_eq!(failed.error(), Some(ErrorCode::NoSuchText));
    assert_eq!(failed.error_status(), Some(4711));

    assert_eq!(
        sink.failures(),
        vec![CallFailure {
            id: 2,
            op: 25,
            error_code: Some(14),
        }]
    );
}

#[test]
fn replies_complete_from_another_thread() {
    let registry = Arc::new(CallRegistry::new());
    let calls: Vec<_> = (0..4)
        .map(|n| registry.register(registry.call(98).add(n)).unwrap())
        .collect();

    let receiver = Arc::clone(&registry);
    std::thread::spawn(move || {
        let mut reader = ReplyReader::new(Cursor::new(b"=4 4\n=3 3\n=2 2\n=1 1\n".to_vec()));
        while let Some(Message::Reply(reply)) = reader.read_message().unwrap() {
            receiver.complete(reply).unwrap();
        }
    })
    .join()
    .unwrap();

    for call in &calls {
        let reply = call.reply().expect("reply attached");
        assert_eq!(reply.parameters, vec![Token::integer(call.id())]);
    }
}
