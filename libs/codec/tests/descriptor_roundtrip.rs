//! Handshake descriptor encoding: binary and text round trips, id/name resolution

use codec::{
    join_text_tokens, split_text_tokens, BufferedInput, BufferedOutput, MessageDescriptor, ProtocolDescriptor,
    ProtocolError, UNKNOWN_ID,
};
use proptest::prelude::*;
use types::MessageType;

fn property_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
    // Text tokens cannot carry whitespace and keys cannot contain '='
    prop::collection::vec(("[a-z][a-z0-9_]{0,8}", "[A-Za-z0-9.,:/]{0,12}"), 0..5)
}

fn message_strategy() -> impl Strategy<Value = (i32, String, Vec<(String, String)>)> {
    prop_oneof![
        prop::sample::select(MessageType::ALL.to_vec()).prop_map(|t| (t.id(), t.name().to_string())),
        (64..10_000i32, "[A-Z][A-Z_]{2,12}"),
    ]
    .prop_flat_map(|(id, name)| property_strategy().prop_map(move |props| (id, name.clone(), props)))
}

fn build(
    props: &[(String, String)],
    send: &[(i32, String, Vec<(String, String)>)],
    receive: &[(i32, String, Vec<(String, String)>)],
) -> ProtocolDescriptor {
    let mut desc = ProtocolDescriptor::default();
    for (k, v) in props {
        desc.set_property(k.as_str(), v.as_str());
    }
    let make = |(id, name, props): &(i32, String, Vec<(String, String)>)| {
        let mut md = MessageDescriptor::with_id_and_name(*id, name.as_str());
        for (k, v) in props {
            md.set_property(k.as_str(), v.as_str());
        }
        md
    };
    for m in send {
        desc.add_send(make(m));
    }
    for m in receive {
        desc.add_receive(make(m));
    }
    desc
}

fn assert_same_structure(a: &ProtocolDescriptor, b: &ProtocolDescriptor) {
    assert_eq!(a.properties(), b.properties());
    for (x, y) in [(a.send_messages(), b.send_messages()), (a.receive_messages(), b.receive_messages())] {
        assert_eq!(x.len(), y.len());
        for (mx, my) in x.iter().zip(y) {
            assert_eq!(mx.id(), my.id());
            assert_eq!(mx.name(), my.name());
            assert_eq!(mx.properties(), my.properties());
        }
    }
}

proptest! {
    #[test]
    fn binary_round_trip_preserves_structure(
        props in property_strategy(),
        send in prop::collection::vec(message_strategy(), 0..6),
        receive in prop::collection::vec(message_strategy(), 0..6),
    ) {
        let desc = build(&props, &send, &receive);
        let mut out = BufferedOutput::new();
        desc.compose_to(&mut out);
        let mut input = BufferedInput::new(out.as_slice());
        let parsed = ProtocolDescriptor::parse_from(&mut input).unwrap();
        prop_assert!(!input.has_available());
        assert_same_structure(&desc, &parsed);
    }

    #[test]
    fn text_round_trip_preserves_structure(
        props in property_strategy(),
        send in prop::collection::vec(message_strategy(), 0..6),
        receive in prop::collection::vec(message_strategy(), 0..6),
    ) {
        // Text form identifies messages by name only, so custom ids are not representable
        let canonical = |m: &(i32, String, Vec<(String, String)>)| MessageType::find_by_id(m.0).is_some();
        let send: Vec<_> = send.into_iter().filter(canonical).collect();
        let receive: Vec<_> = receive.into_iter().filter(canonical).collect();
        let desc = build(&props, &send, &receive);

        let line = join_text_tokens(&desc.to_text_tokens());
        let tokens = split_text_tokens(&line);
        let mut parsed = ProtocolDescriptor::default();
        let next = parsed.append_from_text_tokens(&tokens, 0).unwrap();
        prop_assert_eq!(next, tokens.len());
        assert_same_structure(&desc, &parsed);
    }

    #[test]
    fn truncated_binary_is_rejected(
        send in prop::collection::vec(message_strategy(), 1..4),
        cut in 1usize..64,
    ) {
        let desc = build(&[("type".into(), "qtp".into())], &send, &[]);
        let mut out = BufferedOutput::new();
        desc.compose_to(&mut out);
        let bytes = out.as_slice();
        let cut = cut.min(bytes.len() - 1);
        prop_assert!(ProtocolDescriptor::parse_from(&mut BufferedInput::new(&bytes[..bytes.len() - cut])).is_err());
    }
}

#[test]
fn ticker_handshake_end_to_end() {
    let mut desc = ProtocolDescriptor::new_self("qtp");
    let mut md = MessageDescriptor::with_id_and_name(MessageType::TickerData.id(), "TICKER_DATA");
    md.set_property("version", "1.0");
    desc.add_send(md);

    let mut out = BufferedOutput::new();
    desc.compose_to(&mut out);
    let wire = out.freeze();

    let received = ProtocolDescriptor::parse_from(&mut BufferedInput::new(&wire)).unwrap();
    let md = &received.send_messages()[0];
    assert_eq!(md.message_type(), Some(MessageType::TickerData));
    assert_eq!(md.property("version"), Some("1.0"));
    assert!(received.can_send(MessageType::TickerData));
}

#[test]
fn name_only_descriptor_resolves_after_decode() {
    let mut desc = ProtocolDescriptor::default();
    desc.add_receive(MessageDescriptor::with_id_and_name(UNKNOWN_ID, "STREAM_ADD_SUBSCRIPTION"));

    let mut out = BufferedOutput::new();
    desc.compose_to(&mut out);
    let received = ProtocolDescriptor::parse_from(&mut BufferedInput::new(out.as_slice())).unwrap();

    let md = &received.receive_messages()[0];
    assert_eq!(md.id(), MessageType::StreamAddSubscription.id());
    assert!(received.can_receive(MessageType::StreamAddSubscription));
}

#[test]
fn mismatched_id_and_name_stays_unresolved() {
    let mut desc = ProtocolDescriptor::default();
    desc.add_send(MessageDescriptor::with_id_and_name(MessageType::HistoryData.id(), "TICKER_DATA"));

    let mut out = BufferedOutput::new();
    desc.compose_to(&mut out);
    let received = ProtocolDescriptor::parse_from(&mut BufferedInput::new(out.as_slice())).unwrap();

    assert_eq!(received.send_messages()[0].message_type(), None);
    assert!(!received.can_send(MessageType::TickerData));
    assert!(!received.can_send(MessageType::HistoryData));
    assert!(received.send_set().is_empty());
}

#[test]
fn wrong_protocol_is_reported_as_bad_magic() {
    let err = ProtocolDescriptor::parse_from(&mut BufferedInput::new(b"HTTP/1.1 200 OK")).unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidMagic { .. }));
    assert!(err.to_string().contains("Wrong protocol"));
}
