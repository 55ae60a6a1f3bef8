//! End-to-end scenarios exercising the public `Session` surface against
//! known wire captures.

use pgwire_machine::{Event, Session, StartupOptions};

fn frame(msgtype: u8, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(5 + body.len());
    out.push(msgtype);
    out.extend_from_slice(&((4 + body.len()) as u32).to_be_bytes());
    out.extend_from_slice(body);
    out
}

#[test]
fn startup_and_md5_authentication() {
    let mut session = Session::new();
    session
        .initial_request(&StartupOptions::new("alice").set_database("postgres"))
        .unwrap();
    session.take_outgoing();

    let mut body = Vec::new();
    body.extend_from_slice(&5u32.to_be_bytes());
    body.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
    let request = frame(b'R', &body);
    assert_eq!(&request, &hex("52 00 00 00 0c 00 00 00 05 de ad be ef"));

    let events = session.handle_message(&request).unwrap();
    assert!(matches!(events.as_slice(), [Event::Password]));

    session.send_password("secret").unwrap();
    let out = session.take_outgoing();
    assert_eq!(out[0], b'p');
    assert_eq!(out.len(), 5 + 36);
    assert!(out[5..8].starts_with(b"md5"));
}

#[test]
fn simple_query_emits_known_frame() {
    let mut session = Session::new();
    session.simple_query("select 1").unwrap();
    let out = session.take_outgoing();
    assert_eq!(
        &out[..],
        &hex("51 00 00 00 0d 73 65 6c 65 63 74 20 31 00")[..]
    );
}

#[test]
fn row_description_shapes_data_row() {
    let mut session = Session::new();

    let mut row_desc_body = Vec::new();
    row_desc_body.extend_from_slice(&1i16.to_be_bytes()); // one field
    row_desc_body.extend_from_slice(b"n\0");
    row_desc_body.extend_from_slice(&0i32.to_be_bytes()); // table_oid
    row_desc_body.extend_from_slice(&0i16.to_be_bytes()); // column_index
    row_desc_body.extend_from_slice(&23i32.to_be_bytes()); // type_oid (int4)
    row_desc_body.extend_from_slice(&4i16.to_be_bytes()); // type_size
    row_desc_body.extend_from_slice(&(-1i32).to_be_bytes()); // type_modifier
    row_desc_body.extend_from_slice(&0i16.to_be_bytes()); // format_code
    let row_desc = frame(b'T', &row_desc_body);
    let events = session.handle_message(&row_desc).unwrap();
    assert!(matches!(events.as_slice(), [Event::RowDescription(_)]));
    assert_eq!(session.row_description().len(), 1);
    assert_eq!(session.row_description().fields[0].name.as_ref(), "n");

    let mut data_row_body = Vec::new();
    data_row_body.extend_from_slice(&1i16.to_be_bytes());
    data_row_body.extend_from_slice(&1i32.to_be_bytes());
    data_row_body.push(0x31);
    let data_row = frame(b'D', &data_row_body);
    let events = session.handle_message(&data_row).unwrap();
    match events.as_slice() {
        [Event::DataRow { columns }] => {
            assert_eq!(columns.len(), 1);
            assert_eq!(columns[0].as_deref(), Some(&b"1"[..]));
        }
        other => panic!("unexpected events: {other:?}"),
    }
}

#[test]
fn empty_query_then_ready_for_query_in_order() {
    let mut session = Session::new();
    let mut combined = Vec::new();
    combined.extend_from_slice(&frame(b'I', &[]));
    combined.extend_from_slice(&frame(b'Z', &[b'I']));

    let events = session.handle_message(&combined).unwrap();
    let kinds: Vec<_> = events.iter().map(Event::kind).collect();
    assert_eq!(
        kinds,
        vec![
            pgwire_machine::EventKind::EmptyQuery,
            pgwire_machine::EventKind::ReadyForQuery,
        ]
    );
}

#[test]
fn error_response_decodes_notice_fields() {
    let mut session = Session::new();
    let mut body = Vec::new();
    body.extend_from_slice(b"SERROR\0");
    body.extend_from_slice(b"C42P01\0");
    body.extend_from_slice(b"Mrelation \"x\" does not exist\0");
    body.push(0);
    let error_frame = frame(b'E', &body);

    let events = session.handle_message(&error_frame).unwrap();
    match events.as_slice() {
        [Event::Error(err)] => {
            assert_eq!(err.severity.as_deref(), Some("ERROR"));
            assert_eq!(err.code.as_deref(), Some("42P01"));
            assert_eq!(err.message.as_deref(), Some("relation \"x\" does not exist"));
        }
        other => panic!("unexpected events: {other:?}"),
    }
}

#[test]
fn copy_text_encoding_matches_known_vector() {
    let mut session = Session::new();
    session.send_copy_data(&[Some("a"), None, Some("b\tc")]);
    let out = session.take_outgoing();
    assert_eq!(out[0], b'd');
    assert_eq!(&out[5..], b"a\t\\N\tb\\tc\n");
}

#[test]
fn message_length_reflects_declared_frame_length() {
    let mut session = Session::new();
    assert_eq!(session.message_length(), None);
    let partial = frame(b'Q', b"select 1\0");
    session.handle_message(&partial[..6]).unwrap();
    // §8: message_length is the declared length from the header, i.e.
    // frame.length - 1, independent of how much body has arrived.
    assert_eq!(session.message_length(), Some(partial.len() - 1));
    assert_eq!(session.bytes_needed(), partial.len() - 6);
}

/// Parses a whitespace-separated hex byte string into a `Vec<u8>`, for
/// writing test vectors the way the specification's own hex dumps read.
fn hex(s: &str) -> Vec<u8> {
    s.split_whitespace()
        .map(|b| u8::from_str_radix(b, 16).unwrap())
        .collect()
}
