use crate::server::test::TestSliceExt;
use crate::server::{Event, State};
use crate::HeaderCollection;

use super::scenario::{events, take_output, Scenario};

#[test]
fn keep_alive_two_requests() {
    let mut conn = Scenario::builder()
        .input(b"GET /one HTTP/1.1\r\n\r\n")
        .build()
        .to_ready();

    conn.write_response(200, &HeaderCollection::new(), b"1");
    assert_eq!(conn.state(), State::ReceivingHeaders);
    assert!(take_output(&mut conn).as_slice().as_str().ends_with("\r\n\r\n1"));
    events(&mut conn);

    conn.receive(b"POST /two HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc");
    assert_eq!(conn.poll_event(), Some(Event::RequestReady));
    assert_eq!(conn.request().path(), b"/two");
    assert_eq!(conn.request().content(), b"abc");

    conn.write_response(200, &HeaderCollection::new(), b"2");
    assert_eq!(conn.state(), State::ReceivingHeaders);
    assert!(take_output(&mut conn).as_slice().as_str().ends_with("\r\n\r\n2"));
}

#[test]
fn keep_alive_pipelined() {
    let mut conn = Scenario::builder()
        .input(
            b"GET /one HTTP/1.1\r\n\r\n\
              GET /two HTTP/1.1\r\n\r\n\
              GET /three HTTP/1.1\r\nConnection: close\r\n\r\n",
        )
        .build()
        .to_ready();

    let mut paths = vec![];

    loop {
        paths.push(String::from_utf8(conn.request().path().to_vec()).unwrap());
        conn.write_response(200, &HeaderCollection::new(), b"");

        let ev = events(&mut conn);
        assert!(matches!(ev[0], Event::RequestCompleted(_)));
        match ev.get(1) {
            Some(Event::RequestReady) => continue,
            Some(Event::Closed) => break,
            e => panic!("unexpected {:?}", e),
        }
    }

    assert_eq!(paths, ["/one", "/two", "/three"]);
    assert_eq!(conn.state(), State::Closed);
}

#[test]
fn keep_alive_pipelined_arrives_during_response() {
    let mut conn = Scenario::builder()
        .input(b"GET /one HTTP/1.1\r\n\r\n")
        .build()
        .to_ready();

    conn.write_headers(200, &HeaderCollection::new().with("Content-Length", "2"));
    conn.receive(b"GET /two HTTP/1.1\r\n\r\n");
    assert_eq!(conn.poll_event(), None);
    assert_eq!(conn.request().path(), b"/one");

    conn.write_content(b"ok");

    let ev = events(&mut conn);
    assert_eq!(ev.len(), 2);
    assert_eq!(ev[1], Event::RequestReady);
    assert_eq!(conn.request().path(), b"/two");
}

#[test]
fn keep_alive_client_close() {
    let mut conn = Scenario::builder()
        .input(b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n")
        .build()
        .to_ready();

    conn.write_response(200, &HeaderCollection::new(), b"bye");

    let out = take_output(&mut conn);
    assert!(out.as_slice().as_str().contains("\r\nConnection: close\r\n"));
    assert_eq!(conn.state(), State::Closed);
}

#[test]
fn keep_alive_initialize_again_after_close() {
    let mut conn = Scenario::builder()
        .input(b"GET / HTTP/1.0\r\n\r\n")
        .build()
        .to_ready();

    conn.write_response(200, &HeaderCollection::new(), b"");
    assert_eq!(conn.state(), State::Closed);

    conn.initialize(crate::server::MemoryTransport::new());
    assert_eq!(conn.state(), State::ReceivingHeaders);
    assert_eq!(conn.poll_event(), None);

    conn.receive(b"GET /again HTTP/1.1\r\n\r\n");
    assert_eq!(conn.poll_event(), Some(Event::RequestReady));
    assert_eq!(conn.request().path(), b"/again");
}
