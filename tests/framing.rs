use bytes::Bytes;
use frame_server::{
    Connection, ErrorClass, FrameCodec, FrameError, Handler, HandlerKind, DEFAULT_MAX_MSG,
};
use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::thread;

/// Serve exactly one accepted connection with `handler` on a background thread.
fn serve_once<H>(mut handler: H) -> (TcpStream, thread::JoinHandle<Option<ErrorClass>>)
where
    H: FnMut(&[u8]) -> Bytes + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let worker = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        Connection::new(stream, DEFAULT_MAX_MSG)
            .serve(&mut handler)
            .err()
            .map(|e| e.class())
    });

    (TcpStream::connect(addr).unwrap(), worker)
}

#[test]
fn custom_handler_keeps_framing() {
    let (mut client, worker) = serve_once(|request: &[u8]| {
        let mut reply = request.to_vec();
        reply.reverse();
        Bytes::from(reply)
    });

    let mut codec = FrameCodec::new(DEFAULT_MAX_MSG);
    codec.encode_frame(&mut client, b"abc").unwrap();
    assert_eq!(codec.decode_frame(&mut client).unwrap(), b"cba");

    let payload = vec![0x5a; DEFAULT_MAX_MSG];
    codec.encode_frame(&mut client, &payload).unwrap();
    assert_eq!(codec.decode_frame(&mut client).unwrap(), &payload[..]);

    drop(client);
    assert_eq!(worker.join().unwrap(), None);
}

#[test]
fn oversize_header_is_reported_as_protocol_violation() {
    let (mut client, worker) = serve_once(|request: &[u8]| Bytes::copy_from_slice(request));

    client.write_all(&5000u32.to_le_bytes()).unwrap();
    assert_eq!(
        worker.join().unwrap(),
        Some(ErrorClass::ProtocolViolation)
    );

    let mut codec = FrameCodec::new(DEFAULT_MAX_MSG);
    assert!(matches!(
        codec.decode_frame(&mut client),
        Err(FrameError::Closed) | Err(FrameError::Io(_))
    ));
}

#[test]
fn partial_header_is_reported_as_truncation() {
    let (mut client, worker) = serve_once(|request: &[u8]| Bytes::copy_from_slice(request));

    client.write_all(&[1, 0, 0]).unwrap();
    drop(client);
    assert_eq!(
        worker.join().unwrap(),
        Some(ErrorClass::TransportTruncated)
    );
}

#[test]
fn handler_kinds_build_matching_handlers() {
    let mut first = HandlerKind::Echo.build();
    let mut second = HandlerKind::Greeting.build();
    assert_eq!(&first.handle(b"hello").unwrap()[..], b"hello");
    assert_eq!(&second.handle(b"hello").unwrap()[..], b"world");
}
