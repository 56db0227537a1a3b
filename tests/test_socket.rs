use std::thread;
use std::time::Duration;

use blocknet::context::Context;
use blocknet::error::{Error, SocketError};
use blocknet::net::options::{KeepAlive, NoDelay, ReceiveTimeout, ReuseAddress};
use blocknet::net::{Acceptor, Endpoint, Family, Protocol, Socket, SocketState, WaitKind};

fn listener(ctx: &Context) -> (Acceptor, Endpoint) {
    let acceptor = Acceptor::bind_to(ctx, &Endpoint::loopback(Family::V4, 0), true).unwrap();
    let endpoint = acceptor.local_endpoint().unwrap();
    (acceptor, endpoint)
}

fn connected_pair(ctx: &Context) -> (Socket, Socket) {
    let (acceptor, endpoint) = listener(ctx);
    let mut client = Socket::new(ctx);
    client.open(Protocol::tcp_v4()).unwrap();
    client.connect(&endpoint).unwrap();
    let (server, _) = acceptor.accept().unwrap();
    (client, server)
}

#[test]
fn test_new_socket_is_closed() {
    let ctx = Context::new();
    let socket = Socket::new(&ctx);
    assert!(!socket.is_open());
    assert_eq!(socket.state(), SocketState::Closed);
    assert!(socket.native_handle().is_none());
    assert!(matches!(socket.local_endpoint(), Err(Error::Socket(SocketError::NotOpen))));
    assert!(matches!(socket.send_some(b"x"), Err(Error::Socket(SocketError::NotOpen))));
}

#[test]
fn test_open_twice_is_already_open() {
    let ctx = Context::new();
    let mut socket = Socket::new(&ctx);
    socket.open(Protocol::tcp_v4()).unwrap();
    assert_eq!(socket.state(), SocketState::Open);
    let err = socket.open(Protocol::tcp_v4()).unwrap_err();
    assert_eq!(err.socket_error(), Some(SocketError::AlreadyOpen));
}

#[test]
fn test_close_is_idempotent_and_keeps_protocol() {
    let ctx = Context::new();
    let mut socket = Socket::new(&ctx);
    socket.open(Protocol::udp_v6()).unwrap();
    socket.close().unwrap();
    socket.close().unwrap();
    assert!(!socket.is_open());
    assert_eq!(socket.protocol(), Some(Protocol::udp_v6()));
}

#[test]
fn test_take_moves_ownership() {
    let ctx = Context::new();
    let mut socket = Socket::new(&ctx);
    socket.open(Protocol::tcp_v4()).unwrap();
    let fd = socket.native_handle();

    let moved = socket.take();
    assert!(!socket.is_open());
    assert_eq!(moved.native_handle(), fd);
    assert_eq!(moved.state(), SocketState::Open);
}

#[test]
fn test_connect_and_exchange() {
    let ctx = Context::new();
    let (client, server) = connected_pair(&ctx);
    assert_eq!(client.state(), SocketState::Connected);
    assert_eq!(server.state(), SocketState::Connected);
    assert_eq!(client.remote_endpoint().unwrap(), server.local_endpoint().unwrap());

    assert_eq!(client.send(b"ping").unwrap(), 4);
    let mut buf = [0u8; 4];
    assert_eq!(server.receive(&mut buf).unwrap(), 4);
    assert_eq!(&buf, b"ping");
}

#[test]
fn test_receive_never_moves_more_than_the_buffer() {
    let ctx = Context::new();
    let (client, server) = connected_pair(&ctx);
    client.send(b"0123456789abcdefghij").unwrap();

    let mut first = [0u8; 10];
    assert_eq!(server.receive(&mut first).unwrap(), 10);
    assert_eq!(&first, b"0123456789");

    let mut second = [0u8; 10];
    assert_eq!(server.receive(&mut second).unwrap(), 10);
    assert_eq!(&second, b"abcdefghij");
}

#[test]
fn test_receive_stops_at_eof_with_partial_count() {
    let ctx = Context::new();
    let (mut client, server) = connected_pair(&ctx);
    client.send(b"abc").unwrap();
    client.close().unwrap();

    let mut buf = [0u8; 8];
    let err = server.receive(&mut buf).unwrap_err();
    assert_eq!(err.transferred, 3);
    assert!(err.error.is_eof());
    assert_eq!(&buf[..3], b"abc");
}

#[test]
fn test_large_send_arrives_whole() {
    let ctx = Context::new();
    let (client, server) = connected_pair(&ctx);
    let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    let expected = payload.clone();

    let reader = thread::spawn(move || {
        let mut buf = vec![0u8; expected.len()];
        server.receive(&mut buf).unwrap();
        assert_eq!(buf, expected);
    });
    assert_eq!(client.send(&payload).unwrap(), payload.len());
    reader.join().unwrap();
}

#[test]
fn test_receive_timeout_is_try_again() {
    let ctx = Context::new();
    let (_client, server) = connected_pair(&ctx);
    server.set_option(ReceiveTimeout(Some(Duration::from_millis(100)))).unwrap();

    let mut buf = [0u8; 4];
    let err = server.receive_some(&mut buf).unwrap_err();
    assert!(err.is_try_again(), "unexpected error: {err}");

    let err = server.receive(&mut buf).unwrap_err();
    assert_eq!(err.transferred, 0);
    assert!(err.is_try_again());
}

#[test]
fn test_wait_for_readability() {
    let ctx = Context::new();
    let (client, server) = connected_pair(&ctx);
    assert!(server.wait(WaitKind::Read).unwrap_err().is_try_again());
    assert!(client.wait(WaitKind::Write).is_ok());

    client.send(b"!").unwrap();
    server.wait(WaitKind::Read).unwrap();
}

#[test]
fn test_options_round_trip() {
    let ctx = Context::new();
    let mut socket = Socket::new(&ctx);
    socket.open(Protocol::tcp_v4()).unwrap();

    socket.set_option(ReuseAddress(true)).unwrap();
    socket.set_option(KeepAlive(true)).unwrap();
    socket.set_option(NoDelay(true)).unwrap();
    socket.set_option(ReceiveTimeout(Some(Duration::from_secs(2)))).unwrap();

    assert_eq!(socket.get_option::<ReuseAddress>().unwrap(), ReuseAddress(true));
    assert_eq!(socket.get_option::<KeepAlive>().unwrap(), KeepAlive(true));
    assert_eq!(socket.get_option::<NoDelay>().unwrap(), NoDelay(true));
    assert_eq!(
        socket.get_option::<ReceiveTimeout>().unwrap(),
        ReceiveTimeout(Some(Duration::from_secs(2)))
    );
}

#[test]
fn test_datagrams() {
    let ctx = Context::new();
    let mut receiver = Socket::new(&ctx);
    receiver.open(Protocol::udp_v4()).unwrap();
    receiver.bind(&Endpoint::loopback(Family::V4, 0)).unwrap();
    assert_eq!(receiver.state(), SocketState::Bound);
    let target = receiver.local_endpoint().unwrap();

    let mut sender = Socket::new(&ctx);
    sender.open(Protocol::udp_v4()).unwrap();
    sender.bind(&Endpoint::loopback(Family::V4, 0)).unwrap();
    assert_eq!(sender.send_to(b"datagram", &target).unwrap(), 8);

    let mut buf = [0u8; 64];
    let (n, from) = receiver.receive_from(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"datagram");
    assert_eq!(from, sender.local_endpoint().unwrap());
}

#[test]
fn test_connect_refused_reports_os_error() {
    let ctx = Context::new();
    // bound but not listening
    let mut idle = Socket::new(&ctx);
    idle.open(Protocol::tcp_v4()).unwrap();
    idle.bind(&Endpoint::loopback(Family::V4, 0)).unwrap();
    let target = idle.local_endpoint().unwrap();

    let mut socket = Socket::new(&ctx);
    socket.open(Protocol::tcp_v4()).unwrap();
    let err = socket.connect(&target).unwrap_err();
    assert_eq!(err.raw_os_error(), Some(libc::ECONNREFUSED));
}
