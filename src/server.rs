//! TCP listener for frame-server connections.
//!
//! Accepts connections and hands each one to a [`Connection`]. Errors on a
//! connection end only that connection; the accept loop keeps running.

use crate::config::{Config, ServeMode};
use crate::connection::Connection;
use crate::error::{ConnectionError, ErrorClass};
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use tracing::{debug, error, info, warn};

/// Server instance
pub struct Server {
    config: Config,
    listener: TcpListener,
}

impl Server {
    /// Bind the listening socket described by `config`.
    ///
    /// Failure here is fatal for the process.
    pub fn bind(config: Config) -> io::Result<Self> {
        let addr: SocketAddr = config
            .listen
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let listener = create_listener(addr, config.backlog)?;
        info!(address = %listener.local_addr()?, mode = ?config.mode, "Server listening");

        Ok(Server { config, listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept and serve connections forever.
    pub fn run(&self) -> ! {
        loop {
            self.accept_one();
        }
    }

    /// Accept one connection and serve it according to the configured mode.
    ///
    /// In serial mode this returns once the connection is closed; in threaded
    /// mode it returns as soon as the worker thread is started.
    pub fn accept_one(&self) {
        let (stream, peer) = match self.listener.accept() {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
                return;
            }
        };
        debug!(peer = %peer, "New connection");

        match self.config.mode {
            ServeMode::Serial => serve_connection(stream, peer, &self.config),
            ServeMode::Threaded => {
                let config = self.config.clone();
                let spawned = thread::Builder::new()
                    .name(format!("conn-{peer}"))
                    .spawn(move || serve_connection(stream, peer, &config));
                if let Err(e) = spawned {
                    error!(peer = %peer, error = %e, "Failed to spawn connection thread");
                }
            }
        }
    }
}

/// Serve a single client connection to completion.
fn serve_connection(stream: TcpStream, peer: SocketAddr, config: &Config) {
    let mut handler = config.handler.build();
    let connection = Connection::new(stream, config.max_message);

    match connection.serve(handler.as_mut()) {
        Ok(stats) => {
            debug!(
                peer = %peer,
                exchanges = stats.exchanges,
                "Connection closed"
            );
        }
        Err(e) => log_connection_error(peer, &e),
    }
}

fn log_connection_error(peer: SocketAddr, err: &ConnectionError) {
    match err.class() {
        ErrorClass::ProtocolViolation => {
            warn!(peer = %peer, error = %err, "Protocol violation, closing connection")
        }
        ErrorClass::TransportTruncated => {
            warn!(peer = %peer, error = %err, "Connection dropped mid-frame")
        }
        ErrorClass::HandlerFailure => {
            error!(peer = %peer, error = %err, "Handler failed, closing connection")
        }
        // `serve` reports a clean close as Ok, so only raw socket errors land here.
        ErrorClass::Transport | ErrorClass::TransportClosed => {
            warn!(peer = %peer, error = %err, "Connection error")
        }
    }
}

fn create_listener(addr: SocketAddr, backlog: i32) -> io::Result<TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;

    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode, FrameCodec, DEFAULT_MAX_MSG};
    use crate::error::FrameError;
    use crate::handler::HandlerKind;
    use std::io::{Read, Write};
    use std::net::Shutdown;
    use std::time::Duration;

    fn test_config(handler: HandlerKind, mode: ServeMode) -> Config {
        Config {
            listen: "127.0.0.1:0".to_string(),
            handler,
            mode,
            ..Config::default()
        }
    }

    fn start(config: Config) -> SocketAddr {
        let server = Server::bind(config).unwrap();
        let addr = server.local_addr().unwrap();
        thread::spawn(move || {
            server.run();
        });
        addr
    }

    fn connect(addr: SocketAddr) -> TcpStream {
        let stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream
    }

    fn exchange(stream: &mut TcpStream, codec: &mut FrameCodec, request: &[u8]) -> Vec<u8> {
        codec.encode_frame(stream, request).unwrap();
        codec.decode_frame(stream).unwrap().to_vec()
    }

    #[test]
    fn test_bind_rejects_bad_address() {
        let config = Config {
            listen: "not an address".to_string(),
            ..Config::default()
        };
        let err = Server::bind(config).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_basic_exchange() {
        let addr = start(test_config(HandlerKind::Greeting, ServeMode::Serial));
        let mut stream = connect(addr);

        stream.write_all(b"\x05\x00\x00\x00hello").unwrap();
        let mut reply = [0u8; 9];
        stream.read_exact(&mut reply).unwrap();
        assert_eq!(&reply, b"\x05\x00\x00\x00world");
    }

    #[test]
    fn test_multiple_exchanges_per_connection() {
        let addr = start(test_config(HandlerKind::Echo, ServeMode::Serial));
        let mut stream = connect(addr);
        let mut codec = FrameCodec::new(DEFAULT_MAX_MSG);

        for request in [&b"one"[..], b"two", b"three"] {
            assert_eq!(exchange(&mut stream, &mut codec, request), request);
        }
    }

    #[test]
    fn test_empty_body() {
        let addr = start(test_config(HandlerKind::Greeting, ServeMode::Serial));
        let mut stream = connect(addr);
        let mut codec = FrameCodec::new(DEFAULT_MAX_MSG);

        assert_eq!(exchange(&mut stream, &mut codec, b""), b"world");
    }

    #[test]
    fn test_immediate_close_then_next_connection() {
        let addr = start(test_config(HandlerKind::Echo, ServeMode::Serial));

        drop(connect(addr));

        let mut stream = connect(addr);
        let mut codec = FrameCodec::new(DEFAULT_MAX_MSG);
        assert_eq!(exchange(&mut stream, &mut codec, b"again"), b"again");
    }

    #[test]
    fn test_oversize_header_closes_connection_and_server_continues() {
        let addr = start(test_config(HandlerKind::Echo, ServeMode::Serial));

        let mut bad = connect(addr);
        bad.write_all(&5000u32.to_le_bytes()).unwrap();
        let mut codec = FrameCodec::new(DEFAULT_MAX_MSG);
        match codec.decode_frame(&mut bad) {
            Err(FrameError::Closed) | Err(FrameError::Io(_)) => {}
            other => panic!("unexpected: {:?}", other),
        }

        let mut good = connect(addr);
        assert_eq!(exchange(&mut good, &mut codec, b"still up"), b"still up");
    }

    #[test]
    fn test_truncated_frame_does_not_stop_server() {
        let addr = start(test_config(HandlerKind::Echo, ServeMode::Serial));

        let mut bad = connect(addr);
        bad.write_all(&encode(b"partial", DEFAULT_MAX_MSG).unwrap()[..6])
            .unwrap();
        bad.shutdown(Shutdown::Both).unwrap();
        drop(bad);

        let mut good = connect(addr);
        let mut codec = FrameCodec::new(DEFAULT_MAX_MSG);
        assert_eq!(exchange(&mut good, &mut codec, b"ok"), b"ok");
    }

    #[test]
    fn test_threaded_mode_serves_concurrent_connections() {
        let addr = start(test_config(HandlerKind::Echo, ServeMode::Threaded));

        // The first connection stays open while the second is served.
        let mut first = connect(addr);
        let mut second = connect(addr);
        let mut codec = FrameCodec::new(DEFAULT_MAX_MSG);

        assert_eq!(exchange(&mut second, &mut codec, b"second"), b"second");
        assert_eq!(exchange(&mut first, &mut codec, b"first"), b"first");
    }
}
