#![allow(dead_code)]
//! Scripted in-process rcon server and a stdout logger for the integration
//! tests.

use std::future::Future;
use std::sync::Once;

use log::{Level, Metadata, Record};
use rcon_session::packet::{Packet, PacketType};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

struct SimpleLogger;

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Trace
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("{} - {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: SimpleLogger = SimpleLogger;
static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(|| {
        let _ = log::set_logger(&LOGGER).map(|()| log::set_max_level(log::LevelFilter::Trace));
    });
}

/// Server side of one accepted connection.
pub struct Conn {
    stream: TcpStream,
}

impl Conn {
    /// Next packet from the client, or `None` once it hung up.
    pub async fn read_packet(&mut self) -> Option<Packet> {
        let mut header = [0u8; 4];
        self.stream.read_exact(&mut header).await.ok()?;
        let len = Packet::decode_length(header).unwrap();
        let mut frame = vec![0u8; len];
        self.stream.read_exact(&mut frame).await.ok()?;
        Some(Packet::unpack(&frame).unwrap())
    }

    pub async fn send(&mut self, packet: Packet) {
        self.send_raw(&packet.pack()).await;
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
        self.stream.flush().await.unwrap();
    }

    /// Reads the auth packet and acknowledges it the way a well-behaved server
    /// does. Returns the packet the client sent.
    pub async fn accept_auth(&mut self, password: &str) -> Packet {
        let auth = self.read_packet().await.expect("client sent no auth packet");
        assert!(auth.is(PacketType::Auth));
        assert_eq!(auth.body(), password);
        self.send(Packet::new(auth.id(), PacketType::AuthResponse, "")).await;
        auth
    }

    /// Whether the client closed its end: true once a read hits EOF.
    pub async fn closed_by_peer(&mut self) -> bool {
        let mut buf = [0u8; 64];
        loop {
            match self.stream.read(&mut buf).await {
                Ok(0) | Err(_) => return true,
                Ok(_) => continue,
            }
        }
    }
}

/// Builds a packet from raw body bytes, for bodies that are not valid UTF-8.
pub fn raw_packet(id: i32, packet_type: PacketType, body: &[u8]) -> Vec<u8> {
    let mut raw = Vec::new();
    raw.extend_from_slice(&((body.len() + 10) as i32).to_le_bytes());
    raw.extend_from_slice(&id.to_le_bytes());
    raw.extend_from_slice(&packet_type.to_le_bytes());
    raw.extend_from_slice(body);
    raw.extend_from_slice(&[0, 0]);
    raw
}

/// Accepts `connections` connections one after another on an ephemeral port
/// and runs `handler` on each. The handle resolves to the handler results.
pub async fn serve<F, Fut, T>(connections: usize, handler: F) -> (u16, JoinHandle<Vec<T>>)
where
    F: Fn(Conn) -> Fut + Send + 'static,
    Fut: Future<Output = T> + Send,
    T: Send + 'static,
{
    init_logging();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let mut results = Vec::with_capacity(connections);
        for _ in 0..connections {
            let (stream, _) = listener.accept().await.unwrap();
            results.push(handler(Conn { stream }).await);
        }
        results
    });

    (port, handle)
}
