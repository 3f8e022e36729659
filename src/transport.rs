use std::time::Duration;

use log::{trace, warn};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};

use crate::{
    error::{RconError, Result},
    packet::Packet,
};

/// Owns the tcp stream of a session. Every read and write is bounded by the
/// same timeout; once one of them fails the byte stream can be mid-frame, so
/// the transport has to be shut down rather than reused.
pub(crate) struct Transport {
    stream: TcpStream,
    timeout: Duration,
}

impl Transport {
    pub(crate) async fn open(addr: &str, limit: Duration) -> Result<Self> {
        let stream = timeout(limit, TcpStream::connect(addr))
            .await?
            .map_err(RconError::ConnectionFailed)?;
        stream.set_nodelay(true).map_err(RconError::ConnectionFailed)?;

        trace!("opened tcp stream to {}", addr);

        Ok(Transport {
            stream,
            timeout: limit,
        })
    }

    pub(crate) async fn read_exact(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        timeout(self.timeout, self.stream.read_exact(&mut buf))
            .await?
            .map_err(RconError::ConnectionLost)?;
        Ok(buf)
    }

    pub(crate) async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let stream = &mut self.stream;
        timeout(self.timeout, async move {
            stream.write_all(bytes).await?;
            stream.flush().await
        })
        .await?
        .map_err(RconError::ConnectionLost)
    }

    pub(crate) async fn read_packet(&mut self) -> Result<Packet> {
        let raw_header = self.read_exact(4).await?;
        let mut header = [0u8; 4];
        header.copy_from_slice(&raw_header);

        let len = Packet::decode_length(header)?;
        let frame = self.read_exact(len).await?;
        let packet = Packet::unpack(&frame)?;

        trace!(
            "received packet id {} type {} ({} byte body)",
            packet.id(),
            packet.packet_type(),
            packet.body_bytes().len()
        );
        Ok(packet)
    }

    pub(crate) async fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        trace!(
            "sending packet id {} type {}",
            packet.id(),
            packet.packet_type()
        );
        self.write_all(&packet.pack()).await
    }

    /// Consumes the transport, so a stream is shut down at most once.
    pub(crate) async fn shutdown(mut self) {
        match timeout(self.timeout, self.stream.shutdown()).await {
            Ok(Ok(())) => trace!("tcp stream shut down"),
            Ok(Err(e)) => warn!("error shutting down tcp stream: {}", e),
            Err(_) => warn!("timed out shutting down tcp stream"),
        }
    }
}
