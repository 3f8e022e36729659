use std::time::Duration;

use log::{debug, trace, warn};

use crate::{
    config::Config,
    error::{RconError, Result},
    packet::{is_final_fragment, Packet, PacketType, MAX_BODY_LENGTH},
    transport::Transport,
};

/// Where a [Session] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Authenticating,
    Ready,
    Closed,
}

/// One authenticated connection to a single rcon server. Call `connect()` to
/// establish the connection and authenticate in one go; a session is never
/// connected but unauthenticated.
///
/// The session has to be `mut` as it keeps the counter used for [Packet] IDs,
/// which also means only one command can be in flight at a time. Open a second
/// session if you need to talk to the same server concurrently.
///
/// Any failure while talking to the server drops the connection, and so does
/// dropping the session or cancelling a pending call. `close()` shuts the
/// stream down gracefully.
///
/// ## Example
/// ```no_run
/// use rcon_session::{client::Session, config::Config};
/// use std::error::Error;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn Error>> {
///     let config = Config::builder()
///         .host("dev.viora.sh")
///         .port(27016)
///         .password("<put rcon password here>")
///         .build();
///     let mut session = Session::open(config).await?;
///     let response = session.send_command("echo hi").await;
///     session.close().await;
///
///     assert_eq!(response?.body(), "hi");
///     Ok(())
/// }
/// ```
pub struct Session {
    config: Config,
    // Taken out for the duration of every exchange and only put back once it
    // completed, so an error or a dropped future never leaves it mid-frame.
    transport: Option<Transport>,
    state: SessionState,
    next_packet_id: i32,
}

/// Container struct for a response that can be glued together from multiple [Packet]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    id: i32,
    body: String,
    fragments: usize,
}

impl Response {
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn body(&self) -> &str {
        self.body.as_ref()
    }

    /// How many packets the server split the response into.
    pub fn fragments(&self) -> usize {
        self.fragments
    }

    pub fn into_body(self) -> String {
        self.body
    }
}

/// Connects and authenticates in one call.
pub async fn connect(
    host: &str,
    port: u16,
    password: &str,
    timeout: Duration,
) -> Result<Session> {
    let config = Config::builder()
        .host(host)
        .port(port)
        .password(password)
        .timeout(timeout)
        .build();
    Session::open(config).await
}

impl Session {
    /// Creates a disconnected session. Nothing touches the network until
    /// `connect()`.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        Ok(Session {
            config,
            transport: None,
            state: SessionState::Disconnected,
            next_packet_id: 0,
        })
    }

    /// `new()` followed by `connect()`.
    pub async fn open(config: Config) -> Result<Self> {
        let mut session = Self::new(config)?;
        session.connect().await?;
        Ok(session)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        match self.state {
            SessionState::Closed => SessionState::Closed,
            // a cancelled call took the transport with it
            _ if self.transport.is_none() => SessionState::Disconnected,
            state => state,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// Opens the connection and authenticates. Calling this on a ready session
    /// does nothing; on a disconnected or closed one it reconnects to the same
    /// server.
    pub async fn connect(&mut self) -> Result<()> {
        if self.is_ready() {
            return Ok(());
        }

        self.transition(SessionState::Connecting);
        let address = self.config.address();
        let mut transport = match Transport::open(&address, self.config.timeout).await {
            Ok(transport) => transport,
            Err(e) => {
                warn!("cannot connect to {}: {}", address, e);
                self.transition(SessionState::Disconnected);
                return Err(e);
            }
        };

        self.transition(SessionState::Authenticating);
        let auth_id = self.take_packet_id();
        match Self::auth(&mut transport, auth_id, &self.config.password).await {
            Ok(()) => {
                self.transport = Some(transport);
                self.transition(SessionState::Ready);
                Ok(())
            }
            Err(e) => {
                warn!("auth against {} failed: {}", address, e);
                self.transition(SessionState::Disconnected);
                transport.shutdown().await;
                Err(e)
            }
        }
    }

    /// Run a rcon command. In case of a response being split between multiple
    /// packets, they will be joined together afterwards.
    pub async fn send_command(&mut self, command: &str) -> Result<Response> {
        if !self.is_ready() {
            return Err(RconError::NotConnected);
        }
        if command.len() > MAX_BODY_LENGTH {
            return Err(RconError::CommandTooLong(command.len()));
        }
        let mut transport = self.transport.take().ok_or(RconError::NotConnected)?;

        let id = self.take_packet_id();
        match Self::exchange(&mut transport, id, command).await {
            Ok(response) => {
                self.transport = Some(transport);
                Ok(response)
            }
            Err(e) => {
                warn!("command {} failed, dropping connection: {}", id, e);
                self.transition(SessionState::Disconnected);
                transport.shutdown().await;
                Err(e)
            }
        }
    }

    /// Shuts the connection down. Safe to call any number of times.
    pub async fn close(&mut self) {
        if let Some(transport) = self.transport.take() {
            transport.shutdown().await;
        }
        self.transition(SessionState::Closed);
    }

    async fn auth(transport: &mut Transport, id: i32, password: &str) -> Result<()> {
        transport
            .write_packet(&Packet::new(id, PacketType::Auth, password))
            .await?;

        let response = transport.read_packet().await?;

        // a bad password is answered with id -1
        if response.id() == -1 || !response.is(PacketType::AuthResponse) {
            return Err(RconError::AuthenticationFailed);
        }

        trace!("auth complete");
        Ok(())
    }

    async fn exchange(transport: &mut Transport, id: i32, command: &str) -> Result<Response> {
        transport
            .write_packet(&Packet::new(id, PacketType::Exec, command))
            .await?;

        let mut body = Vec::<u8>::new();
        let mut fragments = 0;

        loop {
            let packet = transport.read_packet().await?;
            if packet.id() != id {
                return Err(RconError::ProtocolError(format!(
                    "invalid response id: expected {}, got {}",
                    id,
                    packet.id()
                )));
            }

            fragments += 1;
            let last = is_final_fragment(packet.body_bytes().len());
            body.extend_from_slice(packet.body_bytes());
            if last {
                break;
            }
            trace!("fragment {} of response {} is full, reading on", fragments, id);
        }

        // decode once the fragments are joined, a character can straddle two of them
        let body = String::from_utf8_lossy(&body)
            .trim_end_matches('\0')
            .to_string();

        Ok(Response {
            id,
            body,
            fragments,
        })
    }

    fn take_packet_id(&mut self) -> i32 {
        let id = self.next_packet_id;
        // wrap to 1, never into the negative range where -1 means "auth failed"
        self.next_packet_id = id.checked_add(1).unwrap_or(1);
        id
    }

    fn transition(&mut self, state: SessionState) {
        if self.state != state {
            debug!(
                "session {}: {:?} -> {:?}",
                self.config.address(),
                self.state,
                state
            );
            self.state = state;
        }
    }
}
