use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, RconError>;

/// Possible errors for the package.
///
/// Every variant except [RconError::NotConnected], [RconError::CommandTooLong]
/// and [RconError::Config] is raised after the session has already dropped its
/// connection, so the caller has to `connect()` again before sending further
/// commands.
#[derive(Error, Debug)]
pub enum RconError {
    /// Returned if the host is down, behind a firewall or refuses the
    /// connection.
    #[error("cannot connect to host")]
    ConnectionFailed(#[source] std::io::Error),
    /// Returned if you can't remember the password, or the server answered the
    /// auth packet with something other than an auth response.
    #[error("authentication failed")]
    AuthenticationFailed,
    /// Returned if the server did not respond in time.
    #[error("timeout")]
    Timeout,
    /// Returned if the stream was closed or broke in the middle of a packet.
    #[error("connection lost")]
    ConnectionLost(#[source] std::io::Error),
    /// Returned if the server sent something we can't make sense of: a
    /// response to a different request, or a packet with a bogus size.
    #[error("protocol error: {0}")]
    ProtocolError(String),
    /// Returned if a command is sent on a session that is not authenticated.
    #[error("not connected")]
    NotConnected,
    /// Returned if a command does not fit in a single packet. Nothing is sent
    /// and the session stays usable.
    #[error("command is {0} bytes, too long for one packet")]
    CommandTooLong(usize),
    /// Returned if the session configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RconError {
    /// Whether this failure tore down the connection it happened on.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            RconError::NotConnected | RconError::CommandTooLong(_) | RconError::Config(_)
        )
    }
}

impl From<tokio::time::error::Elapsed> for RconError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        RconError::Timeout
    }
}
