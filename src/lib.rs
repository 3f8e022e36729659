//! Pure Rust async client session for the [Source RCON protocol](https://developer.valvesoftware.com/wiki/Source_RCON_Protocol).
pub mod client;
pub mod config;
pub mod error;
pub mod packet;
mod transport;

pub use client::{connect, Response, Session, SessionState};
pub use config::Config;
pub use error::{RconError, Result};
