use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Errors surfaced by the bridge
///
/// Only startup and serving failures are fatal. Everything that happens while
/// handling input is contained where it occurs and never becomes an error.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to bind observer listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("observer server failed: {0}")]
    Serve(#[source] io::Error),

    #[error("failed to start input reader: {0}")]
    Input(#[source] io::Error),

    #[error("bridge hub is no longer running")]
    HubClosed,
}

pub type BridgeResult<T> = Result<T, BridgeError>;
