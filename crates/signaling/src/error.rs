//! Fehlertypen fuer den Signaling-Service

use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Anmeldedaten vom Auth-Kollaborateur abgelehnt
    #[error("Anmeldung abgelehnt: {0}")]
    AnmeldungAbgelehnt(String),

    /// Server ist voll
    #[error("Server ist voll")]
    ServerVoll,
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
