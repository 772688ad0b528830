//! sprechfunk-signaling – Echtzeit-Gateway
//!
//! Dieser Crate nimmt TCP-Verbindungen der Funk-Clients an, uebersetzt
//! ihre Control-Nachrichten in Operationen des Kanal-Kerns und stellt die
//! daraus entstehenden Kanal-Events ueber die Send-Queues der Verbindungen
//! zu.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalingServer)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |  State Machine: Verbunden -> Angemeldet -> ImKanal
//!     |
//!     v
//! MessageDispatcher
//!     |
//!     +-- AuthHandler     (Login)
//!     +-- ChannelHandler  (Join, Leave, MemberList)
//!     +-- FloorHandler    (StartRecording, StopRecording)
//!     +-- AudioHandler    (AudioReady)
//!
//! EventBroadcaster – Send-Queue pro angemeldeter Sitzung (EventSenke)
//! Authentifizierer – bildet Anmeldedaten auf eine UserId ab
//! ```

pub mod auth;
pub mod broadcast;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod server_state;
pub mod tcp;

// Bequeme Re-Exporte
pub use auth::{Authentifizierer, OffenerAuthentifizierer};
pub use broadcast::EventBroadcaster;
pub use connection::ClientConnection;
pub use dispatcher::MessageDispatcher;
pub use error::{SignalingError, SignalingResult};
pub use server_state::{SignalingConfig, SignalingState};
pub use tcp::SignalingServer;
