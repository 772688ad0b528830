//! sprechfunk-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert alle Nachrichten die zwischen Client und Server
//! ueber die Echtzeit-Verbindung ausgetauscht werden, sowie das
//! Frame-Format auf dem TCP-Stream.

pub mod control;
pub mod wire;

pub use control::{ControlMessage, ControlPayload, ErrorCode, ErrorResponse};
pub use wire::FrameCodec;
