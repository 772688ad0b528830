//! sprechfunk-core – Gemeinsame Typen, Events und Fehlertypen
//!
//! Dieses Crate stellt die Bausteine bereit, die von allen anderen
//! Sprechfunk-Crates gemeinsam genutzt werden: Identifikatoren, das
//! Mitglieds- und Audio-Modell, die Kanal-Events und den zentralen
//! Fehler-Enum.

pub mod error;
pub mod event;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{Result, SprechfunkError};
pub use event::{EventSenke, KanalEvent};
pub use types::{AudioRef, ChannelId, Mitglied, SitzungId, UserId};
