//! Fehlertypen fuer Sprechfunk
//!
//! Zentraler Fehler-Enum fuer alle Kanal-Operationen. Keiner dieser Fehler
//! ist fuer den Prozess fatal; alle betreffen genau einen Kanal oder eine
//! Sitzung.

use crate::types::{ChannelId, UserId};
use thiserror::Error;

/// Globaler Result-Alias fuer Sprechfunk
pub type Result<T> = std::result::Result<T, SprechfunkError>;

/// Alle moeglichen Fehler im Sprechfunk-System
#[derive(Debug, Error)]
pub enum SprechfunkError {
    // --- Sprechrecht ---
    /// Ein anderer Benutzer haelt das Sprechrecht
    #[error("Sprechrecht belegt durch {inhaber}")]
    SprechrechtBelegt { inhaber: UserId },

    /// Freigabe durch einen Benutzer der das Sprechrecht nicht haelt
    #[error("{0} haelt das Sprechrecht nicht")]
    NichtInhaber(UserId),

    // --- Kanal ---
    #[error("Kanal nicht gefunden: {0}")]
    KanalNichtGefunden(ChannelId),

    #[error("{user_id} ist nicht Mitglied von {channel_id}")]
    NichtImKanal {
        user_id: UserId,
        channel_id: ChannelId,
    },

    // --- Audio ---
    #[error("Audio-Upload fehlgeschlagen: {0}")]
    UploadFehlgeschlagen(String),

    // --- Eingabe ---
    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl SprechfunkError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Client es spaeter erneut versuchen kann
    pub fn ist_wiederholbar(&self) -> bool {
        matches!(
            self,
            Self::SprechrechtBelegt { .. } | Self::UploadFehlgeschlagen(_)
        )
    }

    /// Gibt true zurueck wenn der Fehler dem Client nicht gemeldet wird
    pub fn ist_stillschweigend(&self) -> bool {
        matches!(self, Self::NichtInhaber(_))
    }
}
