//! Gemeinsame Identifikations- und Datentypen fuer Sprechfunk
//!
//! IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen. `UserId` und
//! `ChannelId` werden beim Deserialisieren validiert, da sie direkt vom
//! Client kommen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Maximale Laenge einer User-ID in Bytes
pub const MAX_USER_ID_LAENGE: usize = 128;

/// Maximale Laenge einer Channel-ID in Zeichen
pub const MAX_CHANNEL_ID_LAENGE: usize = 64;

// ---------------------------------------------------------------------------
// UserId
// ---------------------------------------------------------------------------

/// Opaker, stabiler Benutzer-Identifikator (vom Auth-Kollaborateur verifiziert)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Erstellt eine UserId nach Pruefung auf Nicht-Leer und Maximallaenge
    pub fn neu(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        let getrimmt = id.trim();
        if getrimmt.is_empty() {
            return Err("User-ID darf nicht leer sein".into());
        }
        if getrimmt.len() > MAX_USER_ID_LAENGE {
            return Err(format!(
                "User-ID zu lang: {} Bytes (Maximum: {MAX_USER_ID_LAENGE})",
                getrimmt.len()
            ));
        }
        Ok(Self(getrimmt.to_string()))
    }

    /// Gibt die ID als String-Slice zurueck
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::neu(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ChannelId
// ---------------------------------------------------------------------------

/// Kanal-Identifikator
///
/// Erlaubt nur `[A-Za-z0-9_-]`, da die ID auch als Verzeichnisname im
/// Audio-Speicher verwendet wird.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelId(String);

impl ChannelId {
    /// Erstellt eine ChannelId nach Pruefung des Zeichensatzes
    pub fn neu(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.is_empty() || id.len() > MAX_CHANNEL_ID_LAENGE {
            return Err(format!(
                "Channel-ID muss 1 bis {MAX_CHANNEL_ID_LAENGE} Zeichen lang sein"
            ));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(format!("Channel-ID enthaelt ungueltige Zeichen: {id}"));
        }
        Ok(Self(id))
    }

    /// Gibt die ID als String-Slice zurueck
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ChannelId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::neu(value)
    }
}

impl From<ChannelId> for String {
    fn from(id: ChannelId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "channel:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SitzungId
// ---------------------------------------------------------------------------

/// Globaler Sitzungs-Zaehler (beginnt bei 1, 0 ist reserviert)
static SITZUNG_ZAEHLER: AtomicU64 = AtomicU64::new(1);

/// Identifiziert eine einzelne Transport-Verbindung
///
/// Ein Benutzer kann sich nach einem Verbindungsabbruch neu verbinden,
/// bevor der alte Disconnect verarbeitet wurde. Die SitzungId trennt
/// beide Verbindungen voneinander.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SitzungId(pub u64);

impl SitzungId {
    /// Vergibt die naechste freie SitzungId (monoton steigend)
    pub fn naechste() -> Self {
        Self(SITZUNG_ZAEHLER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for SitzungId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sitzung:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Mitglied
// ---------------------------------------------------------------------------

/// Ein im Kanal anwesender Benutzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mitglied {
    pub user_id: UserId,
    pub display_name: String,
    pub license_number: String,
}

impl Mitglied {
    pub fn neu(
        user_id: UserId,
        display_name: impl Into<String>,
        license_number: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            license_number: license_number.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AudioRef
// ---------------------------------------------------------------------------

/// Referenz auf ein hochgeladenes Audio-Artefakt
///
/// Der Kanal referenziert das Artefakt nur; die Datei selbst gehoert dem
/// Speicher-Kollaborateur.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioRef {
    pub owner_id: UserId,
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
    /// Aufnahmedauer in Sekunden (vom Client gemeldet)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

impl AudioRef {
    /// Erstellt eine AudioRef mit dem aktuellen Zeitpunkt als Upload-Zeit
    pub fn jetzt(owner_id: UserId, url: impl Into<String>, duration_secs: Option<f64>) -> Self {
        Self {
            owner_id,
            url: url.into(),
            uploaded_at: Utc::now(),
            duration_secs,
        }
    }
}
