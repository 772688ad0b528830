//! Control-Protokoll (TCP)
//!
//! Definiert alle Nachrichten die ueber die Echtzeit-Verbindung zwischen
//! Client und Server ausgetauscht werden.
//!
//! ## Design
//! - Request/Response Pattern: jede Nachricht hat eine `request_id: u32`
//! - Server-initiierte Benachrichtigungen tragen `request_id = 0`
//! - JSON-Serialisierung via serde, Tagged Enum mit kebab-case Namen
//!   (`start-recording`, `audio-available`, ...)

use serde::{Deserialize, Serialize};
use sprechfunk_core::types::{AudioRef, ChannelId, Mitglied, SitzungId, UserId};
use sprechfunk_core::KanalEvent;

/// request_id fuer Nachrichten die der Server von sich aus sendet
pub const BENACHRICHTIGUNG_ID: u32 = 0;

// ---------------------------------------------------------------------------
// Fehler-Codes
// ---------------------------------------------------------------------------

/// Standardisierte Fehler-Codes fuer Error-Responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Allgemein
    InternalError,
    InvalidRequest,
    NotFound,
    // Sitzung
    SessionExpired,
    AlreadyLoggedIn,
    ServerFull,
    // Kanal
    FloorBusy,
    NotInChannel,
    UploadFailed,
}

// ---------------------------------------------------------------------------
// Anmeldung
// ---------------------------------------------------------------------------

/// Anmeldung mit dem vom Auth-Kollaborateur ausgestellten Identifikator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub user_id: UserId,
    /// Optionaler Token fuer den Auth-Kollaborateur
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub client_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: UserId,
    pub sitzung: SitzungId,
}

// ---------------------------------------------------------------------------
// Kanal-Nachrichten
// ---------------------------------------------------------------------------

/// Kanal beitreten
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub channel_id: ChannelId,
    pub display_name: String,
    #[serde(default)]
    pub license_number: String,
}

/// Bestaetigung des Beitritts mit vollstaendigem Kanal-Schnappschuss
///
/// Der Client baut daraus nach einem (Re-)Connect seine Sicht auf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinResponse {
    pub channel_id: ChannelId,
    pub already_member: bool,
    /// Alle Mitglieder in Beitrittsreihenfolge (inklusive des Beitretenden)
    pub members: Vec<Mitglied>,
    pub floor_holder: Option<UserId>,
    pub last_audio: Option<AudioRef>,
}

/// Kanal verlassen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub channel_id: ChannelId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveResponse {
    pub channel_id: ChannelId,
}

/// Mitgliederliste abfragen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberListRequest {
    pub channel_id: ChannelId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberListResponse {
    pub channel_id: ChannelId,
    pub members: Vec<Mitglied>,
}

// ---------------------------------------------------------------------------
// Sprechrecht und Audio
// ---------------------------------------------------------------------------

/// start-recording / stop-recording
///
/// Die `user_id` muss mit der angemeldeten Sitzung uebereinstimmen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingRequest {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRecordingResponse {
    pub user_id: UserId,
    /// true wenn das Sprechrecht bereits von diesem Benutzer gehalten wurde
    pub already_holding: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopRecordingResponse {
    pub user_id: UserId,
    /// false wenn der Benutzer das Sprechrecht nicht hielt (No-op)
    pub released: bool,
}

/// Meldung dass eine Aufnahme hochgeladen wurde
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioReadyRequest {
    pub user_id: UserId,
    pub url: String,
    #[serde(default)]
    pub duration_secs: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioReadyResponse {
    pub audio: AudioRef,
}

// ---------------------------------------------------------------------------
// Server -> Client Benachrichtigungen
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberLeftEvent {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingEvent {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioAvailableEvent {
    pub owner_id: UserId,
    pub audio: AudioRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastingAckEvent {
    pub audio: AudioRef,
}

// ---------------------------------------------------------------------------
// Keepalive
// ---------------------------------------------------------------------------

/// Ping (Client -> Server oder Server -> Client)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingMessage {
    /// Unix-Timestamp in Millisekunden fuer RTT-Messung
    pub timestamp_ms: u64,
}

/// Pong-Antwort (spiegelt Timestamp zurueck)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PongMessage {
    pub echo_timestamp_ms: u64,
    pub server_timestamp_ms: u64,
}

// ---------------------------------------------------------------------------
// Haupt-Enum: ControlPayload
// ---------------------------------------------------------------------------

/// Alle moeglichen Control-Nachrichten (typsicher via Tagged Enum)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlPayload {
    // Anmeldung
    Login(LoginRequest),
    LoginResponse(LoginResponse),

    // Kanal
    Join(JoinRequest),
    JoinResponse(JoinResponse),
    Leave(LeaveRequest),
    LeaveResponse(LeaveResponse),
    MemberList(MemberListRequest),
    MemberListResponse(MemberListResponse),

    // Sprechrecht
    StartRecording(RecordingRequest),
    StartRecordingResponse(StartRecordingResponse),
    StopRecording(RecordingRequest),
    StopRecordingResponse(StopRecordingResponse),

    // Audio
    AudioReady(AudioReadyRequest),
    AudioReadyResponse(AudioReadyResponse),

    // Benachrichtigungen
    MemberJoined(Mitglied),
    MemberLeft(MemberLeftEvent),
    RecordingStarted(RecordingEvent),
    RecordingStopped(RecordingEvent),
    AudioAvailable(AudioAvailableEvent),
    BroadcastingAck(BroadcastingAckEvent),

    // Keepalive
    Ping(PingMessage),
    Pong(PongMessage),

    // Error
    Error(ErrorResponse),
}

/// Standardisierte Fehler-Antwort
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
    /// Optionale maschinenlesbare Details
    pub details: Option<serde_json::Value>,
}

impl From<KanalEvent> for ControlPayload {
    fn from(event: KanalEvent) -> Self {
        match event {
            KanalEvent::MitgliedBeigetreten(mitglied) => Self::MemberJoined(mitglied),
            KanalEvent::MitgliedVerlassen { user_id } => {
                Self::MemberLeft(MemberLeftEvent { user_id })
            }
            KanalEvent::AufnahmeGestartet { user_id } => {
                Self::RecordingStarted(RecordingEvent { user_id })
            }
            KanalEvent::AufnahmeGestoppt { user_id } => {
                Self::RecordingStopped(RecordingEvent { user_id })
            }
            KanalEvent::AudioVerfuegbar { owner_id, audio } => {
                Self::AudioAvailable(AudioAvailableEvent { owner_id, audio })
            }
            KanalEvent::SendungBestaetigt { audio } => {
                Self::BroadcastingAck(BroadcastingAckEvent { audio })
            }
        }
    }
}

impl ControlPayload {
    /// true fuer Nachrichten die nur der Server senden darf
    pub fn ist_server_nachricht(&self) -> bool {
        matches!(
            self,
            Self::LoginResponse(_)
                | Self::JoinResponse(_)
                | Self::LeaveResponse(_)
                | Self::MemberListResponse(_)
                | Self::StartRecordingResponse(_)
                | Self::StopRecordingResponse(_)
                | Self::AudioReadyResponse(_)
                | Self::MemberJoined(_)
                | Self::MemberLeft(_)
                | Self::RecordingStarted(_)
                | Self::RecordingStopped(_)
                | Self::AudioAvailable(_)
                | Self::BroadcastingAck(_)
                | Self::Error(_)
        )
    }
}

// ---------------------------------------------------------------------------
// Control-Frame (Umschlag fuer alle Nachrichten)
// ---------------------------------------------------------------------------

/// Control-Protokoll-Nachricht mit Request/Response-Zuordnung
///
/// Jede Nachricht traegt eine `request_id` die der Client vergibt.
/// Der Server kopiert die ID in die Antwort damit der Client
/// Request und Response zuordnen kann.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlMessage {
    pub request_id: u32,
    pub payload: ControlPayload,
}

impl ControlMessage {
    /// Erstellt eine neue Control-Nachricht
    pub fn new(request_id: u32, payload: ControlPayload) -> Self {
        Self {
            request_id,
            payload,
        }
    }

    /// Erstellt eine Server-Benachrichtigung aus einem Kanal-Event
    pub fn benachrichtigung(event: KanalEvent) -> Self {
        Self::new(BENACHRICHTIGUNG_ID, event.into())
    }

    /// Erstellt eine Ping-Nachricht
    pub fn ping(request_id: u32, timestamp_ms: u64) -> Self {
        Self::new(
            request_id,
            ControlPayload::Ping(PingMessage { timestamp_ms }),
        )
    }

    /// Erstellt eine Pong-Antwort
    pub fn pong(request_id: u32, echo_timestamp_ms: u64, server_timestamp_ms: u64) -> Self {
        Self::new(
            request_id,
            ControlPayload::Pong(PongMessage {
                echo_timestamp_ms,
                server_timestamp_ms,
            }),
        )
    }

    /// Erstellt eine Fehler-Antwort
    pub fn error(request_id: u32, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::error_mit_details(request_id, code, message, None)
    }

    /// Erstellt eine Fehler-Antwort mit maschinenlesbaren Details
    pub fn error_mit_details(
        request_id: u32,
        code: ErrorCode,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        Self::new(
            request_id,
            ControlPayload::Error(ErrorResponse {
                code,
                message: message.into(),
                details,
            }),
        )
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
