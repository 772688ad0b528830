//! Handler fuer alle Control-Nachrichten
//!
//! Jeder Handler ist fuer einen bestimmten Nachrichtentyp zustaendig
//! und hat Zugriff auf den gemeinsamen SignalingState.

pub mod audio_handler;
pub mod auth_handler;
pub mod channel_handler;
pub mod floor_handler;

use sprechfunk_core::error::SprechfunkError;
use sprechfunk_core::types::{ChannelId, UserId};
use sprechfunk_protocol::control::{ControlMessage, ErrorCode};

use crate::dispatcher::DispatcherContext;

/// Bildet einen Fehler des Kanal-Kerns auf eine Error-Antwort ab
pub(crate) fn fehler_antwort(request_id: u32, fehler: &SprechfunkError) -> ControlMessage {
    let nachricht = fehler.to_string();
    match fehler {
        SprechfunkError::SprechrechtBelegt { inhaber } => ControlMessage::error_mit_details(
            request_id,
            ErrorCode::FloorBusy,
            nachricht,
            Some(serde_json::json!({ "holder": inhaber.as_str() })),
        ),
        SprechfunkError::NichtImKanal { .. } => {
            ControlMessage::error(request_id, ErrorCode::NotInChannel, nachricht)
        }
        SprechfunkError::KanalNichtGefunden(_) => {
            ControlMessage::error(request_id, ErrorCode::NotFound, nachricht)
        }
        SprechfunkError::UploadFehlgeschlagen(_) => {
            ControlMessage::error(request_id, ErrorCode::UploadFailed, nachricht)
        }
        SprechfunkError::NichtInhaber(_) | SprechfunkError::UngueltigeEingabe(_) => {
            ControlMessage::error(request_id, ErrorCode::InvalidRequest, nachricht)
        }
        SprechfunkError::Konfiguration(_)
        | SprechfunkError::Intern(_)
        | SprechfunkError::Anyhow(_) => {
            tracing::error!(fehler = %fehler, "Interner Fehler im Kanal-Kern");
            ControlMessage::error(request_id, ErrorCode::InternalError, "Interner Serverfehler")
        }
    }
}

/// Prueft dass die Nachricht fuer den angemeldeten Benutzer gilt und die
/// Verbindung in einem Kanal ist. Liefert den Kanal.
pub(crate) fn kanal_der_verbindung(
    request_id: u32,
    angegeben: &UserId,
    user_id: &UserId,
    ctx: &DispatcherContext,
) -> Result<ChannelId, ControlMessage> {
    if angegeben != user_id {
        tracing::warn!(
            user_id = %user_id,
            angegeben = %angegeben,
            "Nachricht fuer fremde User-ID abgelehnt"
        );
        return Err(ControlMessage::error(
            request_id,
            ErrorCode::InvalidRequest,
            "user_id stimmt nicht mit der Anmeldung ueberein",
        ));
    }
    ctx.kanal.clone().ok_or_else(|| {
        ControlMessage::error(
            request_id,
            ErrorCode::NotInChannel,
            "Verbindung ist keinem Kanal beigetreten",
        )
    })
}
