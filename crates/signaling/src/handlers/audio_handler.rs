//! Audio-Handler – audio-ready
//!
//! Fuer Clients die ihre Aufnahme selbst hochladen und nur die fertige URL
//! melden. Uploads ueber die HTTP-API veroeffentlichen direkt.

use sprechfunk_core::types::{AudioRef, UserId};
use sprechfunk_protocol::control::{
    AudioReadyRequest, AudioReadyResponse, ControlMessage, ControlPayload, ErrorCode,
};

use crate::dispatcher::DispatcherContext;
use crate::handlers::{fehler_antwort, kanal_der_verbindung};
use crate::server_state::SignalingState;

pub fn handle_audio_ready(
    request: AudioReadyRequest,
    request_id: u32,
    user_id: UserId,
    ctx: &DispatcherContext,
    state: &SignalingState,
) -> ControlMessage {
    let channel_id = match kanal_der_verbindung(request_id, &request.user_id, &user_id, ctx) {
        Ok(c) => c,
        Err(antwort) => return antwort,
    };

    if request.url.trim().is_empty() {
        return ControlMessage::error(request_id, ErrorCode::InvalidRequest, "Leere Audio-URL");
    }

    let audio = AudioRef::jetzt(user_id, request.url.trim(), request.duration_secs);
    match state.kanaele.audio_veroeffentlichen(&channel_id, audio.clone()) {
        Ok(_) => ControlMessage::new(
            request_id,
            ControlPayload::AudioReadyResponse(AudioReadyResponse { audio }),
        ),
        Err(e) => fehler_antwort(request_id, &e),
    }
}
