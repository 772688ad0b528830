//! Floor-Handler – start-recording / stop-recording

use sprechfunk_core::types::UserId;
use sprechfunk_protocol::control::{
    ControlMessage, ControlPayload, RecordingRequest, StartRecordingResponse,
    StopRecordingResponse,
};

use crate::dispatcher::DispatcherContext;
use crate::handlers::{fehler_antwort, kanal_der_verbindung};
use crate::server_state::SignalingState;

pub fn handle_start_recording(
    request: RecordingRequest,
    request_id: u32,
    user_id: UserId,
    ctx: &DispatcherContext,
    state: &SignalingState,
) -> ControlMessage {
    let channel_id = match kanal_der_verbindung(request_id, &request.user_id, &user_id, ctx) {
        Ok(c) => c,
        Err(antwort) => return antwort,
    };

    match state
        .kanaele
        .sprechrecht_anfordern(&channel_id, &user_id, ctx.sitzung)
    {
        Ok(already_holding) => ControlMessage::new(
            request_id,
            ControlPayload::StartRecordingResponse(StartRecordingResponse {
                user_id,
                already_holding,
            }),
        ),
        Err(e) => fehler_antwort(request_id, &e),
    }
}

/// Gibt das Sprechrecht frei; durch einen Nicht-Halter still ignoriert
pub fn handle_stop_recording(
    request: RecordingRequest,
    request_id: u32,
    user_id: UserId,
    ctx: &DispatcherContext,
    state: &SignalingState,
) -> ControlMessage {
    let channel_id = match kanal_der_verbindung(request_id, &request.user_id, &user_id, ctx) {
        Ok(c) => c,
        Err(antwort) => return antwort,
    };

    let released = match state.kanaele.sprechrecht_freigeben(&channel_id, &user_id) {
        Ok(()) => true,
        Err(e) if e.ist_stillschweigend() => {
            tracing::debug!(user_id = %user_id, channel_id = %channel_id, "stop-recording ohne Sprechrecht");
            false
        }
        Err(e) => return fehler_antwort(request_id, &e),
    };

    ControlMessage::new(
        request_id,
        ControlPayload::StopRecordingResponse(StopRecordingResponse { user_id, released }),
    )
}
