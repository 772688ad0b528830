//! Auth-Handler – Login
//!
//! Fragt den Auth-Kollaborateur nach der UserId und registriert die
//! Verbindung beim Broadcaster.

use sprechfunk_protocol::control::{
    ControlMessage, ControlPayload, ErrorCode, LoginRequest, LoginResponse,
};

use crate::dispatcher::DispatcherContext;
use crate::server_state::SignalingState;

/// Verarbeitet eine Login-Anfrage
pub async fn handle_login(
    request: LoginRequest,
    request_id: u32,
    ctx: &mut DispatcherContext,
    state: &SignalingState,
) -> ControlMessage {
    let user_id = match state.authentifizierer.pruefen(&request).await {
        Ok(uid) => uid,
        Err(e) => {
            tracing::warn!(
                peer = %ctx.peer_addr,
                user_id = %request.user_id,
                fehler = %e,
                "Login abgelehnt"
            );
            return ControlMessage::error(request_id, ErrorCode::InvalidRequest, e.to_string());
        }
    };

    let empfang = state.broadcaster.client_registrieren(user_id.clone(), ctx.sitzung);
    ctx.empfang = Some(empfang);
    ctx.user_id = Some(user_id.clone());

    tracing::info!(
        peer = %ctx.peer_addr,
        user_id = %user_id,
        sitzung = %ctx.sitzung,
        client_version = request.client_version.as_deref().unwrap_or("-"),
        "Client angemeldet"
    );

    ControlMessage::new(
        request_id,
        ControlPayload::LoginResponse(LoginResponse {
            user_id,
            sitzung: ctx.sitzung,
        }),
    )
}
