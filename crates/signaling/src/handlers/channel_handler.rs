//! Channel-Handler – Join, Leave, MemberList
//!
//! Eine Verbindung ist hoechstens in einem Kanal. Ein Join in einen anderen
//! Kanal verlaesst den bisherigen zuerst.

use sprechfunk_core::types::{Mitglied, UserId};
use sprechfunk_protocol::control::{
    ControlMessage, ControlPayload, JoinRequest, JoinResponse, LeaveRequest, LeaveResponse,
    MemberListRequest, MemberListResponse,
};

use crate::dispatcher::DispatcherContext;
use crate::server_state::SignalingState;

/// Verarbeitet einen Kanal-Beitritt
pub async fn handle_join(
    request: JoinRequest,
    request_id: u32,
    user_id: UserId,
    ctx: &mut DispatcherContext,
    state: &SignalingState,
) -> ControlMessage {
    let channel_id = request.channel_id;

    if let Some(alter_kanal) = ctx.kanal.take() {
        if alter_kanal != channel_id {
            tracing::debug!(
                user_id = %user_id,
                von = %alter_kanal,
                nach = %channel_id,
                "Kanalwechsel"
            );
            state
                .aufraeumer
                .verbindung_beendet(&alter_kanal, &user_id, Some(ctx.sitzung))
                .await;
        }
    }

    let display_name = match request.display_name.trim() {
        "" => user_id.as_str().to_string(),
        name => name.to_string(),
    };
    let mitglied = Mitglied::neu(user_id, display_name, request.license_number.trim());
    let ergebnis = state.kanaele.beitreten(&channel_id, mitglied, ctx.sitzung);
    ctx.kanal = Some(channel_id.clone());

    let schnappschuss = ergebnis.schnappschuss;
    ControlMessage::new(
        request_id,
        ControlPayload::JoinResponse(JoinResponse {
            channel_id,
            already_member: ergebnis.bereits_mitglied,
            members: schnappschuss.mitglieder,
            floor_holder: schnappschuss.sprechrecht_inhaber,
            last_audio: schnappschuss.letztes_audio,
        }),
    )
}

/// Verarbeitet das Verlassen eines Kanals
///
/// Idempotent: auch ohne Mitgliedschaft wird mit `leave-response` geantwortet.
pub async fn handle_leave(
    request: LeaveRequest,
    request_id: u32,
    user_id: UserId,
    ctx: &mut DispatcherContext,
    state: &SignalingState,
) -> ControlMessage {
    if ctx.kanal.as_ref() == Some(&request.channel_id) {
        ctx.kanal = None;
        state
            .aufraeumer
            .verbindung_beendet(&request.channel_id, &user_id, Some(ctx.sitzung))
            .await;
    } else {
        tracing::debug!(user_id = %user_id, channel_id = %request.channel_id, "Leave ohne Mitgliedschaft");
    }

    ControlMessage::new(
        request_id,
        ControlPayload::LeaveResponse(LeaveResponse {
            channel_id: request.channel_id,
        }),
    )
}

/// Liefert die Mitgliederliste eines Kanals (leer fuer unbekannte Kanaele)
pub fn handle_member_list(
    request: MemberListRequest,
    request_id: u32,
    state: &SignalingState,
) -> ControlMessage {
    let members = state.kanaele.mitglieder(&request.channel_id);
    ControlMessage::new(
        request_id,
        ControlPayload::MemberListResponse(MemberListResponse {
            channel_id: request.channel_id,
            members,
        }),
    )
}
