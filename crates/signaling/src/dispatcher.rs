//! Message-Dispatcher – Routet ControlMessages an die richtigen Handler
//!
//! Der Dispatcher empfaengt ControlMessages von einer ClientConnection,
//! bestimmt den richtigen Handler und gibt die Antwort zurueck.
//!
//! ## Zustandspruefung
//! - `Login`, `Ping`, `Pong` sind immer erlaubt
//! - Alles andere erst nach erfolgreichem Login
//! - Sprechrecht und Audio erst nach einem Kanal-Beitritt

use sprechfunk_core::types::{ChannelId, SitzungId, UserId};
use sprechfunk_protocol::control::{ControlMessage, ControlPayload, ErrorCode};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::handlers::{audio_handler, auth_handler, channel_handler, floor_handler};
use crate::server_state::SignalingState;

/// Zustand der Verbindung aus Sicht des Protokolls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbindungsZustand {
    /// Verbunden, noch nicht angemeldet
    Verbunden,
    /// Angemeldet, in keinem Kanal
    Angemeldet,
    /// Mitglied eines Kanals
    ImKanal,
}

/// Dispatcher-Kontext – Informationen ueber die aktuelle Verbindung
pub struct DispatcherContext {
    pub peer_addr: SocketAddr,
    /// Sitzung dieser Verbindung (fuer sitzungsbezogenes Aufraeumen)
    pub sitzung: SitzungId,
    /// Angemeldete User-ID (None vor dem Login)
    pub user_id: Option<UserId>,
    /// Kanal dem diese Verbindung beigetreten ist
    pub kanal: Option<ChannelId>,
    /// Broadcaster-Queue nach dem Login; die Verbindung uebernimmt sie
    pub empfang: Option<mpsc::Receiver<ControlMessage>>,
}

impl DispatcherContext {
    pub fn neu(peer_addr: SocketAddr) -> Self {
        Self {
            peer_addr,
            sitzung: SitzungId::naechste(),
            user_id: None,
            kanal: None,
            empfang: None,
        }
    }

    pub fn zustand(&self) -> VerbindungsZustand {
        match (&self.user_id, &self.kanal) {
            (None, _) => VerbindungsZustand::Verbunden,
            (Some(_), None) => VerbindungsZustand::Angemeldet,
            (Some(_), Some(_)) => VerbindungsZustand::ImKanal,
        }
    }
}

/// Zentraler Message-Dispatcher
///
/// Routet eingehende ControlMessages an die entsprechenden Handler und
/// gibt die Antwort-ControlMessage zurueck.
pub struct MessageDispatcher {
    state: Arc<SignalingState>,
}

impl MessageDispatcher {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    /// Verarbeitet eine eingehende ControlMessage und gibt die Antwort zurueck
    ///
    /// Gibt `None` zurueck wenn keine Antwort gesendet werden soll (Pong).
    pub async fn dispatch(
        &self,
        message: ControlMessage,
        ctx: &mut DispatcherContext,
    ) -> Option<ControlMessage> {
        let request_id = message.request_id;

        match message.payload {
            // -------------------------------------------------------------------
            // Anmeldung (immer erlaubt)
            // -------------------------------------------------------------------
            ControlPayload::Login(req) => {
                if ctx.user_id.is_some() {
                    return Some(ControlMessage::error(
                        request_id,
                        ErrorCode::AlreadyLoggedIn,
                        "Bereits angemeldet",
                    ));
                }
                Some(auth_handler::handle_login(req, request_id, ctx, &self.state).await)
            }

            // -------------------------------------------------------------------
            // Keepalive
            // -------------------------------------------------------------------
            ControlPayload::Ping(ping) => {
                let server_ts = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_millis() as u64;
                Some(ControlMessage::pong(request_id, ping.timestamp_ms, server_ts))
            }

            ControlPayload::Pong(_) => {
                tracing::trace!(peer = %ctx.peer_addr, "Pong empfangen");
                None
            }

            // -------------------------------------------------------------------
            // Anmeldung erfordernde Nachrichten
            // -------------------------------------------------------------------
            payload => {
                let Some(user_id) = ctx.user_id.clone() else {
                    return Some(ControlMessage::error(
                        request_id,
                        ErrorCode::SessionExpired,
                        "Nicht angemeldet – bitte zuerst Login senden",
                    ));
                };
                self.dispatch_angemeldet(payload, request_id, user_id, ctx)
                    .await
            }
        }
    }

    /// Routet Nachrichten die eine Anmeldung erfordern
    async fn dispatch_angemeldet(
        &self,
        payload: ControlPayload,
        request_id: u32,
        user_id: UserId,
        ctx: &mut DispatcherContext,
    ) -> Option<ControlMessage> {
        match payload {
            // -------------------------------------------------------------------
            // Kanal
            // -------------------------------------------------------------------
            ControlPayload::Join(req) => Some(
                channel_handler::handle_join(req, request_id, user_id, ctx, &self.state).await,
            ),

            ControlPayload::Leave(req) => Some(
                channel_handler::handle_leave(req, request_id, user_id, ctx, &self.state).await,
            ),

            ControlPayload::MemberList(req) => {
                Some(channel_handler::handle_member_list(req, request_id, &self.state))
            }

            // -------------------------------------------------------------------
            // Sprechrecht und Audio
            // -------------------------------------------------------------------
            ControlPayload::StartRecording(req) => Some(floor_handler::handle_start_recording(
                req,
                request_id,
                user_id,
                ctx,
                &self.state,
            )),

            ControlPayload::StopRecording(req) => Some(floor_handler::handle_stop_recording(
                req,
                request_id,
                user_id,
                ctx,
                &self.state,
            )),

            ControlPayload::AudioReady(req) => Some(audio_handler::handle_audio_ready(
                req,
                request_id,
                user_id,
                ctx,
                &self.state,
            )),

            // -------------------------------------------------------------------
            // Unerwartete Nachrichten
            // -------------------------------------------------------------------
            ControlPayload::Login(_) => Some(ControlMessage::error(
                request_id,
                ErrorCode::AlreadyLoggedIn,
                "Bereits angemeldet",
            )),

            ControlPayload::Ping(_) | ControlPayload::Pong(_) => None,

            payload => {
                debug_assert!(payload.ist_server_nachricht());
                tracing::warn!(
                    request_id,
                    peer = %ctx.peer_addr,
                    "Unerwartete Server->Client Nachricht vom Client empfangen"
                );
                Some(ControlMessage::error(
                    request_id,
                    ErrorCode::InvalidRequest,
                    "Unerwartete Nachricht",
                ))
            }
        }
    }

    /// Bereinigt alle Ressourcen einer Verbindung beim Trennen
    ///
    /// Nur Zustand dieser Sitzung wird entfernt.
    pub async fn verbindung_cleanup(&self, ctx: &mut DispatcherContext) {
        let Some(user_id) = ctx.user_id.take() else {
            return;
        };

        if let Some(kanal) = ctx.kanal.take() {
            self.state
                .aufraeumer
                .verbindung_beendet(&kanal, &user_id, Some(ctx.sitzung))
                .await;
        }
        self.state.broadcaster.client_entfernen(&user_id, ctx.sitzung);

        tracing::debug!(user_id = %user_id, sitzung = %ctx.sitzung, "Verbindungs-Ressourcen bereinigt");
    }
}
