//! Client-Connection – Verwaltet eine einzelne TCP-Verbindung
//!
//! Jede TCP-Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task.
//!
//! ## Ablauf
//! ```text
//! Verbunden -> (login) Angemeldet -> (join) ImKanal
//!     ^                                  |
//!     +------------ Disconnect ----------+
//! ```
//! Beim Disconnect (Client schliesst, Lesefehler, Timeout, Shutdown) wird
//! der Zustand dieser Sitzung aufgeraeumt.
//!
//! ## Keepalive
//! - Server sendet alle `keepalive_sek` einen Ping
//! - Kommt `verbindungs_timeout_sek` lang kein Frame, wird getrennt

use futures_util::{SinkExt, StreamExt};
use sprechfunk_protocol::{
    control::{ControlMessage, ErrorCode},
    wire::FrameCodec,
};
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::codec::Framed;

use crate::dispatcher::{DispatcherContext, MessageDispatcher};
use crate::server_state::SignalingState;

/// Wartet auf die naechste Broadcaster-Nachricht; vor dem Login nie
async fn naechste_ausgehende(
    empfang: &mut Option<mpsc::Receiver<ControlMessage>>,
) -> Option<ControlMessage> {
    match empfang {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn jetzt_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Verarbeitet eine einzelne TCP-Verbindung
///
/// Liest Frames via `FrameCodec`, dispatcht an `MessageDispatcher` und
/// sendet Antworten sowie Kanal-Events zurueck.
pub struct ClientConnection {
    state: Arc<SignalingState>,
    peer_addr: SocketAddr,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection und zaehlt sie als aktiv
    pub fn neu(state: Arc<SignalingState>, peer_addr: SocketAddr) -> Self {
        state.aktive_verbindungen.fetch_add(1, Ordering::Relaxed);
        Self { state, peer_addr }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis die Verbindung getrennt wird oder ein Shutdown-Signal
    /// eingeht.
    pub async fn verarbeiten(self, stream: TcpStream, mut shutdown_rx: watch::Receiver<bool>) {
        let peer_addr = self.peer_addr;
        let keepalive_intervall = Duration::from_secs(self.state.config.keepalive_sek.max(1));
        let timeout_dauer = Duration::from_secs(self.state.config.verbindungs_timeout_sek.max(1));

        let mut framed = Framed::new(
            stream,
            FrameCodec::with_max_size(self.state.config.max_frame_groesse),
        );
        let mut ctx = DispatcherContext::neu(peer_addr);
        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));

        tracing::info!(peer = %peer_addr, sitzung = %ctx.sitzung, "Neue Verbindung");

        let mut letzter_empfang = Instant::now();
        let mut keepalive = tokio::time::interval_at(
            Instant::now() + keepalive_intervall,
            keepalive_intervall,
        );
        let mut ping_request_id: u32 = 0;

        loop {
            let frist = letzter_empfang + timeout_dauer;

            tokio::select! {
                // Eingehende Nachricht vom Client
                frame = framed.next() => {
                    match frame {
                        Some(Ok(nachricht)) => {
                            letzter_empfang = Instant::now();
                            tracing::trace!(
                                peer = %peer_addr,
                                request_id = nachricht.request_id,
                                "Nachricht empfangen"
                            );

                            let antwort = dispatcher.dispatch(nachricht, &mut ctx).await;
                            if let Some(antwort) = antwort {
                                if let Err(e) = framed.send(antwort).await {
                                    tracing::warn!(peer = %peer_addr, fehler = %e, "Senden fehlgeschlagen");
                                    break;
                                }
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!(peer = %peer_addr, fehler = %e, "Frame-Lesefehler");
                            break;
                        }
                        None => {
                            tracing::info!(peer = %peer_addr, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                // Kanal-Events aus dem Broadcaster
                ausgehend = naechste_ausgehende(&mut ctx.empfang) => {
                    match ausgehend {
                        Some(nachricht) => {
                            if let Err(e) = framed.send(nachricht).await {
                                tracing::warn!(peer = %peer_addr, fehler = %e, "Event-Senden fehlgeschlagen");
                                break;
                            }
                        }
                        None => {
                            // Queue wurde durch eine neuere Anmeldung desselben
                            // Benutzers ersetzt
                            tracing::info!(peer = %peer_addr, sitzung = %ctx.sitzung, "Durch neuere Verbindung ersetzt");
                            ctx.empfang = None;
                        }
                    }
                }

                // Keepalive-Ping
                _ = keepalive.tick() => {
                    ping_request_id = ping_request_id.wrapping_add(1);
                    let ping = ControlMessage::ping(ping_request_id, jetzt_ms());
                    if let Err(e) = framed.send(ping).await {
                        tracing::warn!(peer = %peer_addr, fehler = %e, "Ping-Senden fehlgeschlagen");
                        break;
                    }
                }

                // Inaktivitaets-Timeout
                _ = tokio::time::sleep_until(frist) => {
                    tracing::warn!(peer = %peer_addr, "Verbindungs-Timeout");
                    break;
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer_addr, "Shutdown-Signal – Verbindung wird getrennt");
                        let abschied = ControlMessage::error(
                            0,
                            ErrorCode::InternalError,
                            "Server wird heruntergefahren",
                        );
                        let _ = framed.send(abschied).await;
                        break;
                    }
                }
            }
        }

        dispatcher.verbindung_cleanup(&mut ctx).await;
        self.state.aktive_verbindungen.fetch_sub(1, Ordering::Relaxed);
        tracing::info!(peer = %peer_addr, "Verbindungs-Task beendet");
    }
}
