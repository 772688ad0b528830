//! Event-Broadcaster – Stellt Nachrichten an angemeldete Clients zu
//!
//! Der EventBroadcaster verwaltet die Send-Queues aller angemeldeten
//! Verbindungen, indiziert nach UserId. Pro Benutzer gibt es genau eine
//! aktive Queue: meldet sich derselbe Benutzer ueber eine neue Verbindung
//! an, ersetzt deren Queue die alte.
//!
//! Als `EventSenke` wird der Broadcaster vom Kanal-Kern waehrend der
//! Kanal-Sperre aufgerufen. Deshalb wird ausschliesslich mit `try_send`
//! eingereiht; eine volle Queue verwirft die Nachricht.

use dashmap::DashMap;
use sprechfunk_core::types::{SitzungId, UserId};
use sprechfunk_core::{EventSenke, KanalEvent};
use sprechfunk_protocol::control::ControlMessage;
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Groesse der Send-Queue pro Client
pub const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer angemeldeten Verbindung
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub user_id: UserId,
    pub sitzung: SitzungId,
    pub tx: mpsc::Sender<ControlMessage>,
}

impl ClientSender {
    /// Sendet eine Nachricht nicht-blockierend an den Client
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: ControlMessage) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(user_id = %self.user_id, sitzung = %self.sitzung, "Send-Queue voll – Nachricht verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(user_id = %self.user_id, "Send-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EventBroadcaster
// ---------------------------------------------------------------------------

/// Zentraler Event-Broadcaster fuer alle angemeldeten Clients
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct EventBroadcaster {
    inner: Arc<EventBroadcasterInner>,
}

struct EventBroadcasterInner {
    /// Client-Sender, indiziert nach UserId
    clients: DashMap<UserId, ClientSender>,
}

impl EventBroadcaster {
    /// Erstellt einen neuen EventBroadcaster
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(EventBroadcasterInner {
                clients: DashMap::new(),
            }),
        }
    }

    /// Registriert eine angemeldete Verbindung und gibt ihre Empfangs-Queue zurueck
    ///
    /// Eine bestehende Queue desselben Benutzers wird ersetzt; der alte
    /// Empfaenger sieht danach das Queue-Ende.
    pub fn client_registrieren(
        &self,
        user_id: UserId,
        sitzung: SitzungId,
    ) -> mpsc::Receiver<ControlMessage> {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        let sender = ClientSender {
            user_id: user_id.clone(),
            sitzung,
            tx,
        };
        if let Some(alt) = self.inner.clients.insert(user_id.clone(), sender) {
            tracing::info!(
                user_id = %user_id,
                alte_sitzung = %alt.sitzung,
                neue_sitzung = %sitzung,
                "Neue Verbindung ersetzt bestehende Send-Queue"
            );
        } else {
            tracing::debug!(user_id = %user_id, sitzung = %sitzung, "Client im Broadcaster registriert");
        }
        rx
    }

    /// Entfernt die Queue einer Verbindung
    ///
    /// Nur wenn sie noch zu `sitzung` gehoert; die Queue einer neueren
    /// Verbindung desselben Benutzers bleibt bestehen.
    pub fn client_entfernen(&self, user_id: &UserId, sitzung: SitzungId) -> bool {
        let entfernt = self
            .inner
            .clients
            .remove_if(user_id, |_, sender| sender.sitzung == sitzung)
            .is_some();
        if entfernt {
            tracing::debug!(user_id = %user_id, sitzung = %sitzung, "Client aus Broadcaster entfernt");
        }
        entfernt
    }

    /// Sendet eine Nachricht an einen einzelnen Client
    ///
    /// Gibt `true` zurueck wenn der Client gefunden und die Nachricht eingereiht wurde.
    pub fn an_user_senden(&self, user_id: &UserId, nachricht: ControlMessage) -> bool {
        match self.inner.clients.get(user_id) {
            Some(sender) => sender.senden(nachricht),
            None => {
                tracing::debug!(user_id = %user_id, "Senden an nicht verbundenen Client");
                false
            }
        }
    }

    /// Gibt die Anzahl der registrierten Clients zurueck
    pub fn client_anzahl(&self) -> usize {
        self.inner.clients.len()
    }

    /// Prueft ob ein Client registriert ist
    pub fn ist_registriert(&self, user_id: &UserId) -> bool {
        self.inner.clients.contains_key(user_id)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::neu()
    }
}

impl EventSenke for EventBroadcaster {
    fn zustellen(&self, empfaenger: &UserId, event: KanalEvent) -> bool {
        self.an_user_senden(empfaenger, ControlMessage::benachrichtigung(event))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use sprechfunk_protocol::control::{ControlPayload, BENACHRICHTIGUNG_ID};

    fn uid(s: &str) -> UserId {
        UserId::neu(s).unwrap()
    }

    #[tokio::test]
    async fn client_registrieren_und_senden() {
        let broadcaster = EventBroadcaster::neu();
        let mut rx = broadcaster.client_registrieren(uid("a"), SitzungId::naechste());
        assert!(broadcaster.ist_registriert(&uid("a")));

        assert!(broadcaster.an_user_senden(&uid("a"), ControlMessage::ping(1, 12345)));
        let empfangen = rx.try_recv().expect("Nachricht muss vorhanden sein");
        assert_eq!(empfangen.request_id, 1);
    }

    #[tokio::test]
    async fn kanal_event_wird_als_benachrichtigung_zugestellt() {
        let broadcaster = EventBroadcaster::neu();
        let mut rx = broadcaster.client_registrieren(uid("b"), SitzungId::naechste());

        let zugestellt = broadcaster.zustellen(
            &uid("b"),
            KanalEvent::AufnahmeGestartet { user_id: uid("a") },
        );
        assert!(zugestellt);

        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.request_id, BENACHRICHTIGUNG_ID);
        assert!(matches!(msg.payload, ControlPayload::RecordingStarted(ref e) if e.user_id == uid("a")));
    }

    #[test]
    fn zustellen_an_unbekannten_client_schlaegt_fehl() {
        let broadcaster = EventBroadcaster::neu();
        assert!(!broadcaster.zustellen(&uid("x"), KanalEvent::MitgliedVerlassen { user_id: uid("y") }));
    }

    #[tokio::test]
    async fn volle_queue_verwirft() {
        let broadcaster = EventBroadcaster::neu();
        let _rx = broadcaster.client_registrieren(uid("a"), SitzungId::naechste());
        for i in 0..SEND_QUEUE_GROESSE as u32 {
            assert!(broadcaster.an_user_senden(&uid("a"), ControlMessage::ping(i, 0)));
        }
        assert!(!broadcaster.an_user_senden(&uid("a"), ControlMessage::ping(999, 0)));
    }

    #[tokio::test]
    async fn neue_sitzung_ersetzt_alte_queue() {
        let broadcaster = EventBroadcaster::neu();
        let alt = SitzungId::naechste();
        let neu = SitzungId::naechste();
        let mut rx_alt = broadcaster.client_registrieren(uid("a"), alt);
        let mut rx_neu = broadcaster.client_registrieren(uid("a"), neu);
        assert_eq!(broadcaster.client_anzahl(), 1);

        broadcaster.an_user_senden(&uid("a"), ControlMessage::ping(5, 0));
        assert!(rx_neu.try_recv().is_ok());
        // Alter Sender wurde verworfen -> Queue geschlossen
        assert!(rx_alt.recv().await.is_none());

        // Abbau der alten Sitzung darf die neue nicht entfernen
        assert!(!broadcaster.client_entfernen(&uid("a"), alt));
        assert!(broadcaster.ist_registriert(&uid("a")));
        assert!(broadcaster.client_entfernen(&uid("a"), neu));
        assert!(!broadcaster.ist_registriert(&uid("a")));
    }
}
