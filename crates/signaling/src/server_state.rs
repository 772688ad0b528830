//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt alle geteilten Services und Zustands-Manager als Arc-Referenzen,
//! die sicher zwischen tokio-Tasks geteilt werden koennen.

use sprechfunk_kanal::{AudioSpeicher, Aufraeumer, Kanaldienst};
use sprechfunk_protocol::wire::DEFAULT_MAX_FRAME_SIZE;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::auth::Authentifizierer;
use crate::broadcast::EventBroadcaster;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Anzeigename des Servers
    pub server_name: String,
    /// Maximale gleichzeitige Verbindungen
    pub max_clients: u32,
    /// Keepalive-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer inaktive Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
    /// Maximale Groesse eines Control-Frames in Bytes
    pub max_frame_groesse: usize,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            server_name: "Sprechfunk".to_string(),
            max_clients: 512,
            keepalive_sek: 30,
            verbindungs_timeout_sek: 90,
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState {
    /// Server-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Kanal-Kern (Mitglieder, Sprechrecht, Audio-Verteilung)
    pub kanaele: Kanaldienst,
    /// Aufraeumen nach Verlassen und Verbindungsabbruch
    pub aufraeumer: Aufraeumer,
    /// Event-Broadcaster (Send-Queues der angemeldeten Verbindungen)
    pub broadcaster: EventBroadcaster,
    /// Auth-Kollaborateur
    pub authentifizierer: Arc<dyn Authentifizierer>,
    /// Anzahl offener TCP-Verbindungen (fuer max_clients)
    pub aktive_verbindungen: AtomicUsize,
    /// Startzeitpunkt des Servers (fuer Uptime-Berechnung)
    pub start_time: Instant,
}

impl SignalingState {
    /// Verdrahtet Broadcaster, Kanaldienst und Aufraeumer
    ///
    /// Der Broadcaster ist die `EventSenke` des Kanaldienstes.
    pub fn neu(
        config: SignalingConfig,
        speicher: Arc<dyn AudioSpeicher>,
        authentifizierer: Arc<dyn Authentifizierer>,
    ) -> Arc<Self> {
        let broadcaster = EventBroadcaster::neu();
        let kanaele = Kanaldienst::neu(Arc::new(broadcaster.clone()));
        let aufraeumer = Aufraeumer::neu(kanaele.clone(), speicher);
        Arc::new(Self {
            config: Arc::new(config),
            kanaele,
            aufraeumer,
            broadcaster,
            authentifizierer,
            aktive_verbindungen: AtomicUsize::new(0),
            start_time: Instant::now(),
        })
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn verbindungen(&self) -> usize {
        self.aktive_verbindungen.load(Ordering::Relaxed)
    }
}
