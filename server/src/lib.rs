//! sprechfunk-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;
pub mod http;

use anyhow::{Context, Result};
use config::ServerConfig;
use sprechfunk_kanal::{AudioSpeicher, DiskAudioSpeicher, SprechrechtWaechter};
use sprechfunk_signaling::{OffenerAuthentifizierer, SignalingServer, SignalingState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

/// Gebundene Adressen und Hintergrund-Tasks eines hochgefahrenen Servers
pub struct LaufenderServer {
    pub tcp_adresse: SocketAddr,
    pub http_adresse: SocketAddr,
    pub state: Arc<SignalingState>,
    tasks: Vec<JoinHandle<()>>,
}

impl LaufenderServer {
    /// Wartet bis alle Subsysteme nach dem Shutdown-Signal beendet sind
    pub async fn beenden(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(fehler = %e, "Subsystem-Task abgebrochen");
            }
        }
    }
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Subsysteme und laeuft bis Ctrl-C
    pub async fn starten(self) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let laufend = self.hochfahren(shutdown_rx).await?;

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");

        let _ = shutdown_tx.send(true);
        laufend.beenden().await;
        Ok(())
    }

    /// Bindet alle Sockets und startet die Subsysteme
    ///
    /// Reihenfolge:
    /// 1. Audio-Verzeichnis anlegen
    /// 2. TCP-Gateway binden (Control-Protokoll)
    /// 3. HTTP-API binden (Upload, Abfragen, Audio-Dateien)
    /// 4. Sprechrecht-Waechter starten
    pub async fn hochfahren(&self, shutdown_rx: watch::Receiver<bool>) -> Result<LaufenderServer> {
        tracing::info!(
            server_name = %self.config.server.name,
            tcp = %self.config.tcp_bind_adresse(),
            http = %self.config.http_bind_adresse(),
            "Server startet"
        );

        let audio_verzeichnis = PathBuf::from(&self.config.speicher.verzeichnis);
        tokio::fs::create_dir_all(&audio_verzeichnis)
            .await
            .with_context(|| format!("Audio-Verzeichnis '{}' nicht anlegbar", audio_verzeichnis.display()))?;
        let speicher: Arc<dyn AudioSpeicher> = Arc::new(DiskAudioSpeicher::neu(
            &audio_verzeichnis,
            self.config.speicher.oeffentliche_url.clone(),
        ));

        let state = SignalingState::neu(
            self.config.signaling(),
            Arc::clone(&speicher),
            Arc::new(OffenerAuthentifizierer),
        );

        // TCP-Gateway
        let tcp_addr: SocketAddr = self
            .config
            .tcp_bind_adresse()
            .parse()
            .context("Ungueltige TCP-Bind-Adresse")?;
        let signaling = SignalingServer::binden(Arc::clone(&state), tcp_addr)
            .await
            .with_context(|| format!("TCP-Port {tcp_addr} nicht bindbar"))?;
        let tcp_adresse = signaling.lokale_adresse()?;
        let tcp_task = {
            let rx = shutdown_rx.clone();
            tokio::spawn(async move {
                if let Err(e) = signaling.starten(rx).await {
                    tracing::error!(fehler = %e, "TCP-Gateway beendet mit Fehler");
                }
            })
        };

        // HTTP-API
        let http_state = http::HttpState {
            signaling: Arc::clone(&state),
            speicher,
            max_upload_bytes: self.config.speicher.max_upload_bytes,
        };
        let app = http::router(http_state, &audio_verzeichnis, &self.config.netzwerk.cors_origins);
        let listener = tokio::net::TcpListener::bind(self.config.http_bind_adresse())
            .await
            .with_context(|| format!("HTTP-Adresse {} nicht bindbar", self.config.http_bind_adresse()))?;
        let http_adresse = listener.local_addr()?;
        tracing::info!(adresse = %http_adresse, "HTTP-API gestartet");
        let http_task = {
            let mut rx = shutdown_rx.clone();
            tokio::spawn(async move {
                let signal = async move {
                    let _ = rx.wait_for(|s| *s).await;
                };
                if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(signal).await {
                    tracing::error!(fehler = %e, "HTTP-API beendet mit Fehler");
                }
                tracing::info!("HTTP-API gestoppt");
            })
        };

        // Waechter
        let waechter = SprechrechtWaechter::neu(
            state.kanaele.clone(),
            self.config.max_sprechdauer(),
            self.config.waechter_intervall(),
        );
        let waechter_task = tokio::spawn(waechter.starten(shutdown_rx));

        Ok(LaufenderServer {
            tcp_adresse,
            http_adresse,
            state,
            tasks: vec![tcp_task, http_task, waechter_task],
        })
    }
}
