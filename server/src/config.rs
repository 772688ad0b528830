//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use serde::{Deserialize, Serialize};
use sprechfunk_protocol::wire::DEFAULT_MAX_FRAME_SIZE;
use sprechfunk_signaling::SignalingConfig;
use std::time::Duration;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Keepalive und Timeouts der Echtzeit-Verbindungen
    pub verbindung: VerbindungsEinstellungen,
    /// Sprechrecht-Einstellungen
    pub kanal: KanalEinstellungen,
    /// Ablage der Aufnahmen
    pub speicher: SpeicherEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
    /// Maximale Anzahl gleichzeitiger Clients
    pub max_clients: u32,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Sprechfunk Server".into(),
            max_clients: 512,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer TCP und HTTP
    pub bind_adresse: String,
    /// Port fuer das Control-Protokoll
    pub tcp_port: u16,
    /// Port fuer die HTTP-API und die Audio-Dateien
    pub http_port: u16,
    /// CORS-Origins fuer HTTP (leer = alle erlaubt)
    pub cors_origins: Vec<String>,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            tcp_port: 9987,
            http_port: 8080,
            cors_origins: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerbindungsEinstellungen {
    pub keepalive_sek: u64,
    pub verbindungs_timeout_sek: u64,
    /// Maximale Groesse eines Control-Frames in Bytes
    pub max_frame_groesse: usize,
}

impl Default for VerbindungsEinstellungen {
    fn default() -> Self {
        Self {
            keepalive_sek: 30,
            verbindungs_timeout_sek: 90,
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Sprechrecht-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KanalEinstellungen {
    /// Laengste Sprechdauer bevor der Waechter das Sprechrecht entzieht
    pub max_sprechdauer_sek: u64,
    /// Pruefintervall des Waechters
    pub waechter_intervall_ms: u64,
}

impl Default for KanalEinstellungen {
    fn default() -> Self {
        Self {
            max_sprechdauer_sek: 60,
            waechter_intervall_ms: 1000,
        }
    }
}

/// Ablage der Aufnahmen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeicherEinstellungen {
    /// Wurzelverzeichnis der Audio-Dateien
    pub verzeichnis: String,
    /// Basis-URL unter der `/audio/...` von aussen erreichbar ist
    pub oeffentliche_url: String,
    /// Obergrenze fuer einen Upload in Bytes
    pub max_upload_bytes: usize,
}

impl Default for SpeicherEinstellungen {
    fn default() -> Self {
        Self {
            verzeichnis: "data/audio".into(),
            oeffentliche_url: "http://127.0.0.1:8080".into(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Gibt die vollstaendige Bind-Adresse fuer TCP zurueck
    pub fn tcp_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.tcp_port)
    }

    /// Gibt die vollstaendige Bind-Adresse fuer HTTP zurueck
    pub fn http_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.http_port)
    }

    /// Einstellungen fuer den TCP-Gateway
    pub fn signaling(&self) -> SignalingConfig {
        SignalingConfig {
            server_name: self.server.name.clone(),
            max_clients: self.server.max_clients,
            keepalive_sek: self.verbindung.keepalive_sek,
            verbindungs_timeout_sek: self.verbindung.verbindungs_timeout_sek,
            max_frame_groesse: self.verbindung.max_frame_groesse,
        }
    }

    pub fn max_sprechdauer(&self) -> Duration {
        Duration::from_secs(self.kanal.max_sprechdauer_sek.max(1))
    }

    pub fn waechter_intervall(&self) -> Duration {
        Duration::from_millis(self.kanal.waechter_intervall_ms.max(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.server.max_clients, 512);
        assert_eq!(cfg.netzwerk.tcp_port, 9987);
        assert_eq!(cfg.netzwerk.http_port, 8080);
        assert_eq!(cfg.kanal.max_sprechdauer_sek, 60);
        assert_eq!(cfg.speicher.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn bind_adressen() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.tcp_bind_adresse(), "0.0.0.0:9987");
        assert_eq!(cfg.http_bind_adresse(), "0.0.0.0:8080");
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [server]
            name = "Leitstelle Nord"
            max_clients = 100

            [netzwerk]
            tcp_port = 10000

            [kanal]
            max_sprechdauer_sek = 30

            [speicher]
            verzeichnis = "/var/lib/sprechfunk"
        "#;
        let cfg: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.server.name, "Leitstelle Nord");
        assert_eq!(cfg.server.max_clients, 100);
        assert_eq!(cfg.netzwerk.tcp_port, 10000);
        assert_eq!(cfg.max_sprechdauer(), Duration::from_secs(30));
        assert_eq!(cfg.speicher.verzeichnis, "/var/lib/sprechfunk");
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.netzwerk.http_port, 8080);
        assert_eq!(cfg.kanal.waechter_intervall_ms, 1000);
        assert_eq!(cfg.verbindung.keepalive_sek, 30);
    }

    #[test]
    fn signaling_config_uebernimmt_werte() {
        let mut cfg = ServerConfig::default();
        cfg.server.max_clients = 3;
        cfg.verbindung.verbindungs_timeout_sek = 15;
        let sig = cfg.signaling();
        assert_eq!(sig.max_clients, 3);
        assert_eq!(sig.verbindungs_timeout_sek, 15);
        assert_eq!(sig.server_name, "Sprechfunk Server");
    }

    #[test]
    fn fehlende_datei_liefert_standardwerte() {
        let cfg = ServerConfig::laden("/nicht/vorhanden/config.toml").unwrap();
        assert_eq!(cfg.netzwerk.tcp_port, 9987);
    }

    #[test]
    fn kaputte_datei_ist_fehler() {
        let dir = tempfile::tempdir().unwrap();
        let pfad = dir.path().join("config.toml");
        std::fs::write(&pfad, "[server\nname = ").unwrap();
        assert!(ServerConfig::laden(pfad.to_str().unwrap()).is_err());
    }
}
