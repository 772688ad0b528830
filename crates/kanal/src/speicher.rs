//! Speicher fuer hochgeladene Aufnahmen
//!
//! Das `AudioSpeicher`-Trait abstrahiert den konkreten Speicher. Der Kanal
//! referenziert Aufnahmen nur ueber ihre URL; Anlegen und Loeschen der
//! Dateien liegt allein hier.

use async_trait::async_trait;
use bytes::Bytes;
use sprechfunk_core::types::{AudioRef, ChannelId, UserId};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Dateiendung wenn der Client keine brauchbare mitliefert
pub const STANDARD_ENDUNG: &str = "m4a";

#[derive(Debug, Error)]
pub enum SpeicherError {
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    #[error("Leere Aufnahme")]
    LeereAufnahme,

    #[error("URL gehoert nicht zu diesem Speicher: {0}")]
    FremdeUrl(String),
}

/// Eine hochgeladene Aufnahme vor dem Speichern
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub channel_id: ChannelId,
    pub owner_id: UserId,
    pub daten: Bytes,
    pub dauer_sek: Option<f64>,
    /// Dateiendung aus dem Original-Dateinamen (ohne Punkt)
    pub dateiendung: Option<String>,
}

#[async_trait]
pub trait AudioSpeicher: Send + Sync + 'static {
    /// Legt die Aufnahme dauerhaft ab und liefert ihre Referenz
    async fn speichern(&self, upload: AudioUpload) -> Result<AudioRef, SpeicherError>;

    /// Loescht eine einzelne Aufnahme; eine fehlende Datei ist kein Fehler
    async fn loeschen(&self, url: &str) -> Result<(), SpeicherError>;

    /// Verwirft die Aufnahmen eines abgebauten Kanals
    ///
    /// Loescht nur Dateien dieses Speichers unter `channel_id`; andere
    /// Verweise werden uebersprungen. Fehler einzelner Dateien brechen den
    /// Vorgang nicht ab.
    async fn kanal_verwerfen(
        &self,
        channel_id: &ChannelId,
        urls: &[String],
    ) -> Result<(), SpeicherError>;
}

/// Dateisystem-Speicher
///
/// Ablage unter `<verzeichnis>/<channel>/<uuid>.<endung>`, oeffentliche URL
/// `<oeffentliche_url>/audio/<channel>/<uuid>.<endung>`.
#[derive(Debug, Clone)]
pub struct DiskAudioSpeicher {
    verzeichnis: PathBuf,
    oeffentliche_url: String,
}

impl DiskAudioSpeicher {
    pub fn neu(verzeichnis: impl Into<PathBuf>, oeffentliche_url: impl Into<String>) -> Self {
        Self {
            verzeichnis: verzeichnis.into(),
            oeffentliche_url: oeffentliche_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn verzeichnis(&self) -> &std::path::Path {
        &self.verzeichnis
    }

    fn url_praefix(&self) -> String {
        format!("{}/audio/", self.oeffentliche_url)
    }

    /// Bildet eine URL dieses Speichers auf den Dateipfad ab
    ///
    /// Lehnt fremde URLs und alles ab was aus dem Verzeichnis fuehren koennte.
    pub fn pfad_aus_url(&self, url: &str) -> Option<PathBuf> {
        self.aufloesen(url).map(|(_, pfad)| pfad)
    }

    /// Kanal und Dateipfad einer URL dieses Speichers
    fn aufloesen(&self, url: &str) -> Option<(ChannelId, PathBuf)> {
        let rest = url.strip_prefix(&self.url_praefix())?;
        let (kanal, datei) = rest.split_once('/')?;
        let kanal = ChannelId::neu(kanal).ok()?;
        let datei_ok = !datei.is_empty()
            && !datei.starts_with('.')
            && datei
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
        if !datei_ok {
            return None;
        }
        let pfad = self.verzeichnis.join(kanal.as_str()).join(datei);
        Some((kanal, pfad))
    }
}

fn endung_bereinigen(endung: Option<&str>) -> &str {
    match endung {
        Some(e) if !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()) => e,
        _ => STANDARD_ENDUNG,
    }
}

#[async_trait]
impl AudioSpeicher for DiskAudioSpeicher {
    async fn speichern(&self, upload: AudioUpload) -> Result<AudioRef, SpeicherError> {
        if upload.daten.is_empty() {
            return Err(SpeicherError::LeereAufnahme);
        }

        let endung = endung_bereinigen(upload.dateiendung.as_deref()).to_ascii_lowercase();
        let datei = format!("{}.{}", Uuid::new_v4(), endung);
        let kanal_dir = self.verzeichnis.join(upload.channel_id.as_str());
        tokio::fs::create_dir_all(&kanal_dir).await?;

        let pfad = kanal_dir.join(&datei);
        tokio::fs::write(&pfad, &upload.daten).await?;
        tracing::debug!(pfad = %pfad.display(), bytes = upload.daten.len(), "Aufnahme gespeichert");

        let url = format!("{}{}/{}", self.url_praefix(), upload.channel_id.as_str(), datei);
        Ok(AudioRef::jetzt(upload.owner_id, url, upload.dauer_sek))
    }

    async fn loeschen(&self, url: &str) -> Result<(), SpeicherError> {
        let pfad = self
            .pfad_aus_url(url)
            .ok_or_else(|| SpeicherError::FremdeUrl(url.to_string()))?;
        match tokio::fs::remove_file(&pfad).await {
            Ok(()) => {
                tracing::debug!(pfad = %pfad.display(), "Aufnahme geloescht");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn kanal_verwerfen(
        &self,
        channel_id: &ChannelId,
        urls: &[String],
    ) -> Result<(), SpeicherError> {
        let mut geloescht = 0usize;
        for url in urls {
            // Nur Dateien unter dem eigenen Kanal; Verweise auf fremde
            // Speicher oder andere Kanaele bleiben unangetastet
            match self.aufloesen(url) {
                Some((kanal, pfad)) if &kanal == channel_id => {
                    match tokio::fs::remove_file(&pfad).await {
                        Ok(()) => geloescht += 1,
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                        Err(e) => {
                            tracing::warn!(pfad = %pfad.display(), fehler = %e, "Aufnahme nicht geloescht");
                        }
                    }
                }
                _ => {
                    tracing::debug!(channel_id = %channel_id, url = %url, "Fremder Verweis beim Verwerfen uebersprungen");
                }
            }
        }

        // Nur ein leeres Verzeichnis wird entfernt; ein inzwischen neu
        // angelegter Kanal gleichen Namens behaelt seine Dateien
        let kanal_dir = self.verzeichnis.join(channel_id.as_str());
        if let Err(e) = tokio::fs::remove_dir(&kanal_dir).await {
            tracing::debug!(pfad = %kanal_dir.display(), fehler = %e, "Kanal-Verzeichnis bleibt bestehen");
        }
        tracing::debug!(channel_id = %channel_id, anzahl = geloescht, "Aufnahmen verworfen");
        Ok(())
    }
}
