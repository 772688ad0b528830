//! Zustand eines einzelnen Kanals

use serde::Serialize;
use sprechfunk_core::types::{AudioRef, ChannelId, Mitglied, UserId};

use crate::mitglieder::Mitgliederliste;
use crate::sprechrecht::Sprechrecht;

/// Veraenderlicher Zustand eines Kanals (immer unter der Kanal-Sperre)
#[derive(Debug)]
pub struct KanalZustand {
    pub channel_id: ChannelId,
    pub mitglieder: Mitgliederliste,
    pub sprechrecht: Sprechrecht,
    pub letztes_audio: Option<AudioRef>,
    /// URLs aller in diesem Kanal veroeffentlichten Aufnahmen
    pub artefakte: Vec<String>,
    /// Gesetzt sobald der Kanal aus der Registry entfernt wurde. Wer den
    /// Zustand danach noch sperrt, muss neu nachschlagen.
    pub abgebaut: bool,
}

impl KanalZustand {
    pub fn neu(channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            mitglieder: Mitgliederliste::neu(),
            sprechrecht: Sprechrecht::Frei,
            letztes_audio: None,
            artefakte: Vec::new(),
            abgebaut: false,
        }
    }

    pub fn schnappschuss(&self) -> Schnappschuss {
        Schnappschuss {
            channel_id: self.channel_id.clone(),
            mitglieder: self.mitglieder.liste(),
            sprechrecht_inhaber: self.sprechrecht.inhaber().cloned(),
            letztes_audio: self.letztes_audio.clone(),
        }
    }
}

/// Konsistente Sicht auf einen Kanal zu einem Zeitpunkt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schnappschuss {
    pub channel_id: ChannelId,
    pub mitglieder: Vec<Mitglied>,
    pub sprechrecht_inhaber: Option<UserId>,
    pub letztes_audio: Option<AudioRef>,
}

impl Schnappschuss {
    /// Sicht auf einen (noch) nicht existierenden Kanal
    pub fn leer(channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            mitglieder: Vec::new(),
            sprechrecht_inhaber: None,
            letztes_audio: None,
        }
    }
}
