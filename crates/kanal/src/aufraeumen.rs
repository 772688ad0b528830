//! Aufraeumen nach Verlassen oder Verbindungsabbruch
//!
//! Reihenfolge unter einer einzigen Kanal-Sperre:
//! 1. Haelt der Benutzer das Sprechrecht, wird es entzogen
//! 2. Der Benutzer wird aus der Mitgliederliste entfernt
//! 3. Ist der Kanal danach leer, wird er abgebaut (letzte Aufnahme verworfen)
//!
//! Mit Sitzung betrifft das Aufraeumen nur Eintraege dieser Sitzung. Eine
//! neuere Verbindung desselben Benutzers bleibt dadurch erhalten.

use sprechfunk_core::types::{ChannelId, SitzungId, UserId};
use sprechfunk_core::KanalEvent;
use std::sync::Arc;

use crate::dienst::Kanaldienst;
use crate::speicher::AudioSpeicher;

/// Was beim Aufraeumen passiert ist
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AufraeumErgebnis {
    pub sprechrecht_entzogen: bool,
    pub entfernt: bool,
    pub kanal_abgebaut: bool,
    /// URLs der Aufnahmen des abgebauten Kanals
    pub artefakte: Vec<String>,
}

impl Kanaldienst {
    /// Entfernt einen Benutzer aus einem Kanal (Schritte 1 bis 3)
    ///
    /// Kein Fehler wenn Kanal oder Mitglied nicht existieren.
    pub fn verlassen(
        &self,
        channel_id: &ChannelId,
        user_id: &UserId,
        sitzung: Option<SitzungId>,
    ) -> AufraeumErgebnis {
        let mut ergebnis = AufraeumErgebnis::default();
        let Some(kanal) = self.kanal(channel_id) else {
            return ergebnis;
        };
        let mut zustand = kanal.lock();
        if zustand.abgebaut {
            return ergebnis;
        }

        let gehoert_zur_sitzung = |s: SitzungId| sitzung.map_or(true, |erwartet| erwartet == s);

        // 1. Sprechrecht
        let haelt = zustand
            .sprechrecht
            .halter()
            .is_some_and(|h| h.user_id == *user_id && gehoert_zur_sitzung(h.sitzung));
        if haelt {
            zustand.sprechrecht.entziehen();
            ergebnis.sprechrecht_entzogen = true;
            tracing::info!(
                channel_id = %channel_id,
                user_id = %user_id,
                "Sprechrecht beim Verlassen entzogen"
            );
            self.an_andere(
                &zustand,
                user_id,
                KanalEvent::AufnahmeGestoppt {
                    user_id: user_id.clone(),
                },
            );
        }

        // 2. Mitgliedschaft
        if zustand.mitglieder.verlassen(user_id, sitzung).is_some() {
            ergebnis.entfernt = true;
            tracing::info!(
                channel_id = %channel_id,
                user_id = %user_id,
                mitglieder = zustand.mitglieder.len(),
                "Mitglied hat den Kanal verlassen"
            );
            self.an_alle(
                &zustand,
                KanalEvent::MitgliedVerlassen {
                    user_id: user_id.clone(),
                },
            );
        } else {
            tracing::debug!(channel_id = %channel_id, user_id = %user_id, "Kein passender Mitgliedseintrag");
        }

        // 3. Abbau
        if zustand.mitglieder.is_empty() {
            zustand.abgebaut = true;
            zustand.letztes_audio = None;
            ergebnis.kanal_abgebaut = true;
            ergebnis.artefakte = std::mem::take(&mut zustand.artefakte);
            self.inner
                .kanaele
                .remove_if(channel_id, |_, k| Arc::ptr_eq(k, &kanal));
            tracing::info!(channel_id = %channel_id, "Kanal abgebaut");
        }

        ergebnis
    }
}

/// Aufraeumer – verbindet den Kanaldienst mit dem Audio-Speicher
///
/// Nach einem Abbau werden die Aufnahmen des Kanals im Speicher verworfen.
#[derive(Clone)]
pub struct Aufraeumer {
    dienst: Kanaldienst,
    speicher: Arc<dyn AudioSpeicher>,
}

impl Aufraeumer {
    pub fn neu(dienst: Kanaldienst, speicher: Arc<dyn AudioSpeicher>) -> Self {
        Self { dienst, speicher }
    }

    /// Verbindung beendet oder Kanal explizit verlassen
    pub async fn verbindung_beendet(
        &self,
        channel_id: &ChannelId,
        user_id: &UserId,
        sitzung: Option<SitzungId>,
    ) -> AufraeumErgebnis {
        let ergebnis = self.dienst.verlassen(channel_id, user_id, sitzung);
        if ergebnis.kanal_abgebaut {
            if let Err(e) = self
                .speicher
                .kanal_verwerfen(channel_id, &ergebnis.artefakte)
                .await
            {
                tracing::warn!(channel_id = %channel_id, fehler = %e, "Aufnahmen konnten nicht verworfen werden");
            }
        }
        ergebnis
    }
}
