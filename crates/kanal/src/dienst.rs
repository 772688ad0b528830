//! Kanaldienst
//!
//! Zentrale Stelle fuer alle Kanal-Operationen: Beitritt, Mitgliederliste,
//! Sprechrecht und Audio-Verteilung. Kanaele werden beim ersten Beitritt
//! angelegt und beim Verlassen des letzten Mitglieds abgebaut (siehe
//! `aufraeumen`).
//!
//! ## Nebenlaeufigkeit
//! - Registry: `DashMap<ChannelId, Arc<Mutex<KanalZustand>>>`
//! - Alle Mutationen eines Kanals laufen unter dessen `parking_lot::Mutex`
//! - Events werden waehrend der Sperre an die `EventSenke` uebergeben, so
//!   sieht jeder Empfaenger die Zustandsaenderungen in derselben Reihenfolge
//! - Sperr-Reihenfolge: Kanal vor Registry-Shard. Nur der Abbau in
//!   `verlassen` greift mit gehaltener Kanal-Sperre auf die Registry zu
//!   (`remove_if`). Alle anderen Pfade klonen den `Arc` aus der Registry und
//!   geben die Shard-Sperre frei, bevor sie den Kanal sperren

use dashmap::DashMap;
use parking_lot::Mutex;
use sprechfunk_core::error::{Result, SprechfunkError};
use sprechfunk_core::types::{AudioRef, ChannelId, Mitglied, SitzungId, UserId};
use sprechfunk_core::{EventSenke, KanalEvent};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::mitglieder::Eintragung;
use crate::sprechrecht::Anforderung;
use crate::zustand::{KanalZustand, Schnappschuss};

pub(crate) type KanalRef = Arc<Mutex<KanalZustand>>;

/// Ergebnis eines Beitritts
#[derive(Debug, Clone)]
pub struct BeitrittErgebnis {
    /// Benutzer war bereits Mitglied (Metadaten wurden aktualisiert)
    pub bereits_mitglied: bool,
    /// Ein von der vorherigen Sitzung gehaltenes Sprechrecht wurde entzogen
    pub sprechrecht_entzogen: bool,
    /// Kanal-Zustand direkt nach dem Beitritt
    pub schnappschuss: Schnappschuss,
}

/// Kanaldienst – Clone teilt den inneren Zustand
#[derive(Clone)]
pub struct Kanaldienst {
    pub(crate) inner: Arc<KanaldienstInner>,
}

pub(crate) struct KanaldienstInner {
    pub(crate) kanaele: DashMap<ChannelId, KanalRef>,
    senke: Arc<dyn EventSenke>,
}

impl Kanaldienst {
    pub fn neu(senke: Arc<dyn EventSenke>) -> Self {
        Self {
            inner: Arc::new(KanaldienstInner {
                kanaele: DashMap::new(),
                senke,
            }),
        }
    }

    // ---- Registry ----

    pub(crate) fn kanal(&self, channel_id: &ChannelId) -> Option<KanalRef> {
        self.inner.kanaele.get(channel_id).map(|e| e.value().clone())
    }

    fn kanal_oder_neu(&self, channel_id: &ChannelId) -> KanalRef {
        self.inner
            .kanaele
            .entry(channel_id.clone())
            .or_insert_with(|| {
                tracing::info!(channel_id = %channel_id, "Kanal angelegt");
                Arc::new(Mutex::new(KanalZustand::neu(channel_id.clone())))
            })
            .value()
            .clone()
    }

    /// Alle aktuell registrierten Kanaele (Arcs ausserhalb der Registry-Sperre)
    pub(crate) fn alle_kanaele(&self) -> Vec<KanalRef> {
        self.inner
            .kanaele
            .iter()
            .map(|e| e.value().clone())
            .collect()
    }

    pub fn anzahl_kanaele(&self) -> usize {
        self.inner.kanaele.len()
    }

    // ---- Zustellung ----

    pub(crate) fn zustellen(&self, empfaenger: &UserId, event: KanalEvent) {
        let name = event.name();
        if !self.inner.senke.zustellen(empfaenger, event) {
            tracing::debug!(empfaenger = %empfaenger, event = name, "Event nicht zugestellt");
        }
    }

    /// Sendet an alle Mitglieder ausser `ausser`
    pub(crate) fn an_andere(&self, zustand: &KanalZustand, ausser: &UserId, event: KanalEvent) {
        for empfaenger in zustand.mitglieder.andere(ausser) {
            self.zustellen(empfaenger, event.clone());
        }
    }

    pub(crate) fn an_alle(&self, zustand: &KanalZustand, event: KanalEvent) {
        for empfaenger in zustand.mitglieder.alle() {
            self.zustellen(empfaenger, event.clone());
        }
    }

    // ---- Mitglieder ----

    /// Tritt einem Kanal bei (legt ihn bei Bedarf an)
    ///
    /// Idempotent: ein bereits eingetragener Benutzer wird aktualisiert und
    /// nicht erneut angekuendigt. Kommt der Beitritt ueber eine neue Sitzung
    /// und haelt die alte Sitzung noch das Sprechrecht, wird es entzogen.
    pub fn beitreten(
        &self,
        channel_id: &ChannelId,
        mitglied: Mitglied,
        sitzung: SitzungId,
    ) -> BeitrittErgebnis {
        loop {
            let kanal = self.kanal_oder_neu(channel_id);
            let mut zustand = kanal.lock();
            if zustand.abgebaut {
                // Kanal wurde zwischen Nachschlagen und Sperren abgebaut
                continue;
            }

            let user_id = mitglied.user_id.clone();
            let mut sprechrecht_entzogen = false;
            let bereits_mitglied = match zustand.mitglieder.beitreten(mitglied.clone(), sitzung) {
                Eintragung::Neu => {
                    tracing::info!(
                        channel_id = %channel_id,
                        user_id = %user_id,
                        mitglieder = zustand.mitglieder.len(),
                        "Mitglied beigetreten"
                    );
                    self.an_andere(&zustand, &user_id, KanalEvent::MitgliedBeigetreten(mitglied));
                    false
                }
                Eintragung::Aktualisiert { alte_sitzung } => {
                    tracing::debug!(channel_id = %channel_id, user_id = %user_id, "Bereits Mitglied");
                    let alte_sitzung_haelt = alte_sitzung.is_some_and(|alt| {
                        zustand
                            .sprechrecht
                            .halter()
                            .is_some_and(|h| h.user_id == user_id && h.sitzung == alt)
                    });
                    if alte_sitzung_haelt {
                        zustand.sprechrecht.entziehen();
                        sprechrecht_entzogen = true;
                        tracing::info!(
                            channel_id = %channel_id,
                            user_id = %user_id,
                            "Sprechrecht der vorherigen Sitzung entzogen"
                        );
                        self.an_andere(
                            &zustand,
                            &user_id,
                            KanalEvent::AufnahmeGestoppt {
                                user_id: user_id.clone(),
                            },
                        );
                    }
                    true
                }
            };

            return BeitrittErgebnis {
                bereits_mitglied,
                sprechrecht_entzogen,
                schnappschuss: zustand.schnappschuss(),
            };
        }
    }

    /// Mitglieder in Beitrittsreihenfolge; leer fuer unbekannte Kanaele
    pub fn mitglieder(&self, channel_id: &ChannelId) -> Vec<Mitglied> {
        self.schnappschuss(channel_id)
            .map(|s| s.mitglieder)
            .unwrap_or_default()
    }

    pub fn schnappschuss(&self, channel_id: &ChannelId) -> Option<Schnappschuss> {
        let kanal = self.kanal(channel_id)?;
        let zustand = kanal.lock();
        (!zustand.abgebaut).then(|| zustand.schnappschuss())
    }

    pub fn ist_mitglied(&self, channel_id: &ChannelId, user_id: &UserId) -> bool {
        self.kanal(channel_id).is_some_and(|kanal| {
            let zustand = kanal.lock();
            !zustand.abgebaut && zustand.mitglieder.enthaelt(user_id)
        })
    }

    // ---- Sprechrecht ----

    /// Fordert das Sprechrecht an
    ///
    /// Gibt `Ok(true)` zurueck wenn der Benutzer es bereits hielt (kein
    /// erneutes Event). Nur die aktuelle Sitzung eines Mitglieds darf
    /// anfordern.
    pub fn sprechrecht_anfordern(
        &self,
        channel_id: &ChannelId,
        user_id: &UserId,
        sitzung: SitzungId,
    ) -> Result<bool> {
        let nicht_im_kanal = || SprechfunkError::NichtImKanal {
            user_id: user_id.clone(),
            channel_id: channel_id.clone(),
        };

        let kanal = self.kanal(channel_id).ok_or_else(nicht_im_kanal)?;
        let mut zustand = kanal.lock();
        let ist_aktuelle_sitzung = zustand
            .mitglieder
            .eintrag(user_id)
            .is_some_and(|e| e.sitzung == sitzung);
        if zustand.abgebaut || !ist_aktuelle_sitzung {
            return Err(nicht_im_kanal());
        }

        match zustand.sprechrecht.anfordern(user_id, sitzung, Instant::now()) {
            Anforderung::Erteilt => {
                tracing::info!(channel_id = %channel_id, user_id = %user_id, "Sprechrecht erteilt");
                self.an_andere(
                    &zustand,
                    user_id,
                    KanalEvent::AufnahmeGestartet {
                        user_id: user_id.clone(),
                    },
                );
                Ok(false)
            }
            Anforderung::BereitsGehalten => {
                tracing::debug!(channel_id = %channel_id, user_id = %user_id, "Sprechrecht bereits gehalten");
                Ok(true)
            }
            Anforderung::Belegt(inhaber) => {
                tracing::debug!(
                    channel_id = %channel_id,
                    user_id = %user_id,
                    inhaber = %inhaber,
                    "Sprechrecht belegt, Anforderung abgewiesen"
                );
                Err(SprechfunkError::SprechrechtBelegt { inhaber })
            }
        }
    }

    /// Gibt das Sprechrecht frei
    ///
    /// `Err(NichtInhaber)` wenn `user_id` das Sprechrecht nicht haelt; der
    /// Zustand bleibt dann unveraendert.
    pub fn sprechrecht_freigeben(&self, channel_id: &ChannelId, user_id: &UserId) -> Result<()> {
        let nicht_inhaber = || SprechfunkError::NichtInhaber(user_id.clone());

        let kanal = self.kanal(channel_id).ok_or_else(nicht_inhaber)?;
        let mut zustand = kanal.lock();
        if zustand.abgebaut || !zustand.sprechrecht.freigeben(user_id) {
            return Err(nicht_inhaber());
        }

        tracing::info!(channel_id = %channel_id, user_id = %user_id, "Sprechrecht freigegeben");
        self.an_andere(
            &zustand,
            user_id,
            KanalEvent::AufnahmeGestoppt {
                user_id: user_id.clone(),
            },
        );
        Ok(())
    }

    /// Entzieht das Sprechrecht ohne Halter-Pruefung
    ///
    /// Gibt den bisherigen Halter zurueck, `None` wenn es frei war.
    pub fn sprechrecht_entziehen(&self, channel_id: &ChannelId) -> Option<UserId> {
        let kanal = self.kanal(channel_id)?;
        let mut zustand = kanal.lock();
        if zustand.abgebaut {
            return None;
        }
        let halter = zustand.sprechrecht.entziehen()?;
        tracing::info!(channel_id = %channel_id, user_id = %halter.user_id, "Sprechrecht entzogen");
        self.an_andere(
            &zustand,
            &halter.user_id,
            KanalEvent::AufnahmeGestoppt {
                user_id: halter.user_id.clone(),
            },
        );
        Some(halter.user_id)
    }

    pub fn sprechrecht_inhaber(&self, channel_id: &ChannelId) -> Option<UserId> {
        self.schnappschuss(channel_id)
            .and_then(|s| s.sprechrecht_inhaber)
    }

    /// Entzieht jedes Sprechrecht das laenger als `max_dauer` gehalten wird
    ///
    /// `recording-stopped` geht dabei an alle Mitglieder einschliesslich des
    /// Halters, damit dessen Client die lokale Aufnahme beendet.
    pub fn abgelaufene_entziehen(
        &self,
        max_dauer: Duration,
        jetzt: Instant,
    ) -> Vec<(ChannelId, UserId)> {
        let mut entzogen = Vec::new();
        for kanal in self.alle_kanaele() {
            let mut zustand = kanal.lock();
            if zustand.abgebaut || !zustand.sprechrecht.ist_abgelaufen(max_dauer, jetzt) {
                continue;
            }
            if let Some(halter) = zustand.sprechrecht.entziehen() {
                tracing::warn!(
                    channel_id = %zustand.channel_id,
                    user_id = %halter.user_id,
                    gehalten_ms = jetzt.saturating_duration_since(halter.seit).as_millis() as u64,
                    "Sprechrecht nach Zeitlimit entzogen"
                );
                self.an_alle(
                    &zustand,
                    KanalEvent::AufnahmeGestoppt {
                        user_id: halter.user_id.clone(),
                    },
                );
                entzogen.push((zustand.channel_id.clone(), halter.user_id));
            }
        }
        entzogen
    }

    // ---- Audio ----

    /// Verteilt eine hochgeladene Aufnahme
    ///
    /// Alle Mitglieder ausser dem Urheber erhalten `audio-available`, der
    /// Urheber `broadcasting-ack`. Haelt der Urheber noch das Sprechrecht,
    /// wird es vorher in derselben Sperre freigegeben. Gibt zurueck ob dabei
    /// freigegeben wurde.
    pub fn audio_veroeffentlichen(&self, channel_id: &ChannelId, audio: AudioRef) -> Result<bool> {
        let kanal = self
            .kanal(channel_id)
            .ok_or_else(|| SprechfunkError::KanalNichtGefunden(channel_id.clone()))?;
        let mut zustand = kanal.lock();
        if zustand.abgebaut {
            return Err(SprechfunkError::KanalNichtGefunden(channel_id.clone()));
        }

        let owner_id = audio.owner_id.clone();
        if !zustand.mitglieder.enthaelt(&owner_id) {
            return Err(SprechfunkError::NichtImKanal {
                user_id: owner_id,
                channel_id: channel_id.clone(),
            });
        }

        let implizit_freigegeben = zustand.sprechrecht.freigeben(&owner_id);
        if implizit_freigegeben {
            tracing::debug!(
                channel_id = %channel_id,
                user_id = %owner_id,
                "Sprechrecht mit Veroeffentlichung freigegeben"
            );
            self.an_andere(
                &zustand,
                &owner_id,
                KanalEvent::AufnahmeGestoppt {
                    user_id: owner_id.clone(),
                },
            );
        }

        zustand.letztes_audio = Some(audio.clone());
        zustand.artefakte.push(audio.url.clone());

        tracing::info!(
            channel_id = %channel_id,
            user_id = %owner_id,
            url = %audio.url,
            empfaenger = zustand.mitglieder.len().saturating_sub(1),
            "Aufnahme verteilt"
        );
        self.an_andere(
            &zustand,
            &owner_id,
            KanalEvent::AudioVerfuegbar {
                owner_id: owner_id.clone(),
                audio: audio.clone(),
            },
        );
        self.zustellen(&owner_id, KanalEvent::SendungBestaetigt { audio });

        Ok(implizit_freigegeben)
    }
}
