//! Waechter fuer das Sprechrecht-Zeitlimit
//!
//! Ein Client der waehrend der Aufnahme abstuerzt ohne dass die Verbindung
//! sauber abbricht, wuerde den Kanal sonst dauerhaft blockieren.

use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::dienst::Kanaldienst;

pub struct SprechrechtWaechter {
    dienst: Kanaldienst,
    max_dauer: Duration,
    intervall: Duration,
}

impl SprechrechtWaechter {
    pub fn neu(dienst: Kanaldienst, max_dauer: Duration, intervall: Duration) -> Self {
        Self {
            dienst,
            max_dauer,
            // interval() verlangt eine Periode > 0
            intervall: intervall.max(Duration::from_millis(1)),
        }
    }

    /// Prueft alle Kanaele bis das Shutdown-Signal kommt
    pub async fn starten(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            max_dauer_sek = self.max_dauer.as_secs(),
            intervall_ms = self.intervall.as_millis() as u64,
            "Sprechrecht-Waechter gestartet"
        );
        let mut takt = tokio::time::interval(self.intervall);
        takt.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = takt.tick() => {
                    let entzogen = self.dienst.abgelaufene_entziehen(self.max_dauer, Instant::now());
                    if !entzogen.is_empty() {
                        tracing::debug!(anzahl = entzogen.len(), "Abgelaufene Sprechrechte entzogen");
                    }
                }
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("Sprechrecht-Waechter beendet");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::hilfe::SammelSenke;
    use sprechfunk_core::{ChannelId, KanalEvent, Mitglied, SitzungId, UserId};
    use std::sync::Arc;

    #[tokio::test]
    async fn haengendes_sprechrecht_wird_entzogen() {
        let senke = Arc::new(SammelSenke::default());
        let dienst = Kanaldienst::neu(senke.clone());
        let cid = ChannelId::neu("channel1").unwrap();
        let a = UserId::neu("a").unwrap();
        let sitzung = SitzungId::naechste();
        dienst.beitreten(&cid, Mitglied::neu(a.clone(), "A", ""), sitzung);
        dienst.sprechrecht_anfordern(&cid, &a, sitzung).unwrap();

        let (tx, rx) = watch::channel(false);
        let waechter = SprechrechtWaechter::neu(
            dienst.clone(),
            Duration::from_millis(50),
            Duration::from_millis(10),
        );
        let handle = tokio::spawn(waechter.starten(rx));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(dienst.sprechrecht_inhaber(&cid).is_none());
        assert_eq!(
            senke.events_fuer("a"),
            vec![KanalEvent::AufnahmeGestoppt { user_id: a }]
        );

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("Waechter muss nach Shutdown enden")
            .unwrap();
    }
}
