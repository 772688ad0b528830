//! Kanal-Events und Zustell-Trait
//!
//! Der Kanal-Kern erzeugt `KanalEvent`s und uebergibt sie einer
//! `EventSenke`. Die konkrete Senke (Send-Queues der Verbindungen) wird im
//! Signaling-Crate bereitgestellt.

use crate::types::{AudioRef, Mitglied, UserId};
use serde::{Deserialize, Serialize};

/// Alle Benachrichtigungen die der Server an Kanal-Mitglieder sendet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KanalEvent {
    /// Ein neues Mitglied ist dem Kanal beigetreten
    MitgliedBeigetreten(Mitglied),
    /// Ein Mitglied hat den Kanal verlassen
    MitgliedVerlassen { user_id: UserId },
    /// Ein Mitglied hat das Sprechrecht erhalten
    AufnahmeGestartet { user_id: UserId },
    /// Das Sprechrecht wurde freigegeben (regulaer, erzwungen oder Timeout)
    AufnahmeGestoppt { user_id: UserId },
    /// Eine neue Aufnahme steht zum Abspielen bereit (nie an den Urheber)
    AudioVerfuegbar { owner_id: UserId, audio: AudioRef },
    /// Bestaetigung an den Urheber dass seine Aufnahme verteilt wurde
    SendungBestaetigt { audio: AudioRef },
}

impl KanalEvent {
    /// Kurzname fuer Log-Ausgaben
    pub fn name(&self) -> &'static str {
        match self {
            Self::MitgliedBeigetreten(_) => "member-joined",
            Self::MitgliedVerlassen { .. } => "member-left",
            Self::AufnahmeGestartet { .. } => "recording-started",
            Self::AufnahmeGestoppt { .. } => "recording-stopped",
            Self::AudioVerfuegbar { .. } => "audio-available",
            Self::SendungBestaetigt { .. } => "broadcasting-ack",
        }
    }
}

/// Zustellung von Kanal-Events an einzelne Benutzer
///
/// Wird vom Kanal-Kern waehrend der Kanal-Sperre aufgerufen und darf daher
/// nicht blockieren. Zustellung ist best-effort: ein nicht verbundener
/// oder ueberlasteter Empfaenger verpasst das Event.
pub trait EventSenke: Send + Sync + 'static {
    /// Stellt ein Event an einen Benutzer zu. Gibt `false` zurueck wenn
    /// das Event verworfen wurde.
    fn zustellen(&self, empfaenger: &UserId, event: KanalEvent) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_ist_serde_kompatibel() {
        let event = KanalEvent::AufnahmeGestartet {
            user_id: UserId::neu("a").unwrap(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let decoded: KanalEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn event_namen_folgen_dem_protokoll() {
        let uid = UserId::neu("a").unwrap();
        assert_eq!(
            KanalEvent::MitgliedVerlassen { user_id: uid.clone() }.name(),
            "member-left"
        );
        assert_eq!(
            KanalEvent::AufnahmeGestoppt { user_id: uid }.name(),
            "recording-stopped"
        );
    }
}
