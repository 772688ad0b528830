//! Sprechrecht (Floor) eines Kanals
//!
//! Zustandsautomat `Frei -> Belegt(halter) -> Frei`. Es gibt hoechstens
//! einen Halter; die Atomaritaet liefert die Kanal-Sperre des Aufrufers.

use sprechfunk_core::types::{SitzungId, UserId};
use std::time::{Duration, Instant};

/// Aktueller Halter des Sprechrechts
#[derive(Debug, Clone, PartialEq)]
pub struct Halter {
    pub user_id: UserId,
    pub sitzung: SitzungId,
    pub seit: Instant,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Sprechrecht {
    #[default]
    Frei,
    Belegt(Halter),
}

/// Ergebnis einer Anforderung
#[derive(Debug, Clone, PartialEq)]
pub enum Anforderung {
    Erteilt,
    /// Der Anfordernde haelt das Sprechrecht bereits
    BereitsGehalten,
    /// Ein anderer Benutzer haelt das Sprechrecht
    Belegt(UserId),
}

impl Sprechrecht {
    pub fn anfordern(&mut self, user_id: &UserId, sitzung: SitzungId, jetzt: Instant) -> Anforderung {
        match self {
            Self::Frei => {
                *self = Self::Belegt(Halter {
                    user_id: user_id.clone(),
                    sitzung,
                    seit: jetzt,
                });
                Anforderung::Erteilt
            }
            Self::Belegt(halter) if halter.user_id == *user_id => {
                halter.sitzung = sitzung;
                Anforderung::BereitsGehalten
            }
            Self::Belegt(halter) => Anforderung::Belegt(halter.user_id.clone()),
        }
    }

    /// Gibt frei wenn `user_id` der Halter ist. Gibt `false` zurueck wenn
    /// nicht (keine Zustandsaenderung).
    pub fn freigeben(&mut self, user_id: &UserId) -> bool {
        match self {
            Self::Belegt(halter) if halter.user_id == *user_id => {
                *self = Self::Frei;
                true
            }
            _ => false,
        }
    }

    /// Gibt ohne Halter-Pruefung frei und liefert den bisherigen Halter
    pub fn entziehen(&mut self) -> Option<Halter> {
        match std::mem::take(self) {
            Self::Belegt(halter) => Some(halter),
            Self::Frei => None,
        }
    }

    pub fn halter(&self) -> Option<&Halter> {
        match self {
            Self::Belegt(halter) => Some(halter),
            Self::Frei => None,
        }
    }

    pub fn inhaber(&self) -> Option<&UserId> {
        self.halter().map(|h| &h.user_id)
    }

    pub fn ist_abgelaufen(&self, max_dauer: Duration, jetzt: Instant) -> bool {
        self.halter()
            .is_some_and(|h| jetzt.saturating_duration_since(h.seit) >= max_dauer)
    }
}
