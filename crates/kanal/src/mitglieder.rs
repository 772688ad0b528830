//! Mitgliederliste eines Kanals
//!
//! Mengen-Semantik ueber die `UserId`: ein Benutzer ist hoechstens einmal
//! eingetragen. Die Reihenfolge entspricht der Beitrittsreihenfolge.

use sprechfunk_core::types::{Mitglied, SitzungId, UserId};

/// Ein Eintrag der Mitgliederliste
#[derive(Debug, Clone, PartialEq)]
pub struct MitgliedEintrag {
    pub mitglied: Mitglied,
    /// Verbindung ueber die der Benutzer zuletzt beigetreten ist
    pub sitzung: SitzungId,
}

/// Ergebnis von `Mitgliederliste::beitreten`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eintragung {
    /// Benutzer war noch nicht im Kanal
    Neu,
    /// Benutzer war bereits eingetragen; Name und Lizenz wurden aktualisiert
    Aktualisiert {
        /// Gesetzt wenn der Eintrag auf eine neue Sitzung umgebunden wurde
        alte_sitzung: Option<SitzungId>,
    },
}

#[derive(Debug, Default)]
pub struct Mitgliederliste {
    eintraege: Vec<MitgliedEintrag>,
}

impl Mitgliederliste {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Traegt ein Mitglied ein oder aktualisiert einen bestehenden Eintrag
    pub fn beitreten(&mut self, mitglied: Mitglied, sitzung: SitzungId) -> Eintragung {
        if let Some(eintrag) = self
            .eintraege
            .iter_mut()
            .find(|e| e.mitglied.user_id == mitglied.user_id)
        {
            let alte_sitzung = (eintrag.sitzung != sitzung).then_some(eintrag.sitzung);
            eintrag.mitglied = mitglied;
            eintrag.sitzung = sitzung;
            return Eintragung::Aktualisiert { alte_sitzung };
        }

        self.eintraege.push(MitgliedEintrag { mitglied, sitzung });
        Eintragung::Neu
    }

    /// Entfernt ein Mitglied
    ///
    /// Mit `Some(sitzung)` wird nur entfernt wenn der Eintrag noch zu dieser
    /// Sitzung gehoert. `None` entfernt bedingungslos.
    pub fn verlassen(
        &mut self,
        user_id: &UserId,
        sitzung: Option<SitzungId>,
    ) -> Option<MitgliedEintrag> {
        let pos = self.eintraege.iter().position(|e| {
            e.mitglied.user_id == *user_id && sitzung.map_or(true, |s| s == e.sitzung)
        })?;
        Some(self.eintraege.remove(pos))
    }

    pub fn eintrag(&self, user_id: &UserId) -> Option<&MitgliedEintrag> {
        self.eintraege.iter().find(|e| e.mitglied.user_id == *user_id)
    }

    pub fn enthaelt(&self, user_id: &UserId) -> bool {
        self.eintrag(user_id).is_some()
    }

    /// Schnappschuss in Beitrittsreihenfolge
    pub fn liste(&self) -> Vec<Mitglied> {
        self.eintraege.iter().map(|e| e.mitglied.clone()).collect()
    }

    /// Alle User-IDs ausser `ausser`
    pub fn andere<'a>(&'a self, ausser: &'a UserId) -> impl Iterator<Item = &'a UserId> + 'a {
        self.alle().filter(move |u| *u != ausser)
    }

    pub fn alle(&self) -> impl Iterator<Item = &UserId> {
        self.eintraege.iter().map(|e| &e.mitglied.user_id)
    }

    pub fn len(&self) -> usize {
        self.eintraege.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eintraege.is_empty()
    }
}
