//! Gemeinsame Test-Hilfen

use parking_lot::Mutex;
use sprechfunk_core::{EventSenke, KanalEvent, UserId};

/// Senke die alle zugestellten Events in Reihenfolge sammelt
#[derive(Default)]
pub(crate) struct SammelSenke {
    events: Mutex<Vec<(UserId, KanalEvent)>>,
}

impl SammelSenke {
    pub(crate) fn events_fuer(&self, user: &str) -> Vec<KanalEvent> {
        self.events
            .lock()
            .iter()
            .filter(|(u, _)| u.as_str() == user)
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub(crate) fn alle(&self) -> Vec<(UserId, KanalEvent)> {
        self.events.lock().clone()
    }

    pub(crate) fn leeren(&self) {
        self.events.lock().clear();
    }
}

impl EventSenke for SammelSenke {
    fn zustellen(&self, empfaenger: &UserId, event: KanalEvent) -> bool {
        self.events.lock().push((empfaenger.clone(), event));
        true
    }
}
