//! sprechfunk-kanal – Kanal-Koordination
//!
//! Haelt pro Kanal den Zustand "wer ist da", "wer hat das Sprechrecht" und
//! "welche Aufnahme lief zuletzt". Alle Mutationen eines Kanals laufen unter
//! einer Kanal-Sperre; Benachrichtigungen werden waehrend der Sperre an die
//! `EventSenke` uebergeben.
//!
//! ## Module
//! - `mitglieder`  – Mitgliederliste (idempotent, Beitrittsreihenfolge)
//! - `sprechrecht` – Zustandsautomat Frei/Belegt
//! - `zustand`     – Kanal-Zustand und Schnappschuss
//! - `dienst`      – Kanaldienst (Beitritt, Sprechrecht, Audio-Verteilung)
//! - `aufraeumen`  – Aufraeumen nach Verlassen oder Verbindungsabbruch
//! - `waechter`    – Zeitlimit fuer gehaltenes Sprechrecht
//! - `speicher`    – Speicher fuer hochgeladene Aufnahmen

pub mod aufraeumen;
pub mod dienst;
pub mod mitglieder;
pub mod speicher;
pub mod sprechrecht;
pub mod waechter;
pub mod zustand;

pub use aufraeumen::{AufraeumErgebnis, Aufraeumer};
pub use dienst::{BeitrittErgebnis, Kanaldienst};
pub use speicher::{AudioSpeicher, AudioUpload, DiskAudioSpeicher, SpeicherError};
pub use sprechrecht::Sprechrecht;
pub use waechter::SprechrechtWaechter;
pub use zustand::Schnappschuss;

#[cfg(test)]
mod tests;
