//! Integrationstests fuer den Kanal-Kern
//!
//! Prueft das Zusammenspiel von Mitgliedern, Sprechrecht und
//! Audio-Verteilung unter nebenlaeufigen Zugriffen.

use parking_lot::Mutex;
use sprechfunk_core::{AudioRef, ChannelId, EventSenke, KanalEvent, Mitglied, SitzungId, UserId};
use sprechfunk_kanal::Kanaldienst;
use std::sync::Arc;
use std::thread;

#[derive(Default)]
struct Protokoll {
    events: Mutex<Vec<(UserId, KanalEvent)>>,
}

impl Protokoll {
    fn fuer(&self, user: &str) -> Vec<KanalEvent> {
        self.events
            .lock()
            .iter()
            .filter(|(u, _)| u.as_str() == user)
            .map(|(_, e)| e.clone())
            .collect()
    }
}

impl EventSenke for Protokoll {
    fn zustellen(&self, empfaenger: &UserId, event: KanalEvent) -> bool {
        self.events.lock().push((empfaenger.clone(), event));
        true
    }
}

fn uid(s: &str) -> UserId {
    UserId::neu(s).unwrap()
}

fn kanal1() -> ChannelId {
    ChannelId::neu("channel1").unwrap()
}

#[test]
fn gleichzeitige_anforderungen_hoechstens_ein_halter() {
    let dienst = Kanaldienst::neu(Arc::new(Protokoll::default()));
    let teilnehmer: Vec<(UserId, SitzungId)> = (0..16)
        .map(|i| {
            let user = uid(&format!("funker-{i}"));
            let sitzung = SitzungId::naechste();
            dienst.beitreten(&kanal1(), Mitglied::neu(user.clone(), "F", ""), sitzung);
            (user, sitzung)
        })
        .collect();

    for _runde in 0..20 {
        let handles: Vec<_> = teilnehmer
            .iter()
            .cloned()
            .map(|(user, sitzung)| {
                let dienst = dienst.clone();
                thread::spawn(move || {
                    dienst
                        .sprechrecht_anfordern(&kanal1(), &user, sitzung)
                        .ok()
                        .map(|_| user)
                })
            })
            .collect();

        let gewinner: Vec<UserId> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(gewinner.len(), 1, "genau eine Anforderung darf gewinnen");
        assert_eq!(dienst.sprechrecht_inhaber(&kanal1()), Some(gewinner[0].clone()));

        dienst.sprechrecht_freigeben(&kanal1(), &gewinner[0]).unwrap();
    }
}

#[test]
fn gleichzeitiger_beitritt_und_abbau_verliert_keine_mitglieder() {
    let dienst = Kanaldienst::neu(Arc::new(Protokoll::default()));

    for runde in 0..50 {
        let sa = SitzungId::naechste();
        dienst.beitreten(&kanal1(), Mitglied::neu(uid("a"), "A", ""), sa);

        let verlasser = {
            let dienst = dienst.clone();
            thread::spawn(move || dienst.verlassen(&kanal1(), &uid("a"), Some(sa)))
        };
        let beitreter = {
            let dienst = dienst.clone();
            let b = uid(&format!("b-{runde}"));
            thread::spawn(move || {
                dienst.beitreten(&kanal1(), Mitglied::neu(b.clone(), "B", ""), SitzungId::naechste());
                b
            })
        };

        verlasser.join().unwrap();
        let b = beitreter.join().unwrap();

        // B muss in einem registrierten Kanal stehen, egal wer zuerst kam
        assert!(dienst.ist_mitglied(&kanal1(), &b));
        dienst.verlassen(&kanal1(), &b, None);
        assert_eq!(dienst.anzahl_kanaele(), 0);
    }
}

#[test]
fn szenario_zwei_funker() {
    let protokoll = Arc::new(Protokoll::default());
    let dienst = Kanaldienst::neu(protokoll.clone());
    let sa = SitzungId::naechste();
    let sb = SitzungId::naechste();

    dienst.beitreten(&kanal1(), Mitglied::neu(uid("a"), "Anna", "L-1"), sa);
    dienst.beitreten(&kanal1(), Mitglied::neu(uid("b"), "Ben", "L-2"), sb);
    let liste: Vec<_> = dienst
        .mitglieder(&kanal1())
        .into_iter()
        .map(|m| m.user_id)
        .collect();
    assert_eq!(liste, vec![uid("a"), uid("b")]);

    dienst.sprechrecht_anfordern(&kanal1(), &uid("a"), sa).unwrap();
    assert!(dienst.sprechrecht_anfordern(&kanal1(), &uid("b"), sb).is_err());
    assert_eq!(dienst.sprechrecht_inhaber(&kanal1()), Some(uid("a")));

    dienst.sprechrecht_freigeben(&kanal1(), &uid("a")).unwrap();
    dienst.sprechrecht_anfordern(&kanal1(), &uid("b"), sb).unwrap();
    dienst.sprechrecht_freigeben(&kanal1(), &uid("b")).unwrap();

    let audio = AudioRef::jetzt(uid("a"), "http://host/audio/channel1/1.m4a", Some(4.2));
    dienst.audio_veroeffentlichen(&kanal1(), audio.clone()).unwrap();

    assert!(protokoll.fuer("b").contains(&KanalEvent::AudioVerfuegbar {
        owner_id: uid("a"),
        audio: audio.clone(),
    }));
    let bei_a = protokoll.fuer("a");
    assert!(bei_a.contains(&KanalEvent::SendungBestaetigt { audio }));
    assert!(!bei_a
        .iter()
        .any(|e| matches!(e, KanalEvent::AudioVerfuegbar { .. })));
}
