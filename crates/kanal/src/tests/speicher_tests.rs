//! Unit-Tests fuer den DiskAudioSpeicher

use bytes::Bytes;
use sprechfunk_core::{ChannelId, UserId};

use crate::speicher::{AudioSpeicher, AudioUpload, DiskAudioSpeicher, SpeicherError};

fn upload(daten: &'static [u8], endung: Option<&str>) -> AudioUpload {
    AudioUpload {
        channel_id: ChannelId::neu("channel1").unwrap(),
        owner_id: UserId::neu("a").unwrap(),
        daten: Bytes::from_static(daten),
        dauer_sek: Some(2.5),
        dateiendung: endung.map(String::from),
    }
}

#[tokio::test]
async fn test_speichern_und_url() {
    let dir = tempfile::tempdir().unwrap();
    let speicher = DiskAudioSpeicher::neu(dir.path(), "http://127.0.0.1:8080/");

    let audio = speicher.speichern(upload(b"RIFF", Some("m4a"))).await.unwrap();
    assert!(audio.url.starts_with("http://127.0.0.1:8080/audio/channel1/"));
    assert!(audio.url.ends_with(".m4a"));
    assert_eq!(audio.duration_secs, Some(2.5));
    assert_eq!(audio.owner_id.as_str(), "a");

    let pfad = speicher.pfad_aus_url(&audio.url).unwrap();
    assert_eq!(tokio::fs::read(&pfad).await.unwrap(), b"RIFF");
}

#[tokio::test]
async fn test_ungueltige_endung_wird_ersetzt() {
    let dir = tempfile::tempdir().unwrap();
    let speicher = DiskAudioSpeicher::neu(dir.path(), "http://host");
    let audio = speicher
        .speichern(upload(b"x", Some("../../sh")))
        .await
        .unwrap();
    assert!(audio.url.ends_with(".m4a"));
}

#[tokio::test]
async fn test_leere_aufnahme_abgelehnt() {
    let dir = tempfile::tempdir().unwrap();
    let speicher = DiskAudioSpeicher::neu(dir.path(), "http://host");
    let fehler = speicher.speichern(upload(b"", None)).await.unwrap_err();
    assert!(matches!(fehler, SpeicherError::LeereAufnahme));
}

#[tokio::test]
async fn test_loeschen_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let speicher = DiskAudioSpeicher::neu(dir.path(), "http://host");
    let audio = speicher.speichern(upload(b"x", None)).await.unwrap();
    speicher.loeschen(&audio.url).await.unwrap();
    speicher.loeschen(&audio.url).await.unwrap();
    assert!(!speicher.pfad_aus_url(&audio.url).unwrap().exists());
}

#[test]
fn test_pfad_aus_url_lehnt_ausbruch_ab() {
    let speicher = DiskAudioSpeicher::neu("/tmp/audio", "http://host");
    assert!(speicher.pfad_aus_url("http://host/audio/channel1/a.m4a").is_some());
    assert!(speicher.pfad_aus_url("http://host/audio/../etc/passwd").is_none());
    assert!(speicher.pfad_aus_url("http://host/audio/channel1/..").is_none());
    assert!(speicher.pfad_aus_url("http://host/audio/channel1/a/b.m4a").is_none());
    assert!(speicher.pfad_aus_url("http://andere/audio/channel1/a.m4a").is_none());
}

#[tokio::test]
async fn test_loeschen_fremder_url() {
    let dir = tempfile::tempdir().unwrap();
    let speicher = DiskAudioSpeicher::neu(dir.path(), "http://host");
    let fehler = speicher.loeschen("http://evil/x").await.unwrap_err();
    assert!(matches!(fehler, SpeicherError::FremdeUrl(_)));
}

#[tokio::test]
async fn test_kanal_verwerfen_behaelt_fremde_dateien() {
    let dir = tempfile::tempdir().unwrap();
    let speicher = DiskAudioSpeicher::neu(dir.path(), "http://host");
    let alt = speicher.speichern(upload(b"alt", None)).await.unwrap();
    let neu = speicher.speichern(upload(b"neu", None)).await.unwrap();

    let cid = ChannelId::neu("channel1").unwrap();
    speicher.kanal_verwerfen(&cid, &[alt.url.clone()]).await.unwrap();

    assert!(!speicher.pfad_aus_url(&alt.url).unwrap().exists());
    assert!(speicher.pfad_aus_url(&neu.url).unwrap().exists());
}

#[tokio::test]
async fn test_kanal_verwerfen_ueberspringt_fremde_urls() {
    let dir = tempfile::tempdir().unwrap();
    let speicher = DiskAudioSpeicher::neu(dir.path(), "http://host");
    let erste = speicher.speichern(upload(b"eins", None)).await.unwrap();
    let zweite = speicher.speichern(upload(b"zwei", None)).await.unwrap();

    let cid = ChannelId::neu("channel1").unwrap();
    let urls = vec![
        erste.url.clone(),
        "https://cdn.example/x.m4a".to_string(),
        "http://host/audio/../etc/passwd".to_string(),
        zweite.url.clone(),
    ];
    speicher.kanal_verwerfen(&cid, &urls).await.unwrap();

    assert!(!speicher.pfad_aus_url(&erste.url).unwrap().exists());
    assert!(!speicher.pfad_aus_url(&zweite.url).unwrap().exists());
    assert!(!dir.path().join("channel1").exists());
}

#[tokio::test]
async fn test_kanal_verwerfen_laesst_andere_kanaele_in_ruhe() {
    let dir = tempfile::tempdir().unwrap();
    let speicher = DiskAudioSpeicher::neu(dir.path(), "http://host");
    let mut fremd = upload(b"fremd", None);
    fremd.channel_id = ChannelId::neu("andere").unwrap();
    let fremd = speicher.speichern(fremd).await.unwrap();
    let eigen = speicher.speichern(upload(b"eigen", None)).await.unwrap();

    let cid = ChannelId::neu("channel1").unwrap();
    speicher
        .kanal_verwerfen(&cid, &[fremd.url.clone(), eigen.url.clone()])
        .await
        .unwrap();

    assert!(speicher.pfad_aus_url(&fremd.url).unwrap().exists());
    assert!(!speicher.pfad_aus_url(&eigen.url).unwrap().exists());
}
