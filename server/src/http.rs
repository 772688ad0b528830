//! HTTP-API: Audio-Upload, Kanal-Abfragen, Verlassen, Audio-Dateien
//!
//! | Methode | Pfad | |
//! |---|---|---|
//! | GET | `/health` | Health-Check |
//! | GET | `/kanaele/:channel_id` | Schnappschuss |
//! | GET | `/kanaele/:channel_id/mitglieder` | Mitglieder in Beitrittsreihenfolge |
//! | DELETE | `/kanaele/:channel_id/mitglieder/:user_id` | Verlassen ohne Sitzungsbezug |
//! | POST | `/kanaele/:channel_id/audio` | Multipart-Upload (`file`, `id_user`, `duration`) |
//! | GET | `/audio/<channel>/<datei>` | gespeicherte Aufnahmen |

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use serde_json::json;
use sprechfunk_core::types::{ChannelId, UserId};
use sprechfunk_core::SprechfunkError;
use sprechfunk_kanal::{AudioSpeicher, AudioUpload};
use sprechfunk_signaling::SignalingState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Geteilter Zustand der HTTP-Handler
#[derive(Clone)]
pub struct HttpState {
    pub signaling: Arc<SignalingState>,
    pub speicher: Arc<dyn AudioSpeicher>,
    pub max_upload_bytes: usize,
}

/// Baut den vollstaendigen Router
///
/// `audio_verzeichnis` wird unter `/audio` ausgeliefert und muss dem
/// Verzeichnis des `DiskAudioSpeicher` entsprechen.
pub fn router(
    state: HttpState,
    audio_verzeichnis: &std::path::Path,
    cors_origins: &[String],
) -> Router {
    let cors = if cors_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(tower_http::cors::Any)
    };

    // Multipart-Overhead zusaetzlich zur eigentlichen Datei
    let body_limit = state.max_upload_bytes.saturating_add(64 * 1024);

    Router::new()
        .route("/health", get(health))
        .route("/kanaele/:channel_id", get(kanal_abfragen))
        .route("/kanaele/:channel_id/mitglieder", get(mitglieder_auflisten))
        .route(
            "/kanaele/:channel_id/mitglieder/:user_id",
            delete(mitglied_entfernen),
        )
        .route(
            "/kanaele/:channel_id/audio",
            post(audio_hochladen).layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
        .nest_service("/audio", ServeDir::new(audio_verzeichnis))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

// ---------------------------------------------------------------------------
// Fehler-Antworten
// ---------------------------------------------------------------------------

fn fehler(status: StatusCode, nachricht: impl Into<String>) -> Response {
    (status, Json(json!({ "error": nachricht.into() }))).into_response()
}

fn status_fuer(e: &SprechfunkError) -> StatusCode {
    match e {
        SprechfunkError::KanalNichtGefunden(_) | SprechfunkError::NichtImKanal { .. } => {
            StatusCode::NOT_FOUND
        }
        SprechfunkError::UngueltigeEingabe(_) => StatusCode::BAD_REQUEST,
        SprechfunkError::SprechrechtBelegt { .. } => StatusCode::CONFLICT,
        SprechfunkError::UploadFehlgeschlagen(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn kanal_id(roh: String) -> Result<ChannelId, Response> {
    ChannelId::neu(roh).map_err(|e| fehler(StatusCode::BAD_REQUEST, e))
}

fn user_id(roh: String) -> Result<UserId, Response> {
    UserId::neu(roh).map_err(|e| fehler(StatusCode::BAD_REQUEST, e))
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// GET /health
pub async fn health(State(state): State<HttpState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "server": state.signaling.config.server_name,
            "uptime_sek": state.signaling.uptime_sek(),
            "verbindungen": state.signaling.verbindungen(),
            "kanaele": state.signaling.kanaele.anzahl_kanaele(),
        })),
    )
}

async fn kanal_abfragen(
    State(state): State<HttpState>,
    Path(channel_id): Path<String>,
) -> Response {
    let cid = match kanal_id(channel_id) {
        Ok(c) => c,
        Err(r) => return r,
    };
    match state.signaling.kanaele.schnappschuss(&cid) {
        Some(s) => (StatusCode::OK, Json(s)).into_response(),
        None => fehler(
            StatusCode::NOT_FOUND,
            SprechfunkError::KanalNichtGefunden(cid).to_string(),
        ),
    }
}

async fn mitglieder_auflisten(
    State(state): State<HttpState>,
    Path(channel_id): Path<String>,
) -> Response {
    let cid = match kanal_id(channel_id) {
        Ok(c) => c,
        Err(r) => return r,
    };
    let mitglieder = state.signaling.kanaele.mitglieder(&cid);
    (StatusCode::OK, Json(mitglieder)).into_response()
}

/// Verlassen von aussen, unabhaengig von der Sitzung
async fn mitglied_entfernen(
    State(state): State<HttpState>,
    Path((channel_id, uid)): Path<(String, String)>,
) -> Response {
    let cid = match kanal_id(channel_id) {
        Ok(c) => c,
        Err(r) => return r,
    };
    let uid = match user_id(uid) {
        Ok(u) => u,
        Err(r) => return r,
    };

    let ergebnis = state
        .signaling
        .aufraeumer
        .verbindung_beendet(&cid, &uid, None)
        .await;
    tracing::info!(
        channel_id = %cid,
        user_id = %uid,
        entfernt = ergebnis.entfernt,
        kanal_abgebaut = ergebnis.kanal_abgebaut,
        "Mitglied per HTTP entfernt"
    );
    StatusCode::NO_CONTENT.into_response()
}

fn multipart_fehler(e: MultipartError) -> Response {
    fehler(e.status(), e.body_text())
}

async fn feld_text(feld: Field<'_>) -> Result<String, Response> {
    feld.text().await.map_err(multipart_fehler)
}

/// POST /kanaele/:channel_id/audio
///
/// Speichert die Aufnahme und veroeffentlicht sie im Kanal. Schlaegt das
/// Speichern fehl, wird das Sprechrecht des Absenders trotzdem freigegeben.
async fn audio_hochladen(
    State(state): State<HttpState>,
    Path(channel_id): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let cid = match kanal_id(channel_id) {
        Ok(c) => c,
        Err(r) => return r,
    };

    let mut daten = None;
    let mut dateiendung = None;
    let mut absender = None;
    let mut dauer_sek = None;

    loop {
        let feld = match multipart.next_field().await {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => return multipart_fehler(e),
        };
        let name = feld.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                dateiendung = feld
                    .file_name()
                    .and_then(|n| std::path::Path::new(n).extension())
                    .and_then(|e| e.to_str())
                    .map(str::to_owned);
                match feld.bytes().await {
                    Ok(b) => daten = Some(b),
                    Err(e) => return multipart_fehler(e),
                }
            }
            "id_user" => match feld_text(feld).await {
                Ok(t) => absender = Some(t),
                Err(r) => return r,
            },
            "duration" => match feld_text(feld).await {
                Ok(t) => {
                    dauer_sek = t.trim().parse::<f64>().ok().filter(|d| d.is_finite() && *d >= 0.0);
                    if dauer_sek.is_none() {
                        tracing::debug!(wert = %t, "Unbrauchbare Dauer ignoriert");
                    }
                }
                Err(r) => return r,
            },
            andere => {
                tracing::debug!(feld = andere, "Unbekanntes Multipart-Feld ignoriert");
            }
        }
    }

    let Some(daten) = daten else {
        return fehler(StatusCode::BAD_REQUEST, "Feld 'file' fehlt");
    };
    let Some(absender) = absender else {
        return fehler(StatusCode::BAD_REQUEST, "Feld 'id_user' fehlt");
    };
    let uid = match user_id(absender) {
        Ok(u) => u,
        Err(r) => return r,
    };
    if daten.len() > state.max_upload_bytes {
        return fehler(StatusCode::PAYLOAD_TOO_LARGE, "Aufnahme zu gross");
    }

    let upload = AudioUpload {
        channel_id: cid.clone(),
        owner_id: uid.clone(),
        daten,
        dauer_sek,
        dateiendung,
    };

    let audio = match state.speicher.speichern(upload).await {
        Ok(a) => a,
        Err(e) => {
            tracing::warn!(channel_id = %cid, user_id = %uid, fehler = %e, "Upload fehlgeschlagen");
            // Sprechrecht darf nach einem gescheiterten Upload nicht haengen bleiben
            if state.signaling.kanaele.sprechrecht_freigeben(&cid, &uid).is_ok() {
                tracing::info!(channel_id = %cid, user_id = %uid, "Sprechrecht nach Upload-Fehler freigegeben");
            }
            let e = SprechfunkError::UploadFehlgeschlagen(e.to_string());
            return fehler(status_fuer(&e), e.to_string());
        }
    };

    match state
        .signaling
        .kanaele
        .audio_veroeffentlichen(&cid, audio.clone())
    {
        Ok(_) => (StatusCode::OK, Json(audio)).into_response(),
        Err(e) => {
            if let Err(le) = state.speicher.loeschen(&audio.url).await {
                tracing::warn!(url = %audio.url, fehler = %le, "Verwaiste Aufnahme nicht geloescht");
            }
            fehler(status_fuer(&e), e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{self, Body};
    use axum::http::Request;
    use sprechfunk_core::types::{Mitglied, SitzungId};
    use sprechfunk_core::AudioRef;
    use sprechfunk_kanal::DiskAudioSpeicher;
    use sprechfunk_signaling::{OffenerAuthentifizierer, SignalingConfig};
    use tower::ServiceExt;

    const GRENZE: &str = "sprechfunkgrenze";

    struct TestApp {
        app: Router,
        state: HttpState,
        dir: tempfile::TempDir,
    }

    fn test_app_mit(max_upload_bytes: usize) -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let speicher: Arc<dyn AudioSpeicher> =
            Arc::new(DiskAudioSpeicher::neu(dir.path(), "http://funk.test"));
        let signaling = SignalingState::neu(
            SignalingConfig::default(),
            Arc::clone(&speicher),
            Arc::new(OffenerAuthentifizierer),
        );
        let state = HttpState {
            signaling,
            speicher,
            max_upload_bytes,
        };
        let app = router(state.clone(), dir.path(), &[]);
        TestApp { app, state, dir }
    }

    fn test_app() -> TestApp {
        test_app_mit(1024 * 1024)
    }

    fn cid() -> ChannelId {
        ChannelId::neu("channel1").unwrap()
    }

    fn uid(s: &str) -> UserId {
        UserId::neu(s).unwrap()
    }

    fn beitreten(state: &HttpState, user: &str) -> SitzungId {
        let sitzung = SitzungId::naechste();
        state.signaling.kanaele.beitreten(
            &cid(),
            Mitglied::neu(uid(user), user.to_uppercase(), "LIZ"),
            sitzung,
        );
        sitzung
    }

    fn multipart_body(datei: &[u8], user: &str, dauer: Option<&str>) -> Body {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{GRENZE}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"aufnahme.m4a\"\r\nContent-Type: audio/mp4\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(datei);
        body.extend_from_slice(
            format!(
                "\r\n--{GRENZE}\r\nContent-Disposition: form-data; name=\"id_user\"\r\n\r\n{user}\r\n"
            )
            .as_bytes(),
        );
        if let Some(d) = dauer {
            body.extend_from_slice(
                format!(
                    "--{GRENZE}\r\nContent-Disposition: form-data; name=\"duration\"\r\n\r\n{d}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{GRENZE}--\r\n").as_bytes());
        Body::from(body)
    }

    fn upload_request(kanal: &str, body: Body) -> Request<Body> {
        Request::post(format!("/kanaele/{kanal}/audio"))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={GRENZE}"),
            )
            .body(body)
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_antwortet_ok() {
        let t = test_app();
        let response = t
            .app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["kanaele"], 0);
    }

    #[tokio::test]
    async fn mitglieder_in_beitrittsreihenfolge() {
        let t = test_app();
        beitreten(&t.state, "a");
        beitreten(&t.state, "b");

        let response = t
            .app
            .clone()
            .oneshot(Request::get("/kanaele/channel1/mitglieder").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let liste = json_body(response).await;
        let ids: Vec<_> = liste
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["user_id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);

        // Unbekannter Kanal: leere Liste
        let response = t
            .app
            .oneshot(Request::get("/kanaele/leer/mitglieder").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!([]));
    }

    #[tokio::test]
    async fn unbekannter_kanal_ist_404() {
        let t = test_app();
        let response = t
            .app
            .oneshot(Request::get("/kanaele/nirgendwo").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn entfernen_ohne_sitzung_baut_kanal_ab() {
        let t = test_app();
        let sitzung = beitreten(&t.state, "a");
        t.state
            .signaling
            .kanaele
            .sprechrecht_anfordern(&cid(), &uid("a"), sitzung)
            .unwrap();

        let response = t
            .app
            .oneshot(
                Request::delete("/kanaele/channel1/mitglieder/a")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(t.state.signaling.kanaele.schnappschuss(&cid()).is_none());
        assert_eq!(t.state.signaling.kanaele.anzahl_kanaele(), 0);
    }

    #[tokio::test]
    async fn upload_wird_veroeffentlicht_und_ausgeliefert() {
        let t = test_app();
        let sitzung = beitreten(&t.state, "a");
        beitreten(&t.state, "b");
        t.state
            .signaling
            .kanaele
            .sprechrecht_anfordern(&cid(), &uid("a"), sitzung)
            .unwrap();

        let response = t
            .app
            .clone()
            .oneshot(upload_request("channel1", multipart_body(b"AUDIO", "a", Some("2.5"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let audio: AudioRef = serde_json::from_value(json_body(response).await).unwrap();
        assert_eq!(audio.owner_id, uid("a"));
        assert_eq!(audio.duration_secs, Some(2.5));
        assert!(audio.url.starts_with("http://funk.test/audio/channel1/"));
        assert!(audio.url.ends_with(".m4a"));

        // Sprechrecht implizit frei, letzte Aufnahme gesetzt
        let schnappschuss = t.state.signaling.kanaele.schnappschuss(&cid()).unwrap();
        assert!(schnappschuss.sprechrecht_inhaber.is_none());
        assert_eq!(schnappschuss.letztes_audio.map(|a| a.url), Some(audio.url.clone()));

        // Datei ueber /audio abrufbar
        let pfad = audio.url.trim_start_matches("http://funk.test");
        let response = t
            .app
            .oneshot(Request::get(pfad).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"AUDIO");
    }

    #[tokio::test]
    async fn upload_in_fremden_kanal_hinterlaesst_keine_datei() {
        let t = test_app();

        let response = t
            .app
            .oneshot(upload_request("geisterkanal", multipart_body(b"AUDIO", "a", None)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let kanal_dir = t.dir.path().join("geisterkanal");
        let dateien = std::fs::read_dir(&kanal_dir)
            .map(|d| d.count())
            .unwrap_or(0);
        assert_eq!(dateien, 0);
    }

    #[tokio::test]
    async fn leerer_upload_gibt_sprechrecht_frei() {
        let t = test_app();
        let sitzung = beitreten(&t.state, "a");
        t.state
            .signaling
            .kanaele
            .sprechrecht_anfordern(&cid(), &uid("a"), sitzung)
            .unwrap();

        let response = t
            .app
            .oneshot(upload_request("channel1", multipart_body(b"", "a", None)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(t.state.signaling.kanaele.sprechrecht_inhaber(&cid()).is_none());
    }

    #[tokio::test]
    async fn upload_ohne_absender_ist_400() {
        let t = test_app();
        beitreten(&t.state, "a");
        let body = Body::from(format!(
            "--{GRENZE}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"x.m4a\"\r\n\r\nAUDIO\r\n--{GRENZE}--\r\n"
        ));
        let response = t
            .app
            .oneshot(upload_request("channel1", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn zu_grosser_upload_ist_413() {
        let t = test_app_mit(8);
        beitreten(&t.state, "a");
        let response = t
            .app
            .oneshot(upload_request("channel1", multipart_body(&[0u8; 64], "a", None)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
