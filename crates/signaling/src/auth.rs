//! Anbindung an den Auth-Kollaborateur
//!
//! Benutzerverwaltung und Passwoerter liegen ausserhalb von Sprechfunk. Der
//! Gateway fragt beim Login nur nach der verifizierten `UserId`.

use async_trait::async_trait;
use sprechfunk_core::types::UserId;
use sprechfunk_protocol::control::LoginRequest;

use crate::error::SignalingResult;

#[async_trait]
pub trait Authentifizierer: Send + Sync + 'static {
    /// Prueft die Anmeldedaten und liefert die verifizierte UserId
    async fn pruefen(&self, anfrage: &LoginRequest) -> SignalingResult<UserId>;
}

/// Vertraut der vom Client genannten UserId
///
/// Fuer Deployments in denen der Transport bereits vorab authentifiziert
/// ist (z.B. hinter einem Gateway das nur angemeldete Clients durchlaesst).
#[derive(Debug, Default, Clone, Copy)]
pub struct OffenerAuthentifizierer;

#[async_trait]
impl Authentifizierer for OffenerAuthentifizierer {
    async fn pruefen(&self, anfrage: &LoginRequest) -> SignalingResult<UserId> {
        Ok(anfrage.user_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offener_authentifizierer_uebernimmt_user_id() {
        let anfrage = LoginRequest {
            user_id: UserId::neu("funker-7").unwrap(),
            token: None,
            client_version: Some("1.0".into()),
        };
        let uid = OffenerAuthentifizierer.pruefen(&anfrage).await.unwrap();
        assert_eq!(uid.as_str(), "funker-7");
    }
}
