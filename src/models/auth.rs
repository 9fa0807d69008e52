// ============================================================================
// Enveloppes JSON : token, IP publique, création de session SSO
// ============================================================================
// Chaque endpoint a son propre type de corps de requête (pas de map
// String -> Any) : serde garantit l'encodage exact au moment de la compilation
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

/// Corps de POST /token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenRequest {
    pub token: &'static str,
}

impl TokenRequest {
    /// Demande un token valable pour tous les scopes : {"token": "all"}
    pub fn all() -> Self {
        Self { token: "all" }
    }
}

/// Réponse de POST /token
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// Bearer token opaque, durée de vie = une seule requête
///
/// CONCEPT RUST : Newtype pattern
/// - Empêche de confondre un token avec une String quelconque
/// - Debug est implémenté à la main pour ne jamais fuiter le secret dans les logs
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Valeur du header Authorization : "Bearer <token>"
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

impl From<TokenResponse> for BearerToken {
    fn from(response: TokenResponse) -> Self {
        Self(response.access_token)
    }
}

/// Réponse du service d'IP publique : {"ip": "1.2.3.4"}
#[derive(Debug, Deserialize)]
pub struct IpResponse {
    pub ip: String,
}

/// Corps de POST /accounts/ibkr/sso/create
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SsoCreateRequest<'a> {
    pub credential: &'a str,
    pub ip: &'a str,
}
