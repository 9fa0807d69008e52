// ============================================================================
// Module : api
// ============================================================================
// Client HTTP authentifié vers le backend de trading (JSON over HTTP)
// + lookup de l'IP publique de l'appareil
// ============================================================================

pub mod client; // ApiClient : token par requête, exécution, décodage
pub mod error;  // ApiError : erreurs typées du client

pub use client::ApiClient;
pub use error::ApiError;

/// Chemins des endpoints du backend, relatifs à l'URL de base
pub mod endpoints {
    pub const TOKEN: &str = "/token";
    pub const SSO_CREATE: &str = "/accounts/ibkr/sso/create";
    pub const SSO_INITIALIZE: &str = "/accounts/ibkr/sso/initialize";
    pub const SSO_ACCOUNTS: &str = "/accounts/ibkr/sso/accounts";
    pub const SSO_LOGOUT: &str = "/accounts/ibkr/sso/logout";
}
