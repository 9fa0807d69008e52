// ============================================================================
// Module : models
// ============================================================================
// Structures de données échangées avec le backend (enveloppes JSON)
// et snapshot des comptes publié par la session
// ============================================================================

pub mod accounts; // Snapshot des comptes (GET /accounts/ibkr/sso/accounts)
pub mod auth;     // Token, IP publique, création SSO

// Re-export des structures principales pour simplifier les imports
// On peut faire : use trader::models::AccountsSnapshot;
pub use accounts::{AccountsSnapshot, AllowFeatures};
pub use auth::{BearerToken, IpResponse, SsoCreateRequest, TokenRequest, TokenResponse};
