// ============================================================================
// Trader - Library
// ============================================================================
// Cœur client + session du front de trading : client HTTP authentifié et
// machine à états login/logout. Les couches de présentation appellent
// SessionController et lisent l'état qu'il publie.
// ============================================================================

pub mod api;     // Client HTTP authentifié
pub mod config;  // Configuration (URL, timeouts, garde de logout)
pub mod models;  // Enveloppes JSON et snapshot des comptes
pub mod session; // Machine à états de session

pub use api::{ApiClient, ApiError};
pub use config::{ClientConfig, LogoutGuard};
pub use session::{SessionController, SessionState, SessionView};
