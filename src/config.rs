// ============================================================================
// Configuration : ClientConfig
// ============================================================================
// Paramètres du client HTTP, fixés une fois au démarrage du process
//
// CONCEPTS RUST :
// 1. Default trait : valeurs par défaut sans paramètres
// 2. Builder-style : with_*() consomme self et retourne Self modifié
// 3. anyhow::Context : messages d'erreur lisibles sur les variables d'env
// ============================================================================

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Backend par défaut (surchargé par TRADER_BASE_URL)
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Service d'IP publique, sur un autre hôte que le backend
pub const DEFAULT_IP_LOOKUP_URL: &str = "https://api.ipify.org?format=json";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RESOURCE_TIMEOUT: Duration = Duration::from_secs(300);

// ============================================================================
// Enum : LogoutGuard
// ============================================================================
// Condition d'exécution de logout()
//
// Historiquement logout() est gardé par la même condition que login()
// ("seulement si PAS connecté"), ce qui empêche un utilisateur connecté de
// se déconnecter. MatchSource conserve ce comportement, RequireLoggedIn
// applique la condition attendue. À trancher côté produit.
// ============================================================================

/// Politique de garde de logout()
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogoutGuard {
    /// logout() ne s'exécute que si l'état n'est PAS LoggedIn
    #[default]
    MatchSource,

    /// logout() ne s'exécute que si l'état est LoggedIn
    RequireLoggedIn,
}

impl FromStr for LogoutGuard {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "match-source" => Ok(Self::MatchSource),
            "require-logged-in" => Ok(Self::RequireLoggedIn),
            other => anyhow::bail!(
                "garde de logout inconnue : {other:?} (attendu : match-source | require-logged-in)"
            ),
        }
    }
}

/// Configuration du client HTTP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// URL de base du backend, sans slash final
    pub base_url: String,

    /// URL complète du service d'IP publique (doit répondre {"ip": "..."})
    pub ip_lookup_url: String,

    /// Délai max pour établir la connexion
    pub request_timeout: Duration,

    /// Délai max total d'une requête (connexion + corps)
    pub resource_timeout: Duration,

    pub logout_guard: LogoutGuard,
}

impl ClientConfig {
    /// Crée une configuration pointant sur `base_url`, le reste par défaut
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            ..Self::default()
        }
    }

    pub fn with_ip_lookup_url(mut self, url: impl Into<String>) -> Self {
        self.ip_lookup_url = url.into();
        self
    }

    pub fn with_timeouts(mut self, request: Duration, resource: Duration) -> Self {
        self.request_timeout = request;
        self.resource_timeout = resource;
        self
    }

    pub fn with_logout_guard(mut self, guard: LogoutGuard) -> Self {
        self.logout_guard = guard;
        self
    }

    /// Charge la configuration depuis les variables d'environnement
    ///
    /// Variables lues (toutes optionnelles) :
    /// - TRADER_BASE_URL
    /// - TRADER_IP_LOOKUP_URL
    /// - TRADER_REQUEST_TIMEOUT_SECS
    /// - TRADER_RESOURCE_TIMEOUT_SECS
    /// - TRADER_LOGOUT_GUARD (match-source | require-logged-in)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Même chose que from_env() mais avec une source de variables injectée
    ///
    /// CONCEPT RUST : Closure en paramètre (impl Fn)
    /// - Les tests passent une HashMap au lieu de toucher l'environnement global
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("TRADER_BASE_URL") {
            config.base_url = normalize_base_url(url);
        }
        if let Some(url) = lookup("TRADER_IP_LOOKUP_URL") {
            config.ip_lookup_url = url;
        }
        if let Some(secs) = lookup("TRADER_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = parse_secs(&secs)
                .context("TRADER_REQUEST_TIMEOUT_SECS invalide")?;
        }
        if let Some(secs) = lookup("TRADER_RESOURCE_TIMEOUT_SECS") {
            config.resource_timeout = parse_secs(&secs)
                .context("TRADER_RESOURCE_TIMEOUT_SECS invalide")?;
        }
        if let Some(guard) = lookup("TRADER_LOGOUT_GUARD") {
            config.logout_guard = guard.parse().context("TRADER_LOGOUT_GUARD invalide")?;
        }

        Ok(config)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            ip_lookup_url: DEFAULT_IP_LOOKUP_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            resource_timeout: DEFAULT_RESOURCE_TIMEOUT,
            logout_guard: LogoutGuard::default(),
        }
    }
}

/// Retire les slashes finaux : "http://host:5000/" + "/token" -> pas de "//"
fn normalize_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn parse_secs(value: &str) -> Result<Duration> {
    let secs: u64 = value
        .trim()
        .parse()
        .with_context(|| format!("{value:?} n'est pas un nombre de secondes"))?;
    if secs == 0 {
        anyhow::bail!("un timeout de 0 seconde n'est pas autorisé");
    }
    Ok(Duration::from_secs(secs))
}

// ============================================================================
// Tests unitaires
// ============================================================================
