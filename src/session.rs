// ============================================================================
// Structure : SessionController
// ============================================================================
// Machine à états login / logout construite sur ApiClient
//
// Séquence de login (strictement dans cet ordre) :
//   1. IP publique
//   2. POST /accounts/ibkr/sso/create  {credential, ip}
//   3. POST /accounts/ibkr/sso/initialize
//   4. état = LoggedIn
//   5. GET /accounts/ibkr/sso/accounts (échec avalé, l'état reste LoggedIn)
//
// CONCEPTS RUST :
// 1. tokio::sync::Mutex<()> : verrou d'opération tenu pendant toute la séquence
//    (un second login attend la fin du premier puis revoit sa garde)
// 2. tokio::sync::watch : état publié, lu par n'importe quel abonné
// 3. Arc<AccountsSnapshot> : snapshot partagé sans copie, remplacé en bloc
// ============================================================================

use std::sync::Arc;

use reqwest::Method;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, instrument, warn};

use crate::api::{endpoints, ApiClient, ApiError};
use crate::config::LogoutGuard;
use crate::models::{AccountsSnapshot, SsoCreateRequest};

// ============================================================================
// Enum : SessionState
// ============================================================================

/// État de la session brokerage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// État initial, ou après un login raté / un logout réussi
    #[default]
    LoggedOut,

    /// Séquence IP + create + initialize terminée avec succès
    LoggedIn,
}

/// État publié : ce que voit une couche de présentation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionView {
    pub state: SessionState,

    /// Dernier snapshot des comptes (peut rester None même en LoggedIn)
    pub accounts: Option<Arc<AccountsSnapshot>>,

    /// Une séquence login/logout est en cours
    pub busy: bool,
}

impl SessionView {
    pub fn is_logged_in(&self) -> bool {
        self.state == SessionState::LoggedIn
    }

    /// Libellé du compte sélectionné (alias, sinon id), si un snapshot existe
    pub fn selected_label(&self) -> Option<&str> {
        self.accounts.as_deref().map(AccountsSnapshot::selected_alias)
    }
}

/// Contrôleur de session : seul propriétaire de l'état publié
pub struct SessionController {
    client: ApiClient,
    logout_guard: LogoutGuard,
    published: watch::Sender<SessionView>,
    op_lock: Mutex<()>,
}

impl SessionController {
    /// Crée le contrôleur en LoggedOut, sans snapshot
    ///
    /// La politique de garde de logout() vient de la config du client.
    pub fn new(client: ApiClient) -> Self {
        let logout_guard = client.config().logout_guard;
        // Le receiver initial est jeté : send_modify() publie même sans abonné
        let (published, _) = watch::channel(SessionView::default());
        Self {
            client,
            logout_guard,
            published,
            op_lock: Mutex::new(()),
        }
    }

    // ========================================================================
    // Lecture de l'état publié
    // ========================================================================

    /// Copie de l'état publié (mode "polling")
    pub fn view(&self) -> SessionView {
        self.published.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        self.published.borrow().state
    }

    pub fn is_logged_in(&self) -> bool {
        self.state() == SessionState::LoggedIn
    }

    pub fn accounts(&self) -> Option<Arc<AccountsSnapshot>> {
        self.published.borrow().accounts.clone()
    }

    /// Abonnement aux changements (mode "observer")
    ///
    /// CONCEPT RUST : watch::Receiver
    /// - changed().await attend la prochaine publication
    /// - borrow() lit la dernière valeur sans attendre
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.published.subscribe()
    }

    // ========================================================================
    // Login
    // ========================================================================

    /// Connecte la session avec `credential`
    ///
    /// Ne fait rien si déjà LoggedIn. Un échec des étapes 1 à 3 remet l'état
    /// à LoggedOut et est seulement loggé : l'appelant le constate via l'état
    /// retourné (ou publié), jamais via une erreur.
    #[instrument(skip(self, credential))]
    pub async fn login(&self, credential: &str) -> SessionState {
        let _op = self.op_lock.lock().await;

        if self.is_logged_in() {
            debug!("Already logged in, login ignored");
            return SessionState::LoggedIn;
        }

        self.published.send_modify(|view| view.busy = true);

        match self.run_login_sequence(credential).await {
            Ok(()) => {
                info!("SSO session established");
                self.published
                    .send_modify(|view| view.state = SessionState::LoggedIn);

                // Échec avalé : l'état reste LoggedIn, le snapshot précédent reste en place
                if let Err(e) = self.fetch_accounts_snapshot().await {
                    warn!(error = %e, "Failed to fetch accounts info");
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to login");
                self.published
                    .send_modify(|view| view.state = SessionState::LoggedOut);
            }
        }

        self.published.send_modify(|view| view.busy = false);
        self.state()
    }

    /// Étapes 1 à 3, la première erreur interrompt la séquence
    async fn run_login_sequence(&self, credential: &str) -> Result<(), ApiError> {
        let ip = self.client.fetch_public_ip().await?;

        let body = SsoCreateRequest {
            credential,
            ip: &ip,
        };
        self.client
            .request(endpoints::SSO_CREATE, Method::POST, Some(&body))
            .await?;
        debug!("SSO session created");

        self.client
            .send(endpoints::SSO_INITIALIZE, Method::POST)
            .await?;
        debug!("Brokerage session initialized");

        Ok(())
    }

    /// GET des comptes, remplace le snapshot en bloc si succès
    ///
    /// En cas d'erreur rien n'est publié : l'ancien snapshot (ou None) reste.
    async fn fetch_accounts_snapshot(&self) -> Result<Arc<AccountsSnapshot>, ApiError> {
        let snapshot: AccountsSnapshot = self
            .client
            .request_json::<_, ()>(endpoints::SSO_ACCOUNTS, Method::GET, None)
            .await?;

        info!(
            accounts = snapshot.len(),
            selected = %snapshot.selected_account,
            "Accounts info fetched"
        );

        let snapshot = Arc::new(snapshot);
        let published = Arc::clone(&snapshot);
        self.published
            .send_modify(move |view| view.accounts = Some(published));
        Ok(snapshot)
    }

    // ========================================================================
    // Logout
    // ========================================================================

    /// Ferme la session SSO
    ///
    /// S'exécute seulement si la garde configurée l'autorise (voir LogoutGuard).
    /// En cas d'échec l'état reste inchangé et l'erreur est seulement loggée.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        let _op = self.op_lock.lock().await;

        let state = self.state();
        if !logout_allowed(self.logout_guard, state) {
            debug!(?state, guard = ?self.logout_guard, "Logout guard not satisfied, logout ignored");
            return;
        }

        self.published.send_modify(|view| view.busy = true);

        match self.client.send(endpoints::SSO_LOGOUT, Method::POST).await {
            Ok(_) => {
                info!("Logged out");
                self.published.send_modify(|view| {
                    view.state = SessionState::LoggedOut;
                    view.busy = false;
                });
            }
            Err(e) => {
                error!(error = %e, "Failed to logout");
                self.published.send_modify(|view| view.busy = false);
            }
        }
    }
}

/// Garde de logout() selon la politique choisie
fn logout_allowed(guard: LogoutGuard, state: SessionState) -> bool {
    match guard {
        LogoutGuard::MatchSource => state != SessionState::LoggedIn,
        LogoutGuard::RequireLoggedIn => state == SessionState::LoggedIn,
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
// Les séquences complètes login/logout sont dans tests/session_flow.rs
// ============================================================================
