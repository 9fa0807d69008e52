// ============================================================================
// API Client : ApiClient
// ============================================================================
// Client HTTP authentifié vers le backend de trading
//
// Chaque requête non-token va chercher un bearer token NEUF via POST /token
// juste avant de partir : aucun cache, aucun refresh. Un token ne sert
// qu'une fois.
//
// CONCEPTS RUST :
// 1. reqwest::Client : pool de connexions partagé, Clone = Arc interne
// 2. Génériques : request<B: Serialize>, request_json<T: DeserializeOwned>
// 3. map_err : convertit les erreurs reqwest/serde en ApiError
// ============================================================================

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, instrument};

use crate::api::endpoints;
use crate::api::ApiError;
use crate::config::ClientConfig;
use crate::models::{BearerToken, IpResponse, TokenRequest, TokenResponse};

const APPLICATION_JSON: &str = "application/json";

/// Client HTTP authentifié
///
/// CONCEPT RUST : Clone bon marché
/// - reqwest::Client et Arc<ClientConfig> se clonent par compteur de références
/// - Plusieurs tâches peuvent appeler le client en parallèle (Send + Sync)
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl ApiClient {
    /// Construit le client avec les deux timeouts de la configuration
    ///
    /// - request_timeout : délai de connexion
    /// - resource_timeout : délai total de la requête
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .timeout(config.resource_timeout)
            .build()
            .map_err(ApiError::Network)?;

        debug!(base_url = %config.base_url, "HTTP client created");
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Compose l'URL complète : base + endpoint
    fn endpoint_url(&self, endpoint: &str) -> Result<Url, ApiError> {
        let raw = format!("{}{}", self.config.base_url, endpoint);
        Url::parse(&raw).map_err(|e| ApiError::InvalidUrl(format!("{raw} ({e})")))
    }

    // ========================================================================
    // Token
    // ========================================================================

    /// Récupère un bearer token neuf : POST /token avec {"token": "all"}
    ///
    /// Pas de header Authorization sur cet appel.
    #[instrument(skip(self))]
    pub async fn fetch_token(&self) -> Result<BearerToken, ApiError> {
        let url = self.endpoint_url(endpoints::TOKEN)?;
        let payload = serde_json::to_vec(&TokenRequest::all()).map_err(ApiError::Encoding)?;

        debug!("Fetching bearer token");
        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, APPLICATION_JSON)
            .body(payload)
            .send()
            .await
            .map_err(ApiError::Network)?;

        let body = read_success_body(response).await?;

        match serde_json::from_slice::<TokenResponse>(&body) {
            Ok(decoded) => {
                debug!("Bearer token received");
                Ok(decoded.into())
            }
            Err(e) => {
                error!(error = %e, "Decoding token response failed");
                Err(ApiError::Decoding(e))
            }
        }
    }

    // ========================================================================
    // Requêtes authentifiées
    // ========================================================================

    /// Exécute une requête authentifiée et retourne le corps brut
    ///
    /// Ordre des étapes :
    /// 1. Composition de l'URL (InvalidUrl)
    /// 2. Sérialisation du corps s'il y en a un (Encoding)
    /// 3. Token neuf via fetch_token()
    /// 4. Envoi, vérification du statut 2xx (Http), lecture du corps
    ///
    /// CONCEPT RUST : B: Serialize + ?Sized
    /// - ?Sized autorise aussi les types non dimensionnés (ex: serde_json::Value derrière &)
    #[instrument(skip(self, body), fields(has_body = body.is_some()))]
    pub async fn request<B>(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&B>,
    ) -> Result<Vec<u8>, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint_url(endpoint)?;

        let mut builder = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, APPLICATION_JSON);

        if let Some(body) = body {
            let payload = serde_json::to_vec(body).map_err(ApiError::Encoding)?;
            builder = builder.body(payload);
        }

        // Token neuf à chaque requête
        let token = self.fetch_token().await?;
        builder = builder.header(AUTHORIZATION, token.header_value());

        debug!("Sending authorized request");
        let response = builder.send().await.map_err(|e| {
            error!(error = %e, "Transport error");
            ApiError::Network(e)
        })?;

        let body = read_success_body(response).await?;
        debug!(bytes = body.len(), "Request succeeded");
        Ok(body)
    }

    /// Requête authentifiée sans corps, réponse ignorée par l'appelant
    pub async fn send(&self, endpoint: &str, method: Method) -> Result<Vec<u8>, ApiError> {
        self.request::<()>(endpoint, method, None).await
    }

    /// Requête authentifiée + décodage JSON de la réponse en T
    ///
    /// CONCEPT RUST : DeserializeOwned
    /// - T ne garde aucune référence vers le buffer (qui est libéré ensuite)
    pub async fn request_json<T, B>(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let bytes = self.request(endpoint, method, body).await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            error!(endpoint, error = %e, "Decoding response failed");
            ApiError::Decoding(e)
        })
    }

    // ========================================================================
    // Utilitaire : IP publique
    // ========================================================================

    /// IP publique de l'appareil, via un service externe (autre hôte)
    ///
    /// Requête GET non authentifiée. Le statut n'est pas vérifié : une page
    /// d'erreur non-JSON finit en Decoding.
    #[instrument(skip(self))]
    pub async fn fetch_public_ip(&self) -> Result<String, ApiError> {
        let url = Url::parse(&self.config.ip_lookup_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{} ({e})", self.config.ip_lookup_url)))?;

        debug!(url = %url, "Fetching public IP");
        let response = self.http.get(url).send().await.map_err(ApiError::Network)?;
        // Corps tronqué, reset ou timeout pendant la lecture : erreur de transport
        let body = response.bytes().await.map_err(ApiError::Network)?;

        let decoded: IpResponse = serde_json::from_slice(&body).map_err(ApiError::Decoding)?;
        info!(ip = %decoded.ip, "Device IP resolved");
        Ok(decoded.ip)
    }
}

/// Vérifie le statut 2xx puis lit le corps complet
async fn read_success_body(response: Response) -> Result<Vec<u8>, ApiError> {
    let status = response.status();
    if !status.is_success() {
        error!(status = %status, url = %response.url(), "Server returned error status");
        return Err(ApiError::Http {
            status: status.as_u16(),
        });
    }

    let bytes = response.bytes().await.map_err(|e| {
        error!(error = %e, "Reading response body failed");
        ApiError::Network(e)
    })?;
    Ok(bytes.to_vec())
}

// ============================================================================
// Tests unitaires
// ============================================================================
// Les tests réseau (wiremock) sont dans tests/api_client.rs
// ============================================================================
