// ============================================================================
// Enum : ApiError
// ============================================================================
// Toutes les erreurs que le client HTTP peut remonter à son appelant
//
// CONCEPT RUST : thiserror
// - #[derive(Error)] implémente std::error::Error + Display
// - #[error("...")] : message affiché
// - #[source] : chaîne l'erreur sous-jacente (visible avec {:?} ou anyhow)
// ============================================================================

use thiserror::Error;

/// Erreur du client HTTP : le client ne l'avale jamais, l'appelant décide
///
/// Les cinq genres InvalidUrl, InvalidResponse, Http, Decoding et Network
/// forment le contrat du client. Encoding s'y ajoute pour les corps de requête
/// génériques (`B: Serialize`) que serde_json refuse, par exemple une map
/// dont les clés ne sont pas des chaînes. Les corps typés du crate
/// (TokenRequest, SsoCreateRequest) ne le produisent jamais.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Composition base + endpoint impossible
    #[error("URL invalide : {0}")]
    InvalidUrl(String),

    /// La réponse du transport n'est pas une réponse HTTP
    ///
    /// reqwest ne remonte que des réponses HTTP ou des reqwest::Error : aucun
    /// chemin du client ne produit ce cas. Un corps tronqué ou un timeout
    /// pendant la lecture est une erreur de transport (Network).
    #[error("Réponse invalide du serveur : {0}")]
    InvalidResponse(String),

    /// Statut HTTP hors de 200..=299
    #[error("Erreur HTTP : {status}")]
    Http { status: u16 },

    /// Le JSON reçu ne correspond pas à la forme attendue
    #[error("Erreur de décodage : {0}")]
    Decoding(#[source] serde_json::Error),

    /// Le corps de la requête n'a pas pu être sérialisé (extension, voir plus haut)
    #[error("Erreur d'encodage du corps : {0}")]
    Encoding(#[source] serde_json::Error),

    /// Toute autre erreur de transport (DNS, connexion, timeout...)
    #[error("Erreur réseau : {0}")]
    Network(#[source] reqwest::Error),
}

impl ApiError {
    /// Statut HTTP si l'erreur en porte un
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status } => Some(*status),
            _ => None,
        }
    }

    pub fn is_decoding(&self) -> bool {
        matches!(self, ApiError::Decoding(_))
    }
}
