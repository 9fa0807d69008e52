// ============================================================================
// Structure : AccountsSnapshot
// ============================================================================
// Photo instantanée des comptes du courtier (réponse de
// GET /accounts/ibkr/sso/accounts)
//
// CONCEPTS RUST :
// 1. Value object : jamais modifié après construction, remplacé en bloc
// 2. HashMap<String, String> : table id de compte -> alias d'affichage
// 3. #[serde(rename_all = "camelCase")] : "selectedAccount" (JSON) -> selected_account
// ============================================================================

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fonctionnalités autorisées pour la session courante
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowFeatures {
    /// Types d'actifs tradables (ex: "STK,OPT,FUT"), chaîne brute du serveur
    pub allowed_asset_types: String,
}

/// Snapshot des comptes : remplacé en entier à chaque fetch réussi
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsSnapshot {
    /// Identifiants des comptes (ex: "U1234567")
    pub accounts: Vec<String>,

    /// Alias d'affichage par identifiant de compte
    pub aliases: HashMap<String, String>,

    pub allow_features: AllowFeatures,

    /// Compte actuellement sélectionné côté serveur
    pub selected_account: String,

    /// Moment où le snapshot a été décodé (local, absent du JSON)
    ///
    /// CONCEPT RUST : #[serde(skip, default = "...")]
    /// - Le champ n'est ni lu ni écrit en JSON
    /// - À la désérialisation, serde appelle Utc::now() pour le remplir
    #[serde(skip, default = "Utc::now")]
    pub fetched_at: DateTime<Utc>,
}

impl AccountsSnapshot {
    /// Alias du compte sélectionné, ou l'identifiant brut s'il n'a pas d'alias
    ///
    /// CONCEPT RUST : Option::map_or
    /// - Some(alias) -> &alias
    /// - None -> valeur de repli (ici l'id lui-même)
    pub fn selected_alias(&self) -> &str {
        self.alias_for(&self.selected_account)
    }

    /// Alias d'un compte quelconque, même règle de repli
    pub fn alias_for<'a>(&'a self, account_id: &'a str) -> &'a str {
        self.aliases
            .get(account_id)
            .map_or(account_id, String::as_str)
    }

    /// Nombre de comptes dans le snapshot
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
