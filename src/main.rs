// ============================================================================
// Trader - Driver en ligne de commande
// ============================================================================
// Construit le client et le contrôleur de session une seule fois, puis
// déroule le cycle login -> affichage des comptes -> logout (optionnel)
//
// Usage :
//   trader <credential> [--logout]
//   trader            (le credential est lu sur stdin)
//
// CONCEPTS RUST CLÉS :
// 1. #[tokio::main] : runtime async pour tout le programme
// 2. Injection de dépendances : pas de singleton, on passe les instances
// 3. watch::Receiver : une tâche observe l'état publié par la session
// ============================================================================

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use trader::{ApiClient, ClientConfig, SessionController, SessionState};

// ============================================================================
// Initialisation du logging
// ============================================================================
// Logs vers un fichier avec rotation quotidienne : stdout reste réservé
// à la sortie du programme
// ============================================================================

/// Répertoire des logs
///
/// - Linux : ~/.local/share/trader/logs
/// - macOS : ~/Library/Application Support/trader/logs
/// - Repli : ./logs si le répertoire de données est introuvable
fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("trader").join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"))
}

/// Initialise le système de logging vers fichier
///
/// # Utilisation
/// ```bash
/// # Contrôler le niveau de log
/// RUST_LOG=debug trader alice
/// RUST_LOG=trader=trace trader alice
/// ```
fn init_logging() -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir).context("Échec de la création du répertoire de logs")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir.clone(), "trader.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false) // Pas de codes couleur dans le fichier
                .with_target(true)
                .with_thread_ids(true) // Utile pour suivre les tâches async
                .with_line_number(true),
        )
        .with(
            // Par défaut : debug pour trader, info pour les dépendances
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trader=debug,info".into()),
        )
        .try_init()
        .context("Subscriber tracing déjà initialisé")?;

    info!(?log_dir, "Logging initialisé");
    Ok(())
}

// ============================================================================
// Arguments
// ============================================================================

/// Arguments de la ligne de commande
#[derive(Debug, Default, PartialEq)]
struct Args {
    credential: Option<String>,
    logout: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    for arg in args {
        match arg.as_str() {
            "--logout" => parsed.logout = true,
            flag if flag.starts_with("--") => anyhow::bail!("option inconnue : {flag}"),
            value if parsed.credential.is_none() => parsed.credential = Some(value.to_string()),
            extra => anyhow::bail!("argument en trop : {extra}"),
        }
    }
    Ok(parsed)
}

/// Lit le credential sur stdin (une ligne)
fn prompt_credential() -> Result<String> {
    print!("Identifiant : ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Lecture du credential impossible")?;
    Ok(line.trim().to_string())
}

// ============================================================================
// Point d'entrée
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Logging en premier : si l'init échoue, on continue sans
    init_logging().unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {}", e);
        eprintln!("   Continuing without logging...");
    });

    let args = parse_args(std::env::args().skip(1))?;
    let config = ClientConfig::from_env().context("Configuration invalide")?;
    info!(base_url = %config.base_url, guard = ?config.logout_guard, "Trader starting up");

    let credential = match args.credential {
        Some(credential) => credential,
        None => prompt_credential()?,
    };
    if credential.is_empty() {
        anyhow::bail!("credential vide");
    }

    // Instances construites une seule fois, passées explicitement
    let client = ApiClient::new(config).context("Création du client HTTP impossible")?;
    let session = Arc::new(SessionController::new(client));

    // Observateur : affiche chaque transition d'état publiée
    let mut updates = session.subscribe();
    let observer = tokio::spawn(async move {
        let mut last = updates.borrow().state;
        while updates.changed().await.is_ok() {
            let state = updates.borrow().state;
            if state != last {
                println!("→ {:?}", state);
                last = state;
            }
        }
        debug!("Session observer exiting");
    });

    println!("Connexion...");
    match session.login(&credential).await {
        SessionState::LoggedIn => {
            println!("✅ Connecté");
            match session.accounts() {
                Some(snapshot) => {
                    println!("Compte : {}", snapshot.selected_alias());
                    for account in &snapshot.accounts {
                        println!("  - {} ({})", account, snapshot.alias_for(account));
                    }
                    println!(
                        "Actifs autorisés : {}",
                        snapshot.allow_features.allowed_asset_types
                    );
                }
                None => println!("⚠ Comptes indisponibles (voir les logs)"),
            }
        }
        SessionState::LoggedOut => {
            error!("Login failed");
            println!("❌ Échec du login (voir les logs)");
        }
    }

    if args.logout {
        session.logout().await;
        println!("État final : {:?}", session.state());
    }

    // Le contrôleur est libéré : le sender du watch disparaît, l'observateur s'arrête
    drop(session);
    if let Err(e) = observer.await {
        error!(error = %e, "Session observer task failed");
    }

    info!("Trader exiting");
    Ok(())
}
