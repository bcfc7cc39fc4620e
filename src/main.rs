//! steelgate - request gateway and admin approval service.

use anyhow::Context;
use std::sync::Arc;
use steelgate::accounts::{self, AccountStore, MemoryAccountStore, SqliteAccountStore};
use steelgate::config::{self, Config, NotifyConfig};
use steelgate::filter::{FilterChain, FilterChainParams};
use steelgate::http::{AppState, SiteSettings};
use steelgate::notify::{LogNotifier, Notifier, OutboxNotifier, WebhookNotifier};
use steelgate::security::{RateLimiter, TokenCodec, password};
use steelgate::session::MemorySessionProvider;
use steelgate::{metrics, telemetry};
use tracing::{error, info, warn};

/// Set to accept a signing secret shorter than the minimum (development only).
const ALLOW_INSECURE_SECRET_ENV: &str = "STEELGATE_ALLOW_INSECURE_SECRET";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let arg = std::env::args().nth(1);
    if arg.as_deref() == Some("hash-password") {
        return hash_password_from_stdin();
    }
    let config_path = arg.unwrap_or_else(|| "steelgate.toml".to_string());

    let mut config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;
    config.apply_env_overrides();

    if let Err(errors) = config::validate(&config) {
        let allow_insecure = std::env::var(ALLOW_INSECURE_SECRET_ENV).is_ok();
        let mut fatal = 0;
        for e in &errors {
            if e.is_insecure_secret() && allow_insecure {
                warn!(
                    "INSECURE: {} (allowed via {})",
                    e, ALLOW_INSECURE_SECRET_ENV
                );
            } else {
                error!("config: {}", e);
                fatal += 1;
            }
        }
        if fatal > 0 {
            if errors.iter().any(|e| e.is_insecure_secret()) && !allow_insecure {
                error!("  Generate a strong secret with: openssl rand -hex 32");
                error!(
                    "  For development only, set {}=1 to bypass the length check.",
                    ALLOW_INSECURE_SECRET_ENV
                );
            }
            anyhow::bail!("Refusing to start with {fatal} configuration error(s). See messages above.");
        }
    }

    info!(
        listen = %config.server.listen,
        public_url = %config.server.public_url,
        "Starting steelgate"
    );

    metrics::init();

    let accounts: Arc<dyn AccountStore> = match &config.database {
        Some(db) => Arc::new(
            SqliteAccountStore::open(&db.path)
                .await
                .with_context(|| format!("opening account database {}", db.path))?,
        ),
        None => {
            warn!("No [database] configured - accounts are kept in memory only");
            Arc::new(MemoryAccountStore::new())
        }
    };

    for admin in &config.admins {
        accounts::seed_admin(accounts.as_ref(), &admin.email, &admin.password_hash)
            .await
            .with_context(|| format!("seeding admin account {}", admin.email))?;
    }

    let blocklist = config
        .routes
        .blocklist()
        .context("compiling routes.blocked patterns")?;
    let limiter = Arc::new(RateLimiter::new());
    let sweeper = limiter.spawn_sweeper(config.security.rate_limit.sweep_interval());

    let sessions = Arc::new(MemorySessionProvider::new(config.session.settings()));
    let filter = Arc::new(FilterChain::new(FilterChainParams {
        blocklist,
        limiter,
        rate_limit: config.security.rate_limit.policy(),
        sessions: sessions.clone(),
        routes: config.routes.table(),
        login_path: config.server.login_path.clone(),
    }));

    let state = AppState {
        codec: Arc::new(TokenCodec::new(
            config.security.signing_secret.to_key(),
            config.security.token_policy(),
        )),
        accounts,
        notifier: notifier(&config.notify),
        sessions,
        site: Arc::new(SiteSettings {
            public_url: config.server.public_url.clone(),
            admin_console_url: config.server.admin_console_url.clone(),
        }),
    };

    if let Some(port) = config.server.metrics_port {
        tokio::spawn(steelgate::http::run_metrics_server(port));
    }

    let app = steelgate::http::router(state, filter);
    let listener = tokio::net::TcpListener::bind(config.server.listen)
        .await
        .with_context(|| format!("binding {}", config.server.listen))?;
    info!(addr = %config.server.listen, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("steelgate stopped");
    Ok(())
}

fn notifier(config: &NotifyConfig) -> Arc<dyn Notifier> {
    if let Some(ref url) = config.webhook_url {
        info!("Approval links are posted to the configured webhook");
        Arc::new(WebhookNotifier::new(url.clone(), config.webhook_timeout()))
    } else if let Some(ref path) = config.outbox_path {
        info!(path = %path.display(), "Approval links are appended to the outbox file");
        Arc::new(OutboxNotifier::new(path.clone()))
    } else {
        warn!("No [notify] target configured - approval links are logged without their token and cannot be followed");
        Arc::new(LogNotifier)
    }
}

/// `steelgate hash-password`: read one password from stdin and print its
/// PHC string for an `[[admins]]` entry.
fn hash_password_from_stdin() -> anyhow::Result<()> {
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("reading password from stdin")?;
    let secret = line.trim_end_matches(['\r', '\n']);
    password::check_strength(secret)?;
    println!("{}", password::hash_password(secret)?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
