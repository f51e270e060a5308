//src/main.rs

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;

use crate::common::i18n::I18nStore;
use crate::config::AppState;
use crate::middleware::i18n::Locale;

#[derive(Debug, Parser)]
#[command(name = "enrollment-portal", version, about = "Portal de adesão a seguros por grupos parceiros")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Roda as migrações e sobe o servidor HTTP (padrão)
    Serve,

    /// Só roda as migrações do banco de dados
    Migrate,

    /// Provisiona o administrador global. Só roda uma vez, a não ser com --repair.
    BootstrapAdmin {
        #[arg(long, env = "BOOTSTRAP_ADMIN_USERNAME")]
        username: String,

        #[arg(long, env = "BOOTSTRAP_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,

        /// Redefine a senha de um administrador já provisionado
        #[arg(long)]
        repair: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Inicializa o logger (RUST_LOG, padrão "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let app_state = AppState::new().await?;

    // Faz o app rodar as migrações do SQLx antes de qualquer comando
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados")?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(app_state).await,
        Command::Migrate => Ok(()),
        Command::BootstrapAdmin {
            username,
            password,
            repair,
        } => bootstrap_admin(&app_state, &username, &password, repair).await,
    }
}

async fn serve(app_state: AppState) -> anyhow::Result<()> {
    let addr = app_state.settings.bind_addr.clone();
    let app = routes::build_router(app_state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("Erro no servidor Axum")?;
    Ok(())
}

async fn bootstrap_admin(
    app_state: &AppState,
    username: &str,
    password: &str,
    repair: bool,
) -> anyhow::Result<()> {
    let admin = app_state
        .bootstrap_service
        .run(username, password, repair)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_api_error(&Locale::default(), &I18nStore).error))?;

    tracing::info!("Administrador global pronto: {} ({})", admin.username, admin.id);
    tracing::warn!(
        "Remova BOOTSTRAP_ADMIN_PASSWORD do ambiente e troque a senha. Novas execuções exigem --repair."
    );
    Ok(())
}
