//! todo-api バイナリのエントリポイント

use anyhow::{anyhow, Context};
use domain::{TodoStore, UserId};
use infrastructure::{seed_demo_todos, DynamoDbClient, DynamoTodoStore, InMemoryTodoStore};
use shared::{init_tracing, Config, JwksCache, JwksVerifier, StoreBackend, TokenVerifier};
use std::sync::Arc;
use todo_api::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;
    init_tracing(config.log_format).map_err(|e| anyhow!("failed to initialise tracing: {e}"))?;

    let store: Arc<dyn TodoStore> = match config.store_backend {
        StoreBackend::DynamoDb => {
            let mut store = DynamoTodoStore::new(DynamoDbClient::new(&config).await);
            if let Some(page_size) = config.dynamodb_page_size {
                store = store.with_page_size(page_size);
            }
            Arc::new(store)
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; data is lost on restart");
            Arc::new(InMemoryTodoStore::new())
        }
    };

    let keys = Arc::new(JwksCache::from_config(&config.auth));
    let verifier: Arc<dyn TokenVerifier> = Arc::new(JwksVerifier::from_config(&config.auth, keys));
    let state = AppState::new(store, verifier);

    if config.seed_demo_data {
        if let Some(owner) = config.demo_owner_id.clone() {
            let owner = UserId::from_string(owner)?;
            seed_demo_todos(&state.service, &owner)
                .await
                .context("failed to seed demo todos")?;
        }
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, backend = ?config.store_backend, "server starting");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
