use std::future::IntoFuture;
use std::process;
use std::sync::Arc;

use abode::{
    application::{
        auth::AuthGate,
        error::AppError,
        favorites::FavoriteService,
        listings::ListingService,
        query::ListingQueryExecutor,
        recommendations::RecommendationService,
        repos::{FavoritesRepo, ListingsRepo, ListingsWriteRepo, RecommendationsRepo, UsersRepo},
        search::ListingSearchService,
    },
    cache::{CacheConfig, CacheStore, MemoryCacheStore},
    config,
    domain::entities::UserSummary,
    infra::{
        auth::StaticTokenGate,
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState, StoreHealth},
        memory::MemoryStore,
        redis::RedisCacheStore,
        telemetry,
    },
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let db = connect_database(&settings).await?.ok_or_else(|| {
        AppError::from(InfraError::configuration("database url is not configured"))
    })?;
    info!(target = "abode::migrate", "Migrations applied");
    db.pool().close().await;
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let state = build_state(&settings).await?;
    serve_http(&settings, state).await
}

/// Connect, migrate and wrap the configured database, if any.
async fn connect_database(
    settings: &config::Settings,
) -> Result<Option<PostgresRepositories>, AppError> {
    let Some(database_url) = settings.database.url.as_ref() else {
        return Ok(None);
    };

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Some(PostgresRepositories::new(pool)))
}

struct Stores {
    listings: Arc<dyn ListingsRepo>,
    listings_write: Arc<dyn ListingsWriteRepo>,
    favorites: Arc<dyn FavoritesRepo>,
    users: Arc<dyn UsersRepo>,
    recommendations: Arc<dyn RecommendationsRepo>,
    health: StoreHealth,
}

async fn init_stores(settings: &config::Settings) -> Result<Stores, AppError> {
    let configured_users = settings.auth.users.iter().map(|user| UserSummary {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
    });

    match connect_database(settings).await? {
        Some(db) => {
            for user in configured_users {
                if let Err(err) = db.upsert_user(&user).await {
                    warn!(
                        target = "abode::bootstrap",
                        user_id = %user.id,
                        error = %err,
                        "Failed to seed configured user"
                    );
                }
            }
            let db = Arc::new(db);
            Ok(Stores {
                listings: db.clone(),
                listings_write: db.clone(),
                favorites: db.clone(),
                users: db.clone(),
                recommendations: db.clone(),
                health: StoreHealth::Postgres(db),
            })
        }
        None => {
            warn!(
                target = "abode::bootstrap",
                "No database url configured; data lives in process memory and is lost on exit"
            );
            let store = Arc::new(MemoryStore::new());
            for user in configured_users {
                if let Err(err) = store.add_user(user) {
                    warn!(
                        target = "abode::bootstrap",
                        error = %err,
                        "Failed to seed configured user"
                    );
                }
            }
            Ok(Stores {
                listings: store.clone(),
                listings_write: store.clone(),
                favorites: store.clone(),
                users: store.clone(),
                recommendations: store,
                health: StoreHealth::Memory,
            })
        }
    }
}

async fn init_cache(settings: &config::Settings, config: &CacheConfig) -> Arc<dyn CacheStore> {
    let redis_url = settings.cache.redis_url.as_ref().filter(|_| config.enabled);
    if let Some(url) = redis_url {
        match RedisCacheStore::connect(url).await {
            Ok(store) => {
                info!(target = "abode::bootstrap", "Listing cache backed by Redis");
                return Arc::new(store);
            }
            Err(err) => warn!(
                target = "abode::bootstrap",
                error = %err,
                "Redis unreachable at startup; using the in-process cache"
            ),
        }
    }
    Arc::new(MemoryCacheStore::new(config.memory_capacity_non_zero()))
}

async fn build_state(settings: &config::Settings) -> Result<ApiState, AppError> {
    let stores = init_stores(settings).await?;
    let cache_config = CacheConfig::from(&settings.cache);
    let cache = init_cache(settings, &cache_config).await;

    let store_timeout = settings.database.query_timeout;
    let executor = ListingQueryExecutor::new(stores.listings.clone(), store_timeout);
    let search = ListingSearchService::new(executor, cache, cache_config);
    let listings = ListingService::new(
        stores.listings.clone(),
        stores.listings_write.clone(),
        search.clone(),
        store_timeout,
    );
    let favorites = FavoriteService::new(
        stores.listings.clone(),
        stores.favorites.clone(),
        store_timeout,
    );
    let recommendations = RecommendationService::new(
        stores.users.clone(),
        stores.listings.clone(),
        stores.recommendations.clone(),
        store_timeout,
    );
    let auth: Arc<dyn AuthGate> = Arc::new(StaticTokenGate::new(&settings.auth.users));

    Ok(ApiState {
        search,
        listings: Arc::new(listings),
        favorites: Arc::new(favorites),
        recommendations: Arc::new(recommendations),
        auth,
        store: stores.health,
    })
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(target = "abode::http", addr = %settings.server.addr, "Listening");

    let draining = Arc::new(Notify::new());
    let signal = {
        let draining = draining.clone();
        async move {
            shutdown_signal().await;
            draining.notify_one();
        }
    };
    let grace = settings.server.graceful_shutdown;
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(signal)
        .into_future();

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = async {
            draining.notified().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(
                target = "abode::http",
                grace_ms = grace.as_millis() as u64,
                "Graceful shutdown timed out; dropping open connections"
            );
        }
    }

    info!(target = "abode::http", "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target = "abode::http", error = %err, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(target = "abode::http", error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!(target = "abode::http", "Shutdown signal received");
}
