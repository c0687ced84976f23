use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use storefront::config::Config;
use storefront::server;
use storefront::storage::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::from_env();

    // The store must be up before the listener binds; a failed connection
    // aborts startup instead of serving requests against a dead backend.
    #[cfg(feature = "mongodb_backend")]
    let store: Arc<dyn Store> = Arc::new(
        storefront::storage::MongoStore::connect(&config.mongodb_url, &config.database_name)
            .await?,
    );

    #[cfg(not(feature = "mongodb_backend"))]
    let store: Arc<dyn Store> = {
        tracing::warn!("built without mongodb_backend; state is in-memory and volatile");
        Arc::new(storefront::storage::InMemoryStore::new())
    };

    let app = server::build_router(store, &config);
    server::serve(app, config.bind_addr()).await
}
