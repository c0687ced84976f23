//! Environment-driven configuration.

use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{info, warn};

/// Runtime configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP listener binds to.
    pub port: u16,
    /// MongoDB connection string.
    pub mongodb_url: String,
    /// Database holding the `products` and `orders` collections.
    pub database_name: String,
    /// Directory with the frontend `index.html` and an `images/` subdirectory.
    pub static_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: try_load("STOREFRONT_PORT", "3000"),
            mongodb_url: try_load("MONGODB_URL", "mongodb://localhost:27017"),
            database_name: try_load("MONGODB_DB", "storefront"),
            static_dir: PathBuf::from(try_load::<String>("STATIC_DIR", "static")),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            mongodb_url: "mongodb://localhost:27017".to_string(),
            database_name: "storefront".to_string(),
            static_dir: PathBuf::from("static"),
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    match raw.parse() {
        Ok(value) => value,
        Err(e) => {
            warn!("invalid {key} value '{raw}': {e}, using default: {default}");
            default
                .parse()
                .unwrap_or_else(|_| unreachable!("default for {key} must parse"))
        }
    }
}
