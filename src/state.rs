use crate::config::Environment;
use crate::history::TradeRecord;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Derived trade history for one environment, valid as long as the
/// account's last transaction id has not moved.
#[derive(Debug, Clone)]
pub struct HistoryCache {
    pub last_transaction_id: i64,
    pub trades: Vec<TradeRecord>,
}

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Directory holding the per-environment credentials files.
    pub config_dir: PathBuf,
    /// Per-environment trade history cache.
    pub cache: Arc<Mutex<HashMap<Environment, HistoryCache>>>,
}

impl AppState {
    pub fn new(config_dir: PathBuf) -> Self {
        Self {
            config_dir,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Return the cached trades for `env` if they still cover the account's
    /// last transaction id.
    pub async fn cached_trades(&self, env: Environment, last_id: i64) -> Option<Vec<TradeRecord>> {
        let cache = self.cache.lock().await;
        match cache.get(&env) {
            Some(entry) if entry.last_transaction_id == last_id => Some(entry.trades.clone()),
            _ => None,
        }
    }

    /// Replace the cached trades for `env`.
    pub async fn store_trades(&self, env: Environment, last_id: i64, trades: Vec<TradeRecord>) {
        let mut cache = self.cache.lock().await;
        cache.insert(
            env,
            HistoryCache {
                last_transaction_id: last_id,
                trades,
            },
        );
    }

    /// Drop the cached history for one environment, or for all of them.
    pub async fn invalidate(&self, env: Option<Environment>) {
        let mut cache = self.cache.lock().await;
        match env {
            Some(env) => {
                cache.remove(&env);
            }
            None => cache.clear(),
        }
    }
}
