//! Connection pool keyed by `(host, port, username, credential_fingerprint)`
//! (spec §3.4). Bounded by `max_connections`, idle-reaped after
//! `idle_timeout`, guarded by a single mutex -- connection use is
//! lock-free once acquired (spec §9 "Pool representation").

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;
use xec_core::{PoolKey, SshConnectionConfig, XecError};

use crate::auth::authenticate;
use crate::connection::{ClientHandler, SshConnection};

const DEFAULT_MAX_CONNECTIONS: usize = 10;
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// One pooled entry: the connection plus when it was last handed out.
/// Generic over the connection type so the eviction/sizing logic below can
/// be unit-tested without dialing real SSH servers.
pub(crate) struct PoolEntry<T> {
    pub(crate) value: Arc<T>,
    pub(crate) last_used: Instant,
}

/// Snapshot of pool occupancy, surfaced for diagnostics and tests (spec §8
/// properties 6-7: pool reuse and isolation).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub total_connections: usize,
    pub keys: Vec<PoolKey>,
}

pub struct SshPool {
    entries: Mutex<HashMap<PoolKey, Vec<PoolEntry<SshConnection>>>>,
    max_connections: usize,
    idle_timeout: Duration,
}

impl Default for SshPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONNECTIONS, DEFAULT_IDLE_TIMEOUT)
    }
}

impl SshPool {
    pub fn new(max_connections: usize, idle_timeout: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_connections,
            idle_timeout,
        }
    }

    /// Return an idle connection for `key` if one exists, else dial and
    /// authenticate a new one (spec §4.4.1 "On acquisition").
    pub(crate) async fn acquire(
        &self,
        config: &SshConnectionConfig,
    ) -> Result<Arc<SshConnection>, XecError> {
        let key = config.pool_key();
        {
            let mut entries = self.entries.lock().await;
            sweep_idle(&mut entries, self.idle_timeout, Instant::now());
            if let Some(bucket) = entries.get_mut(&key) {
                if let Some(mut entry) = bucket.pop() {
                    entry.last_used = Instant::now();
                    let conn = Arc::clone(&entry.value);
                    bucket.push(entry);
                    debug!(host = %key.host, "reusing pooled SSH connection");
                    return Ok(conn);
                }
            }
        }

        debug!(host = %key.host, port = config.port, "dialing new SSH connection");
        let connection = self.dial(config, &key).await?;

        let mut entries = self.entries.lock().await;
        enforce_capacity(&mut entries, self.max_connections);
        entries
            .entry(key)
            .or_default()
            .push(PoolEntry {
                value: Arc::clone(&connection),
                last_used: Instant::now(),
            });
        Ok(connection)
    }

    async fn dial(
        &self,
        config: &SshConnectionConfig,
        key: &PoolKey,
    ) -> Result<Arc<SshConnection>, XecError> {
        let russh_config = Arc::new(russh::client::Config::default());
        let mut session = tokio::time::timeout(
            config.ready_timeout,
            russh::client::connect(russh_config, (config.host.as_str(), config.port), ClientHandler),
        )
        .await
        .map_err(|_| XecError::SshConnectFailed {
            host: config.host.clone(),
            port: config.port,
            source: anyhow::anyhow!("connect timed out after {:?}", config.ready_timeout),
        })?
        .map_err(|e| XecError::SshConnectFailed {
            host: config.host.clone(),
            port: config.port,
            source: anyhow::Error::from(e),
        })?;

        authenticate(&mut session, config).await?;

        Ok(SshConnection::new(
            key.clone(),
            session,
            config.keepalive_interval,
        ))
    }

    /// Drop a connection that failed with a connection-level error (not a
    /// per-exec error) so the next acquire dials fresh (spec §3.3
    /// "evicted ... on authenticated-channel failure").
    pub(crate) async fn evict(&self, key: &PoolKey, connection: &Arc<SshConnection>) {
        let mut entries = self.entries.lock().await;
        if let Some(bucket) = entries.get_mut(key) {
            bucket.retain(|e| !Arc::ptr_eq(&e.value, connection));
        }
    }

    /// Release all channels and connections, then clear the pool (spec
    /// §4.4.6 "A disposed adapter closes all channels, then all
    /// connections, then clears the pool.").
    pub(crate) async fn dispose_all(&self) {
        let mut entries = self.entries.lock().await;
        entries.clear();
    }

    pub fn stats(&self) -> PoolStats {
        let entries = self.entries.try_lock();
        match entries {
            Ok(entries) => {
                let total = entries.values().map(|b| b.len()).sum();
                PoolStats {
                    total_connections: total,
                    keys: entries.keys().cloned().collect(),
                }
            }
            Err(_) => PoolStats::default(),
        }
    }
}

/// Evict entries idle beyond `idle_timeout`. Pure function over the bucket
/// map so the idle-eviction rule is unit-testable without a real network
/// connection (generic `T` -- tests instantiate it with a zero-sized stub).
fn sweep_idle<T>(entries: &mut HashMap<PoolKey, Vec<PoolEntry<T>>>, idle_timeout: Duration, now: Instant) {
    for bucket in entries.values_mut() {
        bucket.retain(|e| now.duration_since(e.last_used) < idle_timeout);
    }
    entries.retain(|_, bucket| !bucket.is_empty());
}

/// Evict the least-recently-used entry across the whole pool when at
/// capacity, regardless of key, mirroring the corpus's LRU-across-keys
/// eviction strategy.
fn enforce_capacity<T>(entries: &mut HashMap<PoolKey, Vec<PoolEntry<T>>>, max_connections: usize) {
    loop {
        let total: usize = entries.values().map(|b| b.len()).sum();
        if total < max_connections {
            return;
        }
        let victim = entries
            .iter()
            .flat_map(|(k, bucket)| bucket.iter().map(move |e| (k.clone(), e.last_used)))
            .min_by_key(|(_, last_used)| *last_used);
        match victim {
            Some((key, last_used)) => {
                if let Some(bucket) = entries.get_mut(&key) {
                    bucket.retain(|e| e.last_used != last_used);
                }
            }
            None => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(host: &str) -> PoolKey {
        PoolKey {
            host: host.to_string(),
            port: 22,
            username: "root".to_string(),
            credential_fingerprint: "fp".to_string(),
        }
    }

    fn entry(last_used: Instant) -> PoolEntry<()> {
        PoolEntry {
            value: Arc::new(()),
            last_used,
        }
    }

    /// §8 property 6 (pool reuse): sweep never evicts a fresh entry.
    #[test]
    fn sweep_idle_keeps_fresh_entries() {
        let mut entries = HashMap::new();
        entries.insert(key("a"), vec![entry(Instant::now())]);
        sweep_idle(&mut entries, Duration::from_secs(60), Instant::now());
        assert_eq!(entries.get(&key("a")).map(Vec::len), Some(1));
    }

    #[test]
    fn sweep_idle_evicts_stale_entries() {
        let mut entries = HashMap::new();
        let stale = Instant::now() - Duration::from_secs(120);
        entries.insert(key("a"), vec![entry(stale)]);
        sweep_idle(&mut entries, Duration::from_secs(60), Instant::now());
        assert!(entries.get(&key("a")).is_none());
    }

    /// §8 property 7 (pool isolation): distinct keys keep distinct buckets.
    #[test]
    fn distinct_keys_never_share_a_bucket() {
        let mut entries: HashMap<PoolKey, Vec<PoolEntry<()>>> = HashMap::new();
        entries.insert(key("a"), vec![entry(Instant::now())]);
        entries.insert(key("b"), vec![entry(Instant::now())]);
        assert_eq!(entries.len(), 2);
        assert_ne!(key("a"), key("b"));
    }

    #[test]
    fn enforce_capacity_evicts_oldest_across_keys() {
        let mut entries: HashMap<PoolKey, Vec<PoolEntry<()>>> = HashMap::new();
        let older = Instant::now() - Duration::from_secs(5);
        entries.insert(key("a"), vec![entry(older)]);
        entries.insert(key("b"), vec![entry(Instant::now())]);
        enforce_capacity(&mut entries, 2);
        let total: usize = entries.values().map(Vec::len).sum();
        assert_eq!(total, 1);
        assert!(entries.get(&key("b")).is_some());
    }

    #[test]
    fn stats_reports_total_and_keys() {
        let pool = SshPool::new(10, Duration::from_secs(60));
        let stats = pool.stats();
        assert_eq!(stats.total_connections, 0);
        assert!(stats.keys.is_empty());
    }
}
