// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CACHE DE BUSCAS NCM
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// O catálogo NCM muda raramente; a mesma busca digitada de novo (ou após
// apagar e redigitar) é servida da memória até o TTL vencer.
// Só respostas bem-sucedidas são guardadas.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

use super::client::{NcmSearchClient, NcmSearchError};
use crate::types::NcmOption;

/// Configuração do cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL das entradas (em segundos)
    pub ttl_secs: u64,
    /// Máximo de buscas guardadas
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_entries: 256,
        }
    }
}

impl CacheConfig {
    pub fn with_ttl(ttl_secs: u64) -> Self {
        Self {
            ttl_secs,
            ..Default::default()
        }
    }
}

/// Chave normalizada de uma busca.
///
/// `"Velas "` e `"velas"` caem na mesma entrada. Assume que o backend
/// ignora caixa e espaços nas pontas; o cliente interno continua recebendo
/// a consulta original, só a chave é normalizada.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_query(query: &str) -> Self {
        Self(query.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    data: T,
    expires_at: DateTime<Utc>,
    last_accessed: DateTime<Utc>,
    hit_count: u64,
}

impl<T> CacheEntry<T> {
    fn new(data: T, ttl_secs: u64) -> Self {
        let now = Utc::now();
        Self {
            data,
            expires_at: expiry_after(now, ttl_secs),
            last_accessed: now,
            hit_count: 0,
        }
    }

    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Instante de expiração. TTLs fora do alcance do chrono nunca expiram.
fn expiry_after(now: DateTime<Utc>, ttl_secs: u64) -> DateTime<Utc> {
    i64::try_from(ttl_secs)
        .ok()
        .and_then(ChronoDuration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Estatísticas do cache
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    /// Entradas removidas por expiração ou por falta de espaço
    pub evictions: u64,
    /// Taxa de hit (0.0 - 1.0)
    pub hit_rate: f64,
}

/// Cache thread-safe com TTL e limite de entradas.
///
/// Ao atingir `max_entries`, a entrada acessada há mais tempo sai.
pub struct SearchCache<T: Clone + Send + Sync> {
    store: RwLock<HashMap<CacheKey, CacheEntry<T>>>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<T: Clone + Send + Sync> SearchCache<T> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Guarda um valor com o TTL configurado.
    pub fn insert(&self, key: CacheKey, value: T) {
        if let Ok(mut store) = self.store.write() {
            if !store.contains_key(&key) && store.len() >= self.config.max_entries {
                self.evict_least_recent(&mut store);
            }
            store.insert(key, CacheEntry::new(value, self.config.ttl_secs));
        }
    }

    /// Recupera um valor ainda válido. Entradas vencidas são removidas.
    pub fn get(&self, key: &CacheKey) -> Option<T> {
        if let Ok(mut store) = self.store.write() {
            match store.get_mut(key) {
                Some(entry) if !entry.is_expired() => {
                    entry.hit_count += 1;
                    entry.last_accessed = Utc::now();
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.data.clone());
                }
                Some(_) => {
                    store.remove(key);
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
                None => {}
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Quantas vezes a entrada foi servida.
    pub fn hit_count(&self, key: &CacheKey) -> Option<u64> {
        self.store
            .read()
            .ok()
            .and_then(|store| store.get(key).map(|entry| entry.hit_count))
    }

    /// Remove entradas vencidas. Retorna quantas saíram.
    pub fn cleanup(&self) -> usize {
        let removed = match self.store.write() {
            Ok(mut store) => {
                let before = store.len();
                store.retain(|_, entry| !entry.is_expired());
                before - store.len()
            }
            Err(_) => 0,
        };

        self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    pub fn clear(&self) {
        if let Ok(mut store) = self.store.write() {
            store.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.store.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            hits,
            misses,
            entries: self.len(),
            evictions: self.evictions.load(Ordering::Relaxed),
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    /// Resumo de uma linha para logs.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "NCM cache: {} entries | {:.1}% hit rate ({} hits, {} misses) | {} evictions | TTL: {}s",
            stats.entries,
            stats.hit_rate * 100.0,
            stats.hits,
            stats.misses,
            stats.evictions,
            self.config.ttl_secs
        )
    }

    fn evict_least_recent(&self, store: &mut HashMap<CacheKey, CacheEntry<T>>) {
        let oldest = store
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            store.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl<T: Clone + Send + Sync> std::fmt::Debug for SearchCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchCache")
            .field("entries", &self.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Decorador de [`NcmSearchClient`] que serve buscas repetidas do cache.
pub struct CachedNcmClient<C> {
    inner: C,
    cache: Arc<SearchCache<Vec<NcmOption>>>,
}

impl<C: NcmSearchClient> CachedNcmClient<C> {
    pub fn new(inner: C, config: CacheConfig) -> Self {
        Self {
            inner,
            cache: Arc::new(SearchCache::new(config)),
        }
    }

    pub fn cache(&self) -> &SearchCache<Vec<NcmOption>> {
        &self.cache
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: NcmSearchClient> NcmSearchClient for CachedNcmClient<C> {
    async fn search(&self, query: &str) -> Result<Vec<NcmOption>, NcmSearchError> {
        let key = CacheKey::from_query(query);

        if let Some(cached) = self.cache.get(&key) {
            log::debug!("💾 Cache hit: '{}'", key.as_str());
            return Ok(cached);
        }

        let options = self.inner.search(query).await?;
        self.cache.insert(key, options.clone());
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ncm::client::StaticNcmClient;

    fn cache(ttl_secs: u64, max_entries: usize) -> SearchCache<String> {
        SearchCache::new(CacheConfig {
            ttl_secs,
            max_entries,
        })
    }

    #[test]
    fn test_cache_key_normalization() {
        assert_eq!(CacheKey::from_query("  Velas "), CacheKey::from_query("velas"));
        assert_ne!(CacheKey::from_query("velas"), CacheKey::from_query("vela"));
    }

    #[test]
    fn test_insert_get_and_stats() {
        let cache = cache(300, 10);
        let key = CacheKey::from_query("velas");

        assert!(cache.get(&key).is_none());
        cache.insert(key.clone(), "3406.00.00".into());
        assert_eq!(cache.get(&key), Some("3406.00.00".into()));
        assert_eq!(cache.get(&key), Some("3406.00.00".into()));

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.666).abs() < 0.01);
        assert_eq!(cache.hit_count(&key), Some(2));
        assert!(cache.summary().contains("1 entries"));
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let cache = cache(0, 10);
        let key = CacheKey::from_query("velas");
        cache.insert(key.clone(), "x".into());

        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        for ttl in [10_000_000_000_000, i64::MAX as u64, u64::MAX] {
            let cache = cache(ttl, 10);
            cache.insert(CacheKey::from_query("velas"), "3406".to_string());
            assert_eq!(cache.get(&CacheKey::from_query("velas")), Some("3406".to_string()));
            assert_eq!(cache.cleanup(), 0);
        }

        let now = Utc::now();
        assert_eq!(expiry_after(now, u64::MAX), DateTime::<Utc>::MAX_UTC);
        assert_eq!(expiry_after(now, 60), now + ChronoDuration::seconds(60));
    }

    #[test]
    fn test_cleanup_removes_expired() {
        let cache = cache(0, 10);
        for i in 0..4 {
            cache.insert(CacheKey::from_query(&format!("q{}", i)), "x".into());
        }
        assert_eq!(cache.cleanup(), 4);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_max_entries_evicts_least_recent() {
        let cache = cache(300, 2);
        let a = CacheKey::from_query("a");
        let b = CacheKey::from_query("b");
        let c = CacheKey::from_query("c");

        cache.insert(a.clone(), "a".into());
        std::thread::sleep(std::time::Duration::from_millis(5));
        cache.insert(b.clone(), "b".into());
        std::thread::sleep(std::time::Duration::from_millis(5));
        cache.get(&a);
        cache.insert(c.clone(), "c".into());

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&a).is_some());
        assert!(cache.get(&b).is_none());
        assert!(cache.get(&c).is_some());
    }

    #[tokio::test]
    async fn test_cached_client_serves_repeated_query() {
        let client = CachedNcmClient::new(StaticNcmClient::with_defaults(), CacheConfig::default());

        let first = client.search("Velas").await.unwrap();
        let second = client.search("velas ").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(client.inner().call_count(), 1);
        assert_eq!(client.cache().stats().hits, 1);
    }

    #[tokio::test]
    async fn test_cached_client_does_not_cache_failures() {
        let client = CachedNcmClient::new(StaticNcmClient::with_defaults(), CacheConfig::default());

        client.inner().set_failing(true);
        assert!(client.search("velas").await.is_err());
        assert!(client.cache().is_empty());

        client.inner().set_failing(false);
        assert_eq!(client.search("velas").await.unwrap().len(), 1);
        assert_eq!(client.inner().call_count(), 2);
    }
}
