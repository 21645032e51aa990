// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// NCM
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Busca remota de códigos NCM e a sessão de autocomplete com debounce
// que consome essa busca.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Sessão de autocomplete (estado, teclado, seleção, descarte).
pub mod autocomplete;

/// Cache com TTL para resultados de busca.
pub mod cache;

/// Trait de busca NCM e implementações (HTTP, catálogo estático).
pub mod client;

/// Barramento de cliques para fechar o dropdown ao clicar fora.
pub mod pointer;

pub use autocomplete::{
    AutocompleteBuilder, AutocompleteState, DropdownView, Key, KeyOutcome, NcmAutocomplete,
    OnChange, SearchStats, NO_RESULTS_LABEL, SEARCHING_LABEL,
};
pub use cache::{CacheConfig, CacheKey, CacheStats, CachedNcmClient, SearchCache};
pub use client::{HttpNcmClient, NcmSearchClient, NcmSearchError, StaticNcmClient};
pub use pointer::{Bounds, PointerBus, PointerDown};
