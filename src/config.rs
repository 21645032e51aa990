// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CONFIGURAÇÃO DO AUTOCOMPLETE E DA API NCM
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Parâmetros da sessão de autocomplete e do cliente HTTP de NCM.
// Todas as configurações podem ser definidas via .env
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

/// Atraso padrão do debounce da busca (ms).
pub const DEFAULT_DEBOUNCE_MS: u64 = 400;

/// Mínimo de caracteres para disparar uma busca.
pub const DEFAULT_MIN_QUERY_CHARS: usize = 2;

/// Linhas visíveis no dropdown antes de rolar.
pub const DEFAULT_VISIBLE_ROWS: usize = 6;

/// Placeholder padrão do campo NCM.
pub const DEFAULT_PLACEHOLDER: &str = "Buscar código NCM ou descrição...";

/// URL base padrão do backend.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";

/// Tamanho de página padrão das buscas NCM.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Maior TTL aceito para o cache de buscas (30 dias).
pub const MAX_CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Erros de configuração
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid URL in {var} ('{value}'): {source}")]
    InvalidUrl {
        var: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },
}

/// Configuração de uma sessão de autocomplete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutocompleteConfig {
    /// Tempo de silêncio antes de buscar (ms).
    pub debounce_ms: u64,
    /// Mínimo de caracteres para buscar.
    pub min_query_chars: usize,
    /// Linhas visíveis no dropdown (para o scroll "nearest").
    pub visible_rows: usize,
    /// Texto exibido com o campo vazio.
    pub placeholder: String,
    /// Campo desabilitado: ignora digitação, teclado e limpar.
    pub disabled: bool,
    /// Erro de validação exibido abaixo do campo.
    pub error: Option<String>,
}

impl Default for AutocompleteConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            min_query_chars: DEFAULT_MIN_QUERY_CHARS,
            visible_rows: DEFAULT_VISIBLE_ROWS,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            disabled: false,
            error: None,
        }
    }
}

impl AutocompleteConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Configuração do cliente HTTP de NCM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NcmApiConfig {
    /// URL base do backend (ex: `https://api.atelie.com.br`).
    pub base_url: String,
    /// Token Bearer (opcional).
    pub auth_token: Option<String>,
    /// Itens por página.
    pub page_size: u32,
    /// Timeout das requisições em segundos.
    pub timeout_secs: u64,
    /// TTL do cache de buscas. 0 desativa o cache.
    pub cache_ttl_secs: u64,
}

impl Default for NcmApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_token: None,
            page_size: DEFAULT_PAGE_SIZE,
            timeout_secs: 30,
            cache_ttl_secs: 300,
        }
    }
}

impl NcmApiConfig {
    /// Monta a URL de um endpoint relativo à URL base.
    ///
    /// A URL base é tratada como diretório, então
    /// `https://host/v1` + `api/fiscal/ncm` = `https://host/v1/api/fiscal/ncm`.
    pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
        let invalid = |source| ConfigError::InvalidUrl {
            var: "NCM_API_BASE_URL",
            value: self.base_url.clone(),
            source,
        };

        let mut base = Url::parse(self.base_url.trim()).map_err(invalid)?;
        if !base.path().ends_with('/') {
            let path_with_slash = format!("{}/", base.path());
            base.set_path(&path_with_slash);
        }
        base.join(path.trim_start_matches('/')).map_err(invalid)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Interpreta o valor de uma variável de ambiente, caindo no padrão quando
/// ausente ou inválido.
pub(crate) fn parse_or<T>(var: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + Display,
{
    match raw {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => {
                log::info!("📦 {}={}", var, value);
                value
            }
            Err(_) => {
                log::warn!("⚠️  {}='{}' inválido, usando padrão {}", var, raw, default);
                default
            }
        },
    }
}

/// Limita o TTL do cache a [`MAX_CACHE_TTL_SECS`].
pub(crate) fn clamp_cache_ttl(ttl_secs: u64) -> u64 {
    if ttl_secs > MAX_CACHE_TTL_SECS {
        log::warn!(
            "⚠️  NCM_CACHE_TTL_SECS={} acima do máximo, usando {}",
            ttl_secs,
            MAX_CACHE_TTL_SECS
        );
        MAX_CACHE_TTL_SECS
    } else {
        ttl_secs
    }
}

fn env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Carrega a configuração do autocomplete das variáveis de ambiente.
///
/// Variáveis suportadas:
/// - `NCM_DEBOUNCE_MS`: atraso do debounce (padrão: 400)
/// - `NCM_MIN_CHARS`: mínimo de caracteres para buscar (padrão: 2)
/// - `NCM_VISIBLE_ROWS`: linhas visíveis no dropdown (padrão: 6)
pub fn load_autocomplete_config() -> AutocompleteConfig {
    let defaults = AutocompleteConfig::default();

    AutocompleteConfig {
        debounce_ms: parse_or("NCM_DEBOUNCE_MS", env("NCM_DEBOUNCE_MS"), defaults.debounce_ms),
        min_query_chars: parse_or("NCM_MIN_CHARS", env("NCM_MIN_CHARS"), defaults.min_query_chars)
            .max(1),
        visible_rows: parse_or("NCM_VISIBLE_ROWS", env("NCM_VISIBLE_ROWS"), defaults.visible_rows)
            .max(1),
        ..defaults
    }
}

/// Carrega a configuração do cliente HTTP das variáveis de ambiente.
///
/// Variáveis suportadas:
/// - `NCM_API_BASE_URL`: URL base do backend (padrão: `http://localhost:8080`)
/// - `NCM_API_TOKEN`: token Bearer (opcional)
/// - `NCM_PAGE_SIZE`: itens por página (padrão: 20)
/// - `NCM_TIMEOUT_SECS`: timeout das requisições (padrão: 30)
/// - `NCM_CACHE_TTL_SECS`: TTL do cache, 0 desativa (padrão: 300)
///
/// # Exemplo
///
/// ```rust,ignore
/// // .env
/// NCM_API_BASE_URL=https://api.atelie.com.br
/// NCM_API_TOKEN=segredo
///
/// // código
/// let config = load_api_config()?;
/// assert_eq!(config.page_size, 20);
/// ```
pub fn load_api_config() -> Result<NcmApiConfig, ConfigError> {
    let defaults = NcmApiConfig::default();

    let config = NcmApiConfig {
        base_url: env("NCM_API_BASE_URL").unwrap_or(defaults.base_url),
        auth_token: env("NCM_API_TOKEN"),
        page_size: parse_or("NCM_PAGE_SIZE", env("NCM_PAGE_SIZE"), defaults.page_size).max(1),
        timeout_secs: parse_or("NCM_TIMEOUT_SECS", env("NCM_TIMEOUT_SECS"), defaults.timeout_secs),
        cache_ttl_secs: clamp_cache_ttl(parse_or(
            "NCM_CACHE_TTL_SECS",
            env("NCM_CACHE_TTL_SECS"),
            defaults.cache_ttl_secs,
        )),
    };

    // Falha cedo se a URL base for inválida
    config.endpoint("")?;
    log::info!("🔧 API NCM: {}", config.base_url);

    Ok(config)
}
