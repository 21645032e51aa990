// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CLIENTE DE BUSCA NCM
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Trait do colaborador de busca e implementações:
// - HttpNcmClient: backend REST (`/api/fiscal/ncm`)
// - StaticNcmClient: catálogo em memória (testes, modo offline)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::config::{load_api_config, ConfigError, NcmApiConfig};
use crate::fiscal::sanitize_document;
use crate::types::{NcmOption, NcmPage};

/// Erros do cliente de busca NCM
#[derive(Debug, thiserror::Error)]
pub enum NcmSearchError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error ({status}): {body}")]
    ApiError { status: u16, body: String },

    #[error("Authentication failed")]
    AuthError,

    #[error("Invalid response format: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Search task failed: {0}")]
    TaskFailed(String),
}

/// Colaborador de busca usado pelo autocomplete.
///
/// Deve tolerar chamadas repetidas em sequência rápida. "Nenhum resultado"
/// é um `Ok(vec![])`, nunca um erro.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NcmSearchClient: Send + Sync {
    /// Busca códigos NCM por código ou descrição.
    async fn search(&self, query: &str) -> Result<Vec<NcmOption>, NcmSearchError>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO HTTP
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// O backend responde com página (`{content, totalElements, ...}`); versões
/// antigas respondiam com a lista pura.
#[derive(Deserialize)]
#[serde(untagged)]
enum NcmResponse {
    Page(NcmPage),
    List(Vec<NcmOption>),
}

impl From<NcmResponse> for NcmPage {
    fn from(response: NcmResponse) -> Self {
        match response {
            NcmResponse::Page(page) => page,
            NcmResponse::List(content) => NcmPage {
                total_elements: content.len() as u64,
                total_pages: 1,
                content,
            },
        }
    }
}

/// Cliente do endpoint fiscal de NCM do backend.
///
/// # Exemplo
/// ```rust,ignore
/// use atelie_fiscal::ncm::{HttpNcmClient, NcmSearchClient};
///
/// let client = HttpNcmClient::from_env()?;
/// let options = client.search("velas").await?;
/// ```
pub struct HttpNcmClient {
    /// Cliente HTTP.
    client: Client,
    /// Configuração.
    config: NcmApiConfig,
    /// `GET` de busca.
    search_url: Url,
    /// `POST` de sincronização do catálogo.
    sync_url: Url,
}

impl HttpNcmClient {
    /// Cria o cliente com configuração explícita.
    pub fn new(config: NcmApiConfig) -> Result<Self, NcmSearchError> {
        let search_url = config.endpoint("api/fiscal/ncm")?;
        let sync_url = config.endpoint("api/fiscal/ncm/sync")?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| NcmSearchError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            config,
            search_url,
            sync_url,
        })
    }

    /// Cria o cliente a partir das variáveis de ambiente.
    pub fn from_env() -> Result<Self, NcmSearchError> {
        Self::new(load_api_config()?)
    }

    pub fn config(&self) -> &NcmApiConfig {
        &self.config
    }

    /// Busca uma página específica de resultados.
    pub async fn search_page(&self, query: &str, page: u32) -> Result<NcmPage, NcmSearchError> {
        let started = Instant::now();

        let request = self
            .add_auth_headers(self.client.get(self.search_url.clone()))
            .query(&[
                ("query", query.to_string()),
                ("page", page.to_string()),
                ("size", self.config.page_size.to_string()),
            ]);

        let response = request
            .send()
            .await
            .map_err(|e| NcmSearchError::NetworkError(e.to_string()))?;

        let page: NcmPage = self.handle_response::<NcmResponse>(response).await?.into();

        log::debug!(
            "🔎 NCM '{}' → {} de {} resultados em {}ms",
            query,
            page.content.len(),
            page.total_elements,
            started.elapsed().as_millis()
        );

        Ok(page)
    }

    /// Dispara a sincronização do catálogo NCM no backend (`204 No Content`).
    pub async fn sync(&self) -> Result<(), NcmSearchError> {
        let response = self
            .add_auth_headers(self.client.post(self.sync_url.clone()))
            .send()
            .await
            .map_err(|e| NcmSearchError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            log::info!("🔄 Sincronização do catálogo NCM solicitada");
            Ok(())
        } else {
            Err(Self::error_for(status, response).await)
        }
    }

    fn add_auth_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.auth_token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, NcmSearchError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| NcmSearchError::ParseError(e.to_string()))
        } else {
            Err(Self::error_for(status, response).await)
        }
    }

    async fn error_for(status: reqwest::StatusCode, response: reqwest::Response) -> NcmSearchError {
        match status.as_u16() {
            401 | 403 => NcmSearchError::AuthError,
            code => NcmSearchError::ApiError {
                status: code,
                body: response.text().await.unwrap_or_default(),
            },
        }
    }
}

impl std::fmt::Debug for HttpNcmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpNcmClient")
            .field("search_url", &self.search_url.as_str())
            .field("page_size", &self.config.page_size)
            .field("authenticated", &self.config.auth_token.is_some())
            .finish()
    }
}

#[async_trait]
impl NcmSearchClient for HttpNcmClient {
    async fn search(&self, query: &str) -> Result<Vec<NcmOption>, NcmSearchError> {
        Ok(self.search_page(query, 0).await?.content)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CATÁLOGO ESTÁTICO
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Consultas mantidas no histórico do [`StaticNcmClient`].
pub const MAX_RECORDED_QUERIES: usize = 200;

/// Catálogo NCM em memória.
///
/// Usado em testes e no modo offline da TUI. Permite simular latência e
/// queda do serviço, e registra as últimas [`MAX_RECORDED_QUERIES`] consultas.
#[derive(Debug)]
pub struct StaticNcmClient {
    catalog: Vec<NcmOption>,
    latency: Duration,
    limit: usize,
    failing: AtomicBool,
    queries: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl StaticNcmClient {
    pub fn new(catalog: Vec<NcmOption>) -> Self {
        Self {
            catalog,
            latency: Duration::ZERO,
            limit: crate::config::DEFAULT_PAGE_SIZE as usize,
            failing: AtomicBool::new(false),
            queries: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Catálogo de exemplo com itens típicos do ateliê.
    pub fn with_defaults() -> Self {
        Self::new(default_catalog())
    }

    /// Atraso artificial de cada busca.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Máximo de resultados por busca.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Liga/desliga a simulação de falha de rede.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Últimas consultas recebidas, em ordem.
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Total de buscas desde a criação (inclui as que já saíram do histórico).
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn matches(option: &NcmOption, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return false;
        }

        let looks_like_code = query
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c.is_whitespace());

        if looks_like_code {
            sanitize_document(&option.code).starts_with(&sanitize_document(&query))
        } else {
            option.description.to_lowercase().contains(&query)
        }
    }
}

#[async_trait]
impl NcmSearchClient for StaticNcmClient {
    async fn search(&self, query: &str) -> Result<Vec<NcmOption>, NcmSearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut queries) = self.queries.lock() {
            queries.push_back(query.to_string());
            while queries.len() > MAX_RECORDED_QUERIES {
                queries.pop_front();
            }
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(NcmSearchError::NetworkError("simulated outage".into()));
        }

        Ok(self
            .catalog
            .iter()
            .filter(|option| Self::matches(option, query))
            .take(self.limit)
            .cloned()
            .collect())
    }
}

/// Catálogo de exemplo.
pub fn default_catalog() -> Vec<NcmOption> {
    [
        ("3406.00.00", "Velas, pavios e artigos semelhantes"),
        ("3307.41.00", "Agarbate e outras preparações odoríferas que atuem por combustão"),
        ("3307.49.00", "Outras preparações para perfumar ou desodorizar ambientes"),
        ("4420.10.00", "Estatuetas e outros objetos de ornamentação, de madeira"),
        ("6913.90.00", "Estatuetas e outros objetos de ornamentação, de cerâmica"),
        ("3926.40.00", "Estatuetas e outros objetos de ornamentação, de plástico"),
        ("7117.19.00", "Outras bijuterias de metais comuns"),
        ("7117.90.00", "Outras bijuterias"),
        ("6109.10.00", "Camisetas de malha de algodão"),
        ("6302.60.00", "Roupas de toucador ou de cozinha, de tecidos atoalhados de algodão"),
        ("8471.30.12", "Máquinas portáteis de processamento de dados, peso inferior a 3,5 kg"),
    ]
    .into_iter()
    .map(|(code, description)| NcmOption::new(code, description))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_search_by_description() {
        let client = StaticNcmClient::with_defaults();

        let results = client.search("estatuetas").await.unwrap();
        let codes: Vec<&str> = results.iter().map(|o| o.code.as_str()).collect();
        assert_eq!(codes, vec!["4420.10.00", "6913.90.00", "3926.40.00"]);
    }

    #[tokio::test]
    async fn test_static_search_by_code_prefix() {
        let client = StaticNcmClient::with_defaults();

        let results = client.search("3307").await.unwrap();
        assert_eq!(results.len(), 2);

        let dotted = client.search("7117.1").await.unwrap();
        assert_eq!(dotted, vec![NcmOption::new("7117.19.00", "Outras bijuterias de metais comuns")]);
    }

    #[tokio::test]
    async fn test_static_no_match_is_empty_not_error() {
        let client = StaticNcmClient::with_defaults();
        let results = client.search("xyzxyz").await.unwrap();
        assert!(results.is_empty());
        assert_eq!(client.queries(), vec!["xyzxyz".to_string()]);
    }

    #[tokio::test]
    async fn test_static_query_history_is_capped() {
        let client = StaticNcmClient::with_defaults();
        for i in 0..MAX_RECORDED_QUERIES + 50 {
            client.search(&format!("busca {i}")).await.unwrap();
        }

        let queries = client.queries();
        assert_eq!(queries.len(), MAX_RECORDED_QUERIES);
        assert_eq!(queries.first().map(String::as_str), Some("busca 50"));
        assert_eq!(client.call_count(), MAX_RECORDED_QUERIES + 50);
    }

    #[tokio::test]
    async fn test_static_failure_and_limit() {
        let client = StaticNcmClient::with_defaults().with_limit(1);
        assert_eq!(client.search("estatuetas").await.unwrap().len(), 1);

        client.set_failing(true);
        let err = client.search("estatuetas").await.unwrap_err();
        assert!(matches!(err, NcmSearchError::NetworkError(_)));
        assert_eq!(client.call_count(), 2);
    }

    #[test]
    fn test_list_response_converts_to_page() {
        let response: NcmResponse =
            serde_json::from_str(r#"[{"code": "3406.00.00", "description": "Velas"}]"#).unwrap();
        let page: NcmPage = response.into();
        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].code, "3406.00.00");
    }

    #[test]
    fn test_http_client_rejects_invalid_base_url() {
        let config = NcmApiConfig {
            base_url: "::::".into(),
            ..Default::default()
        };
        assert!(matches!(
            HttpNcmClient::new(config),
            Err(NcmSearchError::ConfigError(_))
        ));
    }
}
