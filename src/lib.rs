//! # Ateliê Fiscal
//!
//! Núcleo fiscal do e-commerce do Ateliê: validação e formatação de
//! documentos brasileiros (CPF/CNPJ) e o campo de busca de códigos NCM.
//!
//! ## Componentes
//!
//! ### 1. Documentos fiscais (`fiscal`)
//! Funções puras, seguras para chamar a cada tecla:
//! - [`sanitize_document`]: remove tudo que não é dígito (idempotente)
//! - [`is_valid_cpf`] / [`is_valid_cnpj`]: verificação Módulo 11
//! - [`format_document`]: máscara progressiva de CPF ou CNPJ
//! - [`MaskKind`]: máscaras de campo (CPF, CNPJ, CPF-ou-CNPJ, CEP)
//!
//! ### 2. Debounce (`debounce`)
//! Timer cancelável explícito (arm/cancel/dispose) que emite só o último
//! valor de uma rajada.
//!
//! ### 3. Autocomplete NCM (`ncm`)
//! Sessão que liga o texto digitado a um colaborador de busca remoto:
//! - Busca após 400ms de silêncio e com ao menos 2 caracteres
//! - Navegação por teclado, commit, limpar e clique fora
//! - Guarda de geração: respostas obsoletas nunca são aplicadas
//!
//! ## Exemplo de Uso
//!
//! ```rust,ignore
//! use atelie_fiscal::prelude::*;
//! use std::sync::Arc;
//!
//! assert!(is_valid_cpf("111.444.777-35"));
//! assert_eq!(format_document("11222333000181"), "11.222.333/0001-81");
//!
//! let client = Arc::new(HttpNcmClient::from_env()?);
//! let ncm = NcmAutocomplete::builder(client)
//!     .on_change(|value| println!("NCM: {value}"))
//!     .build();
//! ncm.input("velas");
//! ```

#![warn(rust_2018_idioms)]

/// Tipos compartilhados entre cliente, cache e sessão.
pub mod types;

/// Validação e formatação de CPF/CNPJ e máscaras de campo.
pub mod fiscal;

/// Debounce trailing-edge com timer cancelável.
pub mod debounce;

/// Cliente de busca NCM, cache e sessão de autocomplete.
pub mod ncm;

/// Configuração via variáveis de ambiente.
///
/// **Autocomplete:**
/// - `NCM_DEBOUNCE_MS`: atraso do debounce (padrão: 400)
/// - `NCM_MIN_CHARS`: mínimo de caracteres para buscar (padrão: 2)
/// - `NCM_VISIBLE_ROWS`: linhas visíveis no dropdown (padrão: 6)
///
/// **API:**
/// - `NCM_API_BASE_URL`: URL base do backend
/// - `NCM_API_TOKEN`: token Bearer (opcional)
/// - `NCM_PAGE_SIZE`, `NCM_TIMEOUT_SECS`, `NCM_CACHE_TTL_SECS`
pub mod config;

/// Interface de terminal (TUI).
pub mod tui;

// Re-exports principais
pub use config::{load_api_config, load_autocomplete_config, AutocompleteConfig, NcmApiConfig};
pub use debounce::Debouncer;
pub use fiscal::{
    format_document, is_valid_cnpj, is_valid_cpf, sanitize_document, validate_document,
    DocumentError, DocumentKind, DocumentValue, MaskKind,
};
pub use types::{NcmOption, NcmPage};

/// Versão da biblioteca.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude com imports comuns para uso rápido.
pub mod prelude {
    pub use crate::config::{AutocompleteConfig, NcmApiConfig};
    pub use crate::debounce::Debouncer;
    pub use crate::fiscal::{
        format_document, is_valid_cnpj, is_valid_cpf, sanitize_document, validate_document,
        DocumentKind, DocumentValue, MaskKind,
    };
    pub use crate::ncm::{
        CachedNcmClient, DropdownView, HttpNcmClient, Key, NcmAutocomplete, NcmSearchClient,
        NcmSearchError, StaticNcmClient,
    };
    pub use crate::types::NcmOption;
}
