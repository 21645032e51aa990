// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TIPOS FUNDAMENTAIS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Estruturas de dados compartilhadas entre o cliente de busca NCM,
// o cache e a sessão de autocomplete.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use serde::{Deserialize, Serialize};

/// Código de classificação fiscal NCM retornado pela busca.
///
/// Imutável depois de recebido. Um lote de opções é sempre substituído por
/// inteiro a cada nova busca, nunca mesclado.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NcmOption {
    /// Código NCM (ex: `"3406.00.00"`).
    pub code: String,
    /// Descrição oficial.
    #[serde(default)]
    pub description: String,
}

impl NcmOption {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }
}

/// Página de resultados do endpoint `GET /api/fiscal/ncm`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NcmPage {
    /// Opções na ordem retornada pelo backend.
    #[serde(default)]
    pub content: Vec<NcmOption>,
    /// Total de registros que casam com a busca.
    #[serde(default)]
    pub total_elements: u64,
    /// Total de páginas.
    #[serde(default)]
    pub total_pages: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ncm_page_deserialization() {
        let json = r#"{
            "content": [{"code": "8471", "description": "Teste"}],
            "totalElements": 1,
            "totalPages": 1,
            "number": 0,
            "size": 20
        }"#;

        let page: NcmPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.content, vec![NcmOption::new("8471", "Teste")]);
        assert_eq!(page.total_elements, 1);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_ncm_option_without_description() {
        let option: NcmOption = serde_json::from_str(r#"{"code": "3406.00.00"}"#).unwrap();
        assert_eq!(option.code, "3406.00.00");
        assert!(option.description.is_empty());
    }
}
