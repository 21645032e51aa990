// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DOCUMENTOS FISCAIS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Validação (Módulo 11) e formatação de CPF/CNPJ, e máscaras de entrada
// para campos fiscais (CPF, CNPJ, CPF-ou-CNPJ, CEP).
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Sanitização, validação e formatação de CPF/CNPJ.
pub mod document;

/// Máscaras de entrada com limite de dígitos.
pub mod mask;

pub use document::{
    format_document, is_valid_cnpj, is_valid_cpf, sanitize_document, validate_document,
    DocumentError, DocumentKind, DocumentValue,
};
pub use mask::{MaskKind, UnknownMask};
