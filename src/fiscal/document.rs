//! Sanitização, validação e formatação de CPF/CNPJ.
//!
//! Todas as funções são puras, sem I/O e seguras para chamar a cada tecla
//! digitada. Nenhuma delas entra em panic: entrada inválida resulta em
//! `false` (validadores) ou numa máscara parcial (formatador).
//!
//! ## Algoritmo Módulo 11
//!
//! - **CPF**: 9 dígitos base + 2 verificadores. Pesos decrescentes 10→2
//!   (primeiro dígito) e 11→2 (segundo). `resto = (soma * 10) % 11`,
//!   e restos 10 ou 11 viram 0.
//! - **CNPJ**: 12 dígitos base + 2 verificadores. Pesos começam em
//!   `tamanho - 7`, decrescem e voltam para 9 quando ficariam abaixo de 2.
//!   `dígito = 0` se `soma % 11 < 2`, senão `11 - soma % 11`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Quantidade de dígitos de um CPF.
pub const CPF_LEN: usize = 11;

/// Quantidade de dígitos de um CNPJ.
pub const CNPJ_LEN: usize = 14;

/// Máscara CPF: `000.000.000-00` (separador inserido antes do índice).
pub(crate) const CPF_SEPARATORS: &[(usize, char)] = &[(3, '.'), (6, '.'), (9, '-')];

/// Máscara CNPJ: `00.000.000/0000-00`.
pub(crate) const CNPJ_SEPARATORS: &[(usize, char)] = &[(2, '.'), (5, '.'), (8, '/'), (12, '-')];

/// Tipo de documento fiscal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Cadastro de Pessoa Física (11 dígitos).
    Cpf,
    /// Cadastro Nacional da Pessoa Jurídica (14 dígitos).
    Cnpj,
}

impl DocumentKind {
    /// Detecta o tipo pelo tamanho exato após sanitização.
    pub fn detect(doc: &str) -> Option<Self> {
        match sanitize_document(doc).len() {
            CPF_LEN => Some(Self::Cpf),
            CNPJ_LEN => Some(Self::Cnpj),
            _ => None,
        }
    }

    /// Quantidade de dígitos esperada.
    pub fn digit_count(&self) -> usize {
        match self {
            Self::Cpf => CPF_LEN,
            Self::Cnpj => CNPJ_LEN,
        }
    }

    /// Valida `doc` como este tipo de documento.
    pub fn is_valid(&self, doc: &str) -> bool {
        match self {
            Self::Cpf => is_valid_cpf(doc),
            Self::Cnpj => is_valid_cnpj(doc),
        }
    }

    /// Nome para exibição.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Cpf => "CPF",
            Self::Cnpj => "CNPJ",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Motivo pelo qual um documento foi rejeitado.
///
/// Os validadores booleanos ([`is_valid_cpf`], [`is_valid_cnpj`]) são o
/// contrato principal; este erro existe para diagnósticos (CLI, logs).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("Invalid length: {found} digits (expected 11 for CPF or 14 for CNPJ)")]
    InvalidLength { found: usize },

    #[error("{kind} with all digits equal is not allowed")]
    RepeatedDigits { kind: DocumentKind },

    #[error("{kind} check digit at position {position} should be {expected}, found {found}")]
    CheckDigitMismatch {
        kind: DocumentKind,
        position: usize,
        expected: u8,
        found: u8,
    },
}

/// Remove todos os caracteres que não são dígitos ASCII.
///
/// Função total e idempotente: `sanitize(sanitize(x)) == sanitize(x)`.
pub fn sanitize_document(doc: &str) -> String {
    doc.chars().filter(char::is_ascii_digit).collect()
}

/// Valida um CPF pelo algoritmo de Módulo 11.
///
/// Aceita entrada formatada ou não (`"111.444.777-35"` ou `"11144477735"`).
pub fn is_valid_cpf(cpf: &str) -> bool {
    check_cpf(&sanitize_document(cpf)).is_ok()
}

/// Valida um CNPJ pelo algoritmo de Módulo 11.
pub fn is_valid_cnpj(cnpj: &str) -> bool {
    check_cnpj(&sanitize_document(cnpj)).is_ok()
}

/// Valida um documento detectando o tipo pelo tamanho.
///
/// Retorna o tipo reconhecido ou o motivo da rejeição.
pub fn validate_document(doc: &str) -> Result<DocumentKind, DocumentError> {
    let clean = sanitize_document(doc);
    match clean.len() {
        CPF_LEN => check_cpf(&clean).map(|_| DocumentKind::Cpf),
        CNPJ_LEN => check_cnpj(&clean).map(|_| DocumentKind::Cnpj),
        found => Err(DocumentError::InvalidLength { found }),
    }
}

/// Formata dinamicamente um documento (CPF ou CNPJ) com máscara.
///
/// Até 11 dígitos usa a máscara de CPF, acima disso a de CNPJ. Separadores
/// só aparecem onde já existe dígito depois deles, então a função pode ser
/// chamada a cada tecla:
///
/// ```rust
/// use atelie_fiscal::fiscal::format_document;
///
/// assert_eq!(format_document("1114447"), "111.444.7");
/// assert_eq!(format_document("11222333000181"), "11.222.333/0001-81");
/// ```
pub fn format_document(doc: &str) -> String {
    let clean = sanitize_document(doc);

    if clean.len() <= CPF_LEN {
        apply_separators(&clean, CPF_SEPARATORS, CPF_LEN)
    } else {
        apply_separators(&clean, CNPJ_SEPARATORS, CNPJ_LEN)
    }
}

/// Insere separadores antes dos índices indicados, truncando em `max_digits`.
pub(crate) fn apply_separators(clean: &str, separators: &[(usize, char)], max_digits: usize) -> String {
    let mut out = String::with_capacity(max_digits + separators.len());

    for (index, ch) in clean.chars().take(max_digits).enumerate() {
        if let Some((_, separator)) = separators.iter().find(|(at, _)| *at == index) {
            out.push(*separator);
        }
        out.push(ch);
    }

    out
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MÓDULO 11
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn to_digits(clean: &str) -> Vec<u8> {
    clean.bytes().map(|b| b - b'0').collect()
}

fn all_equal(digits: &[u8]) -> bool {
    digits.windows(2).all(|pair| pair[0] == pair[1])
}

/// Dígito verificador de CPF sobre os `n` primeiros dígitos (9 ou 10).
fn cpf_check_digit(base: &[u8]) -> u8 {
    let first_weight = base.len() as u32 + 1;
    let sum: u32 = base
        .iter()
        .enumerate()
        .map(|(i, &d)| d as u32 * (first_weight - i as u32))
        .sum();

    let remainder = (sum * 10) % 11;
    if remainder >= 10 {
        0
    } else {
        remainder as u8
    }
}

/// Dígito verificador de CNPJ sobre os `n` primeiros dígitos (12 ou 13).
fn cnpj_check_digit(base: &[u8]) -> u8 {
    let mut weight = base.len() as u32 - 7;
    let mut sum = 0u32;

    for &d in base {
        sum += d as u32 * weight;
        weight -= 1;
        if weight < 2 {
            weight = 9;
        }
    }

    let remainder = sum % 11;
    if remainder < 2 {
        0
    } else {
        (11 - remainder) as u8
    }
}

fn check_cpf(clean: &str) -> Result<(), DocumentError> {
    check_digits(clean, DocumentKind::Cpf, cpf_check_digit)
}

fn check_cnpj(clean: &str) -> Result<(), DocumentError> {
    check_digits(clean, DocumentKind::Cnpj, cnpj_check_digit)
}

fn check_digits(
    clean: &str,
    kind: DocumentKind,
    check_digit: fn(&[u8]) -> u8,
) -> Result<(), DocumentError> {
    let digits = to_digits(clean);
    let len = kind.digit_count();

    if digits.len() != len {
        return Err(DocumentError::InvalidLength { found: digits.len() });
    }

    if all_equal(&digits) {
        return Err(DocumentError::RepeatedDigits { kind });
    }

    // Segundo dígito é calculado já incluindo o primeiro
    for index in [len - 2, len - 1] {
        let expected = check_digit(&digits[..index]);
        if expected != digits[index] {
            return Err(DocumentError::CheckDigitMismatch {
                kind,
                position: index + 1,
                expected,
                found: digits[index],
            });
        }
    }

    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// VALOR DE DOCUMENTO
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Documento em suas duas representações: bruta (só dígitos) e mascarada.
///
/// Recriado a cada edição do campo. `raw` é sempre
/// `sanitize_document(display)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentValue {
    raw: String,
    display: String,
}

impl DocumentValue {
    /// Cria a partir do texto digitado pelo usuário (limite de 14 dígitos).
    pub fn from_input(input: &str) -> Self {
        let raw: String = sanitize_document(input).chars().take(CNPJ_LEN).collect();
        let display = format_document(&raw);
        Self { raw, display }
    }

    /// Forma canônica, apenas dígitos.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Forma mascarada para exibição.
    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Tipo do documento, se o tamanho já estiver completo.
    pub fn kind(&self) -> Option<DocumentKind> {
        DocumentKind::detect(&self.raw)
    }

    /// Valida o documento (CPF ou CNPJ conforme o tamanho).
    pub fn validate(&self) -> Result<DocumentKind, DocumentError> {
        validate_document(&self.raw)
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl From<&str> for DocumentValue {
    fn from(input: &str) -> Self {
        Self::from_input(input)
    }
}

impl fmt::Display for DocumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}
