//! Máscaras de entrada para campos fiscais.
//!
//! O campo guarda só dígitos (limitados pelo tipo) e exibe o valor
//! mascarado. `cpf-cnpj` escolhe a máscara pelo tamanho atual.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::document::{
    apply_separators, sanitize_document, CNPJ_LEN, CNPJ_SEPARATORS, CPF_LEN, CPF_SEPARATORS,
};

/// Quantidade de dígitos de um CEP.
pub const CEP_LEN: usize = 8;

const CEP_SEPARATORS: &[(usize, char)] = &[(5, '-')];

/// Tipo de máscara de um campo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MaskKind {
    /// `000.000.000-00`
    Cpf,
    /// `00.000.000/0000-00`
    Cnpj,
    /// CPF até 11 dígitos, CNPJ acima disso.
    CpfCnpj,
    /// `00000-000`
    Cep,
}

/// Nome de máscara desconhecido.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown mask: {0} (expected cpf, cnpj, cpf-cnpj or cep)")]
pub struct UnknownMask(pub String);

impl MaskKind {
    /// Máximo de dígitos aceitos pelo campo.
    pub fn max_digits(&self) -> usize {
        match self {
            Self::Cpf => CPF_LEN,
            Self::Cnpj | Self::CpfCnpj => CNPJ_LEN,
            Self::Cep => CEP_LEN,
        }
    }

    /// Valor enviado ao formulário: só dígitos, limitado a `max_digits`.
    pub fn clean(&self, input: &str) -> String {
        sanitize_document(input)
            .chars()
            .take(self.max_digits())
            .collect()
    }

    /// Valor mascarado para exibição.
    pub fn apply(&self, input: &str) -> String {
        let clean = sanitize_document(input);

        match self {
            Self::Cpf => apply_separators(&clean, CPF_SEPARATORS, CPF_LEN),
            Self::Cnpj => apply_separators(&clean, CNPJ_SEPARATORS, CNPJ_LEN),
            Self::CpfCnpj if clean.len() <= CPF_LEN => {
                apply_separators(&clean, CPF_SEPARATORS, CPF_LEN)
            }
            Self::CpfCnpj => apply_separators(&clean, CNPJ_SEPARATORS, CNPJ_LEN),
            Self::Cep => apply_separators(&clean, CEP_SEPARATORS, CEP_LEN),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpf => "cpf",
            Self::Cnpj => "cnpj",
            Self::CpfCnpj => "cpf-cnpj",
            Self::Cep => "cep",
        }
    }
}

impl FromStr for MaskKind {
    type Err = UnknownMask;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpf" => Ok(Self::Cpf),
            "cnpj" => Ok(Self::Cnpj),
            "cpf-cnpj" | "cpf_cnpj" => Ok(Self::CpfCnpj),
            "cep" => Ok(Self::Cep),
            other => Err(UnknownMask(other.to_string())),
        }
    }
}

impl fmt::Display for MaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
