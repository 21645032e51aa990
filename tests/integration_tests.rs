//! # Testes de Integração
//!
//! Fluxos completos pela API pública:
//! - Documento digitado → máscara → validação Módulo 11
//! - Autocomplete NCM → cache → commit no formulário
//! - Clique fora via barramento de ponteiro

use std::sync::{Arc, Mutex};
use std::time::Duration;

use atelie_fiscal::fiscal::{DocumentError, DocumentKind};
use atelie_fiscal::ncm::{
    Bounds, CacheConfig, CachedNcmClient, DropdownView, Key, NcmAutocomplete, PointerBus,
    PointerDown, StaticNcmClient,
};
use atelie_fiscal::prelude::*;

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

// ============================================================================
// TESTE 1: Documento fiscal
// ============================================================================

#[test]
fn test_document_typed_digit_by_digit() {
    let mut typed = String::new();
    let mut last = DocumentValue::default();

    for ch in "52998224725".chars() {
        typed.push(ch);
        last = DocumentValue::from_input(&typed);
        // A máscara nunca perde dígitos
        assert_eq!(sanitize_document(last.display()), typed);
    }

    assert_eq!(last.display(), "529.982.247-25");
    assert_eq!(last.kind(), Some(DocumentKind::Cpf));
    assert!(last.is_valid());
}

#[test]
fn test_document_cpf_grows_into_cnpj() {
    let cpf = DocumentValue::from_input("11144477735");
    assert_eq!(cpf.display(), "111.444.777-35");

    let cnpj = DocumentValue::from_input("11444777000161");
    assert_eq!(cnpj.display(), "11.444.777/0001-61");
    assert_eq!(cnpj.validate(), Ok(DocumentKind::Cnpj));
}

#[test]
fn test_known_valid_documents() {
    for cpf in ["111.444.777-35", "529.982.247-25"] {
        assert!(is_valid_cpf(cpf), "{} deveria ser válido", cpf);
        assert!(!is_valid_cnpj(cpf));
    }
    for cnpj in ["11.222.333/0001-81", "12.345.678/0001-95", "11.444.777/0001-61"] {
        assert!(is_valid_cnpj(cnpj), "{} deveria ser válido", cnpj);
        assert!(!is_valid_cpf(cnpj));
    }
}

#[test]
fn test_validation_errors() {
    assert!(matches!(
        validate_document("123"),
        Err(DocumentError::InvalidLength { found: 3 })
    ));
    assert!(matches!(
        validate_document("000.000.000-00"),
        Err(DocumentError::RepeatedDigits { .. })
    ));
    assert!(matches!(
        validate_document("111.444.777-36"),
        Err(DocumentError::CheckDigitMismatch { .. })
    ));
}

#[test]
fn test_field_masks() {
    assert_eq!("cep".parse::<MaskKind>().unwrap().apply("01310100"), "01310-100");
    assert_eq!(MaskKind::CpfCnpj.apply("1122233300018199"), "11.222.333/0001-81");
    assert_eq!(MaskKind::Cpf.clean("111.444.777-3599"), "11144477735");
    assert!("rg".parse::<MaskKind>().is_err());
}

// ============================================================================
// TESTE 2: Autocomplete NCM com cache
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_autocomplete_commit_reaches_form() {
    let committed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&committed);

    let ncm = NcmAutocomplete::builder(Arc::new(StaticNcmClient::with_defaults()))
        .on_change(move |value| sink.lock().unwrap().push(value.to_string()))
        .build();

    ncm.input("bijuterias");
    advance(401).await;

    assert!(matches!(ncm.view(), DropdownView::Options { ref items, .. } if items.len() == 2));

    ncm.handle_key(Key::ArrowDown);
    ncm.handle_key(Key::ArrowDown);
    let outcome = ncm.handle_key(Key::Enter);

    assert!(outcome.prevent_default);
    assert_eq!(ncm.value(), "7117.90.00");
    assert_eq!(ncm.view(), DropdownView::Hidden);
    assert_eq!(
        committed.lock().unwrap().last().map(String::as_str),
        Some("7117.90.00")
    );

    ncm.dispose();
}

#[tokio::test(start_paused = true)]
async fn test_reopen_is_served_from_cache() {
    let cached = Arc::new(CachedNcmClient::new(
        StaticNcmClient::with_defaults(),
        CacheConfig::default(),
    ));
    let ncm = NcmAutocomplete::builder(cached.clone()).build();

    ncm.input("velas");
    advance(401).await;
    assert_eq!(ncm.snapshot().options.len(), 1);

    // Fechar limpa as opções; reabrir busca de novo o mesmo texto
    ncm.handle_key(Key::Escape);
    assert!(ncm.snapshot().options.is_empty());

    ncm.handle_key(Key::ArrowDown);
    advance(10).await;

    let state = ncm.snapshot();
    assert!(state.is_open);
    assert_eq!(state.options[0].code, "3406.00.00");
    assert_eq!(ncm.stats().requests, 2);
    assert_eq!(cached.inner().call_count(), 1);
    assert_eq!(cached.cache().stats().hits, 1);

    ncm.dispose();
}

#[tokio::test(start_paused = true)]
async fn test_backend_failure_then_recovery() {
    let client = Arc::new(StaticNcmClient::with_defaults());
    let ncm = NcmAutocomplete::builder(client.clone()).build();

    client.set_failing(true);
    ncm.input("agarbate");
    advance(401).await;
    assert_eq!(ncm.view(), DropdownView::NoResults);
    assert_eq!(ncm.stats().failures, 1);

    client.set_failing(false);
    ncm.input("agarbates");
    ncm.input("agarbate");
    ncm.input("velas");
    advance(401).await;

    assert_eq!(ncm.snapshot().options.len(), 1);
    assert_eq!(ncm.stats().requests, 2);

    ncm.dispose();
}

// ============================================================================
// TESTE 3: Clique fora
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_click_outside_closes_dropdown() {
    let bus = PointerBus::new();
    let ncm = NcmAutocomplete::builder(Arc::new(StaticNcmClient::with_defaults()))
        .pointer_bus(&bus, Bounds::new(0, 0, 40, 10))
        .build();

    ncm.input("estatuetas");
    advance(401).await;

    // Dentro da área do componente: continua aberto
    bus.publish(PointerDown::new(5, 5));
    advance(1).await;
    assert!(ncm.snapshot().is_open);

    bus.publish(PointerDown::new(60, 20));
    advance(1).await;
    let state = ncm.snapshot();
    assert!(!state.is_open);
    assert!(state.options.is_empty());
    assert_eq!(state.input_value, "estatuetas");

    ncm.dispose();
    advance(1).await;
    assert_eq!(bus.listener_count(), 0);
}
