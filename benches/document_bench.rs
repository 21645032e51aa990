//! Benchmarks dos validadores e máscaras fiscais.
//!
//! Testa performance de:
//! - Validação Módulo 11 de CPF e CNPJ
//! - Máscara progressiva (chamada a cada tecla)
//! - Normalização de chaves do cache NCM
//!
//! Executar: `cargo bench --bench document_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use atelie_fiscal::fiscal::{
    format_document, is_valid_cnpj, is_valid_cpf, sanitize_document, validate_document, MaskKind,
};
use atelie_fiscal::ncm::CacheKey;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HELPERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn create_test_documents() -> Vec<&'static str> {
    vec![
        "111.444.777-35",
        "52998224725",
        "111.444.777-36",
        "000.000.000-00",
        "11.222.333/0001-81",
        "12345678000195",
        "11.444.777/0001-62",
        "123",
    ]
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// BENCHMARK: Validação
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn bench_validators(c: &mut Criterion) {
    let mut group = c.benchmark_group("validators");

    group.bench_function("cpf_valid", |b| {
        b.iter(|| is_valid_cpf(black_box("111.444.777-35")))
    });

    group.bench_function("cnpj_valid", |b| {
        b.iter(|| is_valid_cnpj(black_box("11.222.333/0001-81")))
    });

    group.bench_function("cpf_repeated_digits", |b| {
        b.iter(|| is_valid_cpf(black_box("111.111.111-11")))
    });

    let documents = create_test_documents();
    group.throughput(Throughput::Elements(documents.len() as u64));
    group.bench_function("validate_mixed", |b| {
        b.iter(|| {
            documents
                .iter()
                .filter(|doc| validate_document(black_box(doc)).is_ok())
                .count()
        })
    });

    group.finish();
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// BENCHMARK: Máscaras
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn bench_masks(c: &mut Criterion) {
    let mut group = c.benchmark_group("masks");

    // Simula digitação: cada prefixo é formatado
    let typed = "11222333000181";
    for len in [3, 11, 14] {
        group.bench_with_input(BenchmarkId::new("format_document", len), &len, |b, &len| {
            b.iter(|| format_document(black_box(&typed[..len])))
        });
    }

    group.bench_function("keystroke_sequence", |b| {
        b.iter(|| {
            (1..=typed.len())
                .map(|len| format_document(black_box(&typed[..len])).len())
                .sum::<usize>()
        })
    });

    group.bench_function("sanitize_formatted", |b| {
        b.iter(|| sanitize_document(black_box("11.222.333/0001-81")))
    });

    for mask in [MaskKind::Cpf, MaskKind::Cnpj, MaskKind::CpfCnpj, MaskKind::Cep] {
        group.bench_with_input(BenchmarkId::new("mask_apply", mask), &mask, |b, mask| {
            b.iter(|| mask.apply(black_box("1122233300018199")))
        });
    }

    group.finish();
}

fn bench_cache_key(c: &mut Criterion) {
    c.bench_function("cache_key_normalize", |b| {
        b.iter(|| CacheKey::from_query(black_box("  Estatuetas de Cerâmica  ")))
    });
}

criterion_group!(benches, bench_validators, bench_masks, bench_cache_key);

criterion_main!(benches);
