// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ATELIÊ FISCAL CLI
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Uso:
//   atelie-fiscal-cli validate 111.444.777-35
//   atelie-fiscal-cli format 11222333000181
//   atelie-fiscal-cli mask cep 01310100
//   atelie-fiscal-cli ncm "velas"
//   atelie-fiscal-cli ncm-sync
//   atelie-fiscal-cli --tui [--offline]
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use atelie_fiscal::config::{load_api_config, load_autocomplete_config};
use atelie_fiscal::fiscal::{format_document, validate_document, MaskKind};
use atelie_fiscal::ncm::{CacheConfig, CachedNcmClient, HttpNcmClient, NcmSearchClient, StaticNcmClient};
use atelie_fiscal::tui::{create_event_channel, run_tui, TuiLogger};

/// Arquivo de log usado no modo TUI (o terminal fica com a interface).
const TUI_LOG_FILE: &str = "atelie-fiscal.log";

/// Tenta carregar o arquivo .env do diretório atual ou do pai
fn load_dotenv() {
    for path in [PathBuf::from(".env"), PathBuf::from("../.env")] {
        if path.exists() {
            match dotenvy::from_path(&path) {
                Ok(_) => {
                    eprintln!("✓ Carregado .env de: {:?}", path);
                    return;
                }
                Err(e) => eprintln!("⚠ Erro ao carregar {:?}: {}", path, e),
            }
        }
    }
}

fn init_logging(tui_mode: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    if tui_mode {
        match File::create(TUI_LOG_FILE) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!("⚠ Não foi possível criar {}: {}", TUI_LOG_FILE, e);
                builder.filter_level(log::LevelFilter::Off);
            }
        }
    }

    builder.init();
}

fn print_usage(program: &str) {
    eprintln!("Ateliê Fiscal CLI v{}", atelie_fiscal::VERSION);
    eprintln!();
    eprintln!("Uso: {} <comando> [argumentos]", program);
    eprintln!();
    eprintln!("Comandos:");
    eprintln!("  validate <doc>        Valida CPF ou CNPJ (Módulo 11)");
    eprintln!("  format <doc>          Aplica a máscara de CPF/CNPJ");
    eprintln!("  mask <tipo> <valor>   Máscara de campo (cpf, cnpj, cpf-cnpj, cep)");
    eprintln!("  ncm <busca>           Busca códigos NCM no backend");
    eprintln!("  ncm-sync              Solicita a sincronização do catálogo NCM");
    eprintln!("  --tui [--offline]     Formulário interativo (offline usa catálogo local)");
    eprintln!();
    eprintln!("Exemplos:");
    eprintln!("  {} validate 111.444.777-35", program);
    eprintln!("  {} ncm \"velas aromáticas\"", program);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Carregar .env PRIMEIRO, antes de qualquer coisa
    load_dotenv();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("atelie-fiscal-cli");
    let tui_mode = args.get(1).map(String::as_str) == Some("--tui");

    init_logging(tui_mode);

    let Some(command) = args.get(1) else {
        print_usage(program);
        std::process::exit(1);
    };

    match command.as_str() {
        "validate" if args.len() >= 3 => run_validate(&args[2..].join(" ")),
        "format" if args.len() >= 3 => {
            println!("{}", format_document(&args[2..].join(" ")));
            Ok(())
        }
        "mask" if args.len() >= 4 => run_mask(&args[2], &args[3..].join(" ")),
        "ncm" if args.len() >= 3 => run_ncm_search(&args[2..].join(" ")).await,
        "ncm-sync" => run_ncm_sync().await,
        "--tui" => run_tui_mode(args.iter().any(|a| a == "--offline")).await,
        _ => {
            print_usage(program);
            std::process::exit(1);
        }
    }
}

fn run_validate(doc: &str) -> anyhow::Result<()> {
    match validate_document(doc) {
        Ok(kind) => {
            println!("✓ {} válido: {}", kind.display_name(), format_document(doc));
            Ok(())
        }
        Err(e) => {
            println!("✗ Documento inválido: {}", e);
            std::process::exit(2);
        }
    }
}

fn run_mask(kind: &str, value: &str) -> anyhow::Result<()> {
    let mask: MaskKind = kind.parse()?;
    println!("{}", mask.apply(value));
    log::debug!("Valor limpo ({}): {}", mask, mask.clean(value));
    Ok(())
}

async fn run_ncm_search(query: &str) -> anyhow::Result<()> {
    let client = HttpNcmClient::new(load_api_config()?)?;
    let page = client.search_page(query, 0).await?;

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(" NCM: \"{}\" ({} resultados)", query, page.total_elements);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if page.content.is_empty() {
        println!("Nenhum código NCM encontrado.");
    }
    for option in &page.content {
        println!("  {:<12} {}", option.code, option.description);
    }
    if page.total_pages > 1 {
        println!();
        println!("(página 1 de {})", page.total_pages);
    }

    Ok(())
}

async fn run_ncm_sync() -> anyhow::Result<()> {
    let client = HttpNcmClient::new(load_api_config()?)?;
    client.sync().await?;
    println!("✓ Sincronização do catálogo NCM solicitada");
    Ok(())
}

/// Executa o formulário interativo
async fn run_tui_mode(offline: bool) -> anyhow::Result<()> {
    let config = load_autocomplete_config();
    let (tx, rx) = create_event_channel();
    let logger = TuiLogger::new(tx.clone());

    let client: Arc<dyn NcmSearchClient> = if offline {
        logger.warning("Modo offline: usando catálogo NCM local");
        Arc::new(StaticNcmClient::with_defaults())
    } else {
        let api = load_api_config()?;
        let ttl = api.cache_ttl_secs;
        let http = HttpNcmClient::new(api)?;
        logger.info(format!("Backend NCM: {}", http.config().base_url));

        if ttl > 0 {
            Arc::new(CachedNcmClient::new(http, CacheConfig::with_ttl(ttl)))
        } else {
            Arc::new(http)
        }
    };

    // A TUI bloqueia a thread; as tasks da sessão seguem no runtime
    let outcome = tokio::task::spawn_blocking(move || run_tui(client, config, tx, rx)).await??;

    if !outcome.ncm.is_empty() || !outcome.document.is_empty() {
        println!("NCM: {}", outcome.ncm);
        println!("Documento: {}", format_document(&outcome.document));
    }

    Ok(())
}
