//! Interface de terminal com os campos NCM e CPF/CNPJ.
//!
//! Hospeda uma sessão [`NcmAutocomplete`](crate::ncm::NcmAutocomplete):
//! teclas viram [`Key`](crate::ncm::Key), cliques passam pelo
//! [`PointerBus`](crate::ncm::PointerBus) e o layout define a área usada
//! para o clique fora.

mod app;
mod runner;
mod ui;

pub use app::{App, AppEvent, AppLayout, Field, LogEntry, LogLevel};
pub use runner::{create_event_channel, run_tui, TuiLogger, TuiOutcome};
