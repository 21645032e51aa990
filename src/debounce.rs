// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DEBOUNCE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Debounce trailing-edge como timer cancelável explícito (arm/cancel).
// Cada sessão de autocomplete possui o seu; nada é compartilhado.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Atualização agendada ainda não entregue.
#[derive(Debug)]
struct Pending<T> {
    value: T,
    handle: JoinHandle<()>,
}

/// Cópia atrasada de um valor que muda rapidamente.
///
/// A saída só muda depois que a entrada fica estável por `delay`. Durante
/// uma rajada de mudanças nenhum valor intermediário é emitido.
///
/// Precisa de um runtime Tokio ativo: cada [`set`](Self::set) agenda uma
/// task com `tokio::spawn`.
///
/// # Exemplo
///
/// ```rust,ignore
/// let mut debouncer = Debouncer::new(String::new(), Duration::from_millis(400));
/// let mut rx = debouncer.subscribe();
///
/// debouncer.set("8".into());
/// debouncer.set("84".into()); // cancela o "8"
///
/// rx.changed().await?;
/// assert_eq!(*rx.borrow(), "84");
/// ```
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    tx: Arc<watch::Sender<T>>,
    pending: Option<Pending<T>>,
    /// Incrementado a cada cancelamento; timers de épocas antigas não emitem.
    epoch: Arc<AtomicU64>,
    disposed: bool,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Cria o debouncer com o valor inicial já emitido.
    pub fn new(initial: T, delay: Duration) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            delay,
            tx: Arc::new(tx),
            pending: None,
            epoch: Arc::new(AtomicU64::new(0)),
            disposed: false,
        }
    }

    /// Recebe as emissões do valor atrasado.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Último valor emitido.
    pub fn current(&self) -> T {
        self.tx.borrow().clone()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Informa um novo valor de entrada.
    ///
    /// Cancela a atualização pendente e agenda outra para `delay` depois.
    pub fn set(&mut self, value: T) {
        if self.disposed {
            log::trace!("Debouncer descartado, ignorando valor");
            return;
        }
        self.cancel();
        self.arm(value);
    }

    /// Altera o atraso, reagendando o valor pendente (se houver).
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
        if self.disposed {
            return;
        }
        if let Some(pending) = self.pending.take() {
            let fired = pending.handle.is_finished();
            pending.handle.abort();
            self.epoch.fetch_add(1, Ordering::SeqCst);
            if !fired {
                self.arm(pending.value);
            }
        }
    }

    /// Se existe uma atualização agendada que ainda não disparou.
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .map(|p| !p.handle.is_finished())
            .unwrap_or(false)
    }

    /// Cancela a atualização pendente sem emitir nada.
    pub fn cancel(&mut self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(pending) = self.pending.take() {
            pending.handle.abort();
        }
    }

    /// Cancela e desativa o debouncer. Nada dispara depois disso.
    pub fn dispose(&mut self) {
        self.cancel();
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn arm(&mut self, value: T) {
        let deadline = Instant::now() + self.delay;
        let tx = Arc::clone(&self.tx);
        let epoch = Arc::clone(&self.epoch);
        let armed_epoch = epoch.load(Ordering::SeqCst);
        let emitted = value.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;

            tx.send_if_modified(|current| {
                if epoch.load(Ordering::SeqCst) != armed_epoch || *current == emitted {
                    return false;
                }
                *current = emitted;
                true
            });
        });

        self.pending = Some(Pending { value, handle });
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(pending) = self.pending.take() {
            pending.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const DELAY: Duration = Duration::from_millis(400);

    /// Coleta todas as emissões em background.
    fn record(debouncer: &Debouncer<String>) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut rx = debouncer.subscribe();
        let sink = Arc::clone(&seen);
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let value = rx.borrow_and_update().clone();
                sink.lock().unwrap().push(value);
            }
        });
        seen
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_emits_only_final_value() {
        let mut debouncer = Debouncer::new(String::new(), DELAY);
        let seen = record(&debouncer);

        for value in ["n", "nc", "ncm"] {
            debouncer.set(value.to_string());
            advance(100).await;
        }

        // 300ms após a última mudança: nada ainda
        advance(299).await;
        assert_eq!(debouncer.current(), "");
        assert!(debouncer.is_pending());

        advance(2).await;
        assert_eq!(debouncer.current(), "ncm");
        assert_eq!(*seen.lock().unwrap(), vec!["ncm".to_string()]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_value_not_emitted_before_delay() {
        let mut debouncer = Debouncer::new(String::new(), DELAY);
        debouncer.set("84".into());

        advance(399).await;
        assert_eq!(debouncer.current(), "");

        advance(2).await;
        assert_eq!(debouncer.current(), "84");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_cancels_pending_update() {
        let mut debouncer = Debouncer::new(String::new(), DELAY);
        let seen = record(&debouncer);

        debouncer.set("84".into());
        advance(100).await;
        debouncer.dispose();
        advance(1000).await;

        assert_eq!(debouncer.current(), "");
        assert!(seen.lock().unwrap().is_empty());

        // Depois de descartado, set é ignorado
        debouncer.set("85".into());
        advance(1000).await;
        assert_eq!(debouncer.current(), "");
        assert!(debouncer.is_disposed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_value_is_not_reemitted() {
        let mut debouncer = Debouncer::new(String::new(), DELAY);
        let seen = record(&debouncer);

        debouncer.set("84".into());
        advance(500).await;
        debouncer.set("845".into());
        advance(100).await;
        debouncer.set("84".into());
        advance(500).await;

        assert_eq!(*seen.lock().unwrap(), vec!["84".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_value() {
        let mut debouncer = Debouncer::new(0u32, DELAY);
        debouncer.set(7);
        debouncer.cancel();
        advance(1000).await;
        assert_eq!(debouncer.current(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_delay_rearms_pending_value() {
        let mut debouncer = Debouncer::new(0u32, DELAY);
        debouncer.set(7);
        advance(300).await;

        debouncer.set_delay(Duration::from_millis(1000));
        advance(200).await;
        assert_eq!(debouncer.current(), 0);

        advance(801).await;
        assert_eq!(debouncer.current(), 7);
        assert_eq!(debouncer.delay(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_timer() {
        let mut debouncer = Debouncer::new(String::new(), DELAY);
        let mut rx = debouncer.subscribe();
        debouncer.set("x".into());
        drop(debouncer);

        advance(1000).await;
        // Sender descartado sem emitir
        assert!(rx.changed().await.is_err());
        assert_eq!(*rx.borrow(), "");
    }
}
