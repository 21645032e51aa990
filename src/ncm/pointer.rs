//! Eventos de ponteiro em nível de documento.
//!
//! Cada sessão de autocomplete assina o barramento ao ser criada e cancela a
//! assinatura ao ser descartada; um clique fora da área do componente fecha
//! o dropdown.

use tokio::sync::broadcast;

/// Clique (botão pressionado) em coordenadas de tela.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerDown {
    pub x: u16,
    pub y: u16,
}

impl PointerDown {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// Área ocupada por um componente (campo + dropdown).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Bounds {
    pub fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, point: PointerDown) -> bool {
        let right = self.x as u32 + self.width as u32;
        let bottom = self.y as u32 + self.height as u32;
        point.x >= self.x
            && (point.x as u32) < right
            && point.y >= self.y
            && (point.y as u32) < bottom
    }
}

/// Barramento de cliques compartilhado pela tela.
#[derive(Debug, Clone)]
pub struct PointerBus {
    tx: broadcast::Sender<PointerDown>,
}

impl PointerBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    /// Publica um clique. Sem assinantes, o evento é descartado.
    pub fn publish(&self, event: PointerDown) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PointerDown> {
        self.tx.subscribe()
    }

    /// Assinantes ativos.
    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for PointerBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_contains() {
        let bounds = Bounds::new(10, 5, 20, 3);
        assert!(bounds.contains(PointerDown::new(10, 5)));
        assert!(bounds.contains(PointerDown::new(29, 7)));
        assert!(!bounds.contains(PointerDown::new(30, 7)));
        assert!(!bounds.contains(PointerDown::new(15, 8)));
        assert!(!bounds.contains(PointerDown::new(9, 5)));
        assert!(!Bounds::default().contains(PointerDown::new(0, 0)));
    }

    #[tokio::test]
    async fn test_bus_delivers_to_subscribers() {
        let bus = PointerBus::new();
        bus.publish(PointerDown::new(0, 0));

        let mut rx = bus.subscribe();
        assert_eq!(bus.listener_count(), 1);

        bus.publish(PointerDown::new(3, 4));
        assert_eq!(rx.recv().await.unwrap(), PointerDown::new(3, 4));

        drop(rx);
        assert_eq!(bus.listener_count(), 0);
    }
}
