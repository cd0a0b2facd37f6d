//! Process-wide live-connection count, for metrics and `/healthz` only.
//!
//! Connections themselves hold no shared mutable state — each websocket
//! task owns its own seat/room binding and talks to its room purely through
//! the room's own mailbox. This registry exists only so the gateway can
//! report how many sockets are open without locking any per-connection data.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    active: Arc<AtomicU64>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_count(&self) -> u64 {
        self.active.load(Ordering::Relaxed)
    }

    /// Registers one connection, returning a guard that decrements the count
    /// when the connection's task ends (including on panic/early-return).
    pub fn register(&self) -> ConnectionGuard {
        self.active.fetch_add(1, Ordering::Relaxed);
        crate::metrics::websocket_connections_total();
        crate::metrics::websocket_connections_active(self.active.load(Ordering::Relaxed));
        ConnectionGuard { registry: self.clone() }
    }
}

pub struct ConnectionGuard {
    registry: ConnectionRegistry,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.registry.active.fetch_sub(1, Ordering::Relaxed);
        crate::metrics::websocket_connections_active(self.registry.active_count());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_decrements_on_drop() {
        let registry = ConnectionRegistry::new();
        {
            let _guard = registry.register();
            assert_eq!(registry.active_count(), 1);
        }
        assert_eq!(registry.active_count(), 0);
    }
}
