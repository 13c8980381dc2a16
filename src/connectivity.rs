//! Connectivity Monitor
//!
//! A boolean seeded once and then driven only by platform online/offline
//! notifications. There is no polling, heartbeat or debounce: every event is
//! forwarded to subscribers as it arrives.
//!
//! Code running inside [`provide`] can read the monitor through
//! [`is_online`]. Reading it anywhere else is a caller bug and panics.

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Platform connectivity notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkEvent {
    Online,
    Offline,
}

impl NetworkEvent {
    pub fn is_online(&self) -> bool {
        matches!(self, NetworkEvent::Online)
    }
}

/// Current online status, shared by every clone
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    state: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (state, _) = watch::channel(initially_online);
        Self {
            state: Arc::new(state),
        }
    }

    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    /// Apply one platform notification; returns the new status
    pub fn apply(&self, event: NetworkEvent) -> bool {
        let online = event.is_online();
        let previous = self.state.send_replace(online);
        if previous != online {
            info!(online, "connectivity changed");
        }
        online
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    /// Drive the monitor from a platform event stream until it ends
    pub async fn listen<S>(&self, events: S)
    where
        S: Stream<Item = NetworkEvent>,
    {
        let mut events = std::pin::pin!(events);
        while let Some(event) = events.next().await {
            self.apply(event);
        }
    }
}

tokio::task_local! {
    static PROVIDED: ConnectivityMonitor;
}

/// Run `fut` with `monitor` readable through [`is_online`] and [`current`]
pub async fn provide<F: Future>(monitor: ConnectivityMonitor, fut: F) -> F::Output {
    PROVIDED.scope(monitor, fut).await
}

/// The monitor of the enclosing provider scope.
///
/// # Panics
///
/// Panics when called outside [`provide`].
pub fn current() -> ConnectivityMonitor {
    match PROVIDED.try_with(ConnectivityMonitor::clone) {
        Ok(monitor) => monitor,
        Err(_) => panic!("connectivity status read outside of a connectivity provider scope"),
    }
}

/// Online status of the enclosing provider scope.
///
/// # Panics
///
/// Panics when called outside [`provide`].
pub fn is_online() -> bool {
    current().is_online()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[test]
    fn test_apply_follows_events() {
        let monitor = ConnectivityMonitor::new(true);
        assert!(!monitor.apply(NetworkEvent::Offline));
        assert!(!monitor.is_online());
        assert!(monitor.apply(NetworkEvent::Online));
        assert!(monitor.is_online());
    }

    #[tokio::test]
    async fn test_listen_forwards_every_event() {
        let monitor = ConnectivityMonitor::new(false);
        let mut rx = monitor.subscribe();

        monitor
            .listen(stream::iter(vec![NetworkEvent::Online, NetworkEvent::Offline, NetworkEvent::Online]))
            .await;

        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());
        assert!(monitor.is_online());
    }

    #[tokio::test]
    async fn test_provider_scope_exposes_status() {
        let monitor = ConnectivityMonitor::new(true);
        let handle = monitor.clone();

        let seen = provide(monitor, async move {
            let before = is_online();
            handle.apply(NetworkEvent::Offline);
            (before, is_online())
        })
        .await;

        assert_eq!(seen, (true, false));
    }

    #[test]
    #[should_panic(expected = "outside of a connectivity provider scope")]
    fn test_is_online_outside_scope_panics() {
        is_online();
    }

    #[test]
    fn test_event_wire_names() {
        assert_eq!(serde_json::to_value(NetworkEvent::Offline).unwrap(), "offline");
    }
}
