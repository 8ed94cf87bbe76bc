//! Live-client tracking.
//!
//! Every connection registers a [`ClientInfo`] at accept time and
//! unregisters at close. The registry keeps an abort handle for each
//! in-flight request task, so that unregistering a client cancels every
//! operation still running on its behalf: a cancelled handler is dropped
//! at its next suspension point and produces no reply. This is what keeps
//! a reply from being written to a socket whose client has already
//! disappeared.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::task::AbortHandle;
use tracing::{debug, info};

/// Per-connection client handle, carried with every request.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    conn_index: u64,
    suppress_logging: bool,
}

impl ClientInfo {
    /// The connection index, used to correlate log lines.
    pub fn conn_index(&self) -> u64 {
        self.conn_index
    }

    /// True if per-request detail logging is disabled for this client.
    ///
    /// Suppressed clients still get one unadorned outcome line per
    /// request; fingerprints, key comments, and failure reasons are
    /// omitted.
    pub fn suppress_logging(&self) -> bool {
        self.suppress_logging
    }

    /// Logs a request detail line, unless this client suppresses logging.
    pub fn log(&self, req_index: u64, args: std::fmt::Arguments<'_>) {
        if !self.suppress_logging {
            debug!("c#{},r#{}: {}", self.conn_index, req_index, args);
        }
    }

    /// Logs a reply outcome line. Always emitted, even for suppressed
    /// clients.
    pub fn log_outcome(&self, req_index: u64, outcome: &str) {
        debug!("c#{},r#{}: reply: {}", self.conn_index, req_index, outcome);
    }
}

/// Tracks live connections and their in-flight request tasks.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    next_conn: AtomicU64,
    inflight: Mutex<HashMap<u64, Vec<AbortHandle>>>,
}

impl ClientRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection and returns its client handle.
    pub fn register(&self, suppress_logging: bool) -> ClientInfo {
        let conn_index = self.next_conn.fetch_add(1, Ordering::Relaxed);
        self.inflight
            .lock()
            .expect("client registry lock poisoned")
            .insert(conn_index, Vec::new());
        info!("c#{}: new connection", conn_index);
        ClientInfo {
            conn_index,
            suppress_logging,
        }
    }

    /// Associates an in-flight request task with a connection.
    ///
    /// If the connection has already been unregistered (the client raced
    /// a disconnect against request submission), the task is aborted
    /// immediately.
    pub fn track(&self, conn_index: u64, handle: AbortHandle) {
        let mut inflight = self.inflight.lock().expect("client registry lock poisoned");
        match inflight.get_mut(&conn_index) {
            Some(handles) => handles.push(handle),
            None => handle.abort(),
        }
    }

    /// Unregisters a connection, cancelling every in-flight request task
    /// still associated with it.
    pub fn unregister(&self, conn_index: u64) {
        let handles = self
            .inflight
            .lock()
            .expect("client registry lock poisoned")
            .remove(&conn_index);
        if let Some(handles) = handles {
            let cancelled = handles.iter().filter(|h| !h.is_finished()).count();
            for handle in handles {
                handle.abort();
            }
            if cancelled > 0 {
                info!(
                    "c#{}: connection closed, {} operation(s) cancelled",
                    conn_index, cancelled
                );
            } else {
                info!("c#{}: connection closed", conn_index);
            }
        }
    }

    /// Number of task handles currently tracked for a connection.
    pub fn inflight_count(&self, conn_index: u64) -> usize {
        self.inflight
            .lock()
            .expect("client registry lock poisoned")
            .get(&conn_index)
            .map_or(0, Vec::len)
    }
}
