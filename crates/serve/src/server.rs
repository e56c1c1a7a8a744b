use exn::ResultExt;
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::instrument;

use stash_inspect::ActiveDatabase;

use crate::error::{ErrorKind, Result};
use crate::handlers::{AppState, router};
use crate::observer::{RequestEvent, RequestLog};

#[derive(Debug)]
struct Running {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Serves `GET /{table}/{id}` lookups against whichever database is
/// currently selected in the shared [`ActiveDatabase`].
///
/// At most one listener runs at a time. Dropping the server shuts the
/// listener down.
#[derive(Debug)]
pub struct QueryServer {
    state: AppState,
    running: Mutex<Option<Running>>,
}

impl QueryServer {
    pub fn new(db: ActiveDatabase) -> Self {
        Self {
            state: AppState { db, log: RequestLog::default() },
            running: Mutex::new(None),
        }
    }

    /// Receive an event for every request handled from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RequestEvent> {
        self.state.log.subscribe()
    }

    /// Listen on all interfaces at `port` (`0` picks a free port).
    ///
    /// Calling this while already listening returns the existing address,
    /// whatever `port` is.
    #[instrument(skip(self))]
    pub async fn start(&self, port: u16) -> Result<SocketAddr> {
        let mut running = self.running.lock().await;
        if let Some(current) = running.as_ref() {
            if !current.task.is_finished() {
                return Ok(current.addr);
            }
            tracing::warn!(addr = %current.addr, "Previous listener ended on its own; restarting");
        }
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await.or_raise(|| ErrorKind::Bind(port))?;
        let addr = listener.local_addr().or_raise(|| ErrorKind::Bind(port))?;
        let (shutdown, signal) = oneshot::channel::<()>();
        let app = router(self.state.clone());
        let task = tokio::spawn(async move {
            // A dropped sender also resolves the signal.
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = signal.await;
                })
                .await;
            if let Err(err) = result {
                tracing::error!(%err, "Query server stopped unexpectedly");
            }
        });
        tracing::info!(%addr, "Query server listening");
        *running = Some(Running { addr, shutdown, task });
        Ok(addr)
    }

    /// Stop listening and wait until the port is released. Does nothing if
    /// the server is not running.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<()> {
        let Some(running) = self.running.lock().await.take() else {
            return Ok(());
        };
        let _ = running.shutdown.send(());
        running.task.await.or_raise(|| ErrorKind::Server)?;
        tracing::info!(addr = %running.addr, "Query server stopped");
        Ok(())
    }

    /// Address of the running listener, if any.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().filter(|r| !r.task.is_finished()).map(|r| r.addr)
    }

    pub async fn is_running(&self) -> bool {
        self.local_addr().await.is_some()
    }
}
