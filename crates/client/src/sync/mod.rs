//! Live order synchronization.
//!
//! Keeps an in-memory order list consistent with two sources: the
//! authoritative REST fetch (`GET /customer/my/orders`, full replace) and
//! the order events push topic (status-only overwrites by order id).
//!
//! A push event may arrive while a fetch is in flight. Events applied during
//! that window are also recorded in a reconciliation buffer and re-applied
//! after the replace, so a status change newer than the fetched snapshot is
//! never silently rolled back.
//!
//! The push channel reconnects forever on a fixed delay; drops are logged
//! and never surfaced to callers.

pub mod progress;

pub use progress::StatusProgress;

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::client::generate_key;
use tokio_tungstenite::tungstenite::http::{Request, Uri};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use shoplive_core::{Order, OrderStatusEvent};

use crate::error::{ClientError, Result};
use crate::session::SessionManager;
use crate::store::StoreError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Upper bound on events buffered during one fetch window.
const FETCH_BUFFER_CAP: usize = 256;

#[derive(Debug, Error)]
enum SubscribeError {
    #[error("no stored credentials")]
    NotLoggedIn,
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
    #[error("invalid events url: {0}")]
    Url(#[from] tokio_tungstenite::tungstenite::http::uri::InvalidUri),
    #[error("invalid subscription request: {0}")]
    Request(#[from] tokio_tungstenite::tungstenite::http::Error),
    #[error("connection failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),
}

struct ConnectionHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

/// Live view of the authenticated customer's orders.
///
/// Cheap to clone; clones share the same order list and subscription.
#[derive(Clone)]
pub struct OrderSync {
    inner: Arc<SyncInner>,
}

struct SyncInner {
    session: SessionManager,
    orders: RwLock<Vec<Order>>,
    /// `Some` while a fetch is in flight; push events applied in that window
    /// are recorded here and replayed after the full replace.
    fetch_buffer: Mutex<Option<Vec<OrderStatusEvent>>>,
    connection: tokio::sync::Mutex<Option<ConnectionHandle>>,
}

impl OrderSync {
    /// Create an order sync over a session.
    #[must_use]
    pub fn new(session: SessionManager) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                session,
                orders: RwLock::new(Vec::new()),
                fetch_buffer: Mutex::new(None),
                connection: tokio::sync::Mutex::new(None),
            }),
        }
    }

    /// Snapshot of the current order list, in display order.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.inner.orders.read().clone()
    }

    /// Fetch the full order list and replace the local collection.
    ///
    /// The server is authoritative for fetch: the result replaces everything,
    /// then any push events that arrived during the fetch window are
    /// re-applied on top.
    ///
    /// # Errors
    ///
    /// Any failure - non-OK response or transport error alike - is treated
    /// as "session invalid": credentials are wiped, the local list is
    /// emptied, and `ClientError::SessionInvalid` is returned. This endpoint
    /// is the session's canary; the tradeoff of logging out on a transport
    /// blip is accepted deliberately.
    pub async fn load_orders(&self) -> Result<Vec<Order>> {
        {
            let mut buffer = self.inner.fetch_buffer.lock();
            if buffer.is_none() {
                *buffer = Some(Vec::new());
            }
        }

        let generation = self.inner.session.generation();
        let fetched: Result<Vec<Order>> = self.inner.session.get_json("/customer/my/orders").await;

        match fetched {
            Ok(fetched) => {
                if self.inner.session.generation() != generation {
                    self.inner.fetch_buffer.lock().take();
                    debug!("session changed during order fetch, discarding result");
                    return Err(ClientError::SessionInvalid);
                }

                // Hold the buffer lock across the replace so no event can
                // slip between "drain buffer" and "install snapshot".
                let mut buffer_slot = self.inner.fetch_buffer.lock();
                let buffered = buffer_slot.take().unwrap_or_default();
                let mut orders = self.inner.orders.write();
                *orders = fetched;

                let mut replayed = 0_usize;
                for event in buffered {
                    if let Some(order) = orders.iter_mut().find(|o| o.id == event.order_id) {
                        order.status = event.status;
                        replayed += 1;
                    }
                }

                let snapshot = orders.clone();
                drop(orders);
                drop(buffer_slot);

                info!(count = snapshot.len(), replayed, "order list replaced from fetch");
                Ok(snapshot)
            }
            Err(err) => {
                self.inner.fetch_buffer.lock().take();
                warn!(error = %err, "order fetch failed, treating session as invalid");
                self.inner.session.force_logout();
                self.inner.orders.write().clear();
                Err(ClientError::SessionInvalid)
            }
        }
    }

    /// Start the push subscription if it is not already running.
    ///
    /// The spawned task reconnects forever on a fixed delay; connection
    /// failures never reach the caller.
    pub async fn connect(&self) {
        let mut connection = self.inner.connection.lock().await;
        if let Some(handle) = connection.as_ref()
            && !handle.task.is_finished()
        {
            debug!("order events subscription already active");
            return;
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(run_subscription(inner, shutdown_rx));
        *connection = Some(ConnectionHandle { shutdown_tx, task });
    }

    /// Stop the push subscription.
    ///
    /// Safe to call when never connected or already disconnected.
    pub async fn disconnect(&self) {
        let mut connection = self.inner.connection.lock().await;
        if let Some(handle) = connection.take() {
            let _ = handle.shutdown_tx.try_send(());
            handle.task.abort();
            debug!("order events subscription stopped");
        }
    }
}

impl SyncInner {
    /// Apply a push event: overwrite only the status of the matching order.
    ///
    /// Orders unknown locally are ignored - push is status-only and never
    /// creates orders. Returns whether an order was updated.
    fn apply_event(&self, event: &OrderStatusEvent) -> bool {
        if let Some(buffer) = self.fetch_buffer.lock().as_mut() {
            if buffer.len() < FETCH_BUFFER_CAP {
                buffer.push(event.clone());
            } else {
                warn!("fetch reconciliation buffer full, dropping event");
            }
        }

        let mut orders = self.orders.write();
        match orders.iter_mut().find(|o| o.id == event.order_id) {
            Some(order) => {
                debug!(order_id = %event.order_id, status = %event.status, "order status updated from push");
                order.status = event.status;
                true
            }
            None => {
                debug!(order_id = %event.order_id, "push event for unknown order ignored");
                false
            }
        }
    }

    /// Open the WebSocket with the bearer token on the upgrade request.
    async fn open_socket(&self) -> std::result::Result<(WsStream, String), SubscribeError> {
        let credentials = self.session.credentials();
        let token = credentials
            .access_token()?
            .ok_or(SubscribeError::NotLoggedIn)?;
        let customer_id = credentials
            .customer_id()?
            .ok_or(SubscribeError::NotLoggedIn)?;

        let url = self.session.config().order_events_url.as_str();
        let uri: Uri = url.parse()?;
        let host = uri.host().unwrap_or("localhost");
        let host_header = uri.port_u16().map_or_else(
            || host.to_string(),
            |port| format!("{host}:{port}"),
        );

        let request = Request::builder()
            .uri(url)
            .header("Host", host_header)
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Sec-WebSocket-Version", "13")
            .header("Sec-WebSocket-Key", generate_key())
            .header("Authorization", format!("Bearer {token}"))
            .body(())?;

        let (stream, _) = connect_async(request).await?;
        Ok((stream, customer_id))
    }
}

/// Subscription task: connect, subscribe, pump events, reconnect on a fixed
/// delay until shut down.
async fn run_subscription(inner: Arc<SyncInner>, mut shutdown_rx: mpsc::Receiver<()>) {
    let reconnect_delay = inner.session.config().reconnect_delay;

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        let generation = inner.session.generation();
        match inner.open_socket().await {
            Ok((mut stream, customer_id)) => {
                let subscribe = serde_json::json!({
                    "subscribe": format!("orders/{customer_id}")
                })
                .to_string();

                if let Err(err) = stream.send(Message::Text(subscribe.into())).await {
                    warn!(error = %err, "failed to send subscribe frame");
                } else {
                    info!(customer_id = %customer_id, "order events subscription established");
                    let outcome =
                        pump_events(&inner, &mut stream, &mut shutdown_rx, generation).await;
                    if outcome == PumpOutcome::Shutdown {
                        break;
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "order events connection failed");
            }
        }

        // Fixed reconnect delay, shutdown-aware
        tokio::select! {
            () = tokio::time::sleep(reconnect_delay) => {}
            _ = shutdown_rx.recv() => break,
        }
    }

    debug!("order events task stopped");
}

#[derive(Debug, PartialEq, Eq)]
enum PumpOutcome {
    /// Shutdown was requested; stop the task.
    Shutdown,
    /// The connection dropped or the session changed; reconnect after the
    /// fixed delay.
    Reconnect,
}

/// Read frames until the connection drops, the session changes, or shutdown
/// is requested.
async fn pump_events(
    inner: &Arc<SyncInner>,
    stream: &mut WsStream,
    shutdown_rx: &mut mpsc::Receiver<()>,
    generation: u64,
) -> PumpOutcome {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                let _ = stream.close(None).await;
                return PumpOutcome::Shutdown;
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if inner.session.generation() != generation {
                        debug!("session changed, dropping push event and resubscribing");
                        return PumpOutcome::Reconnect;
                    }
                    match serde_json::from_str::<OrderStatusEvent>(&text) {
                        Ok(event) => { inner.apply_event(&event); }
                        Err(err) => warn!(error = %err, "undecodable order event ignored"),
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    if stream.send(Message::Pong(payload)).await.is_err() {
                        warn!("order events connection lost sending pong");
                        return PumpOutcome::Reconnect;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    warn!("order events connection closed, will reconnect");
                    return PumpOutcome::Reconnect;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(error = %err, "order events connection error, will reconnect");
                    return PumpOutcome::Reconnect;
                }
            }
        }
    }
}
