//! Connection manager.
//!
//! A single background task owns the transport, the subscription registry and
//! the reconnection loop. The public handle only sends commands to it, so
//! every mutation of the registry and every write to the socket happens in
//! one place and in order.

use std::sync::Arc;
use std::time::Duration;

use navbat_server::{
    domain::{OrganizationId, QueueEvent},
    infrastructure::dto::websocket::{ClientMessage, ServerMessage},
};
use tokio::{
    sync::{broadcast, mpsc, oneshot, watch},
    task::JoinHandle,
    time::{self, Instant},
};

use super::{
    backoff::Backoff,
    state::ConnectionState,
    transport::{Connector, Frame, Transport},
};
use crate::{
    config::ClientConfig,
    error::{ClientError, ConnectError, TransportError},
    subscription::{ChannelSubscription, SubscriptionRegistry},
};

const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);
/// `time::interval_at` panics on a zero period
const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug)]
pub(crate) enum Command {
    Connect,
    Disconnect,
    Acquire(OrganizationId),
    Release(OrganizationId),
    Channels(oneshot::Sender<Vec<OrganizationId>>),
    Shutdown,
}

/// Handle to the connection task.
///
/// Dropping the handle stops the task. Outstanding [`ChannelSubscription`]s
/// become inert.
pub struct ConnectionManager {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    events: broadcast::Sender<QueueEvent>,
    task: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    /// Start the task in `DISCONNECTED`. Call [`connect`](Self::connect) to dial.
    pub fn spawn(connector: Arc<dyn Connector>, config: &ClientConfig) -> Self {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ConnectionState::Disconnected);
        let (events, _) = broadcast::channel(config.event_buffer.max(1));

        let worker = Worker {
            connector,
            backoff: Backoff::new(config.backoff.clone()),
            connect_timeout: config.connect_timeout,
            idle_timeout: config.idle_timeout,
            heartbeat_interval: config.heartbeat_interval.max(MIN_HEARTBEAT_INTERVAL),
            registry: SubscriptionRegistry::new(),
            commands: commands_rx,
            state: state_tx,
            events: events.clone(),
        };
        let task = tokio::spawn(worker.run());

        Self {
            commands,
            state,
            events,
            task: Some(task),
        }
    }

    /// Dial from `DISCONNECTED` or `ERROR`. No-op otherwise.
    pub fn connect(&self) {
        self.command(Command::Connect);
    }

    /// Close the connection and stop reconnecting. Subscriptions are kept
    /// and replayed on the next [`connect`](Self::connect).
    pub fn disconnect(&self) {
        self.command(Command::Disconnect);
    }

    /// Hold `channel` until the returned guard is dropped.
    pub fn subscribe(&self, channel: OrganizationId) -> ChannelSubscription {
        self.command(Command::Acquire(channel.clone()));
        ChannelSubscription::new(channel, self.commands.clone())
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Queue events received from the server, in arrival order
    pub fn events(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    /// Channels currently held by at least one consumer
    pub async fn channels(&self) -> Result<Vec<OrganizationId>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Channels(reply))
            .map_err(|_| ClientError::ManagerStopped)?;
        rx.await.map_err(|_| ClientError::ManagerStopped)
    }

    /// Close the connection and wait for the task to finish.
    pub async fn shutdown(mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::warn!("Connection task ended abnormally: {}", e);
        }
    }

    fn command(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::warn!("Connection manager is not running");
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.commands.send(Command::Shutdown);
        }
    }
}

enum Phase {
    Idle,
    Dial { attempt: u32 },
    Backoff { attempt: u32 },
    Stop,
}

/// What an offline phase should do after a command
enum Control {
    Stay,
    Connect,
    Disconnect,
    Stop,
}

struct Worker {
    connector: Arc<dyn Connector>,
    backoff: Backoff,
    connect_timeout: Duration,
    idle_timeout: Duration,
    heartbeat_interval: Duration,
    registry: SubscriptionRegistry,
    commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<ConnectionState>,
    events: broadcast::Sender<QueueEvent>,
}

impl Worker {
    async fn run(mut self) {
        let mut phase = Phase::Idle;
        loop {
            phase = match phase {
                Phase::Idle => self.idle().await,
                Phase::Dial { attempt } => self.dial(attempt).await,
                Phase::Backoff { attempt } => self.wait_backoff(attempt).await,
                Phase::Stop => break,
            };
        }
        self.set_state(ConnectionState::Disconnected);
        tracing::debug!("Connection task stopped");
    }

    fn set_state(&self, next: ConnectionState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            tracing::info!(state = %next, "Connection state changed");
        }
    }

    /// Registry bookkeeping while there is no transport. Subscriptions only
    /// change the registry here and reach the server on the next replay.
    fn handle_offline(&mut self, command: Option<Command>) -> Control {
        match command {
            Some(Command::Acquire(channel)) => {
                self.registry.acquire(channel);
                Control::Stay
            }
            Some(Command::Release(channel)) => {
                self.registry.release(&channel);
                Control::Stay
            }
            Some(Command::Channels(reply)) => {
                let _ = reply.send(self.registry.channels());
                Control::Stay
            }
            Some(Command::Connect) => Control::Connect,
            Some(Command::Disconnect) => Control::Disconnect,
            Some(Command::Shutdown) | None => Control::Stop,
        }
    }

    async fn idle(&mut self) -> Phase {
        loop {
            let command = self.commands.recv().await;
            match self.handle_offline(command) {
                Control::Stay => {}
                Control::Connect => {
                    self.set_state(ConnectionState::Connecting);
                    return Phase::Dial { attempt: 0 };
                }
                Control::Disconnect => self.set_state(ConnectionState::Disconnected),
                Control::Stop => return Phase::Stop,
            }
        }
    }

    async fn dial(&mut self, attempt: u32) -> Phase {
        let connector = Arc::clone(&self.connector);
        let handshake = time::timeout(self.connect_timeout, connector.connect());
        tokio::pin!(handshake);

        loop {
            tokio::select! {
                result = &mut handshake => {
                    let result = result.unwrap_or(Err(ConnectError::Timeout));
                    return match result {
                        Ok(transport) => self.session(transport).await,
                        Err(e) if e.is_fatal() => {
                            tracing::error!("Connection refused: {}", e);
                            self.set_state(ConnectionState::Error);
                            Phase::Idle
                        }
                        Err(e) => {
                            tracing::warn!(attempt, "Connection attempt failed: {}", e);
                            self.set_state(ConnectionState::Reconnecting);
                            Phase::Backoff { attempt }
                        }
                    };
                }
                command = self.commands.recv() => match self.handle_offline(command) {
                    Control::Stay | Control::Connect => {}
                    Control::Disconnect => {
                        self.set_state(ConnectionState::Disconnected);
                        return Phase::Idle;
                    }
                    Control::Stop => return Phase::Stop,
                },
            }
        }
    }

    async fn wait_backoff(&mut self, attempt: u32) -> Phase {
        let delay = self.backoff.delay(attempt);
        tracing::info!(
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Waiting before reconnecting"
        );
        let sleep = time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                () = &mut sleep => {
                    return Phase::Dial { attempt: attempt.saturating_add(1) };
                }
                command = self.commands.recv() => match self.handle_offline(command) {
                    Control::Stay | Control::Connect => {}
                    Control::Disconnect => {
                        self.set_state(ConnectionState::Disconnected);
                        return Phase::Idle;
                    }
                    Control::Stop => return Phase::Stop,
                },
            }
        }
    }

    async fn session(&mut self, mut transport: Box<dyn Transport>) -> Phase {
        self.set_state(ConnectionState::Connected);

        let channels = self.registry.channels();
        if !channels.is_empty() {
            tracing::info!(count = channels.len(), "Replaying subscriptions");
        }
        for channel in channels {
            let message = ClientMessage::Subscribe { org_id: channel };
            if let Err(e) = send_message(transport.as_mut(), &message).await {
                tracing::warn!("Failed to replay subscription: {}", e);
                return self.connection_lost(transport).await;
            }
        }

        let mut idle_deadline = Instant::now() + self.idle_timeout;
        let mut heartbeat = time::interval_at(
            Instant::now() + self.heartbeat_interval,
            self.heartbeat_interval,
        );
        heartbeat.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let message = match command {
                        Some(Command::Acquire(channel)) => self
                            .registry
                            .acquire(channel.clone())
                            .then_some(ClientMessage::Subscribe { org_id: channel }),
                        Some(Command::Release(channel)) => self
                            .registry
                            .release(&channel)
                            .then_some(ClientMessage::Unsubscribe { org_id: channel }),
                        Some(Command::Channels(reply)) => {
                            let _ = reply.send(self.registry.channels());
                            None
                        }
                        Some(Command::Connect) => None,
                        Some(Command::Disconnect) => {
                            close_transport(transport.as_mut()).await;
                            self.set_state(ConnectionState::Disconnected);
                            return Phase::Idle;
                        }
                        Some(Command::Shutdown) | None => {
                            close_transport(transport.as_mut()).await;
                            return Phase::Stop;
                        }
                    };
                    if let Some(message) = message
                        && let Err(e) = send_message(transport.as_mut(), &message).await
                    {
                        tracing::warn!("Failed to send subscription change: {}", e);
                        return self.connection_lost(transport).await;
                    }
                }
                frame = transport.recv() => match frame {
                    Some(Ok(frame)) => {
                        idle_deadline = Instant::now() + self.idle_timeout;
                        if let Frame::Text(text) = frame {
                            self.dispatch(&text);
                        }
                    }
                    Some(Err(e)) => {
                        tracing::warn!("Connection error: {}", e);
                        return self.connection_lost(transport).await;
                    }
                    None => {
                        tracing::info!("Server closed the connection");
                        return self.connection_lost(transport).await;
                    }
                },
                _ = heartbeat.tick() => {
                    if let Err(e) = send_message(transport.as_mut(), &ClientMessage::Ping).await {
                        tracing::warn!("Failed to send heartbeat: {}", e);
                        return self.connection_lost(transport).await;
                    }
                }
                () = time::sleep_until(idle_deadline) => {
                    tracing::warn!(
                        idle_timeout_ms = u64::try_from(self.idle_timeout.as_millis()).unwrap_or(u64::MAX),
                        "No traffic from server, reconnecting"
                    );
                    return self.connection_lost(transport).await;
                }
            }
        }
    }

    async fn connection_lost(&mut self, mut transport: Box<dyn Transport>) -> Phase {
        close_transport(transport.as_mut()).await;
        self.set_state(ConnectionState::Reconnecting);
        Phase::Backoff { attempt: 0 }
    }

    /// Forward queue events. Anything unparseable is logged and dropped.
    fn dispatch(&self, text: &str) {
        let message = match serde_json::from_str::<ServerMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Dropping malformed server message: {}", e);
                return;
            }
        };

        match message {
            ServerMessage::ConnectionAck { connection_id, .. } => {
                tracing::debug!(connection_id, "Connection acknowledged");
            }
            ServerMessage::Pong { .. } => tracing::trace!("Pong"),
            other => {
                if let Some(event) = other.into_event() {
                    tracing::debug!(
                        event_type = %event.event_type(),
                        organization_id = %event.organization_id(),
                        item_id = %event.item().id,
                        "Queue event received"
                    );
                    // no listeners is fine
                    let _ = self.events.send(event);
                }
            }
        }
    }
}

async fn send_message(
    transport: &mut dyn Transport,
    message: &ClientMessage,
) -> Result<(), TransportError> {
    let text = serde_json::to_string(message).map_err(|e| TransportError::Send(e.to_string()))?;
    transport.send(text).await
}

async fn close_transport(transport: &mut dyn Transport) {
    if time::timeout(CLOSE_TIMEOUT, transport.close()).await.is_err() {
        tracing::debug!("Timed out closing transport");
    }
}
