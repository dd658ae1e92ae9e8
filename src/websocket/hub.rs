//! WebSocket Connection Hub
//!
//! Tracks connections and their topic subscriptions and fans events out.
//! An event on `prefix.<id>` reaches subscribers of that exact topic, of
//! `prefix.*` and of the bare `prefix`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, RwLock};
use uuid::Uuid;

use super::messages::{ServerMessage, WsEvent, APPLICATIONS_TOPIC, MARKETPLACE_TOPIC};

/// Unique identifier for a WebSocket connection
pub type ConnectionId = String;

type Connections = Arc<RwLock<HashMap<ConnectionId, ConnectionHandle>>>;
type Subscriptions = Arc<RwLock<HashMap<String, HashSet<ConnectionId>>>>;

/// Manages all WebSocket connections and subscriptions
pub struct ConnectionHub {
    /// Active connections: ConnectionId → ConnectionHandle
    connections: Connections,
    /// Topic subscriptions: Topic → Set of ConnectionIds
    subscriptions: Subscriptions,
    /// Broadcast channel for in-process listeners
    broadcast_tx: broadcast::Sender<WsEvent>,
    config: HubConfig,
}

/// Configuration for the connection hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of concurrent connections
    pub max_connections: usize,
    /// Capacity of the broadcast channel
    pub broadcast_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: 1000,
            broadcast_capacity: 1024,
        }
    }
}

/// Handle for sending messages to a specific connection
pub struct ConnectionHandle {
    pub sender: mpsc::UnboundedSender<ServerMessage>,
    pub subscriptions: HashSet<String>,
}

/// Whether a topic string is one the hub routes
pub fn is_valid_topic(topic: &str) -> bool {
    let (prefix, rest) = match topic.split_once('.') {
        Some((prefix, rest)) => (prefix, Some(rest)),
        None => (topic, None),
    };
    if prefix != APPLICATIONS_TOPIC && prefix != MARKETPLACE_TOPIC {
        return false;
    }
    match rest {
        None | Some("*") => true,
        Some(id) => Uuid::parse_str(id).is_ok(),
    }
}

/// Subscription keys that receive an event published on `topic`
fn matching_keys(topic: &str) -> Vec<String> {
    let mut keys = vec![topic.to_string()];
    if let Some((prefix, _)) = topic.split_once('.') {
        keys.push(format!("{}.*", prefix));
        keys.push(prefix.to_string());
    }
    keys
}

async fn deliver(
    connections: &Connections,
    subscriptions: &Subscriptions,
    event: &WsEvent,
) -> usize {
    let subs = subscriptions.read().await;
    let connections = connections.read().await;

    let targets: HashSet<&ConnectionId> = matching_keys(&event.topic)
        .iter()
        .filter_map(|key| subs.get(key))
        .flatten()
        .collect();

    targets
        .into_iter()
        .filter_map(|id| connections.get(id))
        .filter(|handle| handle.sender.send(event.message.clone()).is_ok())
        .count()
}

impl ConnectionHub {
    pub fn new(config: HubConfig) -> Self {
        let (broadcast_tx, _) = broadcast::channel(config.broadcast_capacity);

        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            broadcast_tx,
            config,
        }
    }

    /// Register a new connection, subject to the connection limit
    pub async fn register(
        &self,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<ConnectionId, HubError> {
        let mut connections = self.connections.write().await;
        if connections.len() >= self.config.max_connections {
            return Err(HubError::TooManyConnections(self.config.max_connections));
        }

        let id = Uuid::new_v4().to_string();
        connections.insert(
            id.clone(),
            ConnectionHandle {
                sender,
                subscriptions: HashSet::new(),
            },
        );

        tracing::info!(connection_id = %id, "WebSocket connected");
        Ok(id)
    }

    /// Unregister a connection and clean up its subscriptions
    pub async fn unregister(&self, id: &str) {
        let handle = self.connections.write().await.remove(id);

        if let Some(handle) = handle {
            let mut subs = self.subscriptions.write().await;
            for topic in handle.subscriptions {
                if let Some(subscribers) = subs.get_mut(&topic) {
                    subscribers.remove(id);
                    if subscribers.is_empty() {
                        subs.remove(&topic);
                    }
                }
            }
        }

        tracing::info!(connection_id = %id, "WebSocket disconnected");
    }

    /// Subscribe a connection to topics; invalid topics are skipped
    pub async fn subscribe(&self, id: &str, topics: Vec<String>) -> Result<Vec<String>, HubError> {
        let mut connections = self.connections.write().await;
        let handle = connections.get_mut(id).ok_or(HubError::ConnectionNotFound)?;

        let mut subs = self.subscriptions.write().await;
        let mut subscribed = Vec::new();

        for topic in topics {
            if !is_valid_topic(&topic) {
                tracing::warn!(topic = %topic, "Invalid topic ignored");
                continue;
            }
            handle.subscriptions.insert(topic.clone());
            subs.entry(topic.clone()).or_default().insert(id.to_string());
            subscribed.push(topic);
        }

        tracing::debug!(connection_id = %id, topics = ?subscribed, "Subscribed to topics");
        Ok(subscribed)
    }

    /// Unsubscribe a connection from topics
    pub async fn unsubscribe(
        &self,
        id: &str,
        topics: Vec<String>,
    ) -> Result<Vec<String>, HubError> {
        let mut connections = self.connections.write().await;
        let handle = connections.get_mut(id).ok_or(HubError::ConnectionNotFound)?;

        let mut subs = self.subscriptions.write().await;
        let mut unsubscribed = Vec::new();

        for topic in topics {
            if handle.subscriptions.remove(&topic) {
                if let Some(subscribers) = subs.get_mut(&topic) {
                    subscribers.remove(id);
                    if subscribers.is_empty() {
                        subs.remove(&topic);
                    }
                }
                unsubscribed.push(topic);
            }
        }

        tracing::debug!(connection_id = %id, topics = ?unsubscribed, "Unsubscribed from topics");
        Ok(unsubscribed)
    }

    /// Deliver an event to every matching subscriber, returning the count
    pub async fn broadcast(&self, event: &WsEvent) -> usize {
        let sent = deliver(&self.connections, &self.subscriptions, event).await;
        if sent > 0 {
            tracing::trace!(topic = %event.topic, subscribers = sent, "Broadcast event");
        }
        sent
    }

    /// Publish without waiting; delivery runs on a spawned task
    pub fn publish(&self, event: WsEvent) {
        let _ = self.broadcast_tx.send(event.clone());

        let connections = Arc::clone(&self.connections);
        let subscriptions = Arc::clone(&self.subscriptions);
        tokio::spawn(async move {
            deliver(&connections, &subscriptions, &event).await;
        });
    }

    /// Send a message directly to one connection
    pub async fn send_to(&self, id: &str, message: ServerMessage) -> Result<(), HubError> {
        let connections = self.connections.read().await;
        let handle = connections.get(id).ok_or(HubError::ConnectionNotFound)?;
        handle.sender.send(message).map_err(|_| HubError::SendFailed)
    }

    /// Receiver for every published event
    pub fn subscribe_broadcast(&self) -> broadcast::Receiver<WsEvent> {
        self.broadcast_tx.subscribe()
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn subscription_count(&self, topic: &str) -> usize {
        self.subscriptions
            .read()
            .await
            .get(topic)
            .map(|s| s.len())
            .unwrap_or(0)
    }
}

/// Errors that can occur in the connection hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Too many connections (limit: {0})")]
    TooManyConnections(usize),

    #[error("Connection not found")]
    ConnectionNotFound,

    #[error("Failed to send message")]
    SendFailed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ApplicationStatus, StatusChange};

    fn status_event(id: Uuid) -> WsEvent {
        WsEvent::status_changed(&StatusChange {
            application_id: id,
            from_status: Some(ApplicationStatus::Submitted),
            to_status: ApplicationStatus::UnderReview,
            changed_by: None,
            note: None,
            changed_at: 1_699_000_000_000,
        })
    }

    #[test]
    fn test_valid_topics() {
        let id = Uuid::new_v4();
        assert!(is_valid_topic("applications"));
        assert!(is_valid_topic("applications.*"));
        assert!(is_valid_topic(&format!("applications.{}", id)));
        assert!(is_valid_topic("marketplace"));
        assert!(is_valid_topic(&format!("marketplace.{}", id)));

        assert!(!is_valid_topic(""));
        assert!(!is_valid_topic("metrics.mood"));
        assert!(!is_valid_topic("applications.not-a-uuid"));
    }

    #[tokio::test]
    async fn test_register_unregister() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();

        let id = hub.register(tx).await.unwrap();
        assert_eq!(hub.connection_count().await, 1);

        hub.unregister(&id).await;
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_subscribe_unsubscribe() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();

        let subscribed = hub
            .subscribe(&id, vec!["marketplace".to_string(), "bogus".to_string()])
            .await
            .unwrap();
        assert_eq!(subscribed, vec!["marketplace"]);
        assert_eq!(hub.subscription_count("marketplace").await, 1);

        let unsubscribed = hub.unsubscribe(&id, vec!["marketplace".to_string()]).await.unwrap();
        assert_eq!(unsubscribed, vec!["marketplace"]);
        assert_eq!(hub.subscription_count("marketplace").await, 0);
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let hub = ConnectionHub::new(HubConfig {
            max_connections: 2,
            broadcast_capacity: 16,
        });
        let (tx1, _) = mpsc::unbounded_channel();
        let (tx2, _) = mpsc::unbounded_channel();
        let (tx3, _) = mpsc::unbounded_channel();

        hub.register(tx1).await.unwrap();
        hub.register(tx2).await.unwrap();
        assert!(matches!(
            hub.register(tx3).await,
            Err(HubError::TooManyConnections(2))
        ));
    }

    #[tokio::test]
    async fn test_broadcast_exact_wildcard_and_prefix() {
        let hub = ConnectionHub::new(HubConfig::default());
        let app = Uuid::new_v4();

        let (tx_exact, mut rx_exact) = mpsc::unbounded_channel();
        let (tx_wild, mut rx_wild) = mpsc::unbounded_channel();
        let (tx_prefix, mut rx_prefix) = mpsc::unbounded_channel();
        let (tx_other, mut rx_other) = mpsc::unbounded_channel();

        let exact = hub.register(tx_exact).await.unwrap();
        let wild = hub.register(tx_wild).await.unwrap();
        let prefix = hub.register(tx_prefix).await.unwrap();
        let other = hub.register(tx_other).await.unwrap();

        hub.subscribe(&exact, vec![format!("applications.{}", app)]).await.unwrap();
        hub.subscribe(&wild, vec!["applications.*".to_string()]).await.unwrap();
        hub.subscribe(&prefix, vec!["applications".to_string()]).await.unwrap();
        hub.subscribe(&other, vec!["marketplace".to_string()]).await.unwrap();

        assert_eq!(hub.broadcast(&status_event(app)).await, 3);
        assert!(rx_exact.try_recv().is_ok());
        assert!(rx_wild.try_recv().is_ok());
        assert!(rx_prefix.try_recv().is_ok());
        assert!(rx_other.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_single_delivery_with_overlapping_subscriptions() {
        let hub = ConnectionHub::new(HubConfig::default());
        let app = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();

        hub.subscribe(&id, vec!["applications".to_string(), "applications.*".to_string()])
            .await
            .unwrap();

        assert_eq!(hub.broadcast(&status_event(app)).await, 1);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
