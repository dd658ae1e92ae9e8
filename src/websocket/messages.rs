//! WebSocket Message Types
//!
//! Messages exchanged between portal clients and the LendBridge server.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::finance::{FundingStatus, ProductType};
use crate::store::{Application, ApplicationStatus, InvestmentReceipt, StatusChange};

/// Topic prefix for borrower/admin application events
pub const APPLICATIONS_TOPIC: &str = "applications";
/// Topic prefix for investor-facing listing events
pub const MARKETPLACE_TOPIC: &str = "marketplace";

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to topics (e.g. "applications.<id>", "marketplace")
    Subscribe { topics: Vec<String> },
    /// Unsubscribe from topics
    Unsubscribe { topics: Vec<String> },
    /// Keepalive
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A borrower submitted a new application
    ApplicationSubmitted {
        application_id: Uuid,
        product_type: ProductType,
        loan_amount: f64,
        term_months: u32,
        submitted_at: i64,
    },
    /// An application moved through the review workflow
    StatusChanged {
        application_id: Uuid,
        from_status: Option<ApplicationStatus>,
        to_status: ApplicationStatus,
        changed_at: i64,
    },
    /// An investor funded part of an application
    InvestmentRecorded {
        application_id: Uuid,
        amount: f64,
        percentage: f64,
        funded_amount: f64,
        percent_funded: f64,
        funding_status: FundingStatus,
        status: ApplicationStatus,
    },
    /// Subscription confirmed
    Subscribed { topics: Vec<String> },
    /// Unsubscription confirmed
    Unsubscribed { topics: Vec<String> },
    /// Reply to ping
    Pong,
    /// Error description
    Error { message: String },
    /// Connection established
    Connected { connection_id: String },
}

/// Internal event for broadcasting through the hub
#[derive(Debug, Clone)]
pub struct WsEvent {
    /// Topic this event belongs to (e.g., "applications.<id>")
    pub topic: String,
    /// The message to send to subscribers
    pub message: ServerMessage,
}

/// Per-application topic under a prefix
pub fn topic_for(prefix: &str, application_id: Uuid) -> String {
    format!("{}.{}", prefix, application_id)
}

impl WsEvent {
    pub fn application_submitted(application: &Application) -> Self {
        Self {
            topic: topic_for(APPLICATIONS_TOPIC, application.id),
            message: ServerMessage::ApplicationSubmitted {
                application_id: application.id,
                product_type: application.product_type,
                loan_amount: application.loan_amount,
                term_months: application.term_months,
                submitted_at: application.submitted_at,
            },
        }
    }

    pub fn status_changed(change: &StatusChange) -> Self {
        Self {
            topic: topic_for(APPLICATIONS_TOPIC, change.application_id),
            message: ServerMessage::StatusChanged {
                application_id: change.application_id,
                from_status: change.from_status,
                to_status: change.to_status,
                changed_at: change.changed_at,
            },
        }
    }

    pub fn investment_recorded(receipt: &InvestmentReceipt) -> Self {
        let application = &receipt.application;
        Self {
            topic: topic_for(MARKETPLACE_TOPIC, application.id),
            message: ServerMessage::InvestmentRecorded {
                application_id: application.id,
                amount: receipt.investment.amount,
                percentage: receipt.investment.percentage,
                funded_amount: application.funded_amount,
                percent_funded: application.percent_funded(),
                funding_status: application.funding_status,
                status: application.status,
            },
        }
    }

    /// Same message on another topic
    pub fn retopic(&self, prefix: &str, application_id: Uuid) -> Self {
        Self {
            topic: topic_for(prefix, application_id),
            message: self.message.clone(),
        }
    }
}
