//! Caller context handed in by the authentication layer.
//!
//! An [`ActorContext`] names who is acting and which request the action belongs to.
//! The same actor doubles as the owner of orders it places.

use crate::entities::{ActorType, OrderModel};
use serde::{Deserialize, Serialize};

/// Kind of authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorKind {
    /// Back-office staff member
    Staff,
    /// End user
    User,
}

impl From<ActorKind> for ActorType {
    fn from(kind: ActorKind) -> Self {
        match kind {
            ActorKind::Staff => Self::Staff,
            ActorKind::User => Self::User,
        }
    }
}

/// Who is acting, and on behalf of which request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorContext {
    /// Staff or user identifier
    pub id: i64,
    /// Which table `id` refers to
    pub kind: ActorKind,
    /// Correlation id of the inbound request
    pub request_id: String,
    /// Caller IP address, if the route layer captured it
    pub ip_address: Option<String>,
    /// Caller user agent, if the route layer captured it
    pub user_agent: Option<String>,
}

impl ActorContext {
    /// Creates a staff actor without request metadata.
    #[must_use]
    pub fn staff(id: i64, request_id: impl Into<String>) -> Self {
        Self::new(id, ActorKind::Staff, request_id)
    }

    /// Creates an end-user actor without request metadata.
    #[must_use]
    pub fn user(id: i64, request_id: impl Into<String>) -> Self {
        Self::new(id, ActorKind::User, request_id)
    }

    fn new(id: i64, kind: ActorKind, request_id: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            request_id: request_id.into(),
            ip_address: None,
            user_agent: None,
        }
    }

    /// Attaches client metadata recorded alongside audit entries.
    #[must_use]
    pub fn with_client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }

    /// The owner identity this actor gives to orders it places.
    #[must_use]
    pub const fn owner(&self) -> Owner {
        match self.kind {
            ActorKind::Staff => Owner::Staff(self.id),
            ActorKind::User => Owner::User(self.id),
        }
    }

    /// Whether this actor owns `order`.
    #[must_use]
    pub fn owns(&self, order: &OrderModel) -> bool {
        Owner::of(order) == Some(self.owner())
    }
}

/// Order owner. Exactly one of staff or user, which the enum makes unrepresentable
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Owner {
    /// Placed by a staff member
    Staff(i64),
    /// Placed by an end user
    User(i64),
}

impl Owner {
    /// Reads the owner columns of a stored order.
    #[must_use]
    pub const fn of(order: &OrderModel) -> Option<Self> {
        match (order.staff_id, order.user_id) {
            (Some(id), None) => Some(Self::Staff(id)),
            (None, Some(id)) => Some(Self::User(id)),
            _ => None,
        }
    }

    /// `(staff_id, user_id)` column values.
    #[must_use]
    pub const fn columns(self) -> (Option<i64>, Option<i64>) {
        match self {
            Self::Staff(id) => (Some(id), None),
            Self::User(id) => (None, Some(id)),
        }
    }
}
