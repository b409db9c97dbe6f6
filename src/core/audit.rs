//! Audit writer - Appends business actions to the audit trail.
//!
//! Two entry points: [`audit_in_transaction`] for actions that are part of a unit
//! of work, and [`audit`] for actions with no surrounding transaction (login,
//! logout). Under the default [`AuditPolicy`] a failed audit write is logged and
//! swallowed so an audit outage never blocks business operations; with
//! `strict = true` it fails the caller instead.
//!
//! In-transaction writes run inside a savepoint. A failed insert is rolled back
//! to the savepoint and the surrounding transaction stays usable.

use crate::{
    core::{
        context::ActorContext,
        snapshot::{self, Snapshot},
    },
    entities::{ActorType, AuditAction, audit_log},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{DatabaseTransaction, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use tracing::{debug, error};

/// `entity_type` written for orders.
pub const ORDER_ENTITY: &str = "order";
/// `entity_type` written for products.
pub const PRODUCT_ENTITY: &str = "product";
/// `entity_type` written for staff sessions.
pub const STAFF_ENTITY: &str = "staff";
/// `entity_type` written for user sessions.
pub const USER_ENTITY: &str = "user";

/// What an audit write failure does to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuditPolicy {
    /// Propagate audit write failures instead of logging and continuing
    pub strict: bool,
}

/// An audit row waiting to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    request_id: String,
    actor: Option<(i64, ActorType)>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    entity_type: String,
    entity_id: Option<i64>,
    action: AuditAction,
    previous: Option<Snapshot>,
    new: Option<Snapshot>,
}

impl AuditEntry {
    /// Entry for an action performed by `actor`, or by the system when `None`.
    #[must_use]
    pub fn new(
        request_id: impl Into<String>,
        actor: Option<&ActorContext>,
        action: AuditAction,
        entity_type: impl Into<String>,
        entity_id: Option<i64>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            actor: actor.map(|a| (a.id, a.kind.into())),
            ip_address: actor.and_then(|a| a.ip_address.clone()),
            user_agent: actor.and_then(|a| a.user_agent.clone()),
            entity_type: entity_type.into(),
            entity_id,
            action,
            previous: None,
            new: None,
        }
    }

    /// Entry for an action by `actor` under its own request id.
    #[must_use]
    pub fn by(
        actor: &ActorContext,
        action: AuditAction,
        entity_type: impl Into<String>,
        entity_id: i64,
    ) -> Self {
        Self::new(
            actor.request_id.clone(),
            Some(actor),
            action,
            entity_type,
            Some(entity_id),
        )
    }

    /// Sets the state before the action.
    #[must_use]
    pub fn previous(mut self, snapshot: Snapshot) -> Self {
        self.previous = Some(snapshot);
        self
    }

    /// Sets the state after the action.
    #[must_use]
    pub fn new_data(mut self, snapshot: Snapshot) -> Self {
        self.new = Some(snapshot);
        self
    }

    /// Actor type recorded for this entry; `SYSTEM` when nobody is acting.
    #[must_use]
    pub fn actor_type(&self) -> ActorType {
        self.actor.map_or(ActorType::System, |(_, kind)| kind)
    }

    fn into_active_model(self) -> Result<audit_log::ActiveModel> {
        Ok(audit_log::ActiveModel {
            request_id: Set(self.request_id.clone()),
            actor_id: Set(self.actor.map(|(id, _)| id)),
            actor_type: Set(self.actor_type()),
            entity_type: Set(self.entity_type),
            entity_id: Set(self.entity_id),
            action: Set(self.action),
            previous_data: Set(snapshot::to_json(self.previous.as_ref())?),
            new_data: Set(snapshot::to_json(self.new.as_ref())?),
            ip_address: Set(self.ip_address),
            user_agent: Set(self.user_agent),
            created_at: Set(Utc::now()),
            ..Default::default()
        })
    }
}

/// Writes `entry` as part of the open transaction `txn`.
///
/// Returns `Ok(None)` when the write failed and the policy swallowed it.
pub async fn audit_in_transaction(
    txn: &DatabaseTransaction,
    policy: AuditPolicy,
    entry: AuditEntry,
) -> Result<Option<audit_log::Model>> {
    let action = entry.action;
    let entity_type = entry.entity_type.clone();
    let written = write_in_savepoint(txn, entry).await;
    settle(policy, written, action, &entity_type)
}

/// Writes `entry` on its own, outside any business transaction.
///
/// Returns `Ok(None)` when the write failed and the policy swallowed it.
pub async fn audit(
    db: &DatabaseConnection,
    policy: AuditPolicy,
    entry: AuditEntry,
) -> Result<Option<audit_log::Model>> {
    let action = entry.action;
    let entity_type = entry.entity_type.clone();
    let written = match entry.into_active_model() {
        Ok(row) => row.insert(db).await.map_err(Into::into),
        Err(err) => Err(err),
    };
    settle(policy, written, action, &entity_type)
}

async fn write_in_savepoint(
    txn: &DatabaseTransaction,
    entry: AuditEntry,
) -> Result<audit_log::Model> {
    let row = entry.into_active_model()?;
    let savepoint = txn.begin().await?;
    match row.insert(&savepoint).await {
        Ok(model) => {
            savepoint.commit().await?;
            Ok(model)
        }
        Err(err) => {
            savepoint.rollback().await?;
            Err(err.into())
        }
    }
}

fn settle(
    policy: AuditPolicy,
    written: Result<audit_log::Model>,
    action: AuditAction,
    entity_type: &str,
) -> Result<Option<audit_log::Model>> {
    match written {
        Ok(row) => {
            debug!(audit_id = row.id, ?action, entity_type, "AuditService: entry written");
            Ok(Some(row))
        }
        Err(err) if policy.strict => {
            error!(?action, entity_type, error = %err, "AuditService: write failed");
            Err(err)
        }
        Err(err) => {
            error!(
                ?action,
                entity_type,
                error = %err,
                "AuditService: write failed, continuing without audit entry"
            );
            Ok(None)
        }
    }
}
