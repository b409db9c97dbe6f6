/// Audit trail writer and audit policy
pub mod audit;
/// Product catalog mutations and reads
pub mod catalog;
/// Use case entry points
pub mod coordinator;
/// Actor and ownership context
pub mod context;
/// Product history journal
pub mod history;
/// Manual stock adjustments
pub mod inventory;
/// Guarded stock counter updates
pub mod ledger;
/// Order aggregate persistence
pub mod order_store;
/// Order creation, cancellation and acceptance
pub mod orders;
/// Success and error envelopes
pub mod response;
/// Typed history and audit snapshots
pub mod snapshot;
/// Transaction scope shared by every write of a use case
pub mod unit_of_work;
/// Stock validation before any write
pub mod validator;
