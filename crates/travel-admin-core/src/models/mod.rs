//! Data models for the travel admin backend.
//!
//! Records themselves stay as opaque JSON objects (`serde_json::Value`);
//! the dashboard edits them field by field and the cloud database has no
//! fixed schema. This module holds the typed pieces around them:
//!
//! - `Collection`: the known collection names
//! - `CloudRequest`, `CloudReply`: the cloud-function call shapes
//! - `Stats`: per-collection counts

pub mod cloud;
pub mod collection;
pub mod stats;

pub use cloud::{unwrap_upstream, Action, CloudReply, CloudRequest};
pub use collection::{Collection, UnknownCollection};
pub use stats::Stats;

use serde_json::Value;

/// Field name carrying a record's identifier.
pub const ID_FIELD: &str = "_id";

/// Identifier of a record, if it has one.
pub fn record_id(record: &Value) -> Option<&str> {
    record.get(ID_FIELD).and_then(Value::as_str)
}
