//! Continuation state carried across the selection redirect.
//!
//! [`AuthContext`] is created upstream, decorated by the selection stage with the broker's own
//! identity and the sources it offered, and persisted through a [`StateStore`](crate::store::StateStore)
//! until the requester comes back with a choice. Upstream data stays opaque to the broker: it
//! lives in a JSON attribute map that round-trips untouched.

// self
use crate::{
	_prelude::*,
	auth::SourceId,
	source::{BrokerConfig, SourceDescriptor},
};

/// Opaque attribute map owned by the upstream caller.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Authentication attempt state persisted across the continuation boundary.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthContext {
	/// Upstream attributes (return targets, requested entity, delegate results).
	#[serde(default)]
	pub attributes: Attributes,
	/// Broker decoration written by the selection stage.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub broker: Option<BrokerState>,
	/// Failure attached by the delegation stage when the delegate fails.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<AuthFailure>,
}
impl AuthContext {
	/// Creates an empty context.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a context seeded with upstream attributes.
	pub fn with_attributes(attributes: Attributes) -> Self {
		Self { attributes, ..Default::default() }
	}

	/// Sets an upstream attribute.
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
		self.attributes.insert(key.into(), value.into());
	}

	/// Reads an upstream attribute.
	pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
		self.attributes.get(key)
	}

	/// Sources offered by the broker, if the selection stage has run.
	pub fn offered_sources(&self) -> Option<&[SourceDescriptor]> {
		self.broker.as_ref().map(|state| state.offered_sources.as_slice())
	}

	/// Preselect hint carried by the context, if any.
	pub fn preselect(&self) -> Option<&SourceId> {
		self.broker.as_ref().and_then(|state| state.preselect.as_ref())
	}
}

/// Broker fields written into the context before suspension.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrokerState {
	/// Identifier of the broker instance that suspended the attempt.
	pub broker_id: SourceId,
	/// Snapshot of the sources offered to the requester.
	pub offered_sources: Vec<SourceDescriptor>,
	/// Optional pass-through hint naming the source to pre-select.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub preselect: Option<SourceId>,
}
impl BrokerState {
	/// Snapshots `config` for `broker_id`.
	pub fn new(broker_id: SourceId, config: &BrokerConfig) -> Self {
		Self { broker_id, offered_sources: config.to_vec(), preselect: None }
	}

	/// Returns true when `id` is among the offered sources.
	pub fn offers(&self, id: &str) -> bool {
		self.offered_sources.iter().any(|descriptor| descriptor.id.as_str() == id)
	}
}

/// Persistable failure attached to a context after delegation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthFailure {
	/// Structured failure reported by the delegate; upstream may recover from it.
	#[error("{code}: {message}")]
	Recoverable {
		/// Machine-readable error code (e.g. `WRONGUSERPASS`).
		code: String,
		/// Human-readable message.
		message: String,
	},
	/// Any other delegate failure, reduced to its message so it can be persisted.
	#[error("{message}")]
	Unserializable {
		/// Message of the original error.
		message: String,
	},
}
