//! Storage contracts and built-in store implementations.
//!
//! The broker owns no persistence engine. It talks to three injected collaborators:
//! - [`StateStore`] carries the [`AuthContext`] across the selection redirect.
//! - [`SessionStore`] keeps per-session data such as which delegate authenticated the session.
//! - [`PreferenceStore`] is the requester's long-lived, client-side key/value (a cookie jar).
//!
//! The in-memory implementations back tests and single-process deployments; [`FileStateStore`]
//! lets a suspended attempt survive a process restart.

pub mod file;
pub mod memory;

pub use file::FileStateStore;
pub use memory::{MemoryPreferenceStore, MemorySessionStore, MemoryStateStore};

// self
use crate::{
	_prelude::*,
	auth::{SessionId, StateId},
	context::AuthContext,
};

/// Boxed future returned by the asynchronous store contracts.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persists suspended authentication contexts under opaque identifiers.
///
/// Every saved context is tagged with the stage that suspended it; loading under a different
/// stage fails so a continuation token can only resume the step it was issued for.
pub trait StateStore
where
	Self: Send + Sync,
{
	/// Persists `context` and returns a fresh identifier for it.
	fn save<'a>(&'a self, stage: &'a str, context: &'a AuthContext) -> StoreFuture<'a, StateId>;

	/// Returns a copy of the context without consuming it.
	fn load<'a>(&'a self, id: &'a StateId, stage: &'a str) -> StoreFuture<'a, AuthContext>;

	/// Atomically removes and returns the context; a second `take` of the same id fails with
	/// [`StoreError::NotFound`].
	fn take<'a>(&'a self, id: &'a StateId, stage: &'a str) -> StoreFuture<'a, AuthContext>;
}

/// Per-session key/value storage.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Stores `value` under `namespace` + `key` for `session`.
	fn set_data<'a>(
		&'a self,
		session: &'a SessionId,
		namespace: &'a str,
		key: &'a str,
		value: String,
		timeout: DataTimeout,
	) -> StoreFuture<'a, ()>;

	/// Reads a value previously stored for `session`.
	fn get_data<'a>(
		&'a self,
		session: &'a SessionId,
		namespace: &'a str,
		key: &'a str,
	) -> StoreFuture<'a, Option<String>>;
}

/// Client-side key/value persisted across separate login attempts.
pub trait PreferenceStore
where
	Self: Send + Sync,
{
	/// Writes `value` under `name`.
	fn set(&self, name: &str, value: &str, params: &CookieParams) -> Result<(), StoreError>;

	/// Reads the value stored under `name`.
	fn get(&self, name: &str) -> Option<String>;
}

/// Lifetime policy for session data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataTimeout {
	/// Lives exactly as long as the session.
	SessionEnd,
	/// Expires after the given duration, or at session end if that comes first.
	After(Duration),
}

/// Attributes applied when writing a preference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieParams {
	/// How long the client should keep the value.
	pub lifetime: Duration,
	/// Path scope of the value.
	pub path: String,
	/// Hides the value from client-side scripts when true.
	pub http_only: bool,
}

/// Error type produced by store implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// No live entry exists for the identifier (never saved, already taken, or expired).
	#[error("No saved state found for `{id}`.")]
	NotFound {
		/// Identifier that was looked up.
		id: String,
	},
	/// The entry was saved by a different stage.
	#[error("State was saved for stage `{found}`, expected `{expected}`.")]
	StageMismatch {
		/// Stage requested by the caller.
		expected: String,
		/// Stage recorded with the entry.
		found: String,
	},
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Entry kept by state store implementations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredState {
	/// Stage tag supplied at save time.
	pub stage: String,
	/// Instant the context was saved.
	pub saved_at: OffsetDateTime,
	/// Suspended context.
	pub context: AuthContext,
}
impl StoredState {
	/// Wraps `context` saved now under `stage`.
	pub fn new(stage: &str, context: AuthContext) -> Self {
		Self { stage: stage.to_owned(), saved_at: OffsetDateTime::now_utc(), context }
	}

	/// Returns true once `ttl` has elapsed since the save.
	pub fn is_expired_at(&self, ttl: Duration, now: OffsetDateTime) -> bool {
		now - self.saved_at > ttl
	}

	/// Checks the stage tag.
	pub fn ensure_stage(&self, expected: &str) -> Result<(), StoreError> {
		if self.stage == expected {
			Ok(())
		} else {
			Err(StoreError::StageMismatch {
				expected: expected.to_owned(),
				found: self.stage.clone(),
			})
		}
	}
}
