//! Thread-safe in-memory store implementations for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{SessionId, StateId},
	context::AuthContext,
	store::{
		CookieParams, DataTimeout, PreferenceStore, SessionStore, StateStore, StoreError,
		StoreFuture, StoredState,
	},
};

type StateMap = Arc<RwLock<HashMap<StateId, StoredState>>>;
type SessionMap = Arc<RwLock<HashMap<SessionKey, SessionEntry>>>;

/// Keeps suspended contexts in-process, expiring them after a fixed TTL.
#[derive(Clone, Debug)]
pub struct MemoryStateStore {
	entries: StateMap,
	ttl: Duration,
}
impl MemoryStateStore {
	/// Default lifetime of a suspended attempt.
	pub const DEFAULT_TTL: Duration = Duration::hours(1);

	/// Creates a store whose entries expire after `ttl`.
	pub fn with_ttl(ttl: Duration) -> Self {
		Self { entries: Default::default(), ttl }
	}

	/// Number of entries currently held, expired or not.
	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	/// Returns true when the store holds nothing.
	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	fn save_now(map: StateMap, ttl: Duration, stage: &str, context: AuthContext) -> StateId {
		let now = OffsetDateTime::now_utc();
		let mut guard = map.write();

		// Attempts that are never resumed are swept on the next save.
		guard.retain(|_, state| !state.is_expired_at(ttl, now));

		loop {
			let id = StateId::generate();

			if !guard.contains_key(&id) {
				guard.insert(id.clone(), StoredState::new(stage, context));

				return id;
			}
		}
	}

	fn load_now(
		map: StateMap,
		ttl: Duration,
		id: &StateId,
		stage: &str,
		consume: bool,
	) -> Result<AuthContext, StoreError> {
		let now = OffsetDateTime::now_utc();
		let mut guard = map.write();
		let (expired, stage_check) = match guard.get(id) {
			Some(state) => (state.is_expired_at(ttl, now), state.ensure_stage(stage)),
			None => return Err(not_found(id)),
		};

		if expired {
			guard.remove(id);

			return Err(not_found(id));
		}

		stage_check?;

		let context = if consume {
			guard.remove(id).map(|state| state.context)
		} else {
			guard.get(id).map(|state| state.context.clone())
		};

		context.ok_or_else(|| not_found(id))
	}
}
impl Default for MemoryStateStore {
	fn default() -> Self {
		Self::with_ttl(Self::DEFAULT_TTL)
	}
}
impl StateStore for MemoryStateStore {
	fn save<'a>(&'a self, stage: &'a str, context: &'a AuthContext) -> StoreFuture<'a, StateId> {
		let map = self.entries.clone();
		let context = context.to_owned();

		Box::pin(async move { Ok(Self::save_now(map, self.ttl, stage, context)) })
	}

	fn load<'a>(&'a self, id: &'a StateId, stage: &'a str) -> StoreFuture<'a, AuthContext> {
		let map = self.entries.clone();

		Box::pin(async move { Self::load_now(map, self.ttl, id, stage, false) })
	}

	fn take<'a>(&'a self, id: &'a StateId, stage: &'a str) -> StoreFuture<'a, AuthContext> {
		let map = self.entries.clone();

		Box::pin(async move { Self::load_now(map, self.ttl, id, stage, true) })
	}
}

fn not_found(id: &StateId) -> StoreError {
	StoreError::NotFound { id: id.to_string() }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct SessionKey {
	session: SessionId,
	namespace: String,
	key: String,
}

#[derive(Clone, Debug)]
struct SessionEntry {
	value: String,
	expires_at: Option<OffsetDateTime>,
}

/// Keeps session data in-process.
#[derive(Clone, Debug, Default)]
pub struct MemorySessionStore(SessionMap);
impl MemorySessionStore {
	/// Ends `session`, dropping every value stored for it.
	pub fn end_session(&self, session: &SessionId) {
		self.0.write().retain(|key, _| &key.session != session);
	}

	fn set_now(map: SessionMap, key: SessionKey, value: String, timeout: DataTimeout) {
		let expires_at = match timeout {
			DataTimeout::SessionEnd => None,
			DataTimeout::After(ttl) => Some(OffsetDateTime::now_utc() + ttl),
		};

		map.write().insert(key, SessionEntry { value, expires_at });
	}

	fn get_now(map: SessionMap, key: SessionKey) -> Option<String> {
		let now = OffsetDateTime::now_utc();

		map.read()
			.get(&key)
			.filter(|entry| entry.expires_at.is_none_or(|expires_at| expires_at > now))
			.map(|entry| entry.value.clone())
	}
}
impl SessionStore for MemorySessionStore {
	fn set_data<'a>(
		&'a self,
		session: &'a SessionId,
		namespace: &'a str,
		key: &'a str,
		value: String,
		timeout: DataTimeout,
	) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let key =
			SessionKey { session: session.to_owned(), namespace: namespace.into(), key: key.into() };

		Box::pin(async move {
			Self::set_now(map, key, value, timeout);

			Ok(())
		})
	}

	fn get_data<'a>(
		&'a self,
		session: &'a SessionId,
		namespace: &'a str,
		key: &'a str,
	) -> StoreFuture<'a, Option<String>> {
		let map = self.0.clone();
		let key =
			SessionKey { session: session.to_owned(), namespace: namespace.into(), key: key.into() };

		Box::pin(async move { Ok(Self::get_now(map, key)) })
	}
}

#[derive(Clone, Debug)]
struct Cookie {
	value: String,
	params: CookieParams,
	set_at: OffsetDateTime,
}

/// Cookie jar of a single requester, kept in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryPreferenceStore(Arc<RwLock<HashMap<String, Cookie>>>);
impl MemoryPreferenceStore {
	/// Returns the attributes the value under `name` was written with.
	pub fn params(&self, name: &str) -> Option<CookieParams> {
		self.0.read().get(name).map(|cookie| cookie.params.clone())
	}

	/// Reads `name` as if the current time were `now`.
	pub fn get_at(&self, name: &str, now: OffsetDateTime) -> Option<String> {
		self.0
			.read()
			.get(name)
			.filter(|cookie| cookie.set_at + cookie.params.lifetime > now)
			.map(|cookie| cookie.value.clone())
	}
}
impl PreferenceStore for MemoryPreferenceStore {
	fn set(&self, name: &str, value: &str, params: &CookieParams) -> Result<(), StoreError> {
		let cookie = Cookie {
			value: value.to_owned(),
			params: params.clone(),
			set_at: OffsetDateTime::now_utc(),
		};

		self.0.write().insert(name.to_owned(), cookie);

		Ok(())
	}

	fn get(&self, name: &str) -> Option<String> {
		self.get_at(name, OffsetDateTime::now_utc())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn session(id: &str) -> SessionId {
		SessionId::new(id).expect("Session fixture should be valid.")
	}

	#[tokio::test]
	async fn expired_states_are_not_found() {
		let store = MemoryStateStore::with_ttl(Duration::ZERO);
		let id = store
			.save("multiauth:selection", &AuthContext::new())
			.await
			.expect("Saving a context should succeed.");

		tokio::time::sleep(std::time::Duration::from_millis(5)).await;

		let err = store
			.load(&id, "multiauth:selection")
			.await
			.expect_err("Expired state should not load.");

		assert!(matches!(err, StoreError::NotFound { .. }));
		assert!(store.is_empty(), "Expired entries should be dropped on access.");
	}

	#[tokio::test]
	async fn abandoned_states_are_swept_by_later_saves() {
		let store = MemoryStateStore::with_ttl(Duration::ZERO);

		for _ in 0..100 {
			store
				.save("multiauth:selection", &AuthContext::new())
				.await
				.expect("Saving a context should succeed.");
		}

		tokio::time::sleep(std::time::Duration::from_millis(5)).await;

		let id = store
			.save("multiauth:selection", &AuthContext::new())
			.await
			.expect("Saving a context should succeed.");

		assert_eq!(store.len(), 1);
		assert!(store.entries.read().contains_key(&id));
	}

	#[tokio::test]
	async fn session_values_honor_timeouts_and_session_end() {
		let store = MemorySessionStore::default();
		let alice = session("alice");
		let bob = session("bob");

		store
			.set_data(&alice, "ns", "k", "v".into(), DataTimeout::SessionEnd)
			.await
			.expect("Session write should succeed.");
		store
			.set_data(&alice, "ns", "short", "gone".into(), DataTimeout::After(Duration::ZERO))
			.await
			.expect("Session write should succeed.");

		assert_eq!(store.get_data(&alice, "ns", "k").await, Ok(Some("v".into())));
		assert_eq!(store.get_data(&bob, "ns", "k").await, Ok(None));
		assert_eq!(store.get_data(&alice, "ns", "short").await, Ok(None));

		store.end_session(&alice);

		assert_eq!(store.get_data(&alice, "ns", "k").await, Ok(None));
	}

	#[test]
	fn cookies_expire_after_their_lifetime() {
		let jar = MemoryPreferenceStore::default();
		let params =
			CookieParams { lifetime: Duration::days(90), path: "/".into(), http_only: false };

		jar.set("multiauth_source_multi1", "ldap", &params).expect("Cookie write should succeed.");

		let now = OffsetDateTime::now_utc();

		assert_eq!(jar.get_at("multiauth_source_multi1", now), Some("ldap".into()));
		assert_eq!(jar.get_at("multiauth_source_multi1", now + Duration::days(91)), None);
		assert_eq!(jar.params("multiauth_source_multi1"), Some(params));
	}
}
