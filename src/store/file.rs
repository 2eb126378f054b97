//! File-backed [`StateStore`] so suspended attempts survive a broker restart.
//!
//! Every mutation is staged on a copy of the live states and written to disk first; the
//! in-memory view only changes once the snapshot file has been replaced.

// std
use std::{
	fs::{self, File},
	io::{self, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::StateId,
	context::AuthContext,
	store::{StateStore, StoreError, StoreFuture, StoredState},
};

type States = HashMap<StateId, StoredState>;

/// Persists suspended contexts to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStateStore {
	path: PathBuf,
	ttl: Duration,
	inner: Arc<RwLock<States>>,
}
impl FileStateStore {
	/// Opens (or creates) a store at the provided path, eagerly loading unexpired entries.
	pub fn open(path: impl Into<PathBuf>, ttl: Duration) -> Result<Self, StoreError> {
		let path = path.into();
		let now = OffsetDateTime::now_utc();
		let states = read_snapshot(&path)?
			.into_iter()
			.filter(|(_, state)| !state.is_expired_at(ttl, now))
			.collect();

		Ok(Self { path, ttl, inner: Arc::new(RwLock::new(states)) })
	}

	fn live(&self, states: &States, now: OffsetDateTime) -> States {
		states
			.iter()
			.filter(|(_, state)| !state.is_expired_at(self.ttl, now))
			.map(|(id, state)| (id.clone(), state.clone()))
			.collect()
	}

	fn commit(&self, current: &mut States, next: States) -> Result<(), StoreError> {
		write_snapshot(&self.path, &next)?;

		*current = next;

		Ok(())
	}

	fn read_locked(
		&self,
		id: &StateId,
		stage: &str,
		consume: bool,
	) -> Result<AuthContext, StoreError> {
		let now = OffsetDateTime::now_utc();
		let mut guard = self.inner.write();
		let not_found = || StoreError::NotFound { id: id.to_string() };
		let state = guard.get(id).ok_or_else(not_found)?;

		if state.is_expired_at(self.ttl, now) {
			let next = self.live(&guard, now);

			self.commit(&mut guard, next)?;

			return Err(not_found());
		}

		state.ensure_stage(stage)?;

		if !consume {
			return Ok(state.context.clone());
		}

		let mut next = self.live(&guard, now);
		let taken = next.remove(id).ok_or_else(not_found)?;

		self.commit(&mut guard, next)?;

		Ok(taken.context)
	}
}
impl StateStore for FileStateStore {
	fn save<'a>(&'a self, stage: &'a str, context: &'a AuthContext) -> StoreFuture<'a, StateId> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();
			let mut guard = self.inner.write();
			let mut next = self.live(&guard, now);
			let mut id = StateId::generate();

			while next.contains_key(&id) {
				id = StateId::generate();
			}

			next.insert(id.clone(), StoredState::new(stage, context.to_owned()));
			self.commit(&mut guard, next)?;

			Ok(id)
		})
	}

	fn load<'a>(&'a self, id: &'a StateId, stage: &'a str) -> StoreFuture<'a, AuthContext> {
		Box::pin(async move { self.read_locked(id, stage, false) })
	}

	fn take<'a>(&'a self, id: &'a StateId, stage: &'a str) -> StoreFuture<'a, AuthContext> {
		Box::pin(async move { self.read_locked(id, stage, true) })
	}
}

fn staging_path(path: &Path) -> PathBuf {
	let mut staging = path.as_os_str().to_owned();

	staging.push(".tmp");

	staging.into()
}

fn read_snapshot(path: &Path) -> Result<States, StoreError> {
	let bytes = match fs::read(path) {
		Ok(bytes) => bytes,
		Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(States::new()),
		Err(e) =>
			return Err(StoreError::Backend {
				message: format!("Cannot read suspended states from {}: {e}", path.display()),
			}),
	};

	if bytes.iter().all(u8::is_ascii_whitespace) {
		return Ok(States::new());
	}

	serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
		message: format!("Suspended states in {} are corrupt: {e}", path.display()),
	})
}

fn write_snapshot(path: &Path, states: &States) -> Result<(), StoreError> {
	let bytes = serde_json::to_vec(states).map_err(|e| StoreError::Serialization {
		message: format!("Cannot encode suspended states: {e}"),
	})?;
	let staging = staging_path(path);
	let replace = || -> io::Result<()> {
		if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
			fs::create_dir_all(dir)?;
		}

		let mut file = File::create(&staging)?;

		file.write_all(&bytes)?;
		file.sync_all()?;

		fs::rename(&staging, path)
	};

	replace().map_err(|e| StoreError::Backend {
		message: format!("Cannot persist suspended states to {}: {e}", path.display()),
	})
}
