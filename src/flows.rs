//! Broker stages powered by the [`MultiAuth`] facade.
//!
//! An attempt moves through the stages across separate requests:
//! 1. [`MultiAuth::authenticate`] decorates the context, saves it, and returns a [`Redirect`] to
//!    the selection page.
//! 2. The selection endpoint calls [`MultiAuth::resume`] / [`MultiAuth::select`] with the
//!    `AuthState` it received.
//! 3. [`delegate_authentication`] validates the choice, binds it to the session, and runs the
//!    delegate.
//! 4. Later, [`MultiAuth::logout`] routes logout to the bound delegate.
//!
//! [`Redirect`]: crate::redirect::Redirect

pub mod delegation;
pub mod discovery;
pub mod logout;
pub mod preference;
pub mod selection;
pub mod settings;

pub use delegation::*;
pub use discovery::*;
pub use preference::*;
pub use selection::*;
pub use settings::*;

// self
use crate::{
	_prelude::*,
	auth::SourceId,
	error::ConfigError,
	source::{BrokerConfig, SourceRegistry},
	store::{SessionStore, StateStore},
};

/// Stage tag under which suspended contexts are saved.
pub const SELECTION_STAGE: &str = "multiauth:selection";
/// Session namespace holding the delegate each broker bound to the session.
pub const SESSION_SOURCE_NAMESPACE: &str = "multiauth:selectedSource";
/// Query parameter carrying the state identifier.
pub const AUTH_STATE_PARAM: &str = "AuthState";
/// Query parameter carrying the chosen or preselected source.
pub const SOURCE_PARAM: &str = "source";

/// Authentication source that lets the requester pick among other sources.
///
/// The broker owns its validated source list and settings plus shared handles to the delegate
/// registry and the state and session stores. Request-scoped collaborators (the session id and
/// the requester's preference jar) are passed to each call instead.
#[derive(Clone)]
pub struct MultiAuth {
	/// Identifier of this broker instance.
	pub id: SourceId,
	/// Sources offered to requesters, in display order.
	pub sources: BrokerConfig,
	/// Broker-level settings.
	pub settings: BrokerSettings,
	/// Registry resolving delegate identifiers.
	pub registry: Arc<dyn SourceRegistry>,
	/// Store bridging the selection redirect.
	pub state_store: Arc<dyn StateStore>,
	/// Store holding session bindings.
	pub session_store: Arc<dyn SessionStore>,
}
impl MultiAuth {
	/// Creates a broker from already-validated parts.
	pub fn new(
		id: SourceId,
		sources: BrokerConfig,
		settings: BrokerSettings,
		registry: Arc<dyn SourceRegistry>,
		state_store: Arc<dyn StateStore>,
		session_store: Arc<dyn SessionStore>,
	) -> Result<Self, ConfigError> {
		if let Some(preselect) = settings.preselect.as_ref().filter(|id| !sources.contains(id)) {
			return Err(ConfigError::UnknownPreselect { id: preselect.clone() });
		}

		Ok(Self { id, sources, settings, registry, state_store, session_store })
	}

	/// Builds a broker from raw JSON configuration holding both `sources` and the settings.
	pub fn from_config(
		id: SourceId,
		raw: &serde_json::Value,
		registry: Arc<dyn SourceRegistry>,
		state_store: Arc<dyn StateStore>,
		session_store: Arc<dyn SessionStore>,
	) -> Result<Self, ConfigError> {
		let settings = BrokerSettings::from_value(raw)?;
		let sources =
			BrokerConfig::from_value(raw, &settings.default_language, registry.as_ref())?;

		Self::new(id, sources, settings, registry, state_store, session_store)
	}

	/// Delegation helper bound to this broker's registry, session store, and commit policy.
	pub fn delegator(&self) -> Delegator<'_> {
		Delegator {
			registry: self.registry.as_ref(),
			sessions: self.session_store.as_ref(),
			binding_commit: self.settings.binding_commit,
		}
	}
}
impl Debug for MultiAuth {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MultiAuth")
			.field("id", &self.id)
			.field("sources", &self.sources.ids().collect::<Vec<_>>())
			.field("settings", &self.settings)
			.finish()
	}
}
