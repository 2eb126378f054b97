//! Remembers the last chosen source in the requester's cookie jar.
//!
//! The value is advisory: it only decides which option the selection page highlights and is never
//! trusted for delegation.

// self
use crate::{
	_prelude::*,
	auth::SourceId,
	flows::MultiAuth,
	store::{CookieParams, PreferenceStore, StoreError},
};

/// How long the requester's client keeps the preference.
pub const PREFERENCE_LIFETIME: Duration = Duration::days(90);

const PREFERENCE_COOKIE_PREFIX: &str = "multiauth_source_";

impl MultiAuth {
	/// Name of the cookie holding this broker's preference.
	pub fn preference_cookie_name(&self) -> String {
		format!("{PREFERENCE_COOKIE_PREFIX}{}", self.id)
	}

	/// Cookie attributes used when recording the preference.
	pub fn preference_cookie_params(&self) -> CookieParams {
		CookieParams {
			lifetime: PREFERENCE_LIFETIME,
			path: self.settings.base_path.clone(),
			http_only: false,
		}
	}

	/// Records `id` as the requester's latest choice.
	pub fn set_previous_source(
		&self,
		jar: &dyn PreferenceStore,
		id: &SourceId,
	) -> Result<(), StoreError> {
		jar.set(&self.preference_cookie_name(), id, &self.preference_cookie_params())
	}

	/// Reads the requester's latest choice; a missing or malformed value yields `None`.
	pub fn get_previous_source(&self, jar: &dyn PreferenceStore) -> Option<SourceId> {
		jar.get(&self.preference_cookie_name()).and_then(|value| SourceId::new(value).ok())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		flows::BrokerSettings,
		source::{BrokerConfig, SourceDescriptor, StaticRegistry},
		store::{MemoryPreferenceStore, MemorySessionStore, MemoryStateStore},
	};

	fn broker() -> MultiAuth {
		let ldap = SourceId::new("ldap").expect("Source fixture should be valid.");
		let sources = BrokerConfig::new(vec![
			SourceDescriptor::builder(ldap).build(&Default::default(), None),
		])
		.expect("Fixture config should be valid.");
		let settings = BrokerSettings::new("https://idp.example.com/multiauth/discovery")
			.expect("Fixture URL should parse.")
			.with_base_path("/simplesaml/");

		MultiAuth::new(
			SourceId::new("multi1").expect("Broker fixture should be valid."),
			sources,
			settings,
			Arc::new(StaticRegistry::default()),
			Arc::new(MemoryStateStore::default()),
			Arc::new(MemorySessionStore::default()),
		)
		.expect("Fixture broker should be valid.")
	}

	#[test]
	fn preference_round_trips_with_cookie_attributes() {
		let broker = broker();
		let jar = MemoryPreferenceStore::default();

		assert_eq!(broker.get_previous_source(&jar), None);

		broker
			.set_previous_source(&jar, &SourceId::new("ldap").expect("Source should be valid."))
			.expect("Preference write should succeed.");

		assert_eq!(broker.get_previous_source(&jar).as_deref(), Some("ldap"));
		assert_eq!(
			jar.params("multiauth_source_multi1"),
			Some(CookieParams {
				lifetime: Duration::days(90),
				path: "/simplesaml/".into(),
				http_only: false,
			})
		);
	}

	#[test]
	fn malformed_preference_reads_as_absent() {
		let broker = broker();
		let jar = MemoryPreferenceStore::default();

		jar.set("multiauth_source_multi1", "  ", &broker.preference_cookie_params())
			.expect("Raw cookie write should succeed.");

		assert_eq!(broker.get_previous_source(&jar), None);
	}
}
