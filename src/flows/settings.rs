//! Broker-level options read next to the `sources` list.

// self
use crate::{
	_prelude::*,
	auth::{LanguageCode, SourceId},
	error::ConfigError,
};

/// What logout does when the session holds no binding for the broker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutFallback {
	/// Resolve the broker's own identifier through the registry.
	#[default]
	BrokerId,
	/// Fail with [`Error::UnknownSource`] immediately.
	Reject,
}

/// When the session binding is written relative to the delegate call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingCommit {
	/// Bind as soon as the choice is validated, so failed attempts are recorded too.
	#[default]
	BeforeDelegate,
	/// Bind only once the delegate completes or suspends without error.
	AfterSuccess,
}

/// Options shared by every stage of one broker instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerSettings {
	/// Absolute URL of the selection (discovery) endpoint.
	pub selection_url: Url,
	/// Installation base path; scopes the preference cookie.
	#[serde(default = "default_base_path")]
	pub base_path: String,
	/// Language used for defaulted labels and as the rendering fallback.
	#[serde(default)]
	pub default_language: LanguageCode,
	/// Source preselected when the incoming context carries no hint.
	#[serde(default)]
	pub preselect: Option<SourceId>,
	/// Logout behavior without a session binding.
	#[serde(default)]
	pub logout_fallback: LogoutFallback,
	/// Session binding timing.
	#[serde(default)]
	pub binding_commit: BindingCommit,
}
impl BrokerSettings {
	/// Creates settings with defaults for everything but the selection endpoint.
	pub fn new(selection_url: &str) -> Result<Self, ConfigError> {
		let selection_url = Url::parse(selection_url)
			.map_err(|source| ConfigError::InvalidSelectionUrl { source })?;

		Ok(Self {
			selection_url,
			base_path: default_base_path(),
			default_language: LanguageCode::default(),
			preselect: None,
			logout_fallback: LogoutFallback::default(),
			binding_commit: BindingCommit::default(),
		})
	}

	/// Reads the settings out of raw broker configuration, ignoring `sources`.
	pub fn from_value(raw: &serde_json::Value) -> Result<Self, ConfigError> {
		serde_path_to_error::deserialize(raw).map_err(ConfigError::malformed)
	}

	/// Overrides the base path.
	pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
		self.base_path = base_path.into();

		self
	}

	/// Overrides the default language.
	pub fn with_default_language(mut self, language: LanguageCode) -> Self {
		self.default_language = language;

		self
	}

	/// Sets the configured preselect.
	pub fn with_preselect(mut self, id: SourceId) -> Self {
		self.preselect = Some(id);

		self
	}

	/// Overrides the logout fallback policy.
	pub fn with_logout_fallback(mut self, fallback: LogoutFallback) -> Self {
		self.logout_fallback = fallback;

		self
	}

	/// Overrides the binding commit policy.
	pub fn with_binding_commit(mut self, commit: BindingCommit) -> Self {
		self.binding_commit = commit;

		self
	}
}

fn default_base_path() -> String {
	"/".into()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn settings_fill_defaults() {
		let raw = serde_json::json!({
			"selection_url": "https://idp.example.com/multiauth/discovery",
			"sources": ["ldap"],
		});
		let settings = BrokerSettings::from_value(&raw).expect("Minimal settings should parse.");

		assert_eq!(settings.base_path, "/");
		assert_eq!(settings.default_language.as_str(), "en");
		assert_eq!(settings.preselect, None);
		assert_eq!(settings.logout_fallback, LogoutFallback::BrokerId);
		assert_eq!(settings.binding_commit, BindingCommit::BeforeDelegate);
	}

	#[test]
	fn settings_report_bad_values_by_path() {
		let raw = serde_json::json!({
			"selection_url": "https://idp.example.com/multiauth/discovery",
			"logout_fallback": "guess",
		});
		let err = BrokerSettings::from_value(&raw).expect_err("Unknown policy should fail.");

		assert!(
			matches!(&err, ConfigError::Malformed { path, .. } if path == "logout_fallback"),
			"unexpected error: {err:?}"
		);
		assert!(matches!(
			BrokerSettings::new("not a url"),
			Err(ConfigError::InvalidSelectionUrl { .. })
		));
	}
}
