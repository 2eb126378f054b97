//! Source descriptor data structures shared by configuration and flows.
//!
//! The module exposes the immutable [`SourceDescriptor`], its localized labels, and the ordered
//! [`BrokerConfig`] collection, plus the builder that normalizes raw configuration into them.

/// Builder API and raw-configuration normalization.
pub mod builder;
/// Localized label maps.
pub mod text;

pub use builder::*;
pub use text::*;

// std
use std::{ops::Deref, slice::Iter};
// self
use crate::{_prelude::*, auth::SourceId, error::ConfigError};

/// One selectable delegate mechanism.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
	/// Identifier resolvable through the [`SourceRegistry`](crate::source::SourceRegistry).
	pub id: SourceId,
	/// Label shown on the selection page, per language.
	pub text: LocalizedText,
	/// Presentation hint for the selection page.
	pub css_class: String,
	/// Optional help text rendered under the option.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub help: Option<LocalizedText>,
}
impl SourceDescriptor {
	/// Creates a new builder for the provided identifier.
	pub fn builder(id: SourceId) -> SourceDescriptorBuilder {
		SourceDescriptorBuilder::new(id)
	}
}

/// Ordered, non-empty set of sources with unique identifiers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BrokerConfig(Arc<[SourceDescriptor]>);
impl BrokerConfig {
	/// Validates and wraps already-built descriptors, keeping their order.
	pub fn new(descriptors: Vec<SourceDescriptor>) -> Result<Self, ConfigError> {
		if descriptors.is_empty() {
			return Err(ConfigError::EmptySources);
		}

		let mut seen = HashSet::with_capacity(descriptors.len());

		for descriptor in &descriptors {
			if !seen.insert(descriptor.id.as_str()) {
				return Err(ConfigError::DuplicateSource { id: descriptor.id.clone() });
			}
		}

		Ok(Self(descriptors.into()))
	}

	/// Looks up a descriptor by identifier.
	pub fn get(&self, id: &str) -> Option<&SourceDescriptor> {
		self.0.iter().find(|descriptor| descriptor.id.as_str() == id)
	}

	/// Returns true when `id` is one of the configured sources.
	pub fn contains(&self, id: &str) -> bool {
		self.get(id).is_some()
	}

	/// Iterates over the configured identifiers in order.
	pub fn ids(&self) -> impl Iterator<Item = &SourceId> {
		self.0.iter().map(|descriptor| &descriptor.id)
	}

	/// Iterates over the descriptors in order.
	pub fn iter(&self) -> Iter<'_, SourceDescriptor> {
		self.0.iter()
	}
}
impl Deref for BrokerConfig {
	type Target = [SourceDescriptor];

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl<'de> Deserialize<'de> for BrokerConfig {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let descriptors = Vec::<SourceDescriptor>::deserialize(deserializer)?;

		Self::new(descriptors).map_err(serde::de::Error::custom)
	}
}
impl<'a> IntoIterator for &'a BrokerConfig {
	type IntoIter = Iter<'a, SourceDescriptor>;
	type Item = &'a SourceDescriptor;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}
