// self
use crate::{_prelude::*, auth::LanguageCode};

/// Label keyed by language code.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<LanguageCode, String>);
impl LocalizedText {
	/// Creates a text holding a single translation.
	pub fn single(language: LanguageCode, value: impl Into<String>) -> Self {
		Self(BTreeMap::from([(language, value.into())]))
	}

	/// Adds or replaces a translation.
	pub fn insert(&mut self, language: LanguageCode, value: impl Into<String>) {
		self.0.insert(language, value.into());
	}

	/// Returns the exact translation for `language`.
	pub fn get(&self, language: &str) -> Option<&str> {
		self.0.get(language).map(String::as_str)
	}

	/// Returns true when no translation is present.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Resolves the best label for `language`.
	///
	/// Lookup order: exact match, primary subtag (`pt` for `pt-br`), `default_language`, then the
	/// first translation in code order.
	pub fn resolve(&self, language: &str, default_language: &str) -> Option<&str> {
		let primary = language.split_once('-').map(|(primary, _)| primary);

		self.get(language)
			.or_else(|| primary.and_then(|primary| self.get(primary)))
			.or_else(|| self.get(default_language))
			.or_else(|| self.0.values().next().map(String::as_str))
	}
}
impl FromIterator<(LanguageCode, String)> for LocalizedText {
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = (LanguageCode, String)>,
	{
		Self(iter.into_iter().collect())
	}
}
