// crates.io
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	auth::{LanguageCode, SourceId},
	error::ConfigError,
	source::{BrokerConfig, LocalizedText, SourceDescriptor, SourceRegistry},
};

/// Builder for [`SourceDescriptor`] values.
#[derive(Debug)]
pub struct SourceDescriptorBuilder {
	/// Identifier for the descriptor being constructed.
	pub id: SourceId,
	/// Explicit labels; defaults to `{default_language: id}`.
	pub text: Option<LocalizedText>,
	/// Explicit presentation hint; defaults from the registry type tag.
	pub css_class: Option<String>,
	/// Optional help text.
	pub help: Option<LocalizedText>,
}
impl SourceDescriptorBuilder {
	/// Creates a new builder seeded with the provided identifier.
	pub fn new(id: SourceId) -> Self {
		Self { id, text: None, css_class: None, help: None }
	}

	/// Adds a label for one language.
	pub fn text(mut self, language: LanguageCode, label: impl Into<String>) -> Self {
		self.text.get_or_insert_with(LocalizedText::default).insert(language, label);

		self
	}

	/// Replaces all labels.
	pub fn texts(mut self, text: LocalizedText) -> Self {
		self.text = Some(text);

		self
	}

	/// Sets the presentation hint.
	pub fn css_class(mut self, css_class: impl Into<String>) -> Self {
		self.css_class = Some(css_class.into());

		self
	}

	/// Adds help text for one language.
	pub fn help(mut self, language: LanguageCode, help: impl Into<String>) -> Self {
		self.help.get_or_insert_with(LocalizedText::default).insert(language, help);

		self
	}

	/// Replaces all help text.
	pub fn helps(mut self, help: LocalizedText) -> Self {
		self.help = Some(help);

		self
	}

	/// Consumes the builder, filling defaults.
	///
	/// Labels always carry a `default_language` entry; when the explicit text lacks one, the id
	/// is used.
	///
	/// Without an explicit css class, the registry's type tag for the source is used with `:`
	/// replaced by `-` (`ldap:Ldap` becomes `ldap-Ldap`); an unknown tag yields an empty class.
	pub fn build(
		self,
		default_language: &LanguageCode,
		registry: Option<&dyn SourceRegistry>,
	) -> SourceDescriptor {
		let mut text = self.text.unwrap_or_default();

		if text.get(default_language.as_str()).is_none() {
			text.insert(default_language.clone(), self.id.as_str());
		}

		let css_class = self.css_class.unwrap_or_else(|| {
			registry
				.and_then(|registry| registry.type_tag(&self.id))
				.map(|tag| tag.replace(':', "-"))
				.unwrap_or_default()
		});

		SourceDescriptor { id: self.id, text, css_class, help: self.help }
	}
}

/// Per-source overrides accepted in raw configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SourceOverrides {
	text: Option<RawText>,
	#[serde(rename = "css-class", alias = "cssClass", alias = "css_class")]
	css_class: Option<String>,
	help: Option<RawText>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawText {
	Plain(String),
	Localized(BTreeMap<LanguageCode, String>),
}
impl RawText {
	fn into_text(self, default_language: &LanguageCode) -> LocalizedText {
		match self {
			RawText::Plain(value) => LocalizedText::single(default_language.clone(), value),
			RawText::Localized(map) => map.into_iter().collect(),
		}
	}
}

/// The two legacy shapes a source entry may take.
enum SourceEntry<'a> {
	/// `"ldap"`: the value is the identifier, no overrides.
	Bare(&'a str),
	/// `{"sms": {...}}` or a map member: the key is the identifier.
	Keyed(&'a str, &'a Value),
}
impl<'a> SourceEntry<'a> {
	fn from_list_item(path: &str, item: &'a Value) -> Result<Self, ConfigError> {
		match item {
			Value::String(id) => Ok(Self::Bare(id)),
			Value::Object(entry) if entry.len() == 1 => {
				let (id, overrides) = entry.iter().next().ok_or(ConfigError::EmptySources)?;

				Ok(Self::Keyed(id, overrides))
			},
			Value::Object(entry) =>
				Err(ConfigError::AmbiguousEntry { path: path.to_owned(), found: entry.len() }),
			other => Err(malformed(path, "a source identifier or a single-key object", other)),
		}
	}

	fn from_map_member(id: &'a str, value: &'a Value) -> Self {
		match value {
			// Positional members (`{"0": "ldap"}`) carry the id as the value.
			Value::String(bare) => Self::Bare(bare),
			overrides => Self::Keyed(id, overrides),
		}
	}

	fn normalize(
		self,
		path: &str,
		default_language: &LanguageCode,
		registry: &dyn SourceRegistry,
	) -> Result<SourceDescriptor, ConfigError> {
		let (raw_id, overrides) = match self {
			Self::Bare(id) => (id, SourceOverrides::default()),
			Self::Keyed(id, Value::Null) => (id, SourceOverrides::default()),
			Self::Keyed(id, overrides) => {
				let overrides: SourceOverrides = serde_path_to_error::deserialize(overrides)
					.map_err(|e| ConfigError::Malformed {
						path: format!("{path}.{}", e.path()),
						message: e.into_inner().to_string(),
					})?;

				(id, overrides)
			},
		};
		let id = SourceId::new(raw_id).map_err(|e| ConfigError::identifier(raw_id, e))?;
		let mut builder = SourceDescriptor::builder(id);

		if let Some(text) = overrides.text {
			builder = builder.texts(text.into_text(default_language));
		}
		if let Some(css_class) = overrides.css_class {
			builder = builder.css_class(css_class);
		}
		if let Some(help) = overrides.help {
			builder = builder.helps(help.into_text(default_language));
		}

		Ok(builder.build(default_language, Some(registry)))
	}
}

impl BrokerConfig {
	/// Normalizes raw broker configuration (a JSON object with a `sources` member).
	///
	/// `sources` may be an array whose items are bare identifiers or single-key objects, or an
	/// object mapping identifiers to overrides. Order is preserved in both forms.
	pub fn from_value(
		raw: &Value,
		default_language: &LanguageCode,
		registry: &dyn SourceRegistry,
	) -> Result<Self, ConfigError> {
		let sources = raw.get("sources").ok_or(ConfigError::MissingSources)?;
		let descriptors = match sources {
			Value::Array(items) => items
				.iter()
				.enumerate()
				.map(|(idx, item)| {
					let path = format!("sources[{idx}]");

					SourceEntry::from_list_item(&path, item)?.normalize(
						&path,
						default_language,
						registry,
					)
				})
				.collect::<Result<Vec<_>, _>>()?,
			Value::Object(members) => normalize_map(members, default_language, registry)?,
			other => return Err(malformed("sources", "an array or an object", other)),
		};

		Self::new(descriptors)
	}
}

fn normalize_map(
	members: &Map<String, Value>,
	default_language: &LanguageCode,
	registry: &dyn SourceRegistry,
) -> Result<Vec<SourceDescriptor>, ConfigError> {
	members
		.iter()
		.map(|(key, value)| {
			let path = format!("sources.{key}");

			SourceEntry::from_map_member(key, value).normalize(&path, default_language, registry)
		})
		.collect()
}

fn malformed(path: &str, expected: &str, found: &Value) -> ConfigError {
	let found = match found {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::String(_) => "a string",
		Value::Array(_) => "an array",
		Value::Object(_) => "an object",
	};

	ConfigError::Malformed {
		path: path.to_owned(),
		message: format!("expected {expected}, found {found}"),
	}
}
