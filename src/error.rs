//! Broker-level error types shared across configuration, stores, and flows.

// self
use crate::{
	_prelude::*,
	auth::{IdentifierError, SourceId},
	context::{AuthContext, AuthFailure},
};

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Broker configuration is missing or malformed.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// The requester chose a source this broker instance never offered.
	#[error("Invalid authentication source: {id}.")]
	InvalidSelection {
		/// Identifier supplied by the requester.
		id: String,
	},
	/// The bound (or fallback) source could not be resolved during logout.
	#[error("Invalid authentication source during logout: {id}.")]
	UnknownSource {
		/// Identifier that failed to resolve.
		id: String,
	},
	/// The delegate reported a failure; the failure is attached to the carried context.
	#[error(transparent)]
	Delegate(Box<DelegateFailure>),
}

/// Failure reported by a delegate source, together with the context it was attached to.
#[derive(Debug, ThisError)]
#[error("Authentication source `{source_id}` failed: {failure}")]
pub struct DelegateFailure {
	/// Delegate that produced the failure.
	pub source_id: SourceId,
	/// Persistable failure payload, also stored in `context.error`.
	pub failure: AuthFailure,
	/// Context handed back to upstream failure handling.
	pub context: AuthContext,
}

/// Configuration failures raised while building a broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// The `sources` option is absent.
	#[error("The required option `sources` is missing.")]
	MissingSources,
	/// The `sources` option is present but lists nothing.
	#[error("The option `sources` must list at least one authentication source.")]
	EmptySources,
	/// A configuration value has the wrong shape.
	#[error("Invalid broker configuration at `{path}`: {message}")]
	Malformed {
		/// JSON path of the offending value.
		path: String,
		/// Parser message.
		message: String,
	},
	/// A keyed source entry must name exactly one source.
	#[error("Source entry at `{path}` must name exactly one source, found {found}.")]
	AmbiguousEntry {
		/// JSON path of the offending entry.
		path: String,
		/// Number of keys in the entry.
		found: usize,
	},
	/// An identifier failed validation.
	#[error("Invalid identifier `{value}`.")]
	InvalidIdentifier {
		/// Raw value that failed validation.
		value: String,
		/// Validation failure.
		#[source]
		source: IdentifierError,
	},
	/// The same source appears twice.
	#[error("Authentication source `{id}` is listed more than once.")]
	DuplicateSource {
		/// Duplicated identifier.
		id: SourceId,
	},
	/// The configured preselect is not among the offered sources.
	#[error("Preselected source `{id}` is not one of the configured sources.")]
	UnknownPreselect {
		/// Configured preselect identifier.
		id: SourceId,
	},
	/// The selection endpoint URL cannot be parsed.
	#[error("Selection URL is invalid.")]
	InvalidSelectionUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}
impl ConfigError {
	/// Wraps a structured deserialization failure, keeping the JSON path.
	pub fn malformed(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
		Self::Malformed { path: err.path().to_string(), message: err.into_inner().to_string() }
	}

	/// Wraps an identifier validation failure for `value`.
	pub fn identifier(value: impl Into<String>, source: IdentifierError) -> Self {
		Self::InvalidIdentifier { value: value.into(), source }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn malformed_errors_keep_json_path() {
		#[derive(Debug, Deserialize)]
		#[allow(dead_code)]
		struct Shape {
			inner: Vec<u8>,
		}

		let raw = serde_json::json!({ "inner": [1, "two"] });
		let err = serde_path_to_error::deserialize::<_, Shape>(raw)
			.expect_err("Mixed array should fail to deserialize.");
		let config = ConfigError::malformed(err);

		assert!(
			matches!(&config, ConfigError::Malformed { path, .. } if path == "inner[1]"),
			"unexpected error: {config:?}"
		);
	}

	#[test]
	fn selection_errors_name_the_source() {
		let err = Error::InvalidSelection { id: "admin-backdoor".into() };

		assert_eq!(err.to_string(), "Invalid authentication source: admin-backdoor.");
	}
}
