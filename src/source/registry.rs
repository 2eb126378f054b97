//! Delegate-source hooks and the registry that resolves them.
//!
//! Implementations wrap the real credential-checking mechanisms (directory binds, one-time codes,
//! remote identity providers). The broker only ever calls [`DelegateSource::authenticate`] and
//! [`DelegateSource::logout`]; what happens inside is the delegate's business.

// self
use crate::{
	_prelude::*,
	auth::SourceId,
	context::{AuthContext, AuthFailure},
	redirect::Redirect,
};

type BoxError = Box<dyn StdError + Send + Sync>;

/// Boxed future returned by [`DelegateSource`] hooks.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DelegateError>> + 'a + Send>>;

/// Underlying authentication mechanism the broker can delegate to.
pub trait DelegateSource: Send + Sync {
	/// Authenticates the requester, writing results into `context`.
	fn authenticate<'a>(&'a self, context: &'a mut AuthContext) -> SourceFuture<'a, AuthStep>;

	/// Logs the requester out of this mechanism.
	///
	/// The default implementation has nothing to tear down and completes immediately.
	fn logout<'a>(&'a self, context: &'a mut AuthContext) -> SourceFuture<'a, LogoutStep> {
		let _ = context;

		Box::pin(async { Ok(LogoutStep::Complete) })
	}
}

/// Result of a delegate authentication call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthStep {
	/// Credentials were verified and `context` carries the results.
	Complete,
	/// The delegate suspended the attempt itself (e.g. towards a remote identity provider).
	Redirect(Redirect),
}

/// Result of a delegate logout call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogoutStep {
	/// Logout finished locally.
	Complete,
	/// Logout continues elsewhere.
	Redirect(Redirect),
}

/// Failure raised by a delegate source.
#[derive(Debug, ThisError)]
pub enum DelegateError {
	/// Structured failure the upstream flow knows how to present (wrong password, locked user).
	#[error("{code}: {message}")]
	Auth {
		/// Machine-readable error code.
		code: String,
		/// Human-readable message.
		message: String,
	},
	/// Any other failure; only its message survives the continuation boundary.
	#[error("{source}")]
	Other {
		/// Mechanism-specific error.
		source: BoxError,
	},
}
impl DelegateError {
	/// Builds a structured authentication failure.
	pub fn auth(code: impl Into<String>, message: impl Into<String>) -> Self {
		Self::Auth { code: code.into(), message: message.into() }
	}

	/// Wraps a mechanism-specific error.
	pub fn other(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Other { source: Box::new(src) }
	}
}

impl From<DelegateError> for AuthFailure {
	fn from(error: DelegateError) -> Self {
		match error {
			DelegateError::Auth { code, message } => Self::Recoverable { code, message },
			DelegateError::Other { source } => Self::Unserializable { message: source.to_string() },
		}
	}
}

/// Resolves source identifiers to delegate mechanisms.
pub trait SourceRegistry: Send + Sync {
	/// Returns the delegate registered under `id`.
	fn resolve(&self, id: &str) -> Option<Arc<dyn DelegateSource>>;

	/// Returns the type tag `id` was registered with (e.g. `ldap:Ldap`).
	fn type_tag(&self, id: &str) -> Option<&str>;
}

struct Registration {
	type_tag: String,
	source: Arc<dyn DelegateSource>,
}

/// In-memory registry populated at startup.
#[derive(Default)]
pub struct StaticRegistry(HashMap<SourceId, Registration>);
impl StaticRegistry {
	/// Registers `source` under `id`, replacing any previous registration.
	pub fn register(
		&mut self,
		id: SourceId,
		type_tag: impl Into<String>,
		source: Arc<dyn DelegateSource>,
	) {
		self.0.insert(id, Registration { type_tag: type_tag.into(), source });
	}

	/// Builder-style variant of [`StaticRegistry::register`].
	pub fn with_source(
		mut self,
		id: SourceId,
		type_tag: impl Into<String>,
		source: Arc<dyn DelegateSource>,
	) -> Self {
		self.register(id, type_tag, source);

		self
	}

	/// Number of registered sources.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true when nothing is registered.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl SourceRegistry for StaticRegistry {
	fn resolve(&self, id: &str) -> Option<Arc<dyn DelegateSource>> {
		self.0.get(id).map(|registration| registration.source.clone())
	}

	fn type_tag(&self, id: &str) -> Option<&str> {
		self.0.get(id).map(|registration| registration.type_tag.as_str())
	}
}
impl Debug for StaticRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let mut entries = self
			.0
			.iter()
			.map(|(id, registration)| (id.as_str(), registration.type_tag.as_str()))
			.collect::<Vec<_>>();

		entries.sort_unstable();

		f.debug_map().entries(entries).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	struct Noop;
	impl DelegateSource for Noop {
		fn authenticate<'a>(&'a self, _context: &'a mut AuthContext) -> SourceFuture<'a, AuthStep> {
			Box::pin(async { Ok(AuthStep::Complete) })
		}
	}

	#[test]
	fn registry_exposes_type_tags() {
		let registry = StaticRegistry::default().with_source(
			SourceId::new("ldap").expect("Source fixture should be valid."),
			"ldap:Ldap",
			Arc::new(Noop),
		);

		assert!(registry.resolve("ldap").is_some());
		assert!(registry.resolve("sms").is_none());
		assert_eq!(registry.type_tag("ldap"), Some("ldap:Ldap"));
		assert_eq!(format!("{registry:?}"), "{\"ldap\": \"ldap:Ldap\"}");
	}

	#[test]
	fn opaque_errors_keep_their_message() {
		let err = DelegateError::other(std::io::Error::other("connection reset by peer"));

		assert_eq!(err.to_string(), "connection reset by peer");
		assert!(StdError::source(&err).is_some());
	}

	#[tokio::test]
	async fn default_logout_completes() {
		let mut context = AuthContext::new();
		let step = Noop.logout(&mut context).await.expect("Default logout should succeed.");

		assert_eq!(step, LogoutStep::Complete);
	}
}
