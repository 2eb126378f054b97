//! Shared fixtures for the integration suites.

#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// self
use multiauth_broker::{
	auth::{SessionId, SourceId, StateId},
	context::AuthContext,
	flows::{AUTH_STATE_PARAM, MultiAuth},
	redirect::Redirect,
	source::{AuthStep, DelegateError, DelegateSource, LogoutStep, SourceFuture, StaticRegistry},
	store::{MemorySessionStore, MemoryStateStore},
	url::Url,
};

/// Behavior of a [`RecordingSource`] when asked to authenticate.
#[derive(Clone, Debug)]
pub enum Behavior {
	/// Writes `uid` into the context and completes.
	Accept(&'static str),
	/// Fails with a structured, recoverable error.
	Refuse(&'static str, &'static str),
	/// Fails with an opaque I/O error carrying the message.
	Crash(&'static str),
	/// Suspends towards a remote endpoint.
	Redirect(&'static str),
}

/// Delegate that counts how often each hook ran.
#[derive(Debug)]
pub struct RecordingSource {
	behavior: Behavior,
	authentications: AtomicUsize,
	logouts: AtomicUsize,
}
impl RecordingSource {
	pub fn new(behavior: Behavior) -> Arc<Self> {
		Arc::new(Self {
			behavior,
			authentications: AtomicUsize::new(0),
			logouts: AtomicUsize::new(0),
		})
	}

	pub fn authentications(&self) -> usize {
		self.authentications.load(Ordering::SeqCst)
	}

	pub fn logouts(&self) -> usize {
		self.logouts.load(Ordering::SeqCst)
	}
}
impl DelegateSource for RecordingSource {
	fn authenticate<'a>(&'a self, context: &'a mut AuthContext) -> SourceFuture<'a, AuthStep> {
		Box::pin(async move {
			self.authentications.fetch_add(1, Ordering::SeqCst);

			match &self.behavior {
				Behavior::Accept(uid) => {
					context.insert("uid", *uid);

					Ok(AuthStep::Complete)
				},
				Behavior::Refuse(code, message) => Err(DelegateError::auth(*code, *message)),
				Behavior::Crash(message) =>
					Err(DelegateError::other(std::io::Error::other(*message))),
				Behavior::Redirect(target) => {
					let url = Url::parse(target).map_err(DelegateError::other)?;

					Ok(AuthStep::Redirect(Redirect::to(url)))
				},
			}
		})
	}

	fn logout<'a>(&'a self, _context: &'a mut AuthContext) -> SourceFuture<'a, LogoutStep> {
		Box::pin(async move {
			self.logouts.fetch_add(1, Ordering::SeqCst);

			Ok(LogoutStep::Complete)
		})
	}
}

pub fn source_id(value: &str) -> SourceId {
	SourceId::new(value).expect("Source identifier fixture should be valid.")
}

pub fn session_id(value: &str) -> SessionId {
	SessionId::new(value).expect("Session identifier fixture should be valid.")
}

/// Registry holding `ldap` (accepting), `sms` (refusing), and `saml` (redirecting) delegates.
pub struct Fixture {
	pub ldap: Arc<RecordingSource>,
	pub sms: Arc<RecordingSource>,
	pub saml: Arc<RecordingSource>,
	pub registry: Arc<StaticRegistry>,
	pub states: Arc<MemoryStateStore>,
	pub sessions: Arc<MemorySessionStore>,
}
impl Fixture {
	pub fn new() -> Self {
		let ldap = RecordingSource::new(Behavior::Accept("alice"));
		let sms =
			RecordingSource::new(Behavior::Refuse("WRONGUSERPASS", "Incorrect one-time code."));
		let saml = RecordingSource::new(Behavior::Redirect("https://remote-idp.example.org/sso"));
		let registry = StaticRegistry::default()
			.with_source(source_id("ldap"), "ldap:Ldap", ldap.clone())
			.with_source(source_id("sms"), "sms:Otp", sms.clone())
			.with_source(source_id("saml"), "saml:SP", saml.clone());

		Self {
			ldap,
			sms,
			saml,
			registry: Arc::new(registry),
			states: Arc::new(MemoryStateStore::default()),
			sessions: Arc::new(MemorySessionStore::default()),
		}
	}

	/// Builds broker `multi1` from raw configuration merged over the selection URL.
	pub fn broker(&self, mut raw: serde_json::Value) -> MultiAuth {
		raw["selection_url"] = "https://idp.example.com/multiauth/discovery".into();

		MultiAuth::from_config(
			source_id("multi1"),
			&raw,
			self.registry.clone(),
			self.states.clone(),
			self.sessions.clone(),
		)
		.expect("Broker fixture configuration should be valid.")
	}
}

pub fn state_of(redirect: &Redirect) -> StateId {
	StateId::new(redirect.param(AUTH_STATE_PARAM).expect("Redirect should carry `AuthState`."))
		.expect("State identifier should be valid.")
}
