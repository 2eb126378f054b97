//! Logout stage routed through the session binding written at delegation time.

// self
use crate::{
	_prelude::*,
	auth::{SessionId, SourceId},
	context::{AuthContext, AuthFailure},
	error::DelegateFailure,
	flows::{LogoutFallback, MultiAuth, SESSION_SOURCE_NAMESPACE},
	obs::{self, StageKind, StageOutcome, StageSpan},
	source::LogoutStep,
};

impl MultiAuth {
	/// Forwards logout to the delegate that authenticated `session`.
	///
	/// Without a binding the broker's own identifier is tried instead
	/// ([`LogoutFallback::BrokerId`]) or the call fails right away ([`LogoutFallback::Reject`]).
	pub async fn logout(
		&self,
		session: &SessionId,
		context: &mut AuthContext,
	) -> Result<LogoutStep> {
		const KIND: StageKind = StageKind::Logout;

		let span = StageSpan::new(KIND, &self.id);

		obs::record_stage_outcome(KIND, StageOutcome::Attempt);

		let result = span.instrument(self.logout_inner(session, context)).await;

		match &result {
			Ok(LogoutStep::Complete) => obs::record_stage_outcome(KIND, StageOutcome::Success),
			Ok(LogoutStep::Redirect(_)) =>
				obs::record_stage_outcome(KIND, StageOutcome::Suspended),
			Err(_) => obs::record_stage_outcome(KIND, StageOutcome::Failure),
		}

		result
	}

	/// Returns the delegate bound to `session` by this broker, if any.
	pub async fn bound_source(&self, session: &SessionId) -> Result<Option<String>> {
		Ok(self.session_store.get_data(session, SESSION_SOURCE_NAMESPACE, &self.id).await?)
	}

	async fn logout_inner(
		&self,
		session: &SessionId,
		context: &mut AuthContext,
	) -> Result<LogoutStep> {
		let target = match (self.bound_source(session).await?, self.settings.logout_fallback) {
			(Some(bound), _) => bound,
			(None, LogoutFallback::BrokerId) => self.id.to_string(),
			(None, LogoutFallback::Reject) =>
				return Err(Error::UnknownSource { id: self.id.to_string() }),
		};
		let delegate = self
			.registry
			.resolve(&target)
			.ok_or_else(|| Error::UnknownSource { id: target.clone() })?;

		delegate.logout(context).await.map_err(|e| {
			let failure = AuthFailure::from(e);
			let source_id = SourceId::new(&target).unwrap_or_else(|_| self.id.clone());

			context.error = Some(failure.clone());

			Error::Delegate(Box::new(DelegateFailure {
				source_id,
				failure,
				context: context.clone(),
			}))
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		flows::BrokerSettings,
		source::{
			AuthStep, BrokerConfig, DelegateSource, SourceDescriptor, SourceFuture, StaticRegistry,
		},
		store::{DataTimeout, MemorySessionStore, MemoryStateStore, SessionStore},
	};

	struct Tracked(&'static str);
	impl DelegateSource for Tracked {
		fn authenticate<'a>(&'a self, _context: &'a mut AuthContext) -> SourceFuture<'a, AuthStep> {
			Box::pin(async { Ok(AuthStep::Complete) })
		}

		fn logout<'a>(&'a self, context: &'a mut AuthContext) -> SourceFuture<'a, LogoutStep> {
			Box::pin(async move {
				context.insert("logged_out_by", self.0);

				Ok(LogoutStep::Complete)
			})
		}
	}

	fn id(value: &str) -> SourceId {
		SourceId::new(value).expect("Source fixture should be valid.")
	}

	fn broker(sessions: Arc<MemorySessionStore>, fallback: LogoutFallback) -> MultiAuth {
		let registry = StaticRegistry::default()
			.with_source(id("ldap"), "ldap:Ldap", Arc::new(Tracked("ldap")))
			.with_source(id("sms"), "sms:Otp", Arc::new(Tracked("sms")));
		let sources = BrokerConfig::new(vec![
			SourceDescriptor::builder(id("ldap")).build(&Default::default(), None),
			SourceDescriptor::builder(id("sms")).build(&Default::default(), None),
		])
		.expect("Fixture config should be valid.");
		let settings = BrokerSettings::new("https://idp.example.com/multiauth/discovery")
			.expect("Fixture URL should parse.")
			.with_logout_fallback(fallback);

		MultiAuth::new(
			id("multi1"),
			sources,
			settings,
			Arc::new(registry),
			Arc::new(MemoryStateStore::default()),
			sessions,
		)
		.expect("Fixture broker should be valid.")
	}

	#[tokio::test]
	async fn logout_routes_to_bound_delegate() {
		let sessions = Arc::new(MemorySessionStore::default());
		let broker = broker(sessions.clone(), LogoutFallback::BrokerId);
		let session = SessionId::new("s1").expect("Session fixture should be valid.");

		sessions
			.set_data(
				&session,
				SESSION_SOURCE_NAMESPACE,
				"multi1",
				"sms".into(),
				DataTimeout::SessionEnd,
			)
			.await
			.expect("Binding write should succeed.");

		let mut context = AuthContext::new();
		let step = broker.logout(&session, &mut context).await.expect("Logout should succeed.");

		assert_eq!(step, LogoutStep::Complete);
		assert_eq!(context.get("logged_out_by"), Some(&"sms".into()));
	}

	#[tokio::test]
	async fn reject_policy_fails_without_binding() {
		let broker = broker(Arc::new(MemorySessionStore::default()), LogoutFallback::Reject);
		let session = SessionId::new("s1").expect("Session fixture should be valid.");
		let err = broker
			.logout(&session, &mut AuthContext::new())
			.await
			.expect_err("Unbound session should fail under the reject policy.");

		assert!(matches!(err, Error::UnknownSource { id } if id == "multi1"));
	}
}
