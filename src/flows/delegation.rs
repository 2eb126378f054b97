//! Delegation stage: validate the requester's choice, bind it to the session, run the delegate.
//!
//! The choice arrives from the requester and is untrusted. It is checked against the sources the
//! broker offered when the attempt was suspended (the snapshot carried in the context), never
//! against the live configuration, and a rejected choice leaves no trace in the session.

// self
use crate::{
	_prelude::*,
	auth::{SessionId, SourceId},
	context::{AuthContext, AuthFailure},
	error::DelegateFailure,
	flows::{BindingCommit, MultiAuth, SESSION_SOURCE_NAMESPACE},
	obs::{self, StageKind, StageOutcome, StageSpan},
	redirect::Redirect,
	source::{AuthStep, DelegateError, DelegateSource, SourceRegistry},
	store::{DataTimeout, SessionStore},
};

/// Result of a successful delegation.
#[derive(Clone, Debug, PartialEq)]
pub enum DelegationOutcome {
	/// The delegate verified the requester; the context carries its results.
	Completed(AuthContext),
	/// The delegate suspended the attempt itself and the redirect must end the request.
	Suspended(Redirect),
}

/// Borrowed collaborators needed to delegate an attempt.
#[derive(Clone, Copy)]
pub struct Delegator<'a> {
	/// Registry resolving the chosen identifier.
	pub registry: &'a dyn SourceRegistry,
	/// Store receiving the session binding.
	pub sessions: &'a dyn SessionStore,
	/// When the binding is written.
	pub binding_commit: BindingCommit,
}
impl Delegator<'_> {
	/// Validates `chosen`, records it for `session`, and runs the delegate on `context`.
	pub async fn delegate(
		&self,
		session: &SessionId,
		chosen: &str,
		context: AuthContext,
	) -> Result<DelegationOutcome> {
		const KIND: StageKind = StageKind::Delegation;

		let broker_id = context.broker.as_ref().map(|state| state.broker_id.to_string());
		let span = StageSpan::new(KIND, broker_id.as_deref().unwrap_or_default());

		obs::record_stage_outcome(KIND, StageOutcome::Attempt);

		let result = span.instrument(self.delegate_inner(session, chosen, context)).await;

		match &result {
			Ok(DelegationOutcome::Completed(_)) =>
				obs::record_stage_outcome(KIND, StageOutcome::Success),
			Ok(DelegationOutcome::Suspended(_)) =>
				obs::record_stage_outcome(KIND, StageOutcome::Suspended),
			Err(_) => obs::record_stage_outcome(KIND, StageOutcome::Failure),
		}

		result
	}

	async fn delegate_inner(
		&self,
		session: &SessionId,
		chosen: &str,
		mut context: AuthContext,
	) -> Result<DelegationOutcome> {
		let (broker_id, source_id, delegate) = self.validate(chosen, &context)?;

		if self.binding_commit == BindingCommit::BeforeDelegate {
			self.bind(session, &broker_id, &source_id).await?;
		}

		let step = match delegate.authenticate(&mut context).await {
			Ok(step) => step,
			Err(e) => return Err(attach_failure(source_id, e, context)),
		};

		if self.binding_commit == BindingCommit::AfterSuccess {
			self.bind(session, &broker_id, &source_id).await?;
		}

		Ok(match step {
			AuthStep::Complete => DelegationOutcome::Completed(context),
			AuthStep::Redirect(redirect) => DelegationOutcome::Suspended(redirect),
		})
	}

	fn validate(
		&self,
		chosen: &str,
		context: &AuthContext,
	) -> Result<(SourceId, SourceId, Arc<dyn DelegateSource>)> {
		let reject = |broker: &str| {
			obs::warn_rejected_selection(broker, chosen);

			Error::InvalidSelection { id: chosen.to_owned() }
		};
		let Some(state) = context.broker.as_ref() else {
			return Err(reject(""));
		};

		if !state.offers(chosen) {
			return Err(reject(state.broker_id.as_str()));
		}

		let source_id = SourceId::new(chosen).map_err(|_| reject(state.broker_id.as_str()))?;
		let delegate =
			self.registry.resolve(chosen).ok_or_else(|| reject(state.broker_id.as_str()))?;

		Ok((state.broker_id.clone(), source_id, delegate))
	}

	async fn bind(
		&self,
		session: &SessionId,
		broker_id: &SourceId,
		source_id: &SourceId,
	) -> Result<()> {
		self.sessions
			.set_data(
				session,
				SESSION_SOURCE_NAMESPACE,
				broker_id,
				source_id.to_string(),
				DataTimeout::SessionEnd,
			)
			.await?;

		Ok(())
	}
}
impl Debug for Delegator<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Delegator").field("binding_commit", &self.binding_commit).finish()
	}
}

/// Delegates `context` to `chosen` without a broker instance, binding before the delegate runs.
///
/// `chosen` must be one of the sources recorded in `context.broker`; anything else fails with
/// [`Error::InvalidSelection`] before the session is touched or any delegate is invoked.
pub async fn delegate_authentication(
	registry: &dyn SourceRegistry,
	sessions: &dyn SessionStore,
	session: &SessionId,
	chosen: &str,
	context: AuthContext,
) -> Result<DelegationOutcome> {
	Delegator { registry, sessions, binding_commit: BindingCommit::default() }
		.delegate(session, chosen, context)
		.await
}

impl MultiAuth {
	/// Delegates `context` to `chosen` using this broker's collaborators and commit policy.
	pub async fn delegate_authentication(
		&self,
		session: &SessionId,
		chosen: &str,
		context: AuthContext,
	) -> Result<DelegationOutcome> {
		self.delegator().delegate(session, chosen, context).await
	}
}

fn attach_failure(source_id: SourceId, error: DelegateError, mut context: AuthContext) -> Error {
	let failure = AuthFailure::from(error);

	context.error = Some(failure.clone());

	Error::Delegate(Box::new(DelegateFailure { source_id, failure, context }))
}
