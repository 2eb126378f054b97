//! Selection stage: decorate the attempt, persist it, and hand the requester to the selection page.

// self
use crate::{
	_prelude::*,
	auth::SourceId,
	context::{AuthContext, BrokerState},
	flows::{AUTH_STATE_PARAM, MultiAuth, SELECTION_STAGE, SOURCE_PARAM},
	obs::{self, StageKind, StageOutcome, StageSpan},
	redirect::Redirect,
};

/// Upstream attribute that may name the source to preselect.
pub const PRESELECT_ATTRIBUTE: &str = "multiauth:preselect";

impl MultiAuth {
	/// Suspends `context` towards the selection page.
	///
	/// A preselect hint is read from the [`PRESELECT_ATTRIBUTE`] attribute when present.
	pub async fn authenticate(&self, context: AuthContext) -> Result<Redirect> {
		let hint = context
			.get(PRESELECT_ATTRIBUTE)
			.and_then(serde_json::Value::as_str)
			.and_then(|value| SourceId::new(value).ok());

		self.begin_selection(context, hint).await
	}

	/// Records the broker state in `context`, saves it, and returns the redirect that must end
	/// the current request.
	///
	/// The preselect hint is taken from `requested_preselect`, then from an earlier decoration of
	/// the context, then from the configured default.
	pub async fn begin_selection(
		&self,
		mut context: AuthContext,
		requested_preselect: Option<SourceId>,
	) -> Result<Redirect> {
		const KIND: StageKind = StageKind::Selection;

		let span = StageSpan::new(KIND, &self.id);

		obs::record_stage_outcome(KIND, StageOutcome::Attempt);

		let result = span
			.instrument(async move {
				let preselect = requested_preselect
					.or_else(|| context.preselect().cloned())
					.or_else(|| self.settings.preselect.clone());
				let mut state = BrokerState::new(self.id.clone(), &self.sources);

				state.preselect = preselect;
				context.broker = Some(state);

				let state_id = self.state_store.save(SELECTION_STAGE, &context).await?;
				let mut redirect = Redirect::to(self.settings.selection_url.clone())
					.with_param(AUTH_STATE_PARAM, state_id.as_str());

				if let Some(hint) = context.preselect() {
					redirect = redirect.with_param(SOURCE_PARAM, hint.as_str());
				}

				Ok(redirect)
			})
			.await;

		match &result {
			Ok(_) => obs::record_stage_outcome(KIND, StageOutcome::Suspended),
			Err(_) => obs::record_stage_outcome(KIND, StageOutcome::Failure),
		}

		result
	}
}
