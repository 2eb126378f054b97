//! Discovery stage behind the selection endpoint.
//!
//! The endpoint receives the `AuthState` issued by the selection stage. [`MultiAuth::resume`]
//! either renders the page model or, when there is nothing to choose, delegates straight away;
//! [`MultiAuth::select`] handles the submitted choice. A state is consumed by the first
//! submission, so replaying the same `AuthState` fails with [`StoreError::NotFound`].

// self
use crate::{
	_prelude::*,
	auth::{LanguageCode, SessionId, SourceId, StateId},
	context::AuthContext,
	flows::{DelegationOutcome, MultiAuth, SELECTION_STAGE},
	obs::{self, StageKind, StageOutcome, StageSpan},
	source::SourceDescriptor,
	store::{PreferenceStore, StoreError},
};

/// One option rendered on the selection page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourceOption {
	/// Identifier submitted back when the option is picked.
	pub id: SourceId,
	/// Label resolved for the requested language.
	pub label: String,
	/// Presentation hint.
	pub css_class: String,
	/// Help text resolved for the requested language.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub help: Option<String>,
	/// Marks the requester's previous choice.
	pub preferred: bool,
}

/// Model of the selection page for one suspended attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectionPage {
	/// State identifier the page must submit back.
	pub state_id: StateId,
	/// Broker that suspended the attempt.
	pub broker_id: SourceId,
	/// Offered sources in configured order.
	pub options: Vec<SourceOption>,
	/// Previous choice, when it is still offered.
	pub preferred: Option<SourceId>,
}

/// What the selection endpoint should do next.
#[derive(Clone, Debug, PartialEq)]
pub enum Discovery {
	/// Show the page and wait for a submission.
	Page(SelectionPage),
	/// The choice was implied and delegation already ran.
	Delegated(DelegationOutcome),
}

impl MultiAuth {
	/// Builds the page model for `state_id` without consuming the state.
	pub async fn selection_page(
		&self,
		state_id: &StateId,
		jar: &dyn PreferenceStore,
		language: &LanguageCode,
	) -> Result<SelectionPage> {
		self.observe_discovery(async {
			let context = self.load_owned(state_id).await?;

			Ok(self.page_for(state_id, &context, jar, language))
		})
		.await
	}

	/// Consumes `state_id`, remembers `chosen`, and delegates to it.
	pub async fn select(
		&self,
		state_id: &StateId,
		chosen: &str,
		session: &SessionId,
		jar: &dyn PreferenceStore,
	) -> Result<DelegationOutcome> {
		let context = self.observe_discovery(self.take_owned(state_id)).await?;

		self.remember_choice(&context, chosen, jar)?;
		self.delegate_authentication(session, chosen, context).await
	}

	/// Delegates directly when a single source is offered or a valid preselect is carried, and
	/// returns the page model otherwise.
	pub async fn resume(
		&self,
		state_id: &StateId,
		session: &SessionId,
		jar: &dyn PreferenceStore,
		language: &LanguageCode,
	) -> Result<Discovery> {
		let context = self.observe_discovery(self.load_owned(state_id)).await?;
		let implied = match context.offered_sources().unwrap_or_default() {
			[only] => Some(only.id.clone()),
			offered => context
				.preselect()
				.filter(|hint| offered.iter().any(|descriptor| &descriptor.id == *hint))
				.cloned(),
		};

		match implied {
			Some(chosen) =>
				Ok(Discovery::Delegated(self.select(state_id, &chosen, session, jar).await?)),
			None => Ok(Discovery::Page(self.page_for(state_id, &context, jar, language))),
		}
	}

	async fn observe_discovery<F, T>(&self, fut: F) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		const KIND: StageKind = StageKind::Discovery;

		let span = StageSpan::new(KIND, &self.id);

		obs::record_stage_outcome(KIND, StageOutcome::Attempt);

		let result = span.instrument(fut).await;

		match &result {
			Ok(_) => obs::record_stage_outcome(KIND, StageOutcome::Success),
			Err(_) => obs::record_stage_outcome(KIND, StageOutcome::Failure),
		}

		result
	}

	async fn load_owned(&self, state_id: &StateId) -> Result<AuthContext> {
		let context = self.state_store.load(state_id, SELECTION_STAGE).await?;

		self.ensure_owned(state_id, context)
	}

	async fn take_owned(&self, state_id: &StateId) -> Result<AuthContext> {
		// A foreign broker must not consume the state.
		self.load_owned(state_id).await?;

		let context = self.state_store.take(state_id, SELECTION_STAGE).await?;

		self.ensure_owned(state_id, context)
	}

	fn ensure_owned(&self, state_id: &StateId, context: AuthContext) -> Result<AuthContext> {
		match &context.broker {
			Some(state) if state.broker_id == self.id => Ok(context),
			_ => Err(StoreError::NotFound { id: state_id.to_string() }.into()),
		}
	}

	fn remember_choice(
		&self,
		context: &AuthContext,
		chosen: &str,
		jar: &dyn PreferenceStore,
	) -> Result<()> {
		let offered = context.broker.as_ref().is_some_and(|state| state.offers(chosen));

		if let Some(id) = SourceId::new(chosen).ok().filter(|_| offered) {
			self.set_previous_source(jar, &id)?;
		}

		Ok(())
	}

	fn page_for(
		&self,
		state_id: &StateId,
		context: &AuthContext,
		jar: &dyn PreferenceStore,
		language: &LanguageCode,
	) -> SelectionPage {
		let offered = context.offered_sources().unwrap_or_default();
		let preferred = self
			.get_previous_source(jar)
			.filter(|previous| offered.iter().any(|descriptor| &descriptor.id == previous));
		let options = offered
			.iter()
			.map(|descriptor| {
				self.option_for(descriptor, language, preferred.as_ref() == Some(&descriptor.id))
			})
			.collect();

		SelectionPage { state_id: state_id.clone(), broker_id: self.id.clone(), options, preferred }
	}

	fn option_for(
		&self,
		descriptor: &SourceDescriptor,
		language: &LanguageCode,
		preferred: bool,
	) -> SourceOption {
		let fallback = &self.settings.default_language;
		let label = descriptor
			.text
			.resolve(language, fallback)
			.map_or_else(|| descriptor.id.to_string(), ToOwned::to_owned);
		let help = descriptor
			.help
			.as_ref()
			.and_then(|help| help.resolve(language, fallback))
			.map(ToOwned::to_owned);

		SourceOption {
			id: descriptor.id.clone(),
			label,
			css_class: descriptor.css_class.clone(),
			help,
			preferred,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		flows::{AUTH_STATE_PARAM, BrokerSettings},
		source::{
			AuthStep, BrokerConfig, DelegateSource, LocalizedText, SourceFuture, StaticRegistry,
		},
		store::{MemoryPreferenceStore, MemorySessionStore, MemoryStateStore},
	};

	struct Accepting;
	impl DelegateSource for Accepting {
		fn authenticate<'a>(&'a self, _context: &'a mut AuthContext) -> SourceFuture<'a, AuthStep> {
			Box::pin(async { Ok(AuthStep::Complete) })
		}
	}

	fn id(value: &str) -> SourceId {
		SourceId::new(value).expect("Source fixture should be valid.")
	}

	fn lang(value: &str) -> LanguageCode {
		LanguageCode::new(value).expect("Language fixture should be valid.")
	}

	fn broker(ids: &[&str]) -> MultiAuth {
		let mut registry = StaticRegistry::default();
		let mut descriptors = Vec::new();

		for value in ids {
			registry.register(id(value), "test:Accepting", Arc::new(Accepting));
			descriptors.push(
				SourceDescriptor::builder(id(value))
					.texts(LocalizedText::from_iter([
						(lang("en"), format!("{value} login")),
						(lang("nb"), format!("{value} innlogging")),
					]))
					.build(&lang("en"), None),
			);
		}

		MultiAuth::new(
			id("multi1"),
			BrokerConfig::new(descriptors).expect("Fixture config should be valid."),
			BrokerSettings::new("https://idp.example.com/multiauth/discovery")
				.expect("Fixture URL should parse."),
			Arc::new(registry),
			Arc::new(MemoryStateStore::default()),
			Arc::new(MemorySessionStore::default()),
		)
		.expect("Fixture broker should be valid.")
	}

	async fn suspend(broker: &MultiAuth) -> StateId {
		let redirect =
			broker.authenticate(AuthContext::new()).await.expect("Selection should succeed.");

		StateId::new(redirect.param(AUTH_STATE_PARAM).expect("Redirect should carry the state."))
			.expect("State id should be valid.")
	}

	#[tokio::test]
	async fn page_resolves_labels_and_marks_previous_choice() {
		let broker = broker(&["ldap", "sms"]);
		let jar = MemoryPreferenceStore::default();
		let state_id = suspend(&broker).await;

		broker.set_previous_source(&jar, &id("sms")).expect("Preference write should succeed.");

		let page = broker
			.selection_page(&state_id, &jar, &lang("nb-NO"))
			.await
			.expect("Page should render.");

		assert_eq!(page.preferred, Some(id("sms")));
		assert_eq!(
			page.options.iter().map(|o| (o.label.as_str(), o.preferred)).collect::<Vec<_>>(),
			[("ldap innlogging", false), ("sms innlogging", true)]
		);
	}

	#[tokio::test]
	async fn state_of_another_broker_is_not_found() {
		let broker = broker(&["ldap", "sms"]);
		let state_id = suspend(&broker).await;
		let mut other = broker.clone();

		other.id = id("multi2");

		let err = other
			.selection_page(&state_id, &MemoryPreferenceStore::default(), &lang("en"))
			.await
			.expect_err("Foreign state should not load.");

		assert!(matches!(err, Error::Storage(StoreError::NotFound { .. })));
	}

	#[tokio::test]
	async fn foreign_submission_leaves_the_owner_able_to_resume() {
		let broker = broker(&["ldap", "sms"]);
		let state_id = suspend(&broker).await;
		let session = SessionId::new("s1").expect("Session fixture should be valid.");
		let jar = MemoryPreferenceStore::default();
		let mut other = broker.clone();

		other.id = id("multi2");

		let err = other
			.select(&state_id, "ldap", &session, &jar)
			.await
			.expect_err("Foreign state should not be submitted.");

		assert!(matches!(err, Error::Storage(StoreError::NotFound { .. })));
		assert_eq!(broker.get_previous_source(&jar), None);
		assert!(matches!(
			broker.select(&state_id, "ldap", &session, &jar).await,
			Ok(DelegationOutcome::Completed(_))
		));
	}

	#[tokio::test]
	async fn single_source_delegates_without_a_page() {
		let broker = broker(&["ldap"]);
		let state_id = suspend(&broker).await;
		let session = SessionId::new("s1").expect("Session fixture should be valid.");
		let jar = MemoryPreferenceStore::default();
		let discovery = broker
			.resume(&state_id, &session, &jar, &lang("en"))
			.await
			.expect("Resume should succeed.");

		assert!(matches!(discovery, Discovery::Delegated(DelegationOutcome::Completed(_))));
		assert_eq!(broker.get_previous_source(&jar), Some(id("ldap")));
		assert_eq!(broker.bound_source(&session).await.ok().flatten().as_deref(), Some("ldap"));
	}
}
