// self
use crate::{_prelude::*, obs::StageKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedStage<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedStage<F> = F;

/// A span builder used by broker stages.
#[derive(Clone, Debug)]
pub struct StageSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl StageSpan {
	/// Creates a new span tagged with the stage and the broker instance.
	pub fn new(kind: StageKind, broker: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("multiauth_broker.stage", stage = kind.as_str(), broker);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, broker);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedStage<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a warning for a requester-supplied source that was not offered.
pub fn warn_rejected_selection(broker: &str, requested: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(broker, requested, "rejected authentication source selection");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (broker, requested);
	}
}
