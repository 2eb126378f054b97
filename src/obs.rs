//! Optional observability helpers for broker stages.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `multiauth_broker.stage` with the `stage`
//!   and `broker` fields, plus a warning event whenever a selection is rejected.
//! - Enable `metrics` to increment the `multiauth_broker_stage_total` counter for every
//!   attempt/suspension/success/failure, labeled by `stage` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Broker stages observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageKind {
	/// Suspension towards the selection page.
	Selection,
	/// Loading and rendering the selection page.
	Discovery,
	/// Validation, session binding, and delegate invocation.
	Delegation,
	/// Logout routing.
	Logout,
}
impl StageKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StageKind::Selection => "selection",
			StageKind::Discovery => "discovery",
			StageKind::Delegation => "delegation",
			StageKind::Logout => "logout",
		}
	}
}
impl Display for StageKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each stage call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageOutcome {
	/// Entry to a stage.
	Attempt,
	/// The stage handed a redirect back to the transport.
	Suspended,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl StageOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StageOutcome::Attempt => "attempt",
			StageOutcome::Suspended => "suspended",
			StageOutcome::Success => "success",
			StageOutcome::Failure => "failure",
		}
	}
}
impl Display for StageOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
