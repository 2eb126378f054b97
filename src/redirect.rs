//! Redirect continuation handed back to the caller's transport.
//!
//! The broker never writes HTTP responses. Whenever a stage has to suspend, it returns a
//! [`Redirect`] that the transport must turn into the response ending the current request; no
//! broker code runs after that point, and the attempt resumes later from the carried state id.

// self
use crate::_prelude::*;

/// Terminal instruction to send the requester elsewhere.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[must_use = "a Redirect suspends the flow and must be returned to the transport"]
pub struct Redirect {
	/// Target endpoint without the broker-supplied parameters.
	pub url: Url,
	/// Query parameters appended to `url`, in insertion order.
	pub params: Vec<(String, String)>,
}
impl Redirect {
	/// Creates a redirect to `url` with no extra parameters.
	pub fn to(url: Url) -> Self {
		Self { url, params: Vec::new() }
	}

	/// Appends a query parameter.
	pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.params.push((key.into(), value.into()));

		self
	}

	/// Returns the first value recorded for `key`.
	pub fn param(&self, key: &str) -> Option<&str> {
		self.params.iter().find(|(name, _)| name == key).map(|(_, value)| value.as_str())
	}

	/// Renders the final `Location` URL.
	pub fn location(&self) -> Url {
		let mut url = self.url.clone();

		if !self.params.is_empty() {
			url.query_pairs_mut().extend_pairs(self.params.iter());
		}

		url
	}
}
