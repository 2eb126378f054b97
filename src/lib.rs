//! Authentication-source broker: offer a choice of login mechanisms, carry the choice across the
//! redirect boundary, and route logout back to the mechanism that actually authenticated.
//!
//! The broker never checks credentials itself. [`flows::MultiAuth::authenticate`] suspends the
//! attempt behind a [`redirect::Redirect`], the discovery endpoint resumes it with the
//! requester's choice, and [`flows::delegate_authentication`] validates that choice against the
//! offered set before handing the context to the chosen [`source::DelegateSource`].

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod context;
pub mod error;
pub mod flows;
pub mod obs;
pub mod redirect;
pub mod source;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, HashSet},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::RwLock;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use url;
#[cfg(test)] use color_eyre as _;
