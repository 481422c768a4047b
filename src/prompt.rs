//! User-interaction seam for the authorization-code flow.
//!
//! The manager builds the authorization URL; delivering it to a human and harvesting the
//! redirect is the host application's job. Implementations range from opening a browser
//! and running a loopback listener to driving a headless test double.

// self
use crate::_prelude::*;

/// Boxed future returned by [`AuthorizationPrompter::open`].
pub type PromptFuture<'a> = Pin<Box<dyn Future<Output = Result<PromptOutcome>> + Send + 'a>>;

/// Result of one authorization prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptOutcome {
	/// Authorization code extracted from the redirect, when the user approved.
	pub authorization_code: Option<String>,
	/// `error` parameter from the redirect, when the server reported one.
	pub error_code: Option<String>,
}
impl PromptOutcome {
	/// Successful outcome carrying an authorization code.
	pub fn granted(code: impl Into<String>) -> Self {
		Self { authorization_code: Some(code.into()), error_code: None }
	}

	/// Denied outcome, optionally carrying the server's error code.
	pub fn denied(error_code: Option<String>) -> Self {
		Self { authorization_code: None, error_code }
	}
}

/// Drives the interactive leg of the authorization-code flow.
pub trait AuthorizationPrompter
where
	Self: 'static + Send + Sync,
{
	/// Presents the authorization URL and returns the outcome of the redirect.
	///
	/// `state` is the anti-forgery value embedded in the URL; implementations that harvest
	/// the redirect themselves must drop responses whose `state` does not match.
	fn open(&self, url: Url, state: String) -> PromptFuture<'_>;
}
