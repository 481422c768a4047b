//! Transport abstraction for token endpoint traffic.
//!
//! The lifecycle manager only ever needs one HTTP primitive: POST a form body and read
//! back the status, raw bytes, and the `DPoP-Nonce` header. [`TokenTransport`] captures
//! exactly that, which keeps the manager testable against scripted transports and keeps
//! `reqwest` an optional dependency.

// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`TokenTransport::post_form`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + 'a>>;

/// A form-encoded POST request to a single endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormRequest {
	/// Target endpoint.
	pub url: Url,
	/// Form fields in insertion order.
	pub form: Vec<(String, String)>,
	/// Extra headers, e.g. `Authorization` and `DPoP`.
	pub headers: Vec<(&'static str, String)>,
}
impl FormRequest {
	/// Creates an empty request for the endpoint.
	pub fn new(url: Url) -> Self {
		Self { url, form: Vec::new(), headers: Vec::new() }
	}

	/// Appends a form field.
	pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.form.push((name.into(), value.into()));

		self
	}

	/// Appends a form field when the value is present.
	pub fn optional_field(self, name: impl Into<String>, value: Option<String>) -> Self {
		match value {
			Some(value) => self.field(name, value),
			None => self,
		}
	}

	/// Appends a header.
	pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
		self.headers.push((name, value.into()));

		self
	}

	/// Looks up the first header with the given name.
	pub fn header_value(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(header, _)| header.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}

	/// Looks up the first form field with the given name.
	pub fn field_value(&self, name: &str) -> Option<&str> {
		self.form.iter().find(|(field, _)| field == name).map(|(_, value)| value.as_str())
	}
}

/// Raw response surfaced back to the request executor.
#[derive(Clone, Debug)]
pub struct TransportResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body.
	pub body: Vec<u8>,
	/// Value of the `DPoP-Nonce` header, when the server sent one.
	pub dpop_nonce: Option<String>,
}
impl TransportResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Minimal HTTP surface the manager depends on.
pub trait TokenTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends a form-encoded POST and returns the raw response.
	fn post_form(&self, request: FormRequest) -> TransportFuture<'_>;
}

/// [`reqwest`]-backed transport with redirects disabled.
///
/// Token endpoints never legitimately redirect; following one would leak credentials and
/// proofs to an unexpected origin.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
	client: ReqwestClient,
}
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a transport with its own client.
	pub fn new() -> Result<Self, crate::error::ConfigError> {
		Ok(Self {
			client: ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?,
		})
	}

	/// Wraps an existing client.
	pub fn from_client(client: ReqwestClient) -> Self {
		Self { client }
	}
}
#[cfg(feature = "reqwest")]
impl TokenTransport for ReqwestTransport {
	fn post_form(&self, request: FormRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let mut builder = self.client.post(request.url).form(&request.form);

			for (name, value) in request.headers {
				builder = builder.header(name, value);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let dpop_nonce = response
				.headers()
				.get("dpop-nonce")
				.and_then(|value| value.to_str().ok())
				.map(str::to_owned);
			let body = response.bytes().await?.to_vec();

			Ok(TransportResponse { status, body, dpop_nonce })
		})
	}
}
