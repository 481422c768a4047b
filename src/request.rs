//! Token endpoint request executor.
//!
//! Attaches client authentication and a fresh DPoP proof to every attempt, and drives the
//! RFC 9449 `use_dpop_nonce` retry protocol: when the server rejects a request demanding a
//! nonce, the same form body is retried with a re-minted proof that echoes the server's
//! `DPoP-Nonce` value. Retries are bounded so a server that rejects every nonce cannot
//! spin the client forever.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
// self
use crate::{
	_prelude::*,
	config::ClientCredentials,
	dpop::DpopEngine,
	http::{FormRequest, TokenTransport},
	token::TokenResponse,
};

pub(crate) const MAX_NONCE_RETRIES: usize = 3;
const USE_DPOP_NONCE: &str = "use_dpop_nonce";

/// One fully described token endpoint call.
pub(crate) struct TokenRequest<'a> {
	pub url: &'a Url,
	pub form: Vec<(String, String)>,
	pub credentials: &'a ClientCredentials,
	pub dpop: Option<&'a DpopEngine>,
}

/// Executes the call, returning the parsed token response.
pub(crate) async fn execute<C>(transport: &C, request: TokenRequest<'_>) -> Result<TokenResponse>
where
	C: ?Sized + TokenTransport,
{
	let response = execute_raw(transport, &request, true).await?;

	TokenResponse::parse(&response.body, response.status)
}

/// Executes the call without interpreting the body, e.g. for revocation.
///
/// `fail_on_error` controls whether non-2xx responses become [`Error::TokenEndpoint`];
/// revocation treats any completed exchange as done.
pub(crate) async fn execute_raw<C>(
	transport: &C,
	request: &TokenRequest<'_>,
	fail_on_error: bool,
) -> Result<crate::http::TransportResponse>
where
	C: ?Sized + TokenTransport,
{
	let mut nonce = None;
	let mut retries = 0;

	loop {
		let mut form_request = FormRequest::new(request.url.clone())
			.header("Authorization", basic_auth(request.credentials));

		for (name, value) in &request.form {
			form_request = form_request.field(name.clone(), value.clone());
		}
		if let Some(engine) = request.dpop {
			form_request =
				form_request.header("DPoP", engine.proof("POST", request.url, None, nonce.as_deref())?);
		}

		let response = transport.post_form(form_request).await?;

		if response.is_success() {
			return Ok(response);
		}

		let body = serde_json::from_slice::<ErrorBody>(&response.body).unwrap_or_default();

		if request.dpop.is_some()
			&& retries < MAX_NONCE_RETRIES
			&& body.error.as_deref() == Some(USE_DPOP_NONCE)
			&& let Some(fresh) = response.dpop_nonce.as_deref()
		{
			nonce = Some(fresh.to_owned());
			retries += 1;

			continue;
		}
		if !fail_on_error {
			return Ok(response);
		}

		return Err(Error::TokenEndpoint {
			status: response.status,
			error: body.error,
			description: body.error_description,
		});
	}
}

fn basic_auth(credentials: &ClientCredentials) -> String {
	let secret = credentials.secret.as_deref().unwrap_or_default();

	format!("Basic {}", STANDARD.encode(format!("{}:{secret}", credentials.id)))
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
	error: Option<String>,
	error_description: Option<String>,
}
