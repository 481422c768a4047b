//! Scripted transport and prompter doubles shared by the lifecycle tests.

#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use parking_lot::Mutex;
// self
use oauth2_dpop_client::{
	config::{ClientCredentials, EndpointSet},
	http::{FormRequest, TokenTransport, TransportFuture, TransportResponse},
	manager::TokenManager,
	prompt::{AuthorizationPrompter, PromptFuture, PromptOutcome},
	url::Url,
};

pub const CLIENT_ID: &str = "client-under-test";
pub const CLIENT_SECRET: &str = "client-secret";

/// Transport that replays a script of responses and records every request it saw.
pub struct StubTransport {
	responses: Mutex<VecDeque<TransportResponse>>,
	requests: Mutex<Vec<FormRequest>>,
	delay: Option<std::time::Duration>,
}
impl StubTransport {
	pub fn new(responses: impl IntoIterator<Item = TransportResponse>) -> Arc<Self> {
		Arc::new(Self {
			responses: Mutex::new(responses.into_iter().collect()),
			requests: Mutex::new(Vec::new()),
			delay: None,
		})
	}

	/// Same as [`StubTransport::new`] but each response resolves after a pause, widening
	/// the in-flight window for coalescing tests.
	pub fn with_delay(
		responses: impl IntoIterator<Item = TransportResponse>,
		delay: std::time::Duration,
	) -> Arc<Self> {
		Arc::new(Self {
			responses: Mutex::new(responses.into_iter().collect()),
			requests: Mutex::new(Vec::new()),
			delay: Some(delay),
		})
	}

	pub fn requests(&self) -> Vec<FormRequest> {
		self.requests.lock().clone()
	}

	pub fn request_count(&self) -> usize {
		self.requests.lock().len()
	}
}
impl TokenTransport for StubTransport {
	fn post_form(&self, request: FormRequest) -> TransportFuture<'_> {
		self.requests.lock().push(request);

		let response = self.responses.lock().pop_front();
		let delay = self.delay;

		Box::pin(async move {
			if let Some(delay) = delay {
				tokio::time::sleep(delay).await;
			}

			Ok(response.expect("Transport script exhausted."))
		})
	}
}

/// Prompter that resolves every prompt with the same outcome and records the URLs shown.
pub struct StubPrompter {
	outcome: PromptOutcome,
	urls: Mutex<Vec<Url>>,
	states: Mutex<Vec<String>>,
	prompts: AtomicUsize,
}
impl StubPrompter {
	pub fn granting(code: &str) -> Arc<Self> {
		Arc::new(Self {
			outcome: PromptOutcome::granted(code),
			urls: Mutex::new(Vec::new()),
			states: Mutex::new(Vec::new()),
			prompts: AtomicUsize::new(0),
		})
	}

	pub fn denying(error_code: Option<&str>) -> Arc<Self> {
		Arc::new(Self {
			outcome: PromptOutcome::denied(error_code.map(str::to_owned)),
			urls: Mutex::new(Vec::new()),
			states: Mutex::new(Vec::new()),
			prompts: AtomicUsize::new(0),
		})
	}

	pub fn prompt_count(&self) -> usize {
		self.prompts.load(Ordering::SeqCst)
	}

	pub fn urls(&self) -> Vec<Url> {
		self.urls.lock().clone()
	}

	pub fn states(&self) -> Vec<String> {
		self.states.lock().clone()
	}
}
impl AuthorizationPrompter for StubPrompter {
	fn open(&self, url: Url, state: String) -> PromptFuture<'_> {
		self.prompts.fetch_add(1, Ordering::SeqCst);
		self.urls.lock().push(url);
		self.states.lock().push(state);

		let outcome = self.outcome.clone();

		Box::pin(async move { Ok(outcome) })
	}
}

pub fn url(value: &str) -> Url {
	Url::parse(value).expect("Fixture URL should parse.")
}

pub fn endpoints() -> EndpointSet {
	EndpointSet::builder()
		.authorization(url("https://auth.example/authorize"))
		.token(url("https://auth.example/token"))
		.build()
		.expect("Endpoint fixture should build.")
}

pub fn endpoints_with_maintenance() -> EndpointSet {
	EndpointSet::builder()
		.authorization(url("https://auth.example/authorize"))
		.token(url("https://auth.example/token"))
		.introspect(url("https://auth.example/introspect"))
		.revoke(url("https://auth.example/revoke"))
		.build()
		.expect("Endpoint fixture should build.")
}

pub fn credentials() -> ClientCredentials {
	ClientCredentials::new(CLIENT_ID)
		.with_secret(CLIENT_SECRET)
		.with_redirect_uri(url("https://app.example/callback"))
}

pub fn manager(
	transport: Arc<StubTransport>,
	prompter: Arc<StubPrompter>,
) -> TokenManager<StubTransport> {
	TokenManager::new(transport, prompter, credentials(), endpoints())
}

pub fn token_body(token_type: &str, expires_in: u64) -> String {
	format!(r#"{{"access_token":"at","token_type":"{token_type}","expires_in":{expires_in}}}"#)
}

pub fn response(status: u16, body: &str) -> TransportResponse {
	TransportResponse { status, body: body.as_bytes().to_vec(), dpop_nonce: None }
}

pub fn ok(body: &str) -> TransportResponse {
	response(200, body)
}
