//! Token lifecycle orchestration.
//!
//! [`TokenManager`] owns the cached access token, the stored refresh token, and the live
//! DPoP session. Callers ask for a header-ready credential; the manager serves it from
//! cache when possible and otherwise coalesces all concurrent callers into exactly one
//! acquisition: a refresh grant when a refresh token is stored, a full interactive
//! authorization-code handshake when not.

pub mod events;
use events::{EventHook, EventHooks, ManagerEvent};

// crates.io
use async_lock::MutexGuardArc;
// self
use crate::{
	_prelude::*,
	config::{ClientCredentials, DpopConfig, EndpointSet, PkceMode},
	dpop::{
		DpopEngine, DpopKeyMaterial,
		key::{LocalKeyProvider, SigningKeyProvider},
	},
	http::TokenTransport,
	obs::{FlowKind, FlowOutcome, FlowSpan, record_flow_outcome},
	pkce::{PkcePair, random_string},
	prompt::{AuthorizationPrompter, PromptOutcome},
	request::{self, TokenRequest},
	token::{AccessTokenState, TokenKind, TokenResponse},
};

const STATE_LEN: usize = 32;

/// Introspection endpoint outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Introspection {
	/// No introspection endpoint is configured.
	NotConfigured,
	/// No token of the requested kind is stored.
	Missing,
	/// The server's introspection response body.
	Response(serde_json::Value),
}

/// The orchestrator: cached token state, single-flight acquisition, DPoP session lifecycle.
///
/// All methods take `&self`; a manager is usually wrapped in an [`Arc`] and shared across
/// tasks. The fast path never blocks: a valid cached token is returned from a read lock
/// with no network activity. Everything mutable beyond the cache is only touched inside
/// the serialized acquisition path.
pub struct TokenManager<C>
where
	C: ?Sized + TokenTransport,
{
	prompter: Arc<dyn AuthorizationPrompter>,
	key_provider: Arc<dyn SigningKeyProvider>,
	credentials: ClientCredentials,
	endpoints: EndpointSet,
	pkce: PkceMode,
	dpop: Option<DpopConfig>,
	state: RwLock<Option<AccessTokenState>>,
	refresh: RwLock<Option<String>>,
	dpop_slot: Mutex<DpopSlot>,
	// Single-flight gate; also driven manually through `start_wait`/`end_wait`.
	gate: Arc<AsyncMutex<()>>,
	manual_wait: Mutex<Option<MutexGuardArc<()>>>,
	hooks: EventHooks,
	transport: Arc<C>,
}
impl<C> TokenManager<C>
where
	C: ?Sized + TokenTransport,
{
	/// Creates a manager with PKCE and DPoP disabled.
	pub fn new(
		transport: Arc<C>,
		prompter: Arc<dyn AuthorizationPrompter>,
		credentials: ClientCredentials,
		endpoints: EndpointSet,
	) -> Self {
		Self {
			prompter,
			key_provider: Arc::new(LocalKeyProvider),
			credentials,
			endpoints,
			pkce: PkceMode::default(),
			dpop: None,
			state: RwLock::new(None),
			refresh: RwLock::new(None),
			dpop_slot: Mutex::new(DpopSlot::default()),
			gate: Arc::new(AsyncMutex::new(())),
			manual_wait: Mutex::new(None),
			hooks: EventHooks::default(),
			transport,
		}
	}

	/// Sets the PKCE challenge mode.
	pub fn with_pkce(mut self, mode: PkceMode) -> Self {
		self.pkce = mode;

		self
	}

	/// Enables DPoP binding.
	pub fn with_dpop(mut self, config: DpopConfig) -> Self {
		self.dpop = Some(config);

		self
	}

	/// Seeds a refresh token obtained out of band, e.g. from persisted state.
	pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh = RwLock::new(Some(token.into()));

		self
	}

	/// Replaces the default in-process signing key provider.
	pub fn with_key_provider(mut self, provider: Arc<dyn SigningKeyProvider>) -> Self {
		self.key_provider = provider;

		self
	}

	/// Registers a lifecycle event listener.
	pub fn on_event(&self, hook: EventHook) {
		self.hooks.subscribe(hook);
	}

	/// Registers a listener for server-issued refresh tokens.
	pub fn on_refresh_token_issued<F>(&self, hook: F)
	where
		F: 'static + Send + Sync + Fn(&str),
	{
		self.hooks.subscribe(Box::new(move |event| {
			if let ManagerEvent::RefreshTokenIssued(token) = event {
				hook(token);
			}
		}));
	}

	/// Registers a listener for freshly generated DPoP keypairs.
	pub fn on_dpop_keypair_created<F>(&self, hook: F)
	where
		F: 'static + Send + Sync + Fn(&DpopKeyMaterial),
	{
		self.hooks.subscribe(Box::new(move |event| {
			if let ManagerEvent::DpopKeypairCreated(material) = event {
				hook(material);
			}
		}));
	}

	/// Returns a header-ready credential, acquiring a token if necessary.
	pub async fn authorization_header(&self) -> Result<String> {
		Ok(self.authorization().await?.header_value())
	}

	/// Returns the structured credential, acquiring a token if necessary.
	///
	/// A valid cached token is returned immediately with no network activity. Otherwise
	/// the caller either becomes the single in-flight acquirer or awaits the one already
	/// running, re-validating the cache once released.
	pub async fn authorization(&self) -> Result<AccessTokenState> {
		if let Some(state) = self.cached_valid() {
			return Ok(state);
		}

		let _guard = self.gate.lock().await;

		// The in-flight attempt we waited on may have refreshed the cache.
		if let Some(state) = self.cached_valid() {
			return Ok(state);
		}

		let kind = if self.refresh.read().is_some() {
			FlowKind::Refresh
		} else {
			FlowKind::AuthorizationCode
		};

		record_flow_outcome(kind, FlowOutcome::Attempt);

		let span = FlowSpan::new(kind, "acquire");
		let result = span.instrument(self.acquire(kind)).await;

		record_flow_outcome(kind, if result.is_ok() {
			FlowOutcome::Success
		} else {
			FlowOutcome::Failure
		});

		result
	}

	/// Manually claims the in-flight gate, e.g. while bootstrapping a refresh token that
	/// is still being resolved elsewhere. No-op when already claimed through this method.
	pub async fn start_wait(&self) {
		if self.manual_wait.lock().is_some() {
			return;
		}

		let guard = self.gate.lock_arc().await;

		*self.manual_wait.lock() = Some(guard);
	}

	/// Releases a gate claimed with [`TokenManager::start_wait`].
	pub fn end_wait(&self) {
		self.manual_wait.lock().take();
	}

	/// Snapshot of the cached access token, valid or not, without acquiring.
	pub fn access_token(&self) -> Option<AccessTokenState> {
		self.state.read().clone()
	}

	/// Snapshot of the stored refresh token.
	pub fn refresh_token(&self) -> Option<String> {
		self.refresh.read().clone()
	}

	/// Replaces or clears the stored refresh token.
	pub fn set_refresh_token(&self, token: Option<String>) {
		*self.refresh.write() = token;
	}

	/// Revokes the stored token of the given kind.
	///
	/// Returns `false` when no revocation endpoint is configured, `true` without network
	/// activity when no such token is stored, and `true` after any completed POST
	/// otherwise. The local copy is dropped once the server has been told.
	pub async fn revoke(&self, kind: TokenKind) -> Result<bool> {
		let Some(url) = &self.endpoints.revoke else {
			return Ok(false);
		};
		let Some(token) = self.stored_token(kind) else {
			return Ok(true);
		};

		record_flow_outcome(FlowKind::Revoke, FlowOutcome::Attempt);

		let span = FlowSpan::new(FlowKind::Revoke, "revoke");
		let engine = self.dpop_slot.lock().engine.clone();
		let request = TokenRequest {
			url,
			form: vec![
				("token".into(), token),
				("token_type_hint".into(), kind.hint().into()),
			],
			credentials: &self.credentials,
			dpop: engine.as_ref(),
		};
		let result =
			span.instrument(request::execute_raw(self.transport.as_ref(), &request, false)).await;

		match result {
			Ok(_) => {
				match kind {
					TokenKind::Access => *self.state.write() = None,
					TokenKind::Refresh => *self.refresh.write() = None,
				}

				record_flow_outcome(FlowKind::Revoke, FlowOutcome::Success);

				Ok(true)
			},
			Err(e) => {
				record_flow_outcome(FlowKind::Revoke, FlowOutcome::Failure);

				Err(e)
			},
		}
	}

	/// Introspects the stored token of the given kind against the configured endpoint.
	pub async fn introspect(&self, kind: TokenKind) -> Result<Introspection> {
		let Some(url) = &self.endpoints.introspect else {
			return Ok(Introspection::NotConfigured);
		};
		let Some(token) = self.stored_token(kind) else {
			return Ok(Introspection::Missing);
		};

		record_flow_outcome(FlowKind::Introspect, FlowOutcome::Attempt);

		let span = FlowSpan::new(FlowKind::Introspect, "introspect");
		let engine = self.dpop_slot.lock().engine.clone();
		let request = TokenRequest {
			url,
			form: vec![
				("token".into(), token),
				("token_type_hint".into(), kind.hint().into()),
			],
			credentials: &self.credentials,
			dpop: engine.as_ref(),
		};
		let result =
			span.instrument(request::execute_raw(self.transport.as_ref(), &request, true)).await;
		let response = match result {
			Ok(response) => response,
			Err(e) => {
				record_flow_outcome(FlowKind::Introspect, FlowOutcome::Failure);

				return Err(e);
			},
		};
		let deserializer = &mut serde_json::Deserializer::from_slice(&response.body);
		let value = serde_path_to_error::deserialize(deserializer)
			.map_err(|source| Error::TokenResponseParse { source, status: response.status })?;

		record_flow_outcome(FlowKind::Introspect, FlowOutcome::Success);

		Ok(Introspection::Response(value))
	}

	fn cached_valid(&self) -> Option<AccessTokenState> {
		self.state
			.read()
			.as_ref()
			.filter(|state| state.is_valid_at(OffsetDateTime::now_utc()))
			.cloned()
	}

	fn stored_token(&self, kind: TokenKind) -> Option<String> {
		match kind {
			TokenKind::Access =>
				self.state.read().as_ref().map(|state| state.access_token.clone()),
			TokenKind::Refresh => self.refresh.read().clone(),
		}
	}

	async fn acquire(&self, kind: FlowKind) -> Result<AccessTokenState> {
		let response = match kind {
			FlowKind::Refresh => self.refresh_grant().await?,
			_ => self.authorization_code_grant().await?,
		};

		self.commit(response)
	}

	async fn refresh_grant(&self) -> Result<TokenResponse> {
		let refresh_token = self
			.refresh
			.read()
			.clone()
			.ok_or(crate::error::ConfigError::MissingRefreshToken)?;
		// An existing session key is reused across refreshes.
		let engine = self.dpop_session(false);
		let mut form = vec![
			("grant_type".into(), "refresh_token".into()),
			("refresh_token".into(), refresh_token),
		];

		if let Some(scope) = self.credentials.scope_param() {
			form.push(("scope".into(), scope));
		}

		request::execute(self.transport.as_ref(), TokenRequest {
			url: &self.endpoints.token,
			form,
			credentials: &self.credentials,
			dpop: engine.as_ref(),
		})
		.await
	}

	async fn authorization_code_grant(&self) -> Result<TokenResponse> {
		let state_value = random_string(STATE_LEN);
		let pkce = PkcePair::generate(self.pkce);
		// A fresh authorization handshake starts a fresh DPoP session.
		let engine = self.dpop_session(true);
		let mut url = self.endpoints.authorization.clone();

		{
			let mut query = url.query_pairs_mut();

			query.append_pair("client_id", &self.credentials.id);
			query.append_pair("response_type", "code");
			query.append_pair("response_mode", "fragment");
			query.append_pair("state", &state_value);

			if let Some(scope) = self.credentials.scope_param() {
				query.append_pair("scope", &scope);
			}
			if let Some(redirect_uri) = &self.credentials.redirect_uri {
				query.append_pair("redirect_uri", redirect_uri.as_str());
			}
			if let Some(pair) = &pkce {
				query.append_pair("code_challenge", &pair.challenge);
				query.append_pair("code_challenge_method", pair.mode.as_str());
			}
			if let Some(engine) = &engine {
				query.append_pair("dpop_jkt", engine.thumbprint());
			}
		}

		let outcome = self.prompter.open(url, state_value).await?;
		let code = match outcome {
			PromptOutcome { authorization_code: Some(code), .. } => code,
			PromptOutcome { error_code, .. } =>
				return Err(Error::AuthorizationDenied { code: error_code }),
		};
		let mut form = vec![
			("grant_type".into(), "authorization_code".into()),
			("code".into(), code),
		];

		if let Some(redirect_uri) = &self.credentials.redirect_uri {
			form.push(("redirect_uri".into(), redirect_uri.to_string()));
		}
		if let Some(pair) = &pkce {
			form.push(("code_verifier".into(), pair.verifier.clone()));
		}

		request::execute(self.transport.as_ref(), TokenRequest {
			url: &self.endpoints.token,
			form,
			credentials: &self.credentials,
			dpop: engine.as_ref(),
		})
		.await
	}

	/// Resolves the DPoP session for one acquisition, or `None` when DPoP is off or key
	/// handling failed. Key failures disable DPoP for the attempt instead of failing it:
	/// proof binding is an enhancement, not a prerequisite for obtaining a token.
	fn dpop_session(&self, fresh: bool) -> Option<DpopEngine> {
		let config = self.dpop.as_ref()?;
		let mut slot = self.dpop_slot.lock();

		if !fresh && let Some(engine) = &slot.engine {
			return Some(engine.clone());
		}

		let (signer, generated) = match config {
			DpopConfig::Material(material) if !slot.material_spent => {
				// Supplied material backs only the first session; a replacement key is
				// always freshly generated.
				slot.material_spent = true;

				(self.key_provider.import(material).ok()?, false)
			},
			config => (self.key_provider.generate(config.algorithm()).ok()?, true),
		};
		let engine = DpopEngine::new(signer).ok()?;

		if generated && let Ok(material) = engine.export_material() {
			self.hooks.emit(&ManagerEvent::DpopKeypairCreated(material));
		}

		slot.engine = Some(engine.clone());

		Some(engine)
	}

	/// Validates and installs a token response as the new cached state.
	fn commit(&self, response: TokenResponse) -> Result<AccessTokenState> {
		// Never cache a token with insufficient scope, and never keep a refresh token
		// that would reproduce it.
		if let Some(granted) = &response.scope
			&& !self.credentials.scopes.is_empty()
			&& !self.credentials.scopes_covered_by(granted)
		{
			*self.refresh.write() = None;

			return Err(Error::ScopeMismatch {
				required: self.credentials.scope_param().unwrap_or_default(),
				granted: granted.clone(),
			});
		}
		// The server declined proof binding: the session key is useless now.
		if !response.token_type.eq_ignore_ascii_case("dpop") {
			self.dpop_slot.lock().engine = None;
		}
		if let Some(refresh) = &response.refresh_token {
			*self.refresh.write() = Some(refresh.clone());
			self.hooks.emit(&ManagerEvent::RefreshTokenIssued(refresh.clone()));
		}

		let state = AccessTokenState::from_response(&response, OffsetDateTime::now_utc());

		*self.state.write() = Some(state.clone());

		Ok(state)
	}
}

#[derive(Default)]
struct DpopSlot {
	engine: Option<DpopEngine>,
	material_spent: bool,
}
