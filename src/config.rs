//! Immutable configuration types consumed by the lifecycle manager.
//!
//! Everything here is fixed for the lifetime of a [`TokenManager`](crate::manager::TokenManager)
//! instance. Mutable session state (cached token, rotated refresh token, live DPoP key) lives
//! inside the manager instead of being stashed back into the configuration.

// self
use crate::{_prelude::*, dpop::DpopKeyMaterial, dpop::key::DpopAlgorithm};

/// OAuth 2.0 client credentials and scope requirements.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCredentials {
	/// Client identifier sent with every grant.
	pub id: String,
	/// Optional client secret; public clients leave this unset and authenticate with an
	/// empty secret over HTTP Basic.
	pub secret: Option<String>,
	/// Redirect URI registered for the authorization-code flow.
	pub redirect_uri: Option<Url>,
	/// Scopes the client requires; acquisition fails when the server grants less.
	#[serde(default)]
	pub scopes: BTreeSet<String>,
}
impl ClientCredentials {
	/// Creates credentials for the provided client identifier.
	pub fn new(id: impl Into<String>) -> Self {
		Self { id: id.into(), secret: None, redirect_uri: None, scopes: BTreeSet::new() }
	}

	/// Sets the client secret.
	pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
		self.secret = Some(secret.into());

		self
	}

	/// Sets the redirect URI.
	pub fn with_redirect_uri(mut self, uri: Url) -> Self {
		self.redirect_uri = Some(uri);

		self
	}

	/// Adds required scopes.
	pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes.extend(scopes.into_iter().map(Into::into));

		self
	}

	/// Space-joined scope parameter, or `None` when no scopes are configured.
	///
	/// Absent parameters are never sent to the server, so an empty scope set yields `None`
	/// rather than an empty string.
	pub fn scope_param(&self) -> Option<String> {
		if self.scopes.is_empty() {
			None
		} else {
			Some(self.scopes.iter().cloned().collect::<Vec<_>>().join(" "))
		}
	}

	/// Checks that every required scope appears in the space-delimited granted scope string.
	pub fn scopes_covered_by(&self, granted: &str) -> bool {
		let granted = granted.split_whitespace().collect::<BTreeSet<_>>();

		self.scopes.iter().all(|scope| granted.contains(scope.as_str()))
	}
}

/// Authorization server endpoints used by the manager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSet {
	/// Authorization endpoint used by the authorization-code flow.
	pub authorization: Url,
	/// Token endpoint used for exchanges and refreshes.
	pub token: Url,
	/// Optional introspection endpoint.
	pub introspect: Option<Url>,
	/// Optional revocation endpoint.
	pub revoke: Option<Url>,
}
impl EndpointSet {
	/// Creates a new builder.
	pub fn builder() -> EndpointSetBuilder {
		EndpointSetBuilder::default()
	}
}

/// Builder for [`EndpointSet`] values.
#[derive(Debug, Default)]
pub struct EndpointSetBuilder {
	authorization: Option<Url>,
	token: Option<Url>,
	introspect: Option<Url>,
	revoke: Option<Url>,
}
impl EndpointSetBuilder {
	/// Sets the authorization endpoint.
	pub fn authorization(mut self, url: Url) -> Self {
		self.authorization = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token(mut self, url: Url) -> Self {
		self.token = Some(url);

		self
	}

	/// Sets the optional introspection endpoint.
	pub fn introspect(mut self, url: Url) -> Self {
		self.introspect = Some(url);

		self
	}

	/// Sets the optional revocation endpoint.
	pub fn revoke(mut self, url: Url) -> Self {
		self.revoke = Some(url);

		self
	}

	/// Consumes the builder and validates the required endpoints.
	pub fn build(self) -> Result<EndpointSet, crate::error::ConfigError> {
		let authorization =
			self.authorization.ok_or(crate::error::ConfigError::MissingAuthorizationEndpoint)?;
		let token = self.token.ok_or(crate::error::ConfigError::MissingTokenEndpoint)?;

		Ok(EndpointSet { authorization, token, introspect: self.introspect, revoke: self.revoke })
	}
}

/// PKCE challenge mode for the authorization-code flow.
///
/// Deserialization also accepts a boolean: `true` normalizes to [`PkceMode::S256`] and
/// `false` to [`PkceMode::Off`], matching the lenient configuration surface of comparable
/// clients. The normalization happens here, at the boundary, so the rest of the crate only
/// ever sees the three canonical modes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum PkceMode {
	/// PKCE disabled.
	#[default]
	#[serde(rename = "off")]
	Off,
	/// Plain verifier echo (RFC 7636 `plain`).
	#[serde(rename = "plain")]
	Plain,
	/// SHA-256 challenge derivation (RFC 7636 `S256`).
	#[serde(rename = "S256")]
	S256,
}
impl PkceMode {
	/// Returns the RFC 7636 identifier sent as `code_challenge_method`.
	pub fn as_str(self) -> &'static str {
		match self {
			PkceMode::Off => "off",
			PkceMode::Plain => "plain",
			PkceMode::S256 => "S256",
		}
	}

	/// Returns `true` unless the mode is [`PkceMode::Off`].
	pub fn is_enabled(self) -> bool {
		!matches!(self, PkceMode::Off)
	}
}
impl<'de> Deserialize<'de> for PkceMode {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Raw {
			Sentinel(bool),
			Named(String),
		}

		match Raw::deserialize(deserializer)? {
			Raw::Sentinel(true) => Ok(PkceMode::S256),
			Raw::Sentinel(false) => Ok(PkceMode::Off),
			Raw::Named(name) => match name.as_str() {
				"off" => Ok(PkceMode::Off),
				"plain" => Ok(PkceMode::Plain),
				"S256" => Ok(PkceMode::S256),
				other => Err(serde::de::Error::unknown_variant(other, &["off", "plain", "S256"])),
			},
		}
	}
}

/// DPoP binding configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DpopConfig {
	/// Generate a fresh keypair of the given algorithm for each DPoP session.
	Algorithm(DpopAlgorithm),
	/// Reuse previously exported key material for the first session; later sessions
	/// (after a server-side downgrade discards the key) generate fresh keys of the
	/// same algorithm.
	Material(DpopKeyMaterial),
}
impl DpopConfig {
	/// Algorithm family the configuration resolves to.
	pub fn algorithm(&self) -> DpopAlgorithm {
		match self {
			DpopConfig::Algorithm(algorithm) => *algorithm,
			DpopConfig::Material(material) => material.algorithm,
		}
	}
}
