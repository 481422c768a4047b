//! Token endpoint response shape and cached access token state.

// self
use crate::_prelude::*;

/// Successful token endpoint response body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
	/// The issued access token.
	pub access_token: String,
	/// Token type, e.g. `Bearer` or `DPoP`.
	pub token_type: String,
	/// Lifetime in seconds. Servers that omit it yield an immediately stale token, which
	/// degrades to one acquisition per call instead of breaking.
	#[serde(default)]
	pub expires_in: u64,
	/// Rotated refresh token, when the server issued one.
	pub refresh_token: Option<String>,
	/// Space-delimited scope actually granted, when the server reported it.
	pub scope: Option<String>,
}
impl TokenResponse {
	/// Parses a response body, attributing failures to their JSON path.
	pub fn parse(body: &[u8], status: u16) -> Result<Self> {
		let deserializer = &mut serde_json::Deserializer::from_slice(body);

		serde_path_to_error::deserialize(deserializer)
			.map_err(|source| Error::TokenResponseParse { source, status })
	}
}

/// Cached access token plus the instant it stops being served from cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessTokenState {
	/// The access token itself.
	pub access_token: String,
	/// Token type as issued; joined verbatim into the header value.
	pub token_type: String,
	/// Expiry instant derived from `expires_in` at acquisition time.
	pub expires_at: OffsetDateTime,
}
impl AccessTokenState {
	/// Derives cached state from a token response at the given acquisition instant.
	pub fn from_response(response: &TokenResponse, acquired_at: OffsetDateTime) -> Self {
		Self {
			access_token: response.access_token.clone(),
			token_type: response.token_type.clone(),
			expires_at: acquired_at + Duration::seconds(response.expires_in as _),
		}
	}

	/// Returns `true` while the token is still usable at the given instant.
	pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at > now
	}

	/// `Authorization` header value: token type, a space, the token.
	pub fn header_value(&self) -> String {
		format!("{} {}", self.token_type, self.access_token)
	}
}

/// Which stored token an operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
	/// The cached access token.
	Access,
	/// The stored refresh token.
	Refresh,
}
impl TokenKind {
	/// RFC 7009 / RFC 7662 `token_type_hint` value.
	pub const fn hint(self) -> &'static str {
		match self {
			TokenKind::Access => "access_token",
			TokenKind::Refresh => "refresh_token",
		}
	}
}
