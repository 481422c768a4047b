//! Crate-level error types shared by the lifecycle manager, executor, and DPoP engine.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Proof construction or key handling failure.
	#[error(transparent)]
	Proof(#[from] ProofError),

	/// The authorization prompter returned an error code, or no code at all.
	#[error("Authorization was denied by the prompter (error code: {code:?}).")]
	AuthorizationDenied {
		/// Error code surfaced by the authorization response, when one was given.
		code: Option<String>,
	},
	/// Granted scope is narrower than the configured requirement.
	#[error("Granted scope `{granted}` does not cover the required scope `{required}`.")]
	ScopeMismatch {
		/// Space-joined scopes the client was configured to require.
		required: String,
		/// Space-joined scopes the server actually granted.
		granted: String,
	},
	/// Token endpoint returned a terminal error response.
	#[error("Token endpoint returned an error response (status {status}): {error:?}.")]
	TokenEndpoint {
		/// HTTP status code of the response.
		status: u16,
		/// Structured `error` field from the response body, when parsable.
		error: Option<String>,
		/// Structured `error_description` field, when present.
		description: Option<String>,
	},
	/// Token endpoint responded with JSON that does not match the token response shape.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Endpoint set is missing its authorization endpoint.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Endpoint set is missing its token endpoint.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// No refresh token is stored for a refresh-only operation.
	#[error("No refresh token is available.")]
	MissingRefreshToken,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for ConfigError {
	fn from(e: reqwest::Error) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for TransportError {
	fn from(e: reqwest::Error) -> Self {
		Self::network(e)
	}
}

/// Failures raised while building or signing DPoP proofs and handling key material.
#[derive(Debug, ThisError)]
pub enum ProofError {
	/// Header or payload could not be serialized to JSON.
	#[error("Proof header or payload could not be serialized.")]
	Serialization(#[from] serde_json::Error),
	/// The signing backend rejected the signing operation.
	#[error("Signing operation failed.")]
	Signing(#[from] signature::Error),
	/// Key material could not be generated, encoded, or decoded.
	#[error("Key material is invalid or could not be produced: {reason}.")]
	KeyMaterial {
		/// Backend-specific reason string.
		reason: String,
	},
}
impl ProofError {
	/// Wraps a backend-specific key handling failure.
	pub fn key_material(reason: impl Display) -> Self {
		Self::KeyMaterial { reason: reason.to_string() }
	}
}
