//! PKCE (RFC 7636) verifier and challenge generation.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::config::PkceMode;

const PKCE_VERIFIER_LEN: usize = 64;

/// One-shot PKCE material: the secret verifier and its derived challenge.
///
/// A fresh pair is generated for every authorization attempt; the verifier is consumed by
/// the code exchange and never reused.
#[derive(Clone, Debug)]
pub struct PkcePair {
	/// Secret verifier sent as `code_verifier` during the exchange.
	pub verifier: String,
	/// Derived challenge sent as `code_challenge` in the authorization request.
	pub challenge: String,
	/// Mode that produced the challenge.
	pub mode: PkceMode,
}
impl PkcePair {
	/// Generates a fresh pair for the given mode, or `None` when PKCE is off.
	pub fn generate(mode: PkceMode) -> Option<Self> {
		if !mode.is_enabled() {
			return None;
		}

		let verifier = random_string(PKCE_VERIFIER_LEN);
		let challenge = derive_challenge(mode, &verifier);

		Some(Self { verifier, challenge, mode })
	}
}

/// Derives the challenge for a verifier under the given mode.
///
/// `S256` is the base64url (no padding) SHA-256 digest of the verifier bytes; `plain`
/// echoes the verifier itself.
pub fn derive_challenge(mode: PkceMode, verifier: &str) -> String {
	match mode {
		PkceMode::S256 => URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes())),
		_ => verifier.to_owned(),
	}
}

pub(crate) fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}
