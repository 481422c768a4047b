//! DPoP proof construction (RFC 9449).
//!
//! A [`DpopEngine`] wraps one live signing keypair and mints `dpop+jwt` proofs for token
//! endpoint requests. The engine is cheaply cloneable; the lifecycle manager clones it out
//! of its session state before entering the request loop so proofs can be re-minted per
//! attempt without holding any lock.

pub mod key;
use key::{DpopAlgorithm, ProofSigner};

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
pub use key::DpopKeyMaterial;
use crate::{_prelude::*, error::ProofError, jose::{CompactToken, Jwk}};

const JTI_BYTES: usize = 12;

/// Proof factory bound to one keypair.
///
/// The public JWK and its RFC 7638 thumbprint are computed once at construction; every
/// proof minted afterwards embeds the same key, so `dpop_jkt` pinning in the authorization
/// request stays consistent with the proofs sent to the token endpoint.
#[derive(Clone)]
pub struct DpopEngine {
	signer: Arc<dyn ProofSigner>,
	jwk: Jwk,
	thumbprint: String,
}
impl DpopEngine {
	/// Wraps a signer, precomputing its public JWK and thumbprint.
	pub fn new(signer: Arc<dyn ProofSigner>) -> Result<Self, ProofError> {
		let jwk = signer.public_jwk();
		let thumbprint = jwk.thumbprint()?;

		Ok(Self { signer, jwk, thumbprint })
	}

	/// Algorithm of the bound keypair.
	pub fn algorithm(&self) -> DpopAlgorithm {
		self.signer.algorithm()
	}

	/// RFC 7638 thumbprint of the bound public key, sent as `dpop_jkt`.
	pub fn thumbprint(&self) -> &str {
		&self.thumbprint
	}

	/// Exports the bound keypair for persistence.
	pub fn export_material(&self) -> Result<DpopKeyMaterial, ProofError> {
		self.signer.export()
	}

	/// Mints a signed proof for one HTTP request.
	///
	/// `access_token` adds the `ath` hash claim when the proof accompanies a protected
	/// resource call; token endpoint proofs omit it. `nonce` echoes a server-issued
	/// `DPoP-Nonce` value after a `use_dpop_nonce` challenge.
	pub fn proof(
		&self,
		method: &str,
		uri: &Url,
		access_token: Option<&str>,
		nonce: Option<&str>,
	) -> Result<String, ProofError> {
		// htu covers the URI without query or fragment.
		let mut htu = uri.clone();

		htu.set_query(None);
		htu.set_fragment(None);

		let header = ProofHeader {
			typ: "dpop+jwt",
			alg: self.signer.algorithm().as_str(),
			jwk: &self.jwk,
		};
		let claims = ProofClaims {
			jti: URL_SAFE_NO_PAD.encode(rand::random::<[u8; JTI_BYTES]>()),
			htm: method,
			htu: htu.as_str(),
			iat: OffsetDateTime::now_utc().unix_timestamp(),
			ath: access_token.map(|token| URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))),
			nonce,
		};
		let token = CompactToken::encode(&header, &claims)?;
		let signature = self.signer.sign(token.signing_input().as_bytes())?;

		Ok(token.into_signed(signature).to_string())
	}
}
impl Debug for DpopEngine {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DpopEngine")
			.field("algorithm", &self.signer.algorithm())
			.field("thumbprint", &self.thumbprint)
			.finish()
	}
}

#[derive(Serialize)]
struct ProofHeader<'a> {
	typ: &'a str,
	alg: &'a str,
	jwk: &'a Jwk,
}
#[derive(Serialize)]
struct ProofClaims<'a> {
	jti: String,
	htm: &'a str,
	htu: &'a str,
	iat: i64,
	#[serde(skip_serializing_if = "Option::is_none")]
	ath: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	nonce: Option<&'a str>,
}
