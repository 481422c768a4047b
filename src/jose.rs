//! Compact signed-token codec and JWK representation shared by DPoP proofs.
//!
//! The codec produces the three-segment `header.payload.signature` serialization used by
//! every JWT-shaped artifact in this crate. The signing input is exactly the bytes that
//! appear before the final `.` in the rendered output, so a signature computed over
//! [`CompactToken::signing_input`] always verifies against the rendered token.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Two encoded segments plus an optional signature, rendered as compact serialization.
///
/// A token is unsigned until [`CompactToken::into_signed`] is invoked; signing consumes the
/// value, so a signed token can never be altered afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompactToken {
	header_segment: String,
	payload_segment: String,
	signature: Option<Vec<u8>>,
}
impl CompactToken {
	/// Encodes a header and payload into their base64url (no padding) JSON segments.
	pub fn encode<H, P>(header: &H, payload: &P) -> Result<Self, serde_json::Error>
	where
		H: Serialize,
		P: Serialize,
	{
		let header_segment = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header)?);
		let payload_segment = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload)?);

		Ok(Self { header_segment, payload_segment, signature: None })
	}

	/// Bytes covered by the signature: `header_segment`, a dot, `payload_segment`.
	pub fn signing_input(&self) -> String {
		format!("{}.{}", self.header_segment, self.payload_segment)
	}

	/// Completes the token with a raw signature.
	pub fn into_signed(self, signature: Vec<u8>) -> Self {
		Self { signature: Some(signature), ..self }
	}

	/// Returns `true` once a signature has been attached.
	pub fn is_signed(&self) -> bool {
		self.signature.is_some()
	}
}
impl Display for CompactToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let signature =
			self.signature.as_ref().map(|bytes| URL_SAFE_NO_PAD.encode(bytes)).unwrap_or_default();

		write!(f, "{}.{}.{signature}", self.header_segment, self.payload_segment)
	}
}

/// Public JWK member set.
///
/// Field declaration order is alphabetical on purpose: serializing a key that carries only
/// its required members yields exactly the canonical form RFC 7638 hashes: `{crv,kty,x,y}`
/// for EC, `{e,kty,n}` for RSA, `{k,kty}` for symmetric keys. Thumbprints are compared
/// across independent implementations, so the order and member set are normative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
	/// EC curve name.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub crv: Option<String>,
	/// RSA public exponent.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub e: Option<String>,
	/// Symmetric key value (unused by DPoP, kept for thumbprint completeness).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub k: Option<String>,
	/// Key type: `EC`, `RSA`, or `oct`.
	pub kty: String,
	/// RSA modulus.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub n: Option<String>,
	/// EC x coordinate.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub x: Option<String>,
	/// EC y coordinate.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub y: Option<String>,
}
impl Jwk {
	/// Builds an EC key from base64url coordinates.
	pub fn ec(crv: impl Into<String>, x: impl Into<String>, y: impl Into<String>) -> Self {
		Self {
			crv: Some(crv.into()),
			e: None,
			k: None,
			kty: "EC".into(),
			n: None,
			x: Some(x.into()),
			y: Some(y.into()),
		}
	}

	/// Builds an RSA key from base64url modulus and exponent.
	pub fn rsa(n: impl Into<String>, e: impl Into<String>) -> Self {
		Self {
			crv: None,
			e: Some(e.into()),
			k: None,
			kty: "RSA".into(),
			n: Some(n.into()),
			x: None,
			y: None,
		}
	}

	/// Builds a symmetric key.
	pub fn oct(k: impl Into<String>) -> Self {
		Self { crv: None, e: None, k: Some(k.into()), kty: "oct".into(), n: None, x: None, y: None }
	}

	/// RFC 7638 thumbprint: base64url (no padding) SHA-256 of the canonical member JSON.
	pub fn thumbprint(&self) -> Result<String, serde_json::Error> {
		let canonical = serde_json::to_vec(self)?;

		Ok(URL_SAFE_NO_PAD.encode(Sha256::digest(canonical)))
	}
}
