//! Signing key abstraction and the default local key provider.
//!
//! [`SigningKeyProvider`] is the seam between the DPoP engine and the cryptography backend:
//! it turns an algorithm request or previously exported material into a [`ProofSigner`].
//! [`LocalKeyProvider`] is the in-process default covering the full asymmetric DPoP matrix
//! (ECDSA P-256/384/521 and RSA PKCS#1 v1.5 / PSS with SHA-256/384/512). HMAC is excluded:
//! DPoP proofs require asymmetric keys.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand_core::OsRng;
use rsa::{
	RsaPrivateKey,
	pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding},
	traits::PublicKeyParts,
};
use sha2::{Sha256, Sha384, Sha512};
use signature::{RandomizedSigner, SignatureEncoding, Signer};
// self
use crate::{_prelude::*, error::ProofError, jose::Jwk};

const RSA_KEY_BITS: usize = 2048;

/// Asymmetric signing algorithms usable for DPoP proofs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DpopAlgorithm {
	/// ECDSA over P-256 with SHA-256.
	#[serde(rename = "ES256")]
	Es256,
	/// ECDSA over P-384 with SHA-384.
	#[serde(rename = "ES384")]
	Es384,
	/// ECDSA over P-521 with SHA-512.
	#[serde(rename = "ES512")]
	Es512,
	/// RSASSA-PKCS1-v1_5 with SHA-256.
	#[serde(rename = "RS256")]
	Rs256,
	/// RSASSA-PKCS1-v1_5 with SHA-384.
	#[serde(rename = "RS384")]
	Rs384,
	/// RSASSA-PKCS1-v1_5 with SHA-512.
	#[serde(rename = "RS512")]
	Rs512,
	/// RSASSA-PSS with SHA-256 (salt length = digest length).
	#[serde(rename = "PS256")]
	Ps256,
	/// RSASSA-PSS with SHA-384 (salt length = digest length).
	#[serde(rename = "PS384")]
	Ps384,
	/// RSASSA-PSS with SHA-512 (salt length = digest length).
	#[serde(rename = "PS512")]
	Ps512,
}
impl DpopAlgorithm {
	/// JOSE `alg` identifier.
	pub const fn as_str(self) -> &'static str {
		match self {
			DpopAlgorithm::Es256 => "ES256",
			DpopAlgorithm::Es384 => "ES384",
			DpopAlgorithm::Es512 => "ES512",
			DpopAlgorithm::Rs256 => "RS256",
			DpopAlgorithm::Rs384 => "RS384",
			DpopAlgorithm::Rs512 => "RS512",
			DpopAlgorithm::Ps256 => "PS256",
			DpopAlgorithm::Ps384 => "PS384",
			DpopAlgorithm::Ps512 => "PS512",
		}
	}

	/// Returns `true` for the RSA algorithm families.
	pub const fn is_rsa(self) -> bool {
		!matches!(self, DpopAlgorithm::Es256 | DpopAlgorithm::Es384 | DpopAlgorithm::Es512)
	}
}
impl Display for DpopAlgorithm {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Round-trippable key material: PKCS#8 PEM halves tagged with their algorithm.
///
/// Emitted through the `dpop_keypair_created` hook so callers can persist a keypair and
/// resume the same DPoP session across process restarts.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DpopKeyMaterial {
	/// Algorithm the keypair was generated for.
	pub algorithm: DpopAlgorithm,
	/// SPKI PEM encoding of the public half.
	pub public_key_pem: String,
	/// PKCS#8 PEM encoding of the private half. Callers must avoid logging it.
	pub private_key_pem: String,
}
impl Debug for DpopKeyMaterial {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DpopKeyMaterial")
			.field("algorithm", &self.algorithm)
			.field("public_key_pem", &self.public_key_pem)
			.field("private_key_pem", &"<redacted>")
			.finish()
	}
}

/// A live signing keypair bound to one algorithm.
pub trait ProofSigner
where
	Self: 'static + Send + Sync,
{
	/// Algorithm the key was generated for.
	fn algorithm(&self) -> DpopAlgorithm;

	/// Public key as its required JWK members only.
	fn public_jwk(&self) -> Jwk;

	/// Signs a message with the algorithm-appropriate scheme.
	fn sign(&self, message: &[u8]) -> Result<Vec<u8>, ProofError>;

	/// Exports the keypair for persistence.
	fn export(&self) -> Result<DpopKeyMaterial, ProofError>;
}

/// Produces [`ProofSigner`] instances from algorithm requests or persisted material.
pub trait SigningKeyProvider
where
	Self: 'static + Send + Sync,
{
	/// Generates a fresh keypair for the algorithm.
	fn generate(&self, algorithm: DpopAlgorithm) -> Result<Arc<dyn ProofSigner>, ProofError>;

	/// Imports previously exported material.
	fn import(&self, material: &DpopKeyMaterial) -> Result<Arc<dyn ProofSigner>, ProofError>;
}

/// Default in-process provider backed by the RustCrypto signing stack.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalKeyProvider;
impl SigningKeyProvider for LocalKeyProvider {
	fn generate(&self, algorithm: DpopAlgorithm) -> Result<Arc<dyn ProofSigner>, ProofError> {
		let keypair = match algorithm {
			DpopAlgorithm::Es256 => LocalKeypair::P256(p256::ecdsa::SigningKey::random(&mut OsRng)),
			DpopAlgorithm::Es384 => LocalKeypair::P384(p384::ecdsa::SigningKey::random(&mut OsRng)),
			DpopAlgorithm::Es512 => LocalKeypair::P521(p521::ecdsa::SigningKey::random(&mut OsRng)),
			_ => LocalKeypair::Rsa(
				RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)
					.map_err(ProofError::key_material)?,
			),
		};

		Ok(Arc::new(LocalSigner { algorithm, keypair }))
	}

	fn import(&self, material: &DpopKeyMaterial) -> Result<Arc<dyn ProofSigner>, ProofError> {
		let pem = material.private_key_pem.as_str();
		let keypair = match material.algorithm {
			DpopAlgorithm::Es256 => LocalKeypair::P256(
				p256::ecdsa::SigningKey::from_pkcs8_pem(pem).map_err(ProofError::key_material)?,
			),
			DpopAlgorithm::Es384 => LocalKeypair::P384(
				p384::ecdsa::SigningKey::from_pkcs8_pem(pem).map_err(ProofError::key_material)?,
			),
			// `p521::ecdsa::SigningKey` has no pkcs8 impls in p521 0.13; go through `SecretKey`.
			DpopAlgorithm::Es512 => LocalKeypair::P521(
				p521::ecdsa::SigningKey::from_bytes(
					&p521::SecretKey::from_pkcs8_pem(pem)
						.map_err(ProofError::key_material)?
						.to_bytes(),
				)
				.map_err(ProofError::key_material)?,
			),
			_ => LocalKeypair::Rsa(
				RsaPrivateKey::from_pkcs8_pem(pem).map_err(ProofError::key_material)?,
			),
		};

		Ok(Arc::new(LocalSigner { algorithm: material.algorithm, keypair }))
	}
}

enum LocalKeypair {
	P256(p256::ecdsa::SigningKey),
	P384(p384::ecdsa::SigningKey),
	P521(p521::ecdsa::SigningKey),
	Rsa(RsaPrivateKey),
}

struct LocalSigner {
	algorithm: DpopAlgorithm,
	keypair: LocalKeypair,
}
impl ProofSigner for LocalSigner {
	fn algorithm(&self) -> DpopAlgorithm {
		self.algorithm
	}

	fn public_jwk(&self) -> Jwk {
		match &self.keypair {
			LocalKeypair::P256(key) => {
				let point = key.verifying_key().to_encoded_point(false);

				ec_jwk("P-256", point.x(), point.y())
			},
			LocalKeypair::P384(key) => {
				let point = key.verifying_key().to_encoded_point(false);

				ec_jwk("P-384", point.x(), point.y())
			},
			LocalKeypair::P521(key) => {
				// `SigningKey::verifying_key` is unreachable in p521 0.13; use the `From` impl.
				let point = p521::ecdsa::VerifyingKey::from(key).to_encoded_point(false);

				ec_jwk("P-521", point.x(), point.y())
			},
			LocalKeypair::Rsa(key) => Jwk::rsa(
				URL_SAFE_NO_PAD.encode(key.n().to_bytes_be()),
				URL_SAFE_NO_PAD.encode(key.e().to_bytes_be()),
			),
		}
	}

	fn sign(&self, message: &[u8]) -> Result<Vec<u8>, ProofError> {
		match (&self.keypair, self.algorithm) {
			(LocalKeypair::P256(key), _) => {
				let signature: p256::ecdsa::Signature = key.try_sign(message)?;

				Ok(signature.to_vec())
			},
			(LocalKeypair::P384(key), _) => {
				let signature: p384::ecdsa::Signature = key.try_sign(message)?;

				Ok(signature.to_vec())
			},
			(LocalKeypair::P521(key), _) => {
				let signature: p521::ecdsa::Signature = key.try_sign(message)?;

				Ok(signature.to_vec())
			},
			(LocalKeypair::Rsa(key), DpopAlgorithm::Rs256) =>
				sign_pkcs1v15::<Sha256>(key, message),
			(LocalKeypair::Rsa(key), DpopAlgorithm::Rs384) =>
				sign_pkcs1v15::<Sha384>(key, message),
			(LocalKeypair::Rsa(key), DpopAlgorithm::Rs512) =>
				sign_pkcs1v15::<Sha512>(key, message),
			(LocalKeypair::Rsa(key), DpopAlgorithm::Ps256) => sign_pss::<Sha256>(key, message),
			(LocalKeypair::Rsa(key), DpopAlgorithm::Ps384) => sign_pss::<Sha384>(key, message),
			(LocalKeypair::Rsa(key), DpopAlgorithm::Ps512) => sign_pss::<Sha512>(key, message),
			(LocalKeypair::Rsa(_), algorithm) =>
				Err(ProofError::key_material(format!("RSA key tagged with {algorithm}"))),
		}
	}

	fn export(&self) -> Result<DpopKeyMaterial, ProofError> {
		let (public_key_pem, private_key_pem) = match &self.keypair {
			LocalKeypair::P256(key) => pem_pair(key.verifying_key(), key)?,
			LocalKeypair::P384(key) => pem_pair(key.verifying_key(), key)?,
			LocalKeypair::P521(key) => {
				// `p521::ecdsa::SigningKey` has no pkcs8 impls in p521 0.13; go through
				// `SecretKey`.
				let secret = p521::SecretKey::from_bytes(&key.to_bytes())
					.map_err(ProofError::key_material)?;

				pem_pair(&secret.public_key(), &secret)?
			},
			LocalKeypair::Rsa(key) => pem_pair(&key.to_public_key(), key)?,
		};

		Ok(DpopKeyMaterial { algorithm: self.algorithm, public_key_pem, private_key_pem })
	}
}

fn ec_jwk<B>(crv: &str, x: Option<&B>, y: Option<&B>) -> Jwk
where
	B: AsRef<[u8]>,
{
	Jwk::ec(
		crv,
		URL_SAFE_NO_PAD.encode(x.map(AsRef::as_ref).unwrap_or_default()),
		URL_SAFE_NO_PAD.encode(y.map(AsRef::as_ref).unwrap_or_default()),
	)
}

fn sign_pkcs1v15<D>(key: &RsaPrivateKey, message: &[u8]) -> Result<Vec<u8>, ProofError>
where
	D: sha2::Digest + rsa::pkcs8::AssociatedOid,
{
	let signing_key = rsa::pkcs1v15::SigningKey::<D>::new(key.clone());
	let signature = signing_key.try_sign(message)?;

	Ok(signature.to_vec())
}

fn sign_pss<D>(key: &RsaPrivateKey, message: &[u8]) -> Result<Vec<u8>, ProofError>
where
	D: sha2::Digest + sha2::digest::FixedOutputReset,
{
	// BlindedSigningKey fixes the salt length at the digest length, which is what the JOSE
	// PS* algorithms require.
	let signing_key = rsa::pss::BlindedSigningKey::<D>::new(key.clone());
	let signature = signing_key.try_sign_with_rng(&mut OsRng, message)?;

	Ok(signature.to_vec())
}

fn pem_pair<P, S>(public: &P, private: &S) -> Result<(String, String), ProofError>
where
	P: EncodePublicKey,
	S: EncodePrivateKey,
{
	let public_key_pem =
		public.to_public_key_pem(LineEnding::LF).map_err(ProofError::key_material)?;
	let private_key_pem =
		private.to_pkcs8_pem(LineEnding::LF).map_err(ProofError::key_material)?.to_string();

	Ok((public_key_pem, private_key_pem))
}
