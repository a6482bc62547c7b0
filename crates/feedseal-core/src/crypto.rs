//! Cryptographic primitives: Ed25519 envelopes, signing and Blake3 hashing.
//!
//! Keys and signatures travel as text envelopes `ed25519:<base64>`, carrying
//! 32 raw bytes for keys (public key, or private key seed) and 64 for
//! signatures.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::canonical::to_canonical_string;
use crate::error::{CoreError, Result};

/// Algorithm prefix of every key and signature envelope.
pub const ENVELOPE_PREFIX: &str = "ed25519:";

/// Decode an `ed25519:<base64>` envelope into exactly `N` bytes.
fn decode_envelope<const N: usize>(s: &str) -> std::result::Result<[u8; N], String> {
    let payload = s
        .strip_prefix(ENVELOPE_PREFIX)
        .ok_or_else(|| format!("expected {ENVELOPE_PREFIX} prefix"))?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| format!("invalid base64: {e}"))?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| format!("expected {N} bytes, got {len}"))
}

fn encode_envelope(bytes: &[u8]) -> String {
    format!("{ENVELOPE_PREFIX}{}", STANDARD.encode(bytes))
}

/// A 32-byte Blake3 hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Blake3Hash(pub [u8; 32]);

impl Blake3Hash {
    /// Compute the Blake3 hash of the given data.
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Blake3Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blake3({})", &self.to_hex()[..16])
    }
}

/// A 32-byte Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse an `ed25519:<base64>` envelope.
    pub fn from_envelope(s: &str) -> Result<Self> {
        decode_envelope::<32>(s)
            .map(Self)
            .map_err(CoreError::InvalidKeyFormat)
    }

    /// Render as an `ed25519:<base64>` envelope.
    pub fn to_envelope(&self) -> String {
        encode_envelope(&self.0)
    }

    /// Short identifier: first 16 hex chars of Blake3 over the key bytes.
    pub fn key_id(&self) -> String {
        Blake3Hash::hash(&self.0).to_hex()[..16].to_string()
    }

    /// Verify a signature over a message.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        let verifying_key = VerifyingKey::from_bytes(&self.0)
            .map_err(|e| CoreError::InvalidKeyFormat(e.to_string()))?;
        let sig = DalekSignature::from_bytes(&signature.0);
        verifying_key
            .verify(message, &sig)
            .map_err(|e| CoreError::InvalidSignatureFormat(e.to_string()))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.key_id())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_envelope())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_envelope())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_envelope(&s).map_err(serde::de::Error::custom)
    }
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Parse an `ed25519:<base64>` envelope.
    pub fn from_envelope(s: &str) -> Result<Self> {
        decode_envelope::<64>(s)
            .map(Self)
            .map_err(CoreError::InvalidSignatureFormat)
    }

    /// Render as an `ed25519:<base64>` envelope.
    pub fn to_envelope(&self) -> String {
        encode_envelope(&self.0)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", &hex::encode(&self.0[..8]))
    }
}

/// A keypair for signing documents.
///
/// This wraps ed25519-dalek's SigningKey. It never serializes, and its
/// `Debug` output shows only the public half.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let signing_key = SigningKey::generate(&mut rng);
        Self { signing_key }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Parse a private key envelope (`ed25519:<base64 seed>`).
    pub fn from_private_envelope(s: &str) -> Result<Self> {
        let seed = decode_envelope::<32>(s).map_err(CoreError::InvalidKeyFormat)?;
        Ok(Self::from_seed(&seed))
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Render the private key seed as an envelope.
    pub fn private_envelope(&self) -> String {
        encode_envelope(&self.signing_key.to_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }

    /// Both halves as envelopes.
    pub fn to_encoded(&self) -> EncodedKeyPair {
        EncodedKeyPair {
            public_key: self.public_key().to_envelope(),
            private_key: self.private_envelope(),
        }
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public_key())
    }
}

/// A freshly generated key pair, both halves enveloped.
///
/// This is what key persistence layers store; the core never writes it
/// anywhere itself.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedKeyPair {
    pub public_key: String,
    pub private_key: String,
}

impl fmt::Debug for EncodedKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedKeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Generate a fresh key pair.
pub fn generate_key_pair() -> EncodedKeyPair {
    Keypair::generate().to_encoded()
}

/// Canonicalize `content` and sign its UTF-8 bytes.
///
/// Fails with [`CoreError::InvalidKeyFormat`] when `private_key` is not a
/// 32-byte envelope.
pub fn sign_content<T: Serialize + ?Sized>(content: &T, private_key: &str) -> Result<String> {
    let keypair = Keypair::from_private_envelope(private_key)?;
    let canonical = to_canonical_string(content)?;
    Ok(keypair.sign(canonical.as_bytes()).to_envelope())
}

/// Sign already-canonical signature data.
pub fn sign_canonical(data: &str, private_key: &str) -> Result<String> {
    let keypair = Keypair::from_private_envelope(private_key)?;
    Ok(keypair.sign(data.as_bytes()).to_envelope())
}

/// Canonicalize `content` and verify `signature` with `public_key`.
///
/// Returns false for a forged signature and equally for any malformed input:
/// callers cannot tell the two apart.
pub fn verify_signature<T: Serialize + ?Sized>(
    content: &T,
    signature: &str,
    public_key: &str,
) -> bool {
    match to_canonical_string(content) {
        Ok(canonical) => verify_canonical(&canonical, signature, public_key),
        Err(_) => false,
    }
}

/// Verify a signature over already-canonical signature data.
pub fn verify_canonical(data: &str, signature: &str, public_key: &str) -> bool {
    let (Ok(key), Ok(sig)) = (
        PublicKey::from_envelope(public_key),
        Signature::from_envelope(signature),
    ) else {
        return false;
    };
    key.verify(data.as_bytes(), &sig).is_ok()
}
