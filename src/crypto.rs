use chacha20::{
    cipher::{KeyIvInit, StreamCipher},
    ChaCha20,
};
use sha2::{Digest, Sha256};
use std::fmt;

/// ChaCha20 encryption key size in bytes
pub const ENCRYPTION_KEY_SIZE: usize = 32;

/// ChaCha20 nonce size in bytes
const NONCE_SIZE: usize = 12;

/// Every message under a given passphrase shares this nonce; the keystream
/// only has to be reproducible from the passphrase alone.
const FIXED_NONCE: [u8; NONCE_SIZE] = [0u8; NONCE_SIZE];

/// Domain separator for the tag that keys the frame checksum
const CHECKSUM_TAG_DOMAIN: &[u8] = b"multisteg/frame-check/v1";

/// 256-bit key derived from a passphrase
#[derive(Clone, PartialEq, Eq)]
pub struct CipherKey([u8; ENCRYPTION_KEY_SIZE]);

impl CipherKey {
    /// Derives the key as SHA-256 of the UTF-8 passphrase
    pub fn derive(passphrase: &str) -> Self {
        let digest: [u8; ENCRYPTION_KEY_SIZE] = Sha256::digest(passphrase.as_bytes()).into();
        Self(digest)
    }

    pub fn as_bytes(&self) -> &[u8; ENCRYPTION_KEY_SIZE] {
        &self.0
    }

    /// Secret prefix fed into the frame CRC of encrypted frames, so that a
    /// wrong passphrase surfaces as a checksum mismatch.
    pub fn checksum_tag(&self) -> [u8; ENCRYPTION_KEY_SIZE] {
        let mut hasher = Sha256::new();
        hasher.update(CHECKSUM_TAG_DOMAIN);
        hasher.update(self.0);
        hasher.finalize().into()
    }
}

impl fmt::Debug for CipherKey {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("CipherKey(<redacted>)")
    }
}

/// Derives the payload key from a passphrase
pub fn derive_key(passphrase: &str) -> CipherKey {
    CipherKey::derive(passphrase)
}

/// XORs the ChaCha20 keystream for `key` over `data`.
///
/// Applying it twice with the same key returns the original bytes.
pub fn transform(data: &[u8], key: &CipherKey) -> Vec<u8> {
    let mut cipher = ChaCha20::new(key.as_bytes().into(), &FIXED_NONCE.into());
    let mut output_data = data.to_vec();
    cipher.apply_keystream(&mut output_data);
    output_data
}
