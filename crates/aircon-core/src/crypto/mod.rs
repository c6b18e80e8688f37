//! Cipher codec for the encrypted `pack` field.
//!
//! Every encrypted payload on the wire is produced the same way:
//!
//! ```text
//! JSON bytes ─► PKCS#7 pad to 16 ─► AES-128 per block (ECB) ─► base64 text
//! ```
//!
//! Two key scopes exist.  The [`GENERIC_KEY`] is published by the protocol
//! and is only used for discovery replies and the bind handshake.  Every
//! exchange after a successful bind uses the device's session key.
//!
//! Decryption never returns partial plaintext: malformed base64, a ciphertext
//! whose length is not a positive multiple of the block size, and padding that
//! does not verify are all reported as [`CipherError`].

use aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// AES-128 key length in bytes.
pub const KEY_LEN: usize = 16;

/// The protocol-published key used for discovery replies and binding.
pub const GENERIC_KEY: CipherKey = CipherKey(*b"a3K8Bx%2r8Y7#xDh");

/// Errors produced while decoding a received ciphertext or building a key.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// The transport text is not valid base64.
    #[error("invalid base64 in pack: {0}")]
    InvalidBase64(String),

    /// The decoded ciphertext is empty or not a whole number of blocks.
    #[error("ciphertext length {0} is not a positive multiple of 16")]
    InvalidLength(usize),

    /// The trailing PKCS#7 padding did not verify after decryption.
    #[error("invalid PKCS#7 padding")]
    InvalidPadding,

    /// Key material of the wrong length was supplied.
    #[error("key must be 16 bytes, got {0}")]
    InvalidKeyLength(usize),
}

/// A 128-bit AES key.
#[derive(Clone, PartialEq, Eq)]
pub struct CipherKey([u8; KEY_LEN]);

impl CipherKey {
    /// Wraps raw key bytes.
    pub const fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Builds a key from a slice, rejecting anything that is not exactly
    /// [`KEY_LEN`] bytes long.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKeyLength`] for a slice of any other length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CipherError> {
        let arr: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| CipherError::InvalidKeyLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CipherKey(<redacted>)")
    }
}

/// Encrypts `plaintext` under `key` and returns the base64 transport text.
///
/// # Examples
///
/// ```rust
/// use aircon_core::crypto::{decrypt, encrypt, GENERIC_KEY};
///
/// let text = encrypt(br#"{"t":"bind"}"#, &GENERIC_KEY);
/// let back = decrypt(&text, &GENERIC_KEY).unwrap();
/// assert_eq!(back, br#"{"t":"bind"}"#);
/// ```
pub fn encrypt(plaintext: &[u8], key: &CipherKey) -> String {
    let cipher = Aes128::new(GenericArray::from_slice(key.as_bytes()));

    let mut buf = pad(plaintext);
    for chunk in buf.chunks_exact_mut(BLOCK_SIZE) {
        cipher.encrypt_block(GenericArray::from_mut_slice(chunk));
    }

    STANDARD.encode(buf)
}

/// Decodes base64 `ciphertext` and decrypts it under `key`.
///
/// Surrounding whitespace is ignored; some firmware terminates the pack with
/// a newline.
///
/// # Errors
///
/// Returns [`CipherError`] when the text is not base64, the ciphertext is not
/// a whole number of blocks, or the padding is invalid.
pub fn decrypt(ciphertext: &str, key: &CipherKey) -> Result<Vec<u8>, CipherError> {
    let mut buf = STANDARD
        .decode(ciphertext.trim())
        .map_err(|e| CipherError::InvalidBase64(e.to_string()))?;

    if buf.is_empty() || buf.len() % BLOCK_SIZE != 0 {
        return Err(CipherError::InvalidLength(buf.len()));
    }

    let cipher = Aes128::new(GenericArray::from_slice(key.as_bytes()));
    for chunk in buf.chunks_exact_mut(BLOCK_SIZE) {
        cipher.decrypt_block(GenericArray::from_mut_slice(chunk));
    }

    let plain_len = unpadded_len(&buf)?;
    buf.truncate(plain_len);
    Ok(buf)
}

/// Appends PKCS#7 padding; always adds between 1 and 16 bytes.
fn pad(data: &[u8]) -> Vec<u8> {
    let padding_len = BLOCK_SIZE - (data.len() % BLOCK_SIZE);
    let mut padded = Vec::with_capacity(data.len() + padding_len);
    padded.extend_from_slice(data);
    padded.resize(data.len() + padding_len, padding_len as u8);
    padded
}

/// Verifies PKCS#7 padding and returns the length of the payload before it.
fn unpadded_len(data: &[u8]) -> Result<usize, CipherError> {
    let padding_len = *data.last().ok_or(CipherError::InvalidPadding)? as usize;
    if padding_len == 0 || padding_len > BLOCK_SIZE || padding_len > data.len() {
        return Err(CipherError::InvalidPadding);
    }

    let start = data.len() - padding_len;
    if data[start..].iter().all(|&b| b as usize == padding_len) {
        Ok(start)
    } else {
        Err(CipherError::InvalidPadding)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn session_key() -> CipherKey {
        CipherKey::new(*b"0123456789abcdef")
    }

    #[test]
    fn test_encrypt_then_decrypt_returns_original_plaintext() {
        // Arrange
        let plaintext = br#"{"cols":["Pow","Mod"],"mac":"f4911e000000","t":"status"}"#;

        // Act
        let text = encrypt(plaintext, &session_key());
        let decrypted = decrypt(&text, &session_key()).expect("decrypt must succeed");

        // Assert
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_encrypt_empty_plaintext_produces_one_full_padding_block() {
        // Arrange / Act
        let text = encrypt(b"", &GENERIC_KEY);
        let raw = STANDARD.decode(&text).unwrap();

        // Assert
        assert_eq!(raw.len(), BLOCK_SIZE);
        assert_eq!(decrypt(&text, &GENERIC_KEY).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_block_aligned_plaintext_gets_extra_padding_block() {
        // Arrange: exactly one block of input
        let plaintext = [b'x'; BLOCK_SIZE];

        // Act
        let raw = STANDARD.decode(encrypt(&plaintext, &GENERIC_KEY)).unwrap();

        // Assert
        assert_eq!(raw.len(), 2 * BLOCK_SIZE);
    }

    #[test]
    fn test_ecb_mode_encrypts_identical_blocks_identically() {
        // Arrange: two identical plaintext blocks
        let plaintext = [b'A'; 2 * BLOCK_SIZE];

        // Act
        let raw = STANDARD.decode(encrypt(&plaintext, &GENERIC_KEY)).unwrap();

        // Assert
        assert_eq!(raw[..BLOCK_SIZE], raw[BLOCK_SIZE..2 * BLOCK_SIZE]);
    }

    #[test]
    fn test_decrypt_one_byte_truncated_ciphertext_fails_with_invalid_length() {
        // Arrange
        let text = encrypt(br#"{"t":"scan"}"#, &GENERIC_KEY);
        let mut raw = STANDARD.decode(&text).unwrap();
        raw.pop();
        let truncated = STANDARD.encode(&raw);

        // Act
        let result = decrypt(&truncated, &GENERIC_KEY);

        // Assert
        assert_eq!(result, Err(CipherError::InvalidLength(BLOCK_SIZE - 1)));
    }

    #[test]
    fn test_decrypt_rejects_malformed_base64() {
        let result = decrypt("not*base64!", &GENERIC_KEY);
        assert!(matches!(result, Err(CipherError::InvalidBase64(_))));
    }

    #[test]
    fn test_decrypt_rejects_empty_ciphertext() {
        assert_eq!(decrypt("", &GENERIC_KEY), Err(CipherError::InvalidLength(0)));
    }

    #[test]
    fn test_decrypt_with_wrong_key_never_returns_original_plaintext() {
        // Arrange
        let plaintext = br#"{"t":"bindok","key":"0123456789abcdef"}"#;
        let text = encrypt(plaintext, &GENERIC_KEY);

        // Act
        let result = decrypt(&text, &session_key());

        // Assert: either the padding check fails or the bytes are garbage,
        // never the original JSON.
        match result {
            Err(e) => assert_eq!(e, CipherError::InvalidPadding),
            Ok(bytes) => assert_ne!(bytes, plaintext),
        }
    }

    #[test]
    fn test_decrypt_tolerates_trailing_newline() {
        let text = format!("{}\n", encrypt(b"{}", &GENERIC_KEY));
        assert_eq!(decrypt(&text, &GENERIC_KEY).unwrap(), b"{}");
    }

    #[test]
    fn test_unpadded_len_rejects_zero_pad_byte() {
        let mut block = [b'a'; BLOCK_SIZE];
        block[BLOCK_SIZE - 1] = 0;
        assert_eq!(unpadded_len(&block), Err(CipherError::InvalidPadding));
    }

    #[test]
    fn test_unpadded_len_rejects_inconsistent_pad_bytes() {
        let mut block = [3u8; BLOCK_SIZE];
        block[BLOCK_SIZE - 2] = 7;
        assert_eq!(unpadded_len(&block), Err(CipherError::InvalidPadding));
    }

    #[test]
    fn test_cipher_key_from_slice_rejects_wrong_length() {
        assert_eq!(
            CipherKey::from_slice(b"short"),
            Err(CipherError::InvalidKeyLength(5))
        );
    }

    #[test]
    fn test_cipher_key_debug_does_not_leak_material() {
        let rendered = format!("{:?}", GENERIC_KEY);
        assert!(!rendered.contains("a3K8"));
    }
}
