//! Comment encryption bound to a decrypted post
//!
//! Once a post is decrypted, comments on it are encrypted with a key derived
//! from the post's initialization vector and its decrypted text, so only
//! readers who could decrypt the post can read the comments.
//!
//! ```text
//! key        = HKDF-SHA256(ikm = iv, info = "veilpost-comment" || post_text)
//! wire form  = base64([nonce (12 bytes)] + [ciphertext + tag (16 bytes)])
//! ```

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;

use crate::error::{PostError, PostResult};

/// Nonce size for ChaCha20-Poly1305 (12 bytes)
pub const NONCE_SIZE: usize = 12;

/// Domain separation for comment key derivation
const HKDF_INFO: &[u8] = b"veilpost-comment";

/// Encrypt/decrypt pair for comments on one decrypted post.
///
/// # Example
///
/// ```
/// use veilpost_core::crypto::CommentCodec;
///
/// let codec = CommentCodec::new(&[1, 2, 3], "hello from a secret post").unwrap();
///
/// let sealed = codec.encrypt_comment("nice post").unwrap();
/// assert_eq!(codec.decrypt_comment(&sealed).unwrap(), "nice post");
/// ```
pub struct CommentCodec {
    cipher: ChaCha20Poly1305,
    iv: Vec<u8>,
}

impl CommentCodec {
    /// Create a codec bound to the post's initialization vector and decrypted text.
    pub fn new(iv: &[u8], post_text: &str) -> PostResult<Self> {
        let key = derive_key(iv, post_text.as_bytes())?;
        Ok(Self {
            cipher: ChaCha20Poly1305::new((&key).into()),
            iv: iv.to_vec(),
        })
    }

    /// The initialization vector this codec is bound to
    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    /// Encrypt a plaintext comment into its base64 wire form.
    pub fn encrypt_comment(&self, plaintext: &str) -> PostResult<String> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| PostError::Crypto(format!("Encryption failed: {}", e)))?;

        let mut sealed = nonce_bytes.to_vec();
        sealed.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(sealed))
    }

    /// Decrypt a comment from its base64 wire form.
    pub fn decrypt_comment(&self, encrypted: &str) -> PostResult<String> {
        let sealed = STANDARD
            .decode(encrypted.trim())
            .map_err(|e| PostError::DecryptionFailed(format!("invalid base64: {}", e)))?;

        if sealed.len() < NONCE_SIZE {
            return Err(PostError::DecryptionFailed(
                "Data too short to contain nonce".to_string(),
            ));
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| PostError::DecryptionFailed(format!("{}", e)))?;

        String::from_utf8(plaintext)
            .map_err(|e| PostError::DecryptionFailed(format!("comment is not UTF-8: {}", e)))
    }
}

impl std::fmt::Debug for CommentCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommentCodec")
            .field("iv", &self.iv)
            .finish_non_exhaustive()
    }
}

/// Derive a 32-byte comment key using HKDF-SHA256.
fn derive_key(iv: &[u8], context: &[u8]) -> PostResult<[u8; 32]> {
    let mut info = Vec::with_capacity(HKDF_INFO.len() + context.len());
    info.extend_from_slice(HKDF_INFO);
    info.extend_from_slice(context);

    let hkdf = Hkdf::<Sha256>::new(None, iv);
    let mut output = [0u8; 32];
    hkdf.expand(&info, &mut output)
        .map_err(|e| PostError::Crypto(format!("HKDF expand failed: {}", e)))?;
    Ok(output)
}
