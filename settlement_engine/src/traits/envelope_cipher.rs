use crate::stl_api::errors::CipherError;

/// Envelope encryption scoped to a single named key. Implementations must never log or persist plaintext.
#[allow(async_fn_in_trait)]
pub trait EnvelopeCipher {
    /// The name of the key ciphertexts are produced under. Stored alongside the ciphertext.
    fn key_name(&self) -> String;

    async fn encrypt(&self, plaintext: &[u8]) -> Result<String, CipherError>;

    async fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>, CipherError>;
}
