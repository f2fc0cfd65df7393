#[cfg(feature = "insecure-dev-cipher")]
use settlement_engine::vault::PassthroughCipher;
use settlement_engine::{traits::EnvelopeCipher, vault::TransitCipher, CipherError};

use crate::{config::AppConfig, errors::CliError};

/// The key service the binary was configured with. The passthrough variant only exists in debug builds with the
/// `insecure-dev-cipher` feature.
pub enum AppCipher {
    Transit(TransitCipher),
    #[cfg(feature = "insecure-dev-cipher")]
    Passthrough(PassthroughCipher),
}

impl AppCipher {
    pub fn from_config(config: &AppConfig) -> Result<Self, CliError> {
        match &config.transit {
            Some(transit) => Ok(Self::Transit(TransitCipher::new(transit.clone(), &config.providers.http)?)),
            #[cfg(feature = "insecure-dev-cipher")]
            None => Ok(Self::Passthrough(PassthroughCipher::new())),
            #[cfg(not(feature = "insecure-dev-cipher"))]
            None => Err(crate::errors::ConfigError::NoKeyService.into()),
        }
    }
}

impl EnvelopeCipher for AppCipher {
    fn key_name(&self) -> String {
        match self {
            Self::Transit(c) => c.key_name(),
            #[cfg(feature = "insecure-dev-cipher")]
            Self::Passthrough(c) => c.key_name(),
        }
    }

    async fn encrypt(&self, plaintext: &[u8]) -> Result<String, CipherError> {
        match self {
            Self::Transit(c) => c.encrypt(plaintext).await,
            #[cfg(feature = "insecure-dev-cipher")]
            Self::Passthrough(c) => c.encrypt(plaintext).await,
        }
    }

    async fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>, CipherError> {
        match self {
            Self::Transit(c) => c.decrypt(ciphertext).await,
            #[cfg(feature = "insecure-dev-cipher")]
            Self::Passthrough(c) => c.decrypt(ciphertext).await,
        }
    }
}
