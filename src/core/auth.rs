use crate::utils::error::{HubError, Result};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Configured,
    File,
    Generated,
}

/// Shared secret expected in the `X-API-Key` header.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Resolve the key: explicit override (`--api-key` / `API_KEY` or config), then the
    /// key file, then a freshly generated key persisted to the key file.
    pub fn init(override_key: Option<&str>, key_file: &Path) -> Result<(Self, KeySource)> {
        if let Some(key) = override_key.map(str::trim).filter(|k| !k.is_empty()) {
            return Ok((Self::new(key), KeySource::Configured));
        }

        if key_file.exists() {
            let stored = std::fs::read_to_string(key_file)?;
            let stored = stored.trim();
            if !stored.is_empty() {
                return Ok((Self::new(stored), KeySource::File));
            }
            tracing::warn!("⚠️ Key file {} is empty, generating a new key", key_file.display());
        }

        let key = uuid::Uuid::new_v4().simple().to_string();
        if let Some(parent) = key_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(key_file, &key)?;
        tracing::info!("🔑 Generated new API key → {} (saved to {})", key, key_file.display());
        Ok((Self::new(key), KeySource::Generated))
    }

    pub fn verify(&self, header_key: Option<&str>) -> Result<()> {
        match header_key {
            Some(candidate) if constant_time_eq(candidate.as_bytes(), self.0.as_bytes()) => Ok(()),
            _ => Err(HubError::Unauthorized),
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(****)")
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
