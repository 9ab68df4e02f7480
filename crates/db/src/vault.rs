use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use age::armor::{ArmoredReader, ArmoredWriter, Format};
use age::{Decryptor, Encryptor};
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use talentscout_core::config::PrivacyConfig;
use thiserror::Error;

const EMAIL_HASH_CHARS: usize = 16;
const PHONE_HASH_CHARS: usize = 12;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("identity file {path}: {message}")]
    Io { path: PathBuf, message: String },
    #[error("invalid age identity: {0}")]
    InvalidIdentity(String),
    #[error("encryption failed: {0}")]
    Encrypt(String),
    #[error("decryption failed: {0}")]
    Decrypt(String),
    #[error("value is encrypted but the vault has no identity")]
    MissingIdentity,
}

/// Seals personal fields with an age x25519 identity, or stores them as-is
/// when encryption is switched off.
pub struct RecordVault {
    identity: Option<age::x25519::Identity>,
}

impl std::fmt::Debug for RecordVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordVault").field("encrypting", &self.is_encrypting()).finish()
    }
}

impl RecordVault {
    pub fn plaintext() -> Self {
        Self { identity: None }
    }

    /// A throwaway identity; sealed values are unreadable once it is dropped.
    pub fn ephemeral() -> Self {
        Self { identity: Some(age::x25519::Identity::generate()) }
    }

    pub fn from_config(privacy: &PrivacyConfig) -> Result<Self, VaultError> {
        if privacy.encrypt_data {
            Self::open_or_create(&privacy.identity_path)
        } else {
            Ok(Self::plaintext())
        }
    }

    /// Reads the identity at `path`, generating it (mode 0600) on first use.
    pub fn open_or_create(path: &Path) -> Result<Self, VaultError> {
        let io_error =
            |error: std::io::Error| VaultError::Io { path: path.to_path_buf(), message: error.to_string() };

        if path.exists() {
            let raw = fs::read_to_string(path).map_err(io_error)?;
            let identity = raw
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty() && !line.starts_with('#'))
                .ok_or_else(|| VaultError::InvalidIdentity("identity file is empty".to_owned()))?
                .parse::<age::x25519::Identity>()
                .map_err(|error| VaultError::InvalidIdentity(error.to_string()))?;
            return Ok(Self { identity: Some(identity) });
        }

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let identity = age::x25519::Identity::generate();
        let encoded = identity.to_string();
        fs::write(path, format!("{}\n", encoded.expose_secret())).map_err(io_error)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut permissions = fs::metadata(path).map_err(io_error)?.permissions();
            permissions.set_mode(0o600);
            fs::set_permissions(path, permissions).map_err(io_error)?;
        }

        tracing::info!(
            event_name = "vault.identity_created",
            path = %path.display(),
            "generated record encryption identity"
        );
        Ok(Self { identity: Some(identity) })
    }

    pub fn is_encrypting(&self) -> bool {
        self.identity.is_some()
    }

    /// Returns ASCII-armored ciphertext, or the value unchanged in plaintext mode.
    pub fn seal(&self, value: &str) -> Result<String, VaultError> {
        let Some(identity) = &self.identity else {
            return Ok(value.to_owned());
        };
        let recipient = identity.to_public();
        let encryptor =
            Encryptor::with_recipients(std::iter::once(&recipient as &dyn age::Recipient))
                .map_err(|error| VaultError::Encrypt(error.to_string()))?;

        let mut sealed = Vec::new();
        let armor = ArmoredWriter::wrap_output(&mut sealed, Format::AsciiArmor)
            .map_err(|error| VaultError::Encrypt(error.to_string()))?;
        let mut writer =
            encryptor.wrap_output(armor).map_err(|error| VaultError::Encrypt(error.to_string()))?;
        writer.write_all(value.as_bytes()).map_err(|error| VaultError::Encrypt(error.to_string()))?;
        writer
            .finish()
            .and_then(|armor| armor.finish())
            .map_err(|error| VaultError::Encrypt(error.to_string()))?;

        String::from_utf8(sealed).map_err(|error| VaultError::Encrypt(error.to_string()))
    }

    pub fn open(&self, stored: &str, encrypted: bool) -> Result<String, VaultError> {
        if !encrypted {
            return Ok(stored.to_owned());
        }
        let identity = self.identity.as_ref().ok_or(VaultError::MissingIdentity)?;
        let decryptor = Decryptor::new(ArmoredReader::new(stored.as_bytes()))
            .map_err(|error| VaultError::Decrypt(error.to_string()))?;
        let mut reader = decryptor
            .decrypt(std::iter::once(identity as &dyn age::Identity))
            .map_err(|error| VaultError::Decrypt(error.to_string()))?;

        let mut opened = String::new();
        reader
            .read_to_string(&mut opened)
            .map_err(|error| VaultError::Decrypt(error.to_string()))?;
        Ok(opened)
    }
}

/// First 16 hex chars of SHA-256 over the lowercased, trimmed address.
pub fn hash_email(email: &str) -> String {
    truncated_sha256(email.trim().to_lowercase().as_bytes(), EMAIL_HASH_CHARS)
}

/// First 12 hex chars of SHA-256 over the digits of the number.
pub fn hash_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    truncated_sha256(digits.as_bytes(), PHONE_HASH_CHARS)
}

fn truncated_sha256(bytes: &[u8], chars: usize) -> String {
    let mut hex = format!("{:x}", Sha256::digest(bytes));
    hex.truncate(chars);
    hex
}
