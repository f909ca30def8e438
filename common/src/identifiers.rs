//! Account identities.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::SaveVaultError;

/// Length of an identity in bytes.
pub const IDENTITY_LEN: usize = 20;

/// An opaque, comparable account identity (a 20-byte address).
///
/// Rendered as `0x`-prefixed lowercase hex. The all-zero value is the
/// null identity and never names a real account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity([u8; IDENTITY_LEN]);

impl Identity {
    /// The null identity, meaning "no recipient".
    pub const NULL: Identity = Identity([0u8; IDENTITY_LEN]);

    /// Derive a deterministic identity from a human-readable label.
    ///
    /// Takes the trailing 20 bytes of the SHA-256 digest of the label.
    pub fn from_label(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(label.as_bytes());
        let digest: [u8; 32] = hasher.finalize().into();

        let mut bytes = [0u8; IDENTITY_LEN];
        bytes.copy_from_slice(&digest[32 - IDENTITY_LEN..]);
        Self(bytes)
    }

    /// Check if this is the null identity.
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    /// Lowercase hex representation with `0x` prefix.
    pub fn to_hex(&self) -> String {
        let hex: String = self.0.iter().map(|b| format!("{:02x}", b)).collect();
        format!("0x{}", hex)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Identity {
    type Err = SaveVaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        if hex.len() != IDENTITY_LEN * 2 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(SaveVaultError::InvalidIdentity(s.to_string()));
        }

        let mut bytes = [0u8; IDENTITY_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| SaveVaultError::InvalidIdentity(s.to_string()))?;
        }

        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Identity {
    type Error = SaveVaultError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.to_hex()
    }
}

impl From<[u8; IDENTITY_LEN]> for Identity {
    fn from(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }
}
