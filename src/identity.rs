//! Random identifier generation
//!
//! Identifiers come from the operating system's secure random source. When
//! that source cannot be used, generation switches to a seeded, non-secure
//! generator and says so in the log; output shapes are identical either way.

use rand::RngCore;
use rand::rngs::OsRng;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};
use uuid::Builder;

use crate::constants::identity::{MACHINE_ID_BYTES, UUID_BYTES};
use crate::constants::keys;

/// Where random bytes come from
pub enum EntropySource {
    /// Operating-system CSPRNG
    Os,
    /// Time-seeded fallback; unsuitable for anything security-relevant
    Weak(fastrand::Rng),
}

impl EntropySource {
    /// Test the OS source, falling back to the weak source if it fails
    pub fn detect() -> Self {
        let mut check = [0u8; 1];
        match OsRng.try_fill_bytes(&mut check) {
            Ok(()) => {
                info!(source = "os", "Using operating system entropy");
                EntropySource::Os
            }
            Err(e) => {
                warn!(error = %e, "Secure random source unavailable, falling back to weak entropy");
                Self::weak()
            }
        }
    }

    /// Seed from the clock and process id through a non-cryptographic hash
    pub fn weak() -> Self {
        let mut hasher = DefaultHasher::new();
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default()
            .hash(&mut hasher);
        std::process::id().hash(&mut hasher);
        EntropySource::Weak(fastrand::Rng::with_seed(hasher.finish()))
    }

    pub fn is_secure(&self) -> bool {
        matches!(self, EntropySource::Os)
    }

    fn fill(&mut self, buf: &mut [u8]) {
        if let EntropySource::Os = self {
            match OsRng.try_fill_bytes(buf) {
                Ok(()) => return,
                Err(e) => {
                    warn!(error = %e, "Secure random source failed mid-run, switching to weak entropy");
                    *self = Self::weak();
                }
            }
        }
        if let EntropySource::Weak(rng) = self {
            rng.fill(buf);
        }
    }
}

impl fmt::Display for EntropySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntropySource::Os => "os",
            EntropySource::Weak(_) => "weak",
        })
    }
}

/// The four identifiers written to the storage file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySet {
    pub machine_id: String,
    pub mac_machine_id: String,
    pub dev_device_id: String,
    pub sqm_id: String,
}

impl IdentitySet {
    /// Each value paired with the dotted key it is stored under
    pub fn entries(&self) -> [(&'static str, &str); 4] {
        let [machine, mac_machine, dev_device, sqm] = keys::ALL;
        [
            (machine, self.machine_id.as_str()),
            (mac_machine, self.mac_machine_id.as_str()),
            (dev_device, self.dev_device_id.as_str()),
            (sqm, self.sqm_id.as_str()),
        ]
    }
}

pub struct IdentityGenerator {
    source: EntropySource,
}

impl IdentityGenerator {
    pub fn new(source: EntropySource) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &EntropySource {
        &self.source
    }

    /// `n_bytes` random bytes as `2 * n_bytes` lowercase hex characters
    pub fn random_hex(&mut self, n_bytes: usize) -> String {
        let mut buf = vec![0u8; n_bytes];
        self.source.fill(&mut buf);
        hex::encode(buf)
    }

    /// Random UUID with the version nibble set to 4 and the RFC 4122 variant
    pub fn random_uuid_v4(&mut self) -> String {
        let mut bytes = [0u8; UUID_BYTES];
        self.source.fill(&mut bytes);
        Builder::from_random_bytes(bytes)
            .into_uuid()
            .hyphenated()
            .to_string()
    }

    /// A fresh set of mutually independent identifiers
    pub fn generate(&mut self) -> IdentitySet {
        let ids = IdentitySet {
            machine_id: self.random_hex(MACHINE_ID_BYTES),
            mac_machine_id: self.random_hex(MACHINE_ID_BYTES),
            dev_device_id: self.random_uuid_v4(),
            sqm_id: self.random_uuid_v4(),
        };
        info!(source = %self.source, "Generated new identifiers");
        ids
    }
}
