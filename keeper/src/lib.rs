//! Local greenbox keeper.
//!
//! Runs an in-memory chain against the execution layer, submits the configured purchase
//! plan, keeps the reveal queue drained and recovers overtime actions from its own block
//! archive. Every revealed outcome is replayed off-chain and compared with the emitted one.

use commonware_codec::DecodeExt;
use commonware_cryptography::{ed25519::PrivateKey, Signer};
use commonware_utils::{from_hex_formatted, hex};
use greenbox_types::greenbox::{
    Settings, SettingsError, DEFAULT_LOOKBACK, DEFAULT_REVEAL_BATCH, MAX_DECIMAL,
};
use serde::{Deserialize, Serialize};
use std::{fmt, num::NonZeroU64, str::FromStr};
use thiserror::Error;
use tracing::Level;

pub mod chain;
pub mod engine;

#[derive(Clone, PartialEq, Eq)]
pub struct HexBytes(Vec<u8>);

impl HexBytes {
    pub fn from_hex_formatted(value: &str) -> Option<Self> {
        from_hex_formatted(value).map(Self)
    }
}

impl AsRef<[u8]> for HexBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for HexBytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex(self.as_ref()))
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        let bytes = from_hex_formatted(&value)
            .ok_or_else(|| serde::de::Error::custom("expected a hex string"))?;
        Ok(Self(bytes))
    }
}

/// A domain registered in the first block. Chances and ratios are parts per 10 000.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct DomainPlan {
    pub domain_id: u16,
    pub box_top: u32,
    pub chances: [u16; 4],
    pub ratios: [u16; 4],
    pub decimal: u8,
}

/// A recurring purchase: `boxes` boxes on `domain_id` every `every` blocks.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PurchasePlan {
    /// Seed of the buyer's ed25519 key.
    pub buyer: u64,
    pub domain_id: u16,
    pub boxes: u16,
    pub every: u64,
    /// Paid from the lucky fund under a manager signature instead of by the buyer.
    #[serde(default)]
    pub lucky: bool,
}

/// Configuration for the [engine::Engine].
#[derive(Deserialize, Serialize)]
pub struct Config {
    pub owner_private_key: HexBytes,
    pub manager_private_key: HexBytes,

    pub reveal_delay: u64,
    #[serde(default = "default_reveal_batch")]
    pub reveal_batch: u32,
    #[serde(default = "default_lookback")]
    pub lookback: u64,

    pub blocks: u64,
    pub reveal_every: u64,
    /// Energy minted to every buyer before the first purchase.
    pub buyer_energy: u64,
    #[serde(default)]
    pub lucky_fund: u64,

    pub log_level: String,

    pub domains: Vec<DomainPlan>,
    pub purchases: Vec<PurchasePlan>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} is invalid: {value}")]
    InvalidDecode {
        field: &'static str,
        value: String,
        #[source]
        source: commonware_codec::Error,
    },
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("{field} must be > 0 (got {value})")]
    InvalidNonZero { field: &'static str, value: u64 },
    #[error("invalid settings: {0}")]
    InvalidSettings(#[from] SettingsError),
    #[error("domain {domain_id}: decimal {decimal} exceeds {max}")]
    InvalidDecimal { domain_id: u16, decimal: u8, max: u8 },
    #[error("purchase on unknown domain {domain_id}")]
    UnknownDomain { domain_id: u16 },
}

pub struct ValidatedConfig {
    pub owner: PrivateKey,
    pub manager: PrivateKey,
    pub settings: Settings,

    pub blocks: u64,
    pub reveal_every: NonZeroU64,
    pub buyer_energy: u64,
    pub lucky_fund: u64,
    pub log_level: Level,

    pub domains: Vec<DomainPlan>,
    pub purchases: Vec<PurchasePlan>,
}

struct RedactedConfig<'a>(&'a Config);

impl fmt::Debug for RedactedConfig<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cfg = self.0;
        f.debug_struct("Config")
            .field("owner_private_key", &"<redacted>")
            .field("manager_private_key", &"<redacted>")
            .field("reveal_delay", &cfg.reveal_delay)
            .field("reveal_batch", &cfg.reveal_batch)
            .field("lookback", &cfg.lookback)
            .field("blocks", &cfg.blocks)
            .field("reveal_every", &cfg.reveal_every)
            .field("buyer_energy", &cfg.buyer_energy)
            .field("lucky_fund", &cfg.lucky_fund)
            .field("log_level", &cfg.log_level)
            .field("domains", &cfg.domains)
            .field("purchases", &cfg.purchases)
            .finish()
    }
}

fn default_reveal_batch() -> u32 {
    DEFAULT_REVEAL_BATCH
}

fn default_lookback() -> u64 {
    DEFAULT_LOOKBACK
}

fn decode_key(field: &'static str, value: &HexBytes) -> Result<PrivateKey, ConfigError> {
    PrivateKey::decode(value.as_ref()).map_err(|source| ConfigError::InvalidDecode {
        field,
        value: "<redacted>".to_string(),
        source,
    })
}

fn nonzero_u64(field: &'static str, value: u64) -> Result<NonZeroU64, ConfigError> {
    NonZeroU64::new(value).ok_or(ConfigError::InvalidNonZero { field, value })
}

impl Config {
    pub fn redacted_debug(&self) -> impl fmt::Debug + '_ {
        RedactedConfig(self)
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        let owner = decode_key("owner_private_key", &self.owner_private_key)?;
        let manager = decode_key("manager_private_key", &self.manager_private_key)?;

        let mut settings = Settings::new(owner.public_key(), manager.public_key(), self.reveal_delay);
        settings.reveal_batch = self.reveal_batch;
        settings.lookback = self.lookback;
        settings.validate()?;

        let reveal_every = nonzero_u64("reveal_every", self.reveal_every)?;
        nonzero_u64("blocks", self.blocks)?;
        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;

        for domain in &self.domains {
            if domain.decimal > MAX_DECIMAL {
                return Err(ConfigError::InvalidDecimal {
                    domain_id: domain.domain_id,
                    decimal: domain.decimal,
                    max: MAX_DECIMAL,
                });
            }
        }
        for purchase in &self.purchases {
            nonzero_u64("purchases.every", purchase.every)?;
            if !self
                .domains
                .iter()
                .any(|domain| domain.domain_id == purchase.domain_id)
            {
                return Err(ConfigError::UnknownDomain {
                    domain_id: purchase.domain_id,
                });
            }
        }

        Ok(ValidatedConfig {
            owner,
            manager,
            settings,
            blocks: self.blocks,
            reveal_every,
            buyer_energy: self.buyer_energy,
            lucky_fund: self.lucky_fund,
            log_level,
            domains: self.domains,
            purchases: self.purchases,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::Encode;

    fn key_hex(seed: u64) -> String {
        hex(&PrivateKey::from_seed(seed).encode())
    }

    fn yaml(reveal_every: u64, log_level: &str, purchase_domain: u16) -> String {
        format!(
            r#"
owner_private_key: "{owner}"
manager_private_key: "{manager}"
reveal_delay: 5
blocks: 40
reveal_every: {reveal_every}
buyer_energy: 100000000000
log_level: "{log_level}"
domains:
  - domain_id: 1
    box_top: 200000
    chances: [15, 200, 1000, 0]
    ratios: [500, 1500, 0, 0]
    decimal: 8
purchases:
  - buyer: 10
    domain_id: {purchase_domain}
    boxes: 12
    every: 3
"#,
            owner = key_hex(0),
            manager = key_hex(1),
        )
    }

    #[test]
    fn parses_and_validates() {
        let config: Config = serde_yaml::from_str(&yaml(4, "info", 1)).unwrap();
        let debug = format!("{:?}", config.redacted_debug());
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains(&key_hex(0)));

        let validated = config.validate().unwrap();
        assert_eq!(validated.settings.reveal_delay, 5);
        assert_eq!(validated.settings.reveal_batch, DEFAULT_REVEAL_BATCH);
        assert_eq!(validated.settings.lookback, DEFAULT_LOOKBACK);
        assert_eq!(validated.log_level, Level::INFO);
        assert_eq!(validated.reveal_every.get(), 4);
        assert!(!validated.purchases[0].lucky);
    }

    #[test]
    fn rejects_bad_values() {
        let config: Config = serde_yaml::from_str(&yaml(0, "info", 1)).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidNonZero {
                field: "reveal_every",
                ..
            })
        ));

        let config: Config = serde_yaml::from_str(&yaml(4, "loud", 1)).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel { .. })
        ));

        let mut config: Config = serde_yaml::from_str(&yaml(4, "info", 1)).unwrap();
        config.lookback = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSettings(SettingsError::ZeroLookback))
        ));

        let config: Config = serde_yaml::from_str(&yaml(4, "info", 7)).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownDomain { domain_id: 7 })
        ));
    }
}
