//! Energy-credit ledger records and the execution settings.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::ed25519::PublicKey;
use thiserror::Error as ThisError;

use super::{Address, DEFAULT_LOOKBACK, DEFAULT_REVEAL_BATCH};

/// Fungible assets a purchase can be paid with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Asset {
    /// The energy-credit payment token.
    Energy,
    /// Alternate credit selected by the seed-payment flag.
    Seed,
}

impl Write for Asset {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Energy => 0u8.write(writer),
            Self::Seed => 1u8.write(writer),
        }
    }
}

impl Read for Asset {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Energy),
            1 => Ok(Self::Seed),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for Asset {
    const SIZE: usize = u8::SIZE;
}

/// Endpoint of a balance movement. `Null` is the burn sink (and the mint source).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Party {
    Account(Address),
    LuckyFund,
    Null,
}

impl Write for Party {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Account(address) => {
                0u8.write(writer);
                address.write(writer);
            }
            Self::LuckyFund => 1u8.write(writer),
            Self::Null => 2u8.write(writer),
        }
    }
}

impl Read for Party {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Account(Address::read(reader)?)),
            1 => Ok(Self::LuckyFund),
            2 => Ok(Self::Null),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl EncodeSize for Party {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Account(_) => Address::SIZE,
                _ => 0,
            }
    }
}

/// Shared pool that funds manager-authorized purchases.
///
/// `balance == deposited - dropped` holds after every transaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LuckyFund {
    pub balance: u64,
    pub deposited: u64,
    pub dropped: u64,
}

impl LuckyFund {
    pub fn is_consistent(&self) -> bool {
        self.deposited.checked_sub(self.dropped) == Some(self.balance)
    }
}

impl Write for LuckyFund {
    fn write(&self, writer: &mut impl BufMut) {
        self.balance.write(writer);
        self.deposited.write(writer);
        self.dropped.write(writer);
    }
}

impl Read for LuckyFund {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            balance: u64::read(reader)?,
            deposited: u64::read(reader)?,
            dropped: u64::read(reader)?,
        })
    }
}

impl FixedSize for LuckyFund {
    const SIZE: usize = 3 * u64::SIZE;
}

#[derive(Clone, Copy, Debug, ThisError, PartialEq, Eq)]
pub enum SettingsError {
    #[error("reveal_delay must be at least 1")]
    ZeroRevealDelay,
    #[error("reveal_batch must be non-zero")]
    ZeroRevealBatch,
    #[error("lookback must be non-zero")]
    ZeroLookback,
}

/// Parameters injected into execution by the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Sender allowed to register domains, mint and recover overtime entries.
    pub owner: PublicKey,
    /// Key whose signatures authorize lucky purchases and node sales.
    pub manager: PublicKey,
    /// Blocks between a purchase and the block whose hash resolves it.
    pub reveal_delay: u64,
    /// Queue entries one `RevealBoxes` may process.
    pub reveal_batch: u32,
    /// How many recent block hashes the host keeps retrievable.
    pub lookback: u64,
}

impl Settings {
    pub fn new(owner: PublicKey, manager: PublicKey, reveal_delay: u64) -> Self {
        Self {
            owner,
            manager,
            reveal_delay,
            reveal_batch: DEFAULT_REVEAL_BATCH,
            lookback: DEFAULT_LOOKBACK,
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.reveal_delay == 0 {
            return Err(SettingsError::ZeroRevealDelay);
        }
        if self.reveal_batch == 0 {
            return Err(SettingsError::ZeroRevealBatch);
        }
        if self.lookback == 0 {
            return Err(SettingsError::ZeroLookback);
        }
        Ok(())
    }

    pub fn owner_address(&self) -> Address {
        Address::from_public(&self.owner)
    }
}

impl Write for Settings {
    fn write(&self, writer: &mut impl BufMut) {
        self.owner.write(writer);
        self.manager.write(writer);
        self.reveal_delay.write(writer);
        self.reveal_batch.write(writer);
        self.lookback.write(writer);
    }
}

impl Read for Settings {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let settings = Self {
            owner: PublicKey::read(reader)?,
            manager: PublicKey::read(reader)?,
            reveal_delay: u64::read(reader)?,
            reveal_batch: u32::read(reader)?,
            lookback: u64::read(reader)?,
        };
        settings.validate().map_err(|err| {
            Error::Invalid(
                "Settings",
                match err {
                    SettingsError::ZeroRevealDelay => "zero reveal delay",
                    SettingsError::ZeroRevealBatch => "zero reveal batch",
                    SettingsError::ZeroLookback => "zero lookback",
                },
            )
        })?;
        Ok(settings)
    }
}

impl FixedSize for Settings {
    const SIZE: usize = 2 * PublicKey::SIZE + u64::SIZE + u32::SIZE + u64::SIZE;
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::Encode;
    use commonware_cryptography::{ed25519::PrivateKey, Signer};

    fn settings() -> Settings {
        Settings::new(
            PrivateKey::from_seed(1).public_key(),
            PrivateKey::from_seed(2).public_key(),
            5,
        )
    }

    #[test]
    fn settings_validate() {
        let mut s = settings();
        assert!(s.validate().is_ok());
        s.reveal_delay = 0;
        assert_eq!(s.validate(), Err(SettingsError::ZeroRevealDelay));
        s.reveal_delay = 5;
        s.lookback = 0;
        assert_eq!(s.validate(), Err(SettingsError::ZeroLookback));
        assert_eq!(
            SettingsError::ZeroLookback.to_string(),
            "lookback must be non-zero"
        );
    }

    #[test]
    fn settings_decode_rejects_invalid() {
        let mut s = settings();
        let encoded = s.encode();
        assert_eq!(Settings::read(&mut &encoded[..]).unwrap(), s);

        s.reveal_batch = 0;
        let encoded = s.encode();
        assert!(matches!(
            Settings::read(&mut &encoded[..]),
            Err(Error::Invalid("Settings", "zero reveal batch"))
        ));
    }

    #[test]
    fn lucky_fund_consistency() {
        let fund = LuckyFund {
            balance: 70,
            deposited: 100,
            dropped: 30,
        };
        assert!(fund.is_consistent());
        assert!(!LuckyFund { balance: 71, ..fund }.is_consistent());
    }

    #[test]
    fn party_round_trips() {
        for party in [Party::Account(Address([3u8; 20])), Party::LuckyFund, Party::Null] {
            let encoded = party.encode();
            assert_eq!(encoded.len(), party.encode_size());
            assert_eq!(Party::read(&mut &encoded[..]).unwrap(), party);
        }
    }
}
