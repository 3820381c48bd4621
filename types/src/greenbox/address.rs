use bytes::{Buf, BufMut};
use commonware_codec::{Error, FixedSize, Read, Write};
use commonware_cryptography::{
    ed25519::PublicKey,
    sha256::Sha256,
    Hasher,
};
use commonware_utils::hex;
use std::fmt;

use super::read_bytes;

/// Length of an account address in bytes (160 bits).
pub const ADDRESS_LENGTH: usize = 20;

/// Account identifier used by balances, indexes and the packed action word.
///
/// Derived as the last 20 bytes of `sha256(public_key)`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; ADDRESS_LENGTH]);

impl Address {
    pub fn from_public(public: &PublicKey) -> Self {
        let digest = Sha256::hash(public.as_ref());
        let mut out = [0u8; ADDRESS_LENGTH];
        out.copy_from_slice(&digest.0[32 - ADDRESS_LENGTH..]);
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }
}

impl From<&PublicKey> for Address {
    fn from(public: &PublicKey) -> Self {
        Self::from_public(public)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Write for Address {
    fn write(&self, writer: &mut impl BufMut) {
        writer.put_slice(&self.0);
    }
}

impl Read for Address {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let bytes = read_bytes(reader, ADDRESS_LENGTH)?;
        let mut out = [0u8; ADDRESS_LENGTH];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl FixedSize for Address {
    const SIZE: usize = ADDRESS_LENGTH;
}
