//! Manager-signed commands.
//!
//! Every signature-gated instruction carries a [`ManagerCommand`] body, a nonce and an
//! absolute deadline. The manager signs `tag || fields || nonce || deadline` under
//! [`MANAGER_NAMESPACE`]; execution checks the deadline, then the per-subject nonce,
//! then the signature, and consumes the nonce on success.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::{
    ed25519::{PrivateKey, PublicKey, Signature},
    Signer, Verifier,
};

use super::Address;

pub const MANAGER_NAMESPACE: &[u8] = b"_GREENBOX_MANAGER";

/// Operation fields covered by a manager signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManagerCommand {
    Lucky {
        domain_id: u16,
        box_amount: u16,
        beneficiary: Address,
    },
    BuyNode {
        buyer: Address,
        node_id: u32,
        percentage: u8,
        amount_energy: u64,
    },
}

impl ManagerCommand {
    /// Address whose nonce the command consumes.
    pub fn subject(&self) -> Address {
        match self {
            Self::Lucky { beneficiary, .. } => *beneficiary,
            Self::BuyNode { buyer, .. } => *buyer,
        }
    }

    pub fn payload(&self, nonce: u64, deadline: u64) -> Vec<u8> {
        let mut payload = Vec::with_capacity(self.encode_size() + 2 * u64::SIZE);
        self.write(&mut payload);
        nonce.write(&mut payload);
        deadline.write(&mut payload);
        payload
    }

    pub fn sign(&self, manager: &PrivateKey, nonce: u64, deadline: u64) -> Signature {
        manager.sign(MANAGER_NAMESPACE, &self.payload(nonce, deadline))
    }

    pub fn verify(
        &self,
        manager: &PublicKey,
        nonce: u64,
        deadline: u64,
        signature: &Signature,
    ) -> bool {
        manager.verify(
            MANAGER_NAMESPACE,
            &self.payload(nonce, deadline),
            signature,
        )
    }
}

impl Write for ManagerCommand {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Lucky {
                domain_id,
                box_amount,
                beneficiary,
            } => {
                0u8.write(writer);
                domain_id.write(writer);
                box_amount.write(writer);
                beneficiary.write(writer);
            }
            Self::BuyNode {
                buyer,
                node_id,
                percentage,
                amount_energy,
            } => {
                1u8.write(writer);
                buyer.write(writer);
                node_id.write(writer);
                percentage.write(writer);
                amount_energy.write(writer);
            }
        }
    }
}

impl Read for ManagerCommand {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Lucky {
                domain_id: u16::read(reader)?,
                box_amount: u16::read(reader)?,
                beneficiary: Address::read(reader)?,
            }),
            1 => Ok(Self::BuyNode {
                buyer: Address::read(reader)?,
                node_id: u32::read(reader)?,
                percentage: u8::read(reader)?,
                amount_energy: u64::read(reader)?,
            }),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl EncodeSize for ManagerCommand {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Lucky { .. } => u16::SIZE + u16::SIZE + Address::SIZE,
                Self::BuyNode { .. } => Address::SIZE + u32::SIZE + u8::SIZE + u64::SIZE,
            }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lucky() -> ManagerCommand {
        ManagerCommand::Lucky {
            domain_id: 1,
            box_amount: 10,
            beneficiary: Address([4u8; 20]),
        }
    }

    #[test]
    fn signature_binds_fields_nonce_and_deadline() {
        let manager = PrivateKey::from_seed(7);
        let public = manager.public_key();
        let command = lucky();
        let signature = command.sign(&manager, 0, 100);

        assert!(command.verify(&public, 0, 100, &signature));
        assert!(!command.verify(&public, 1, 100, &signature));
        assert!(!command.verify(&public, 0, 101, &signature));

        let other = ManagerCommand::Lucky {
            domain_id: 1,
            box_amount: 11,
            beneficiary: Address([4u8; 20]),
        };
        assert!(!other.verify(&public, 0, 100, &signature));

        let stranger = PrivateKey::from_seed(8).public_key();
        assert!(!command.verify(&stranger, 0, 100, &signature));
    }

    #[test]
    fn subject_follows_command_kind() {
        assert_eq!(lucky().subject(), Address([4u8; 20]));
        let buy = ManagerCommand::BuyNode {
            buyer: Address([9u8; 20]),
            node_id: 0x12ABC,
            percentage: 20,
            amount_energy: 1_000_000,
        };
        assert_eq!(buy.subject(), Address([9u8; 20]));
        assert_eq!(buy.payload(0, 0).len(), buy.encode_size() + 16);
    }
}
