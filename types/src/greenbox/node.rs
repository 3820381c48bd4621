use bytes::{Buf, BufMut};
use commonware_codec::{Error, FixedSize, Read, ReadExt, Write};

use super::{Address, MAX_NODE_PERCENTAGE};

/// A one-time revenue-share binding. Created by `BuyNode`, never modified.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Node {
    pub node_id: u32,
    pub owner: Address,
    pub percentage: u8,
    pub amount_energy: u64,
}

impl Node {
    pub fn share(&self) -> NodeShare {
        NodeShare {
            node_id: self.node_id,
            owner: self.owner,
            percentage: self.percentage,
        }
    }
}

impl Write for Node {
    fn write(&self, writer: &mut impl BufMut) {
        self.node_id.write(writer);
        self.owner.write(writer);
        self.percentage.write(writer);
        self.amount_energy.write(writer);
    }
}

impl Read for Node {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let node_id = u32::read(reader)?;
        let owner = Address::read(reader)?;
        let percentage = u8::read(reader)?;
        if percentage > MAX_NODE_PERCENTAGE {
            return Err(Error::Invalid("Node", "percentage above 100"));
        }
        Ok(Self {
            node_id,
            owner,
            percentage,
            amount_energy: u64::read(reader)?,
        })
    }
}

impl FixedSize for Node {
    const SIZE: usize = u32::SIZE + Address::SIZE + u8::SIZE + u64::SIZE;
}

/// The node fields surfaced on purchase and reveal events of a node-bound domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeShare {
    pub node_id: u32,
    pub owner: Address,
    pub percentage: u8,
}

impl NodeShare {
    /// Splits `price` into `(to_owner, burned)`; the owner's part rounds down.
    pub fn split(&self, price: u64) -> (u64, u64) {
        let to_owner = (price as u128 * self.percentage as u128 / 100) as u64;
        (to_owner, price - to_owner)
    }
}

impl Write for NodeShare {
    fn write(&self, writer: &mut impl BufMut) {
        self.node_id.write(writer);
        self.owner.write(writer);
        self.percentage.write(writer);
    }
}

impl Read for NodeShare {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            node_id: u32::read(reader)?,
            owner: Address::read(reader)?,
            percentage: u8::read(reader)?,
        })
    }
}

impl FixedSize for NodeShare {
    const SIZE: usize = u32::SIZE + Address::SIZE + u8::SIZE;
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::Encode;

    #[test]
    fn split_rounds_owner_share_down() {
        let share = NodeShare {
            node_id: 0x12ABC,
            owner: Address([1u8; 20]),
            percentage: 20,
        };
        assert_eq!(share.split(12_300_000_000), (2_460_000_000, 9_840_000_000));
        assert_eq!(share.split(7), (1, 6));
        assert_eq!(share.split(0), (0, 0));
    }

    #[test]
    fn node_rejects_large_percentage() {
        let mut node = Node {
            node_id: 1,
            owner: Address([2u8; 20]),
            percentage: 100,
            amount_energy: 5,
        };
        let encoded = node.encode();
        assert_eq!(Node::read(&mut &encoded[..]).unwrap(), node);

        node.percentage = 101;
        let encoded = node.encode();
        assert!(Node::read(&mut &encoded[..]).is_err());
    }
}
