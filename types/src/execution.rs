use bytes::{Buf, BufMut};
use commonware_codec::{
    Encode, EncodeSize, Error, FixedSize, RangeCfg, Read, ReadExt, ReadRangeExt, Write,
};
use commonware_cryptography::{
    ed25519::{self, PublicKey},
    sha256::{Digest, Sha256},
    Digestible, Hasher, Signer, Verifier,
};
use commonware_utils::union;

use crate::greenbox::{
    read_bytes, read_reason, reason_encode_size, write_reason, Action, Address, Asset,
    CommitQueue, GiftReport, LuckyFund, Node, NodeShare, OvertimeSet, Party, Word256,
    MAX_INDEX_LENGTH, MAX_PIXELS_LENGTH, MAX_REASON_LENGTH, MAX_REVEAL_WITH_HASH,
};

pub const NAMESPACE: &[u8] = b"_GREENBOX";
pub const TRANSACTION_SUFFIX: &[u8] = b"_TX";
pub const MAX_BLOCK_TRANSACTIONS: usize = 500;

#[inline]
pub fn transaction_namespace(namespace: &[u8]) -> Vec<u8> {
    union(namespace, TRANSACTION_SUFFIX)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub nonce: u64,
    pub instruction: Instruction,

    pub public: ed25519::PublicKey,
    pub signature: ed25519::Signature,
}

impl Transaction {
    fn payload(nonce: &u64, instruction: &Instruction) -> Vec<u8> {
        let mut payload = Vec::new();
        nonce.write(&mut payload);
        instruction.write(&mut payload);

        payload
    }

    pub fn sign(private: &ed25519::PrivateKey, nonce: u64, instruction: Instruction) -> Self {
        let signature = private.sign(
            &transaction_namespace(NAMESPACE),
            &Self::payload(&nonce, &instruction),
        );

        Self {
            nonce,
            instruction,
            public: private.public_key(),
            signature,
        }
    }

    pub fn verify(&self) -> bool {
        self.public.verify(
            &transaction_namespace(NAMESPACE),
            &Self::payload(&self.nonce, &self.instruction),
            &self.signature,
        )
    }

    /// Address of the sender.
    pub fn sender(&self) -> Address {
        Address::from_public(&self.public)
    }
}

impl Write for Transaction {
    fn write(&self, writer: &mut impl BufMut) {
        self.nonce.write(writer);
        self.instruction.write(writer);
        self.public.write(writer);
        self.signature.write(writer);
    }
}

impl Read for Transaction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let nonce = u64::read(reader)?;
        let instruction = Instruction::read(reader)?;
        let public = ed25519::PublicKey::read(reader)?;
        let signature = ed25519::Signature::read(reader)?;

        Ok(Self {
            nonce,
            instruction,
            public,
            signature,
        })
    }
}

impl EncodeSize for Transaction {
    fn encode_size(&self) -> usize {
        self.nonce.encode_size()
            + self.instruction.encode_size()
            + self.public.encode_size()
            + self.signature.encode_size()
    }
}

impl Digestible for Transaction {
    type Digest = Digest;

    fn digest(&self) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update(self.nonce.to_be_bytes().as_ref());
        hasher.update(self.instruction.encode().as_ref());
        hasher.update(self.public.as_ref());
        // Any valid signature authorizes the same transaction.
        hasher.finalize()
    }
}

fn write_pixels(pixels: &Option<Vec<u8>>, writer: &mut impl BufMut) {
    match pixels {
        Some(pixels) => {
            true.write(writer);
            (pixels.len() as u32).write(writer);
            writer.put_slice(pixels);
        }
        None => false.write(writer),
    }
}

fn read_pixels(reader: &mut impl Buf) -> Result<Option<Vec<u8>>, Error> {
    if !bool::read(reader)? {
        return Ok(None);
    }
    Ok(Some(read_pixel_bytes(reader)?))
}

fn read_pixel_bytes(reader: &mut impl Buf) -> Result<Vec<u8>, Error> {
    let len = u32::read(reader)? as usize;
    if len > MAX_PIXELS_LENGTH {
        return Err(Error::Invalid("Pixels", "too long"));
    }
    read_bytes(reader, len)
}

fn pixels_encode_size(pixels: &Option<Vec<u8>>) -> usize {
    bool::SIZE + pixels.as_ref().map_or(0, |p| u32::SIZE + p.len())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    // Domain registry (tag 10)
    /// Owner only. `packed` carries raw per-10 000 chance/ratio values.
    /// Binary: [10] [domainId:u16] [packed:32] [resetSold:u8]
    RegisterDomain {
        domain_id: u16,
        packed: Word256,
        reset_sold: bool,
    },

    // Purchases (tags 11-13)
    /// Binary: [11] [domainId:u16] [boxAmount:u16] [hasPixels:u8] ([len:u32] [pixels...])
    MakeGreenBox {
        domain_id: u16,
        box_amount: u16,
        pixels: Option<Vec<u8>>,
    },

    /// Manager-signed purchase paid from the lucky fund on behalf of `beneficiary`.
    /// Binary: [12] [domainId:u16] [boxAmount:u16] [beneficiary:20] [nonce:u64] [deadline:u64] [sig:64]
    MakeGreenBoxLucky {
        domain_id: u16,
        box_amount: u16,
        beneficiary: Address,
        nonce: u64,
        deadline: u64,
        signature: ed25519::Signature,
    },

    /// Binary: [13] [nodeId:u32] [percentage:u8] [amountEnergy:u64] [nonce:u64] [deadline:u64] [sig:64]
    BuyNode {
        node_id: u32,
        percentage: u8,
        amount_energy: u64,
        nonce: u64,
        deadline: u64,
        signature: ed25519::Signature,
    },

    // Reveal engine (tags 14-15)
    /// Permissionless.
    /// Binary: [14]
    RevealBoxes,

    /// Owner only. Resolves overtime entries with externally archived hashes.
    /// Binary: [15] [ids:varint-len u32...] [hashes:varint-len digest...]
    RevealBoxesWithHash {
        action_ids: Vec<u32>,
        hashes: Vec<Digest>,
    },

    // Energy ledger (tags 16-18)
    /// Binary: [16] [amount:u64]
    DepositLuckyFund { amount: u64 },

    /// Owner only.
    /// Binary: [17] [asset:u8] [to:20] [amount:u64]
    Mint {
        asset: Asset,
        to: Address,
        amount: u64,
    },

    /// Binary: [18] [asset:u8] [to:20] [amount:u64]
    Transfer {
        asset: Asset,
        to: Address,
        amount: u64,
    },
}

impl Write for Instruction {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::RegisterDomain {
                domain_id,
                packed,
                reset_sold,
            } => {
                10u8.write(writer);
                domain_id.write(writer);
                packed.write(writer);
                reset_sold.write(writer);
            }
            Self::MakeGreenBox {
                domain_id,
                box_amount,
                pixels,
            } => {
                11u8.write(writer);
                domain_id.write(writer);
                box_amount.write(writer);
                write_pixels(pixels, writer);
            }
            Self::MakeGreenBoxLucky {
                domain_id,
                box_amount,
                beneficiary,
                nonce,
                deadline,
                signature,
            } => {
                12u8.write(writer);
                domain_id.write(writer);
                box_amount.write(writer);
                beneficiary.write(writer);
                nonce.write(writer);
                deadline.write(writer);
                signature.write(writer);
            }
            Self::BuyNode {
                node_id,
                percentage,
                amount_energy,
                nonce,
                deadline,
                signature,
            } => {
                13u8.write(writer);
                node_id.write(writer);
                percentage.write(writer);
                amount_energy.write(writer);
                nonce.write(writer);
                deadline.write(writer);
                signature.write(writer);
            }
            Self::RevealBoxes => 14u8.write(writer),
            Self::RevealBoxesWithHash { action_ids, hashes } => {
                15u8.write(writer);
                action_ids.write(writer);
                hashes.write(writer);
            }
            Self::DepositLuckyFund { amount } => {
                16u8.write(writer);
                amount.write(writer);
            }
            Self::Mint { asset, to, amount } => {
                17u8.write(writer);
                asset.write(writer);
                to.write(writer);
                amount.write(writer);
            }
            Self::Transfer { asset, to, amount } => {
                18u8.write(writer);
                asset.write(writer);
                to.write(writer);
                amount.write(writer);
            }
        }
    }
}

impl Read for Instruction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let instruction = match u8::read(reader)? {
            10 => Self::RegisterDomain {
                domain_id: u16::read(reader)?,
                packed: Word256::read(reader)?,
                reset_sold: bool::read(reader)?,
            },
            11 => Self::MakeGreenBox {
                domain_id: u16::read(reader)?,
                box_amount: u16::read(reader)?,
                pixels: read_pixels(reader)?,
            },
            12 => Self::MakeGreenBoxLucky {
                domain_id: u16::read(reader)?,
                box_amount: u16::read(reader)?,
                beneficiary: Address::read(reader)?,
                nonce: u64::read(reader)?,
                deadline: u64::read(reader)?,
                signature: ed25519::Signature::read(reader)?,
            },
            13 => Self::BuyNode {
                node_id: u32::read(reader)?,
                percentage: u8::read(reader)?,
                amount_energy: u64::read(reader)?,
                nonce: u64::read(reader)?,
                deadline: u64::read(reader)?,
                signature: ed25519::Signature::read(reader)?,
            },
            14 => Self::RevealBoxes,
            15 => Self::RevealBoxesWithHash {
                action_ids: Vec::<u32>::read_range(reader, 0..=MAX_REVEAL_WITH_HASH)?,
                hashes: Vec::<Digest>::read_range(reader, 0..=MAX_REVEAL_WITH_HASH)?,
            },
            16 => Self::DepositLuckyFund {
                amount: u64::read(reader)?,
            },
            17 => Self::Mint {
                asset: Asset::read(reader)?,
                to: Address::read(reader)?,
                amount: u64::read(reader)?,
            },
            18 => Self::Transfer {
                asset: Asset::read(reader)?,
                to: Address::read(reader)?,
                amount: u64::read(reader)?,
            },
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(instruction)
    }
}

impl EncodeSize for Instruction {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::RegisterDomain { .. } => u16::SIZE + Word256::SIZE + bool::SIZE,
                Self::MakeGreenBox { pixels, .. } => {
                    u16::SIZE + u16::SIZE + pixels_encode_size(pixels)
                }
                Self::MakeGreenBoxLucky { signature, .. } => {
                    u16::SIZE
                        + u16::SIZE
                        + Address::SIZE
                        + u64::SIZE
                        + u64::SIZE
                        + signature.encode_size()
                }
                Self::BuyNode { signature, .. } => {
                    u32::SIZE
                        + u8::SIZE
                        + u64::SIZE
                        + u64::SIZE
                        + u64::SIZE
                        + signature.encode_size()
                }
                Self::RevealBoxes => 0,
                Self::RevealBoxesWithHash { action_ids, hashes } => {
                    action_ids.encode_size() + hashes.encode_size()
                }
                Self::DepositLuckyFund { amount } => amount.encode_size(),
                Self::Mint { .. } | Self::Transfer { .. } => {
                    Asset::SIZE + Address::SIZE + u64::SIZE
                }
            }
    }
}

/// An ordered batch of transactions produced at `height`.
///
/// The block digest is also the block hash the reveal engine resolves actions with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub parent: Digest,

    pub height: u64,
    pub timestamp: u64,

    pub transactions: Vec<Transaction>,

    digest: Digest,
}

impl Block {
    fn compute_digest(
        parent: &Digest,
        height: u64,
        timestamp: u64,
        transactions: &[Transaction],
    ) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update(parent);
        hasher.update(&height.to_be_bytes());
        hasher.update(&timestamp.to_be_bytes());
        for transaction in transactions {
            hasher.update(&transaction.digest());
        }
        hasher.finalize()
    }

    pub fn new(
        parent: Digest,
        height: u64,
        timestamp: u64,
        transactions: Vec<Transaction>,
    ) -> Result<Self, Error> {
        if transactions.len() > MAX_BLOCK_TRANSACTIONS {
            return Err(Error::Invalid("Block", "too many transactions"));
        }
        let digest = Self::compute_digest(&parent, height, timestamp, &transactions);
        Ok(Self {
            parent,
            height,
            timestamp,
            transactions,
            digest,
        })
    }
}

/// The canonical genesis block.
pub fn genesis_block() -> Block {
    let parent = Sha256::hash(b"GREENBOX_GENESIS");
    let digest = Block::compute_digest(&parent, 0, 0, &[]);
    Block {
        parent,
        height: 0,
        timestamp: 0,
        transactions: Vec::new(),
        digest,
    }
}

impl Write for Block {
    fn write(&self, writer: &mut impl BufMut) {
        self.parent.write(writer);
        self.height.write(writer);
        self.timestamp.write(writer);
        self.transactions.write(writer);
    }
}

impl Read for Block {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let parent = Digest::read(reader)?;
        let height = u64::read(reader)?;
        let timestamp = u64::read(reader)?;
        let transactions = Vec::<Transaction>::read_cfg(
            reader,
            &(RangeCfg::from(0..=MAX_BLOCK_TRANSACTIONS), ()),
        )?;

        let digest = Self::compute_digest(&parent, height, timestamp, &transactions);
        Ok(Self {
            parent,
            height,
            timestamp,
            transactions,
            digest,
        })
    }
}

impl EncodeSize for Block {
    fn encode_size(&self) -> usize {
        self.parent.encode_size()
            + self.height.encode_size()
            + self.timestamp.encode_size()
            + self.transactions.encode_size()
    }
}

impl Digestible for Block {
    type Digest = Digest;

    fn digest(&self) -> Digest {
        self.digest
    }
}

/// Minimal account structure for transaction nonce tracking.
#[derive(Clone, Default, Eq, PartialEq, Debug)]
pub struct Account {
    pub nonce: u64,
}

impl Write for Account {
    fn write(&self, writer: &mut impl BufMut) {
        self.nonce.write(writer);
    }
}

impl Read for Account {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            nonce: u64::read(reader)?,
        })
    }
}

impl EncodeSize for Account {
    fn encode_size(&self) -> usize {
        self.nonce.encode_size()
    }
}

#[derive(Hash, Eq, PartialEq, Ord, PartialOrd, Clone, Debug)]
pub enum Key {
    /// Account for nonce tracking (tag 0)
    Account(PublicKey),
    /// Height of the last applied block (tag 1)
    Commit,

    // Registry keys (tags 10-18)
    Domain(u16),
    Action(u32),
    ActionCounter,
    RevealQueue,
    Overtime,
    UserActions(Address),
    DomainActions(u16),
    Node(u32),
    NodeIndex,

    // Ledger keys (tags 19-21)
    Balance(Asset, Address),
    LuckyFund,
    ManagerNonce(Address),
}

impl Write for Key {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Account(pk) => {
                0u8.write(writer);
                pk.write(writer);
            }
            Self::Commit => 1u8.write(writer),

            Self::Domain(id) => {
                10u8.write(writer);
                id.write(writer);
            }
            Self::Action(id) => {
                11u8.write(writer);
                id.write(writer);
            }
            Self::ActionCounter => 12u8.write(writer),
            Self::RevealQueue => 13u8.write(writer),
            Self::Overtime => 14u8.write(writer),
            Self::UserActions(address) => {
                15u8.write(writer);
                address.write(writer);
            }
            Self::DomainActions(id) => {
                16u8.write(writer);
                id.write(writer);
            }
            Self::Node(id) => {
                17u8.write(writer);
                id.write(writer);
            }
            Self::NodeIndex => 18u8.write(writer),

            Self::Balance(asset, address) => {
                19u8.write(writer);
                asset.write(writer);
                address.write(writer);
            }
            Self::LuckyFund => 20u8.write(writer),
            Self::ManagerNonce(address) => {
                21u8.write(writer);
                address.write(writer);
            }
        }
    }
}

impl Read for Key {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let key = match u8::read(reader)? {
            0 => Self::Account(PublicKey::read(reader)?),
            1 => Self::Commit,

            10 => Self::Domain(u16::read(reader)?),
            11 => Self::Action(u32::read(reader)?),
            12 => Self::ActionCounter,
            13 => Self::RevealQueue,
            14 => Self::Overtime,
            15 => Self::UserActions(Address::read(reader)?),
            16 => Self::DomainActions(u16::read(reader)?),
            17 => Self::Node(u32::read(reader)?),
            18 => Self::NodeIndex,

            19 => Self::Balance(Asset::read(reader)?, Address::read(reader)?),
            20 => Self::LuckyFund,
            21 => Self::ManagerNonce(Address::read(reader)?),

            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(key)
    }
}

impl EncodeSize for Key {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Account(_) => PublicKey::SIZE,
                Self::Commit => 0,

                Self::Domain(_) | Self::DomainActions(_) => u16::SIZE,
                Self::Action(_) | Self::Node(_) => u32::SIZE,
                Self::ActionCounter | Self::RevealQueue | Self::Overtime | Self::NodeIndex => 0,
                Self::UserActions(_) => Address::SIZE,

                Self::Balance(_, _) => Asset::SIZE + Address::SIZE,
                Self::LuckyFund => 0,
                Self::ManagerNonce(_) => Address::SIZE,
            }
    }
}

fn write_ids(ids: &[u32], writer: &mut impl BufMut) {
    (ids.len() as u32).write(writer);
    for id in ids {
        id.write(writer);
    }
}

fn read_ids(reader: &mut impl Buf) -> Result<Vec<u32>, Error> {
    let len = u32::read(reader)? as usize;
    if len > MAX_INDEX_LENGTH {
        return Err(Error::Invalid("ActionIds", "index too long"));
    }
    if reader.remaining() < len * u32::SIZE {
        return Err(Error::EndOfBuffer);
    }
    let mut ids = Vec::with_capacity(len);
    for _ in 0..len {
        ids.push(u32::read(reader)?);
    }
    Ok(ids)
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Value {
    /// Account for nonce tracking (tag 0)
    Account(Account),
    /// Height of the last applied block (tag 1)
    Commit { height: u64 },

    // Registry values (tags 10-17)
    /// Stored (cumulative) domain word including `boxesSold`.
    Domain(Word256),
    Action(Action),
    ActionCounter(u32),
    RevealQueue(CommitQueue),
    Overtime(OvertimeSet),
    /// Append-only id index, packed as 4-byte big-endian ids.
    ActionIds(Vec<u32>),
    Node(Node),

    // Ledger values (tags 19-21)
    Balance(u64),
    LuckyFund(LuckyFund),
    ManagerNonce(u64),
}

impl Write for Value {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Account(account) => {
                0u8.write(writer);
                account.write(writer);
            }
            Self::Commit { height } => {
                1u8.write(writer);
                height.write(writer);
            }

            Self::Domain(word) => {
                10u8.write(writer);
                word.write(writer);
            }
            Self::Action(action) => {
                11u8.write(writer);
                action.write(writer);
            }
            Self::ActionCounter(counter) => {
                12u8.write(writer);
                counter.write(writer);
            }
            Self::RevealQueue(queue) => {
                13u8.write(writer);
                queue.write(writer);
            }
            Self::Overtime(overtime) => {
                14u8.write(writer);
                overtime.write(writer);
            }
            Self::ActionIds(ids) => {
                15u8.write(writer);
                write_ids(ids, writer);
            }
            Self::Node(node) => {
                17u8.write(writer);
                node.write(writer);
            }

            Self::Balance(balance) => {
                19u8.write(writer);
                balance.write(writer);
            }
            Self::LuckyFund(fund) => {
                20u8.write(writer);
                fund.write(writer);
            }
            Self::ManagerNonce(nonce) => {
                21u8.write(writer);
                nonce.write(writer);
            }
        }
    }
}

impl Read for Value {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = match u8::read(reader)? {
            0 => Self::Account(Account::read(reader)?),
            1 => Self::Commit {
                height: u64::read(reader)?,
            },

            10 => Self::Domain(Word256::read(reader)?),
            11 => Self::Action(Action::read(reader)?),
            12 => Self::ActionCounter(u32::read(reader)?),
            13 => Self::RevealQueue(CommitQueue::read(reader)?),
            14 => Self::Overtime(OvertimeSet::read(reader)?),
            15 => Self::ActionIds(read_ids(reader)?),
            17 => Self::Node(Node::read(reader)?),

            19 => Self::Balance(u64::read(reader)?),
            20 => Self::LuckyFund(LuckyFund::read(reader)?),
            21 => Self::ManagerNonce(u64::read(reader)?),

            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(value)
    }
}

impl EncodeSize for Value {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Account(account) => account.encode_size(),
                Self::Commit { .. } => u64::SIZE,

                Self::Domain(_) => Word256::SIZE,
                Self::Action(action) => action.encode_size(),
                Self::ActionCounter(_) => u32::SIZE,
                Self::RevealQueue(queue) => queue.encode_size(),
                Self::Overtime(overtime) => overtime.encode_size(),
                Self::ActionIds(ids) => u32::SIZE + ids.len() * u32::SIZE,
                Self::Node(_) => Node::SIZE,

                Self::Balance(_) => u64::SIZE,
                Self::LuckyFund(_) => LuckyFund::SIZE,
                Self::ManagerNonce(_) => u64::SIZE,
            }
    }
}

/// Indexer fields shared by every purchase event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Greenized {
    pub actor: Address,
    pub action_id: u32,
    pub commit_block: u32,
    pub domain_id: u16,
    pub box_start: u32,
    pub box_amount: u16,
}

impl Write for Greenized {
    fn write(&self, writer: &mut impl BufMut) {
        self.actor.write(writer);
        self.action_id.write(writer);
        self.commit_block.write(writer);
        self.domain_id.write(writer);
        self.box_start.write(writer);
        self.box_amount.write(writer);
    }
}

impl Read for Greenized {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            actor: Address::read(reader)?,
            action_id: u32::read(reader)?,
            commit_block: u32::read(reader)?,
            domain_id: u16::read(reader)?,
            box_start: u32::read(reader)?,
            box_amount: u16::read(reader)?,
        })
    }
}

impl FixedSize for Greenized {
    const SIZE: usize =
        Address::SIZE + u32::SIZE + u32::SIZE + u16::SIZE + u32::SIZE + u16::SIZE;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // Registry events (tags 30-36)
    DomainRegistered {
        domain_id: u16,
        packed: Word256,
    },
    DomainGreenized(Greenized),
    DomainGreenizedWithPixels {
        greenized: Greenized,
        pixels: Vec<u8>,
    },
    DomainGreenizedNode {
        greenized: Greenized,
        node: NodeShare,
    },
    DomainGreenizedNodeWithPixels {
        greenized: Greenized,
        node: NodeShare,
        pixels: Vec<u8>,
    },
    DomainGreenizedLucky {
        greenized: Greenized,
        node: Option<NodeShare>,
        nonce: u64,
    },
    BuyNode {
        node_id: u32,
        buyer: Address,
        percentage: u8,
        amount_energy: u64,
    },

    // Reveal events (tags 37-38)
    BoxesRevealed(GiftReport),
    BoxesOvertime {
        action_id: u32,
        due_block: u64,
    },

    // Ledger events (tags 39-40)
    /// `to == Party::Null` is a burn; `from == Party::Null` is a mint.
    EnergyTransferred {
        asset: Asset,
        from: Party,
        to: Party,
        amount: u64,
    },
    LuckyFundDeposited {
        depositor: Address,
        amount: u64,
        fund: LuckyFund,
    },

    /// The transaction was rolled back (tag 49).
    Rejected {
        actor: Address,
        reason: String,
    },
}

impl Write for Event {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::DomainRegistered { domain_id, packed } => {
                30u8.write(writer);
                domain_id.write(writer);
                packed.write(writer);
            }
            Self::DomainGreenized(greenized) => {
                31u8.write(writer);
                greenized.write(writer);
            }
            Self::DomainGreenizedWithPixels { greenized, pixels } => {
                32u8.write(writer);
                greenized.write(writer);
                (pixels.len() as u32).write(writer);
                writer.put_slice(pixels);
            }
            Self::DomainGreenizedNode { greenized, node } => {
                33u8.write(writer);
                greenized.write(writer);
                node.write(writer);
            }
            Self::DomainGreenizedNodeWithPixels {
                greenized,
                node,
                pixels,
            } => {
                34u8.write(writer);
                greenized.write(writer);
                node.write(writer);
                (pixels.len() as u32).write(writer);
                writer.put_slice(pixels);
            }
            Self::DomainGreenizedLucky {
                greenized,
                node,
                nonce,
            } => {
                35u8.write(writer);
                greenized.write(writer);
                node.write(writer);
                nonce.write(writer);
            }
            Self::BuyNode {
                node_id,
                buyer,
                percentage,
                amount_energy,
            } => {
                36u8.write(writer);
                node_id.write(writer);
                buyer.write(writer);
                percentage.write(writer);
                amount_energy.write(writer);
            }
            Self::BoxesRevealed(report) => {
                37u8.write(writer);
                report.write(writer);
            }
            Self::BoxesOvertime {
                action_id,
                due_block,
            } => {
                38u8.write(writer);
                action_id.write(writer);
                due_block.write(writer);
            }
            Self::EnergyTransferred {
                asset,
                from,
                to,
                amount,
            } => {
                39u8.write(writer);
                asset.write(writer);
                from.write(writer);
                to.write(writer);
                amount.write(writer);
            }
            Self::LuckyFundDeposited {
                depositor,
                amount,
                fund,
            } => {
                40u8.write(writer);
                depositor.write(writer);
                amount.write(writer);
                fund.write(writer);
            }
            Self::Rejected { actor, reason } => {
                49u8.write(writer);
                actor.write(writer);
                write_reason(reason, writer);
            }
        }
    }
}

impl Read for Event {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let event = match u8::read(reader)? {
            30 => Self::DomainRegistered {
                domain_id: u16::read(reader)?,
                packed: Word256::read(reader)?,
            },
            31 => Self::DomainGreenized(Greenized::read(reader)?),
            32 => Self::DomainGreenizedWithPixels {
                greenized: Greenized::read(reader)?,
                pixels: read_pixel_bytes(reader)?,
            },
            33 => Self::DomainGreenizedNode {
                greenized: Greenized::read(reader)?,
                node: NodeShare::read(reader)?,
            },
            34 => Self::DomainGreenizedNodeWithPixels {
                greenized: Greenized::read(reader)?,
                node: NodeShare::read(reader)?,
                pixels: read_pixel_bytes(reader)?,
            },
            35 => Self::DomainGreenizedLucky {
                greenized: Greenized::read(reader)?,
                node: Option::<NodeShare>::read(reader)?,
                nonce: u64::read(reader)?,
            },
            36 => Self::BuyNode {
                node_id: u32::read(reader)?,
                buyer: Address::read(reader)?,
                percentage: u8::read(reader)?,
                amount_energy: u64::read(reader)?,
            },
            37 => Self::BoxesRevealed(GiftReport::read(reader)?),
            38 => Self::BoxesOvertime {
                action_id: u32::read(reader)?,
                due_block: u64::read(reader)?,
            },
            39 => Self::EnergyTransferred {
                asset: Asset::read(reader)?,
                from: Party::read(reader)?,
                to: Party::read(reader)?,
                amount: u64::read(reader)?,
            },
            40 => Self::LuckyFundDeposited {
                depositor: Address::read(reader)?,
                amount: u64::read(reader)?,
                fund: LuckyFund::read(reader)?,
            },
            49 => Self::Rejected {
                actor: Address::read(reader)?,
                reason: read_reason(reader, MAX_REASON_LENGTH)?,
            },
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(event)
    }
}

impl EncodeSize for Event {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::DomainRegistered { .. } => u16::SIZE + Word256::SIZE,
                Self::DomainGreenized(_) => Greenized::SIZE,
                Self::DomainGreenizedWithPixels { pixels, .. } => {
                    Greenized::SIZE + u32::SIZE + pixels.len()
                }
                Self::DomainGreenizedNode { .. } => Greenized::SIZE + NodeShare::SIZE,
                Self::DomainGreenizedNodeWithPixels { pixels, .. } => {
                    Greenized::SIZE + NodeShare::SIZE + u32::SIZE + pixels.len()
                }
                Self::DomainGreenizedLucky { node, .. } => {
                    Greenized::SIZE + node.encode_size() + u64::SIZE
                }
                Self::BuyNode { .. } => u32::SIZE + Address::SIZE + u8::SIZE + u64::SIZE,
                Self::BoxesRevealed(report) => report.encode_size(),
                Self::BoxesOvertime { .. } => u32::SIZE + u64::SIZE,
                Self::EnergyTransferred { from, to, .. } => {
                    Asset::SIZE + from.encode_size() + to.encode_size() + u64::SIZE
                }
                Self::LuckyFundDeposited { .. } => Address::SIZE + u64::SIZE + LuckyFund::SIZE,
                Self::Rejected { reason, .. } => Address::SIZE + reason_encode_size(reason),
            }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Event(Event),
    Transaction(Transaction),
    Commit { height: u64, start: u64 },
}

impl Write for Output {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Event(event) => {
                0u8.write(writer);
                event.write(writer);
            }
            Self::Transaction(transaction) => {
                1u8.write(writer);
                transaction.write(writer);
            }
            Self::Commit { height, start } => {
                2u8.write(writer);
                height.write(writer);
                start.write(writer);
            }
        }
    }
}

impl Read for Output {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let kind = u8::read(reader)?;
        match kind {
            0 => Ok(Self::Event(Event::read(reader)?)),
            1 => Ok(Self::Transaction(Transaction::read(reader)?)),
            2 => Ok(Self::Commit {
                height: u64::read(reader)?,
                start: u64::read(reader)?,
            }),
            _ => Err(Error::InvalidEnum(kind)),
        }
    }
}

impl EncodeSize for Output {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::Event(event) => event.encode_size(),
            Self::Transaction(transaction) => transaction.encode_size(),
            Self::Commit { height, start } => height.encode_size() + start.encode_size(),
        }
    }
}
