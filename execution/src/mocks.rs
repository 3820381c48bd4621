use crate::{
    state_transition::{execute_state_transition, StateTransitionResult},
    BlockContext, BlockHashWindow, Memory,
};
use commonware_cryptography::{
    ed25519::{PrivateKey, PublicKey, Signature},
    sha256::{Digest, Sha256},
    Digestible, Hasher, Signer,
};
use greenbox_types::{
    execution::{genesis_block, Block, Event, Instruction, Output, Transaction},
    greenbox::{Address, DomainConfig, ManagerCommand, Settings, Word256},
};

/// Seconds between mock blocks.
pub const BLOCK_INTERVAL: u64 = 1;

/// Creates an account keypair for Ed25519 signatures used by users
pub fn create_account_keypair(seed: u64) -> (PrivateKey, PublicKey) {
    let private = PrivateKey::from_seed(seed);
    let public = private.public_key();
    (private, public)
}

/// Creates settings with a fixed owner and manager, returning their private keys.
pub fn create_settings(reveal_delay: u64) -> (Settings, PrivateKey, PrivateKey) {
    let (owner, owner_public) = create_account_keypair(0);
    let (manager, manager_public) = create_account_keypair(1);
    (
        Settings::new(owner_public, manager_public, reveal_delay),
        owner,
        manager,
    )
}

/// Synthetic hash of block `height` for windows built without a chain.
pub fn block_hash(height: u64) -> Digest {
    Sha256::hash(&height.to_be_bytes())
}

/// A window filled with [`block_hash`] values up to and including `through_height`.
pub fn create_window(settings: &Settings, through_height: u64) -> BlockHashWindow {
    let mut window = BlockHashWindow::new(settings.lookback).expect("non-zero lookback");
    let start = through_height.saturating_sub(settings.lookback - 1);
    for height in start..=through_height {
        window
            .push(height, block_hash(height))
            .expect("contiguous heights");
    }
    window
}

/// Raw registration word from per-10 000 chances and ratios.
pub fn raw_domain_word(box_top: u32, chances: [u16; 4], ratios: [u16; 4], decimal: u8) -> Word256 {
    DomainConfig {
        box_top,
        chances,
        ratios,
        decimal,
        ..Default::default()
    }
    .to_word()
}

/// Raw registration word bound to `node_id`.
pub fn raw_node_domain_word(box_top: u32, chances: [u16; 4], decimal: u8, node_id: u32) -> Word256 {
    DomainConfig {
        box_top,
        chances,
        decimal,
        node_bound: true,
        node_id,
        ..Default::default()
    }
    .to_word()
}

/// Builds a manager-approved lucky purchase.
pub fn lucky_instruction(
    manager: &PrivateKey,
    domain_id: u16,
    box_amount: u16,
    beneficiary: Address,
    nonce: u64,
    deadline: u64,
) -> Instruction {
    let signature = ManagerCommand::Lucky {
        domain_id,
        box_amount,
        beneficiary,
    }
    .sign(manager, nonce, deadline);
    Instruction::MakeGreenBoxLucky {
        domain_id,
        box_amount,
        beneficiary,
        nonce,
        deadline,
        signature,
    }
}

/// Builds a manager-approved node purchase for `buyer`.
pub fn buy_node_instruction(
    manager: &PrivateKey,
    buyer: &PublicKey,
    node_id: u32,
    percentage: u8,
    amount_energy: u64,
    nonce: u64,
    deadline: u64,
) -> Instruction {
    let signature: Signature = ManagerCommand::BuyNode {
        buyer: Address::from_public(buyer),
        node_id,
        percentage,
        amount_energy,
    }
    .sign(manager, nonce, deadline);
    Instruction::BuyNode {
        node_id,
        percentage,
        amount_energy,
        nonce,
        deadline,
        signature,
    }
}

/// An in-memory chain driving [`execute_state_transition`] block by block.
///
/// Every produced block's digest is pushed into the window and the archive, so the
/// window always ends at the previous block when the next one executes.
pub struct Harness {
    pub state: Memory,
    pub settings: Settings,
    pub window: BlockHashWindow,
    pub owner: PrivateKey,
    pub manager: PrivateKey,
    /// Digest of every block by height, genesis included.
    pub archive: Vec<Digest>,
    parent: Digest,
}

impl Harness {
    pub fn new(reveal_delay: u64) -> Self {
        let (settings, owner, manager) = create_settings(reveal_delay);
        Self::with_settings(settings, owner, manager)
    }

    pub fn with_settings(settings: Settings, owner: PrivateKey, manager: PrivateKey) -> Self {
        let genesis = genesis_block();
        let mut window = BlockHashWindow::new(settings.lookback).expect("non-zero lookback");
        window.push(0, genesis.digest()).expect("first push");
        Self {
            state: Memory::default(),
            settings,
            window,
            owner,
            manager,
            archive: vec![genesis.digest()],
            parent: genesis.digest(),
        }
    }

    /// Height the next block will have.
    pub fn next_height(&self) -> u64 {
        self.archive.len() as u64
    }

    pub fn timestamp(height: u64) -> u64 {
        height * BLOCK_INTERVAL
    }

    /// Hash of an already produced block.
    pub fn hash(&self, height: u64) -> Digest {
        self.archive[height as usize]
    }

    /// Signs each instruction with the sender's current nonce and executes them as one block.
    pub async fn block(&mut self, instructions: Vec<(&PrivateKey, Instruction)>) -> Vec<Output> {
        let mut nonces = std::collections::BTreeMap::new();
        let mut transactions = Vec::with_capacity(instructions.len());
        for (signer, instruction) in instructions {
            let public = signer.public_key();
            let nonce = match nonces.get(&public) {
                Some(nonce) => *nonce,
                None => crate::nonce(&self.state, &public).await.expect("nonce"),
            };
            nonces.insert(public, nonce + 1);
            transactions.push(Transaction::sign(signer, nonce, instruction));
        }
        self.execute(transactions).await.outputs
    }

    /// Executes pre-signed transactions as the next block.
    pub async fn execute(&mut self, transactions: Vec<Transaction>) -> StateTransitionResult {
        let height = self.next_height();
        let timestamp = Self::timestamp(height);
        let block = Block::new(self.parent, height, timestamp, transactions.clone())
            .expect("valid block");
        let result = execute_state_transition(
            &mut self.state,
            &self.settings,
            &self.window,
            BlockContext::new(height, timestamp),
            transactions,
        )
        .await
        .expect("state transition");

        let digest = block.digest();
        self.window.push(height, digest).expect("contiguous heights");
        self.archive.push(digest);
        self.parent = digest;
        result
    }

    /// Produces `count` empty blocks.
    pub async fn skip(&mut self, count: u64) {
        for _ in 0..count {
            self.execute(Vec::new()).await;
        }
    }
}

/// Events of an output list, in order.
pub fn events(outputs: &[Output]) -> Vec<&Event> {
    outputs
        .iter()
        .filter_map(|output| match output {
            Output::Event(event) => Some(event),
            _ => None,
        })
        .collect()
}

/// Rejection reasons of an output list, in order.
pub fn rejections(outputs: &[Output]) -> Vec<&str> {
    events(outputs)
        .into_iter()
        .filter_map(|event| match event {
            Event::Rejected { reason, .. } => Some(reason.as_str()),
            _ => None,
        })
        .collect()
}
