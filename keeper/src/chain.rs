//! In-memory chain: a key-value store, the bounded hash window handed to execution and a
//! full archive of block digests and outputs.

use anyhow::{anyhow, Context as _, Result};
use commonware_cryptography::{sha256::Digest, Digestible};
use greenbox_execution::{
    state_transition::execute_state_transition, BlockContext, BlockHashWindow, State,
};
use greenbox_types::{
    execution::{genesis_block, Block, Key, Output, Transaction, Value},
    greenbox::Settings,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Unix seconds of block 0.
pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

/// Seconds between blocks.
pub const BLOCK_TIME: u64 = 2;

#[derive(Default)]
pub struct Store {
    values: BTreeMap<Key, Value>,
}

impl Store {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl State for Store {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        Ok(self.values.get(key).cloned())
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.values.insert(key, value);
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

pub struct Chain {
    pub store: Store,
    settings: Settings,
    window: BlockHashWindow,
    archive: Vec<Digest>,
    outputs: Vec<Output>,
}

impl Chain {
    pub fn new(settings: Settings) -> Result<Self> {
        let genesis = genesis_block();
        let mut window = BlockHashWindow::new(settings.lookback).context("create hash window")?;
        window
            .push(0, genesis.digest())
            .context("push genesis hash")?;
        Ok(Self {
            store: Store::default(),
            settings,
            window,
            archive: vec![genesis.digest()],
            outputs: Vec::new(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Height the next produced block will have.
    pub fn next_height(&self) -> u64 {
        self.archive.len() as u64
    }

    pub fn timestamp(height: u64) -> u64 {
        GENESIS_TIMESTAMP + height * BLOCK_TIME
    }

    /// Archived digest of a produced block.
    pub fn hash(&self, height: u64) -> Option<Digest> {
        self.archive.get(usize::try_from(height).ok()?).copied()
    }

    /// Every output appended so far, each block closed by an [`Output::Commit`].
    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Builds, executes and archives the next block. Returns the block's outputs.
    pub async fn produce(&mut self, transactions: Vec<Transaction>) -> Result<Vec<Output>> {
        let height = self.next_height();
        let timestamp = Self::timestamp(height);
        let parent = *self
            .archive
            .last()
            .ok_or_else(|| anyhow!("archive missing genesis"))?;
        let block = Block::new(parent, height, timestamp, transactions.clone())
            .map_err(|err| anyhow!("build block {height}: {err}"))?;

        let result = execute_state_transition(
            &mut self.store,
            &self.settings,
            &self.window,
            BlockContext::new(height, timestamp),
            transactions,
        )
        .await
        .with_context(|| format!("execute block {height}"))?;

        let digest = block.digest();
        self.window
            .push(height, digest)
            .with_context(|| format!("push hash of block {height}"))?;
        self.archive.push(digest);

        let start = self.outputs.len() as u64;
        self.outputs.extend(result.outputs.iter().cloned());
        self.outputs.push(Output::Commit { height, start });
        debug!(height, outputs = result.outputs.len(), "block produced");
        Ok(result.outputs)
    }
}
