use anyhow::{Context as _, Result};
use commonware_cryptography::ed25519::PublicKey;
use greenbox_types::{
    execution::{Event, Instruction, Key, Output, Transaction, Value},
    greenbox::Settings,
};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::GreenboxError;
use crate::hash_window::{BlockContext, BlockHashWindow};
use crate::state::{load_account, validate_and_increment_nonce, PrepareError, State, Status};

mod handlers;

/// Transactional overlay over a [`State`] for one block.
///
/// Writes are buffered in `pending` and only reach the backing state through
/// [`Layer::commit`]. Each transaction runs against a checkpoint of the overlay taken
/// after its nonce bump; a rejected transaction restores that checkpoint.
pub struct Layer<'a, S: State> {
    state: &'a S,
    pending: BTreeMap<Key, Status>,

    settings: &'a Settings,
    context: BlockContext,
    hashes: &'a BlockHashWindow,
}

impl<'a, S: State> Layer<'a, S> {
    pub fn new(
        state: &'a S,
        settings: &'a Settings,
        context: BlockContext,
        hashes: &'a BlockHashWindow,
    ) -> Self {
        Self {
            state,
            pending: BTreeMap::new(),

            settings,
            context,
            hashes,
        }
    }

    fn insert(&mut self, key: Key, value: Value) {
        self.pending.insert(key, Status::Update(value));
    }

    pub fn context(&self) -> BlockContext {
        self.context
    }

    async fn prepare(&mut self, transaction: &Transaction) -> Result<(), PrepareError> {
        let mut account = load_account(self, &transaction.public)
            .await
            .map_err(PrepareError::State)?;
        validate_and_increment_nonce(&mut account, transaction.nonce)?;
        self.insert(
            Key::Account(transaction.public.clone()),
            Value::Account(account),
        );

        Ok(())
    }

    async fn apply(&mut self, transaction: &Transaction) -> Result<Vec<Event>, GreenboxError> {
        let public = &transaction.public;

        match &transaction.instruction {
            Instruction::RegisterDomain {
                domain_id,
                packed,
                reset_sold,
            } => {
                self.handle_register_domain(public, *domain_id, packed, *reset_sold)
                    .await
            }
            Instruction::MakeGreenBox {
                domain_id,
                box_amount,
                pixels,
            } => {
                self.handle_make_green_box(public, *domain_id, *box_amount, pixels.clone())
                    .await
            }
            Instruction::MakeGreenBoxLucky {
                domain_id,
                box_amount,
                beneficiary,
                nonce,
                deadline,
                signature,
            } => {
                self.handle_make_green_box_lucky(
                    *domain_id,
                    *box_amount,
                    *beneficiary,
                    *nonce,
                    *deadline,
                    signature,
                )
                .await
            }
            Instruction::BuyNode {
                node_id,
                percentage,
                amount_energy,
                nonce,
                deadline,
                signature,
            } => {
                self.handle_buy_node(
                    public,
                    *node_id,
                    *percentage,
                    *amount_energy,
                    *nonce,
                    *deadline,
                    signature,
                )
                .await
            }
            Instruction::RevealBoxes => self.handle_reveal_boxes().await,
            Instruction::RevealBoxesWithHash { action_ids, hashes } => {
                self.handle_reveal_boxes_with_hash(public, action_ids, hashes)
                    .await
            }
            Instruction::DepositLuckyFund { amount } => {
                self.handle_deposit_lucky_fund(public, *amount).await
            }
            Instruction::Mint { asset, to, amount } => {
                self.handle_mint(public, *asset, *to, *amount).await
            }
            Instruction::Transfer { asset, to, amount } => {
                self.handle_transfer(public, *asset, *to, *amount).await
            }
        }
    }

    pub async fn execute(
        &mut self,
        transactions: Vec<Transaction>,
    ) -> Result<(Vec<Output>, BTreeMap<PublicKey, u64>)> {
        let mut processed_nonces = BTreeMap::new();
        let mut outputs = Vec::new();

        for tx in transactions {
            if !tx.verify() {
                debug!(public = ?tx.public, "invalid signature; dropping transaction");
                continue;
            }
            match self.prepare(&tx).await {
                Ok(()) => {}
                Err(PrepareError::NonceMismatch { expected, got }) => {
                    debug!(
                        public = ?tx.public,
                        expected,
                        got,
                        "nonce mismatch; dropping transaction"
                    );
                    continue;
                }
                Err(PrepareError::State(err)) => {
                    return Err(err).context("state error during prepare");
                }
            }
            processed_nonces.insert(tx.public.clone(), tx.nonce.saturating_add(1));

            let checkpoint = self.pending.clone();
            match self.apply(&tx).await {
                Ok(events) => outputs.extend(events.into_iter().map(Output::Event)),
                Err(GreenboxError::State(err)) => {
                    return Err(err).context("state error during apply");
                }
                Err(err) => {
                    self.pending = checkpoint;
                    debug!(
                        public = ?tx.public,
                        height = self.context.height,
                        reason = %err,
                        "transaction rejected"
                    );
                    outputs.push(Output::Event(Event::Rejected {
                        actor: tx.sender(),
                        reason: err.to_string(),
                    }));
                }
            }
            outputs.push(Output::Transaction(tx));
        }

        Ok((outputs, processed_nonces))
    }

    pub fn commit(self) -> Vec<(Key, Status)> {
        self.pending.into_iter().collect()
    }
}

impl<'a, S: State> State for Layer<'a, S> {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        Ok(match self.pending.get(key) {
            Some(Status::Update(value)) => Some(value.clone()),
            Some(Status::Delete) => None,
            None => self.state.get(key).await?,
        })
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.pending.insert(key, Status::Update(value));
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.pending.insert(key.clone(), Status::Delete);
        Ok(())
    }
}
