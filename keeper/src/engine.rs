use crate::{chain::Chain, DomainPlan, PurchasePlan, ValidatedConfig};
use anyhow::{anyhow, Result};
use commonware_cryptography::{ed25519::PrivateKey, sha256::Digest, Signer};
use greenbox_execution::{nonce, views};
use greenbox_types::{
    execution::{Event, Instruction, Output, Transaction},
    greenbox::{
        calculate_gifts, Address, Asset, DomainConfig, GiftReport, ManagerCommand,
        MAX_REVEAL_WITH_HASH,
    },
};
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

/// Seconds a manager approval stays valid.
const APPROVAL_TTL: u64 = 60;

/// Totals reported once the run ends.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub blocks: u64,
    pub purchases: u64,
    pub rejected: u64,
    pub revealed: u64,
    pub overtime: u64,
    pub recovered: u64,
    pub wins: u64,
    /// Reveals whose emitted outcome did not match the off-chain replay.
    pub mismatches: u64,
}

pub struct Engine {
    owner: PrivateKey,
    manager: PrivateKey,
    blocks: u64,
    reveal_every: u64,
    buyer_energy: u64,
    lucky_fund: u64,
    domains: Vec<DomainPlan>,
    purchases: Vec<PurchasePlan>,

    /// Buyer keys by seed.
    buyers: BTreeMap<u64, PrivateKey>,
    chain: Chain,
    summary: Summary,
}

impl Engine {
    pub fn new(config: ValidatedConfig) -> Result<Self> {
        let buyers = config
            .purchases
            .iter()
            .map(|purchase| (purchase.buyer, PrivateKey::from_seed(purchase.buyer)))
            .collect();
        Ok(Self {
            owner: config.owner,
            manager: config.manager,
            blocks: config.blocks,
            reveal_every: config.reveal_every.get(),
            buyer_energy: config.buyer_energy,
            lucky_fund: config.lucky_fund,
            domains: config.domains,
            purchases: config.purchases,
            buyers,
            chain: Chain::new(config.settings)?,
            summary: Summary::default(),
        })
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Signs `instructions` with consecutive nonces per sender, starting from committed state.
    async fn sign(
        &self,
        instructions: Vec<(&PrivateKey, Instruction)>,
    ) -> Result<Vec<Transaction>> {
        let mut nonces = BTreeMap::new();
        let mut transactions = Vec::with_capacity(instructions.len());
        for (signer, instruction) in instructions {
            let public = signer.public_key();
            let next = match nonces.get(&public) {
                Some(next) => *next,
                None => nonce(&self.chain.store, &public).await?,
            };
            nonces.insert(public, next + 1);
            transactions.push(Transaction::sign(signer, next, instruction));
        }
        Ok(transactions)
    }

    async fn submit(&mut self, transactions: Vec<Transaction>) -> Result<Vec<Output>> {
        let outputs = self.chain.produce(transactions).await?;
        self.summary.blocks += 1;
        self.inspect(&outputs).await?;
        Ok(outputs)
    }

    /// Tallies events and replays every reveal off-chain.
    async fn inspect(&mut self, outputs: &[Output]) -> Result<()> {
        for output in outputs {
            let Output::Event(event) = output else {
                continue;
            };
            match event {
                Event::DomainGreenized(_)
                | Event::DomainGreenizedWithPixels { .. }
                | Event::DomainGreenizedNode { .. }
                | Event::DomainGreenizedNodeWithPixels { .. }
                | Event::DomainGreenizedLucky { .. } => self.summary.purchases += 1,
                Event::BoxesOvertime {
                    action_id,
                    due_block,
                } => {
                    warn!(action_id, due_block, "action moved to overtime");
                    self.summary.overtime += 1;
                }
                Event::BoxesRevealed(report) => {
                    if report.recovered {
                        self.summary.recovered += 1;
                    } else {
                        self.summary.revealed += 1;
                    }
                    self.summary.wins += report.outcome.total_wins() as u64;
                    if !self.verify(report).await? {
                        self.summary.mismatches += 1;
                    }
                }
                Event::Rejected { actor, reason } => {
                    warn!(%actor, %reason, "transaction rejected");
                    self.summary.rejected += 1;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Recomputes a reveal from the archived due-block hash and the tiers the action was
    /// sold under.
    async fn verify(&self, report: &GiftReport) -> Result<bool> {
        let due_block = report.green.commit_block as u64 + self.chain.settings().reveal_delay;
        let expected_hash = self
            .chain
            .hash(due_block)
            .ok_or_else(|| anyhow!("no archived hash for block {due_block}"))?;
        if expected_hash != report.hash {
            error!(
                action_id = report.action_id,
                due_block, "revealed hash differs from archive"
            );
            return Ok(false);
        }

        let action = views::action(&self.chain.store, report.action_id)
            .await?
            .ok_or_else(|| anyhow!("revealed action {} is not stored", report.action_id))?;
        let outcome = calculate_gifts(
            &action.boundaries,
            report.action_id,
            report.green.boxes(),
            &report.hash,
        );
        if outcome != report.outcome || action.node != report.node {
            error!(
                action_id = report.action_id,
                "off-chain replay differs from emitted outcome"
            );
            return Ok(false);
        }
        let stored = views::check_gifts(&self.chain.store, report.action_id).await?;
        if stored.as_ref() != Some(report) {
            error!(
                action_id = report.action_id,
                "stored reveal differs from emitted report"
            );
            return Ok(false);
        }
        debug!(
            action_id = report.action_id,
            wins = outcome.total_wins(),
            "reveal verified"
        );
        Ok(true)
    }

    /// Registers domains, funds buyers and the lucky fund.
    async fn bootstrap(&mut self) -> Result<()> {
        let owner = self.owner.clone();
        let mut instructions = Vec::new();
        for domain in &self.domains {
            let packed = DomainConfig {
                box_top: domain.box_top,
                chances: domain.chances,
                ratios: domain.ratios,
                decimal: domain.decimal,
                ..Default::default()
            }
            .to_word();
            instructions.push((
                &owner,
                Instruction::RegisterDomain {
                    domain_id: domain.domain_id,
                    packed,
                    reset_sold: false,
                },
            ));
        }
        for buyer in self.buyers.values() {
            instructions.push((
                &owner,
                Instruction::Mint {
                    asset: Asset::Energy,
                    to: Address::from_public(&buyer.public_key()),
                    amount: self.buyer_energy,
                },
            ));
        }
        if self.lucky_fund > 0 {
            instructions.push((
                &owner,
                Instruction::Mint {
                    asset: Asset::Energy,
                    to: Address::from_public(&owner.public_key()),
                    amount: self.lucky_fund,
                },
            ));
            instructions.push((
                &owner,
                Instruction::DepositLuckyFund {
                    amount: self.lucky_fund,
                },
            ));
        }

        let transactions = self.sign(instructions).await?;
        self.submit(transactions).await?;
        info!(
            domains = self.domains.len(),
            buyers = self.buyers.len(),
            "bootstrapped"
        );
        Ok(())
    }

    async fn manager_nonces(&self) -> Result<BTreeMap<Address, u64>> {
        let mut nonces = BTreeMap::new();
        for purchase in self.purchases.iter().filter(|purchase| purchase.lucky) {
            if let Some(buyer) = self.buyers.get(&purchase.buyer) {
                let address = Address::from_public(&buyer.public_key());
                let next = views::manager_nonce(&self.chain.store, address).await?;
                nonces.insert(address, next);
            }
        }
        Ok(nonces)
    }

    /// Purchases scheduled for `height`.
    async fn purchases_at(&self, height: u64) -> Result<Vec<Transaction>> {
        let timestamp = Chain::timestamp(height);
        let mut manager_nonces = self.manager_nonces().await?;
        let mut instructions = Vec::new();
        for purchase in &self.purchases {
            if height % purchase.every != 0 {
                continue;
            }
            let Some(buyer) = self.buyers.get(&purchase.buyer) else {
                continue;
            };
            if !purchase.lucky {
                instructions.push((
                    buyer,
                    Instruction::MakeGreenBox {
                        domain_id: purchase.domain_id,
                        box_amount: purchase.boxes,
                        pixels: None,
                    },
                ));
                continue;
            }

            let beneficiary = Address::from_public(&buyer.public_key());
            let next = manager_nonces.entry(beneficiary).or_default();
            let deadline = timestamp + APPROVAL_TTL;
            let signature = ManagerCommand::Lucky {
                domain_id: purchase.domain_id,
                box_amount: purchase.boxes,
                beneficiary,
            }
            .sign(&self.manager, *next, deadline);
            instructions.push((
                &self.owner,
                Instruction::MakeGreenBoxLucky {
                    domain_id: purchase.domain_id,
                    box_amount: purchase.boxes,
                    beneficiary,
                    nonce: *next,
                    deadline,
                    signature,
                },
            ));
            *next += 1;
        }
        self.sign(instructions).await
    }

    /// Submits `RevealBoxes` until the queue stops moving, then recovers overtime.
    async fn drain(&mut self) -> Result<()> {
        let mut last = views::queue_status(&self.chain.store).await?;
        loop {
            let owner = self.owner.clone();
            let transactions = self.sign(vec![(&owner, Instruction::RevealBoxes)]).await?;
            self.submit(transactions).await?;

            let status = views::queue_status(&self.chain.store).await?;
            if status == last {
                break;
            }
            last = status;
        }

        let overtime = views::overtime_entries(&self.chain.store).await?;
        if overtime.is_empty() {
            return Ok(());
        }
        for chunk in overtime.chunks(MAX_REVEAL_WITH_HASH) {
            let mut action_ids = Vec::with_capacity(chunk.len());
            let mut hashes: Vec<Digest> = Vec::with_capacity(chunk.len());
            for entry in chunk {
                let hash = self
                    .chain
                    .hash(entry.due_block)
                    .ok_or_else(|| anyhow!("no archived hash for block {}", entry.due_block))?;
                action_ids.push(entry.action_id);
                hashes.push(hash);
            }
            info!(count = action_ids.len(), "recovering overtime actions");
            let owner = self.owner.clone();
            let transactions = self
                .sign(vec![(
                    &owner,
                    Instruction::RevealBoxesWithHash { action_ids, hashes },
                )])
                .await?;
            self.submit(transactions).await?;
        }
        Ok(())
    }

    /// Produces `blocks` blocks following the plan and drains the queue at the end.
    pub async fn run(mut self) -> Result<Summary> {
        self.bootstrap().await?;
        while self.chain.next_height() <= self.blocks {
            let height = self.chain.next_height();
            if height % self.reveal_every == 0 {
                self.drain().await?;
                continue;
            }
            let transactions = self.purchases_at(height).await?;
            self.submit(transactions).await?;
        }

        // Let the last purchases come due before the final drain.
        for _ in 0..=self.chain.settings().reveal_delay {
            self.submit(Vec::new()).await?;
        }
        self.drain().await?;

        let status = views::queue_status(&self.chain.store).await?;
        info!(
            blocks = self.summary.blocks,
            purchases = self.summary.purchases,
            revealed = self.summary.revealed,
            recovered = self.summary.recovered,
            pending = status.pending,
            overtime = status.overtime,
            mismatches = self.summary.mismatches,
            "run complete"
        );
        Ok(self.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greenbox_types::greenbox::Settings;
    use std::num::NonZeroU64;
    use tracing::Level;

    fn config(reveal_every: u64, lookback: u64) -> ValidatedConfig {
        let owner = PrivateKey::from_seed(0);
        let manager = PrivateKey::from_seed(1);
        let mut settings = Settings::new(owner.public_key(), manager.public_key(), 3);
        settings.lookback = lookback;
        ValidatedConfig {
            owner,
            manager,
            settings,
            blocks: 30,
            reveal_every: NonZeroU64::new(reveal_every).unwrap(),
            buyer_energy: 1_000_000,
            lucky_fund: 10_000,
            log_level: Level::INFO,
            domains: vec![DomainPlan {
                domain_id: 1,
                box_top: 10_000,
                chances: [15, 200, 1000, 0],
                ratios: [500, 1500, 0, 0],
                decimal: 2,
            }],
            purchases: vec![
                PurchasePlan {
                    buyer: 10,
                    domain_id: 1,
                    boxes: 40,
                    every: 2,
                    lucky: false,
                },
                PurchasePlan {
                    buyer: 11,
                    domain_id: 1,
                    boxes: 5,
                    every: 3,
                    lucky: true,
                },
            ],
        }
    }

    #[tokio::test]
    async fn reveals_everything_with_matching_replays() {
        let summary = Engine::new(config(5, 256)).unwrap().run().await.unwrap();
        assert!(summary.purchases > 0);
        assert_eq!(summary.revealed, summary.purchases);
        assert_eq!(summary.overtime, 0);
        assert_eq!(summary.mismatches, 0);
        assert_eq!(summary.rejected, 0);
    }

    #[tokio::test]
    async fn recovers_actions_that_fell_out_of_the_window() {
        // A window shorter than the reveal cadence forces overtime.
        let summary = Engine::new(config(20, 4)).unwrap().run().await.unwrap();
        assert!(summary.overtime > 0);
        assert_eq!(summary.recovered, summary.overtime);
        assert_eq!(summary.revealed + summary.recovered, summary.purchases);
        assert_eq!(summary.mismatches, 0);
    }
}
