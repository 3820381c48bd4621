use super::*;
use commonware_cryptography::ed25519::Signature;
use greenbox_types::greenbox::{
    Address, Asset, CommitQueue, DomainConfig, LuckyFund, ManagerCommand, Node, OvertimeSet,
    Party,
};

mod domain;
mod ledger;
mod node;
mod purchase;
mod reveal;

impl<'a, S: State> Layer<'a, S> {
    pub(in crate::layer) fn require_owner(&self, public: &PublicKey) -> Result<(), GreenboxError> {
        if *public != self.settings.owner {
            return Err(GreenboxError::NotOwner);
        }
        Ok(())
    }

    pub(in crate::layer) async fn load_domain(
        &self,
        domain_id: u16,
    ) -> Result<Option<DomainConfig>, GreenboxError> {
        Ok(match self.get(&Key::Domain(domain_id)).await? {
            Some(Value::Domain(word)) => Some(DomainConfig::from_word(&word)),
            _ => None,
        })
    }

    pub(in crate::layer) fn store_domain(&mut self, domain_id: u16, config: &DomainConfig) {
        self.insert(Key::Domain(domain_id), Value::Domain(config.to_word()));
    }

    pub(in crate::layer) async fn load_node(&self, node_id: u32) -> Result<Option<Node>> {
        Ok(match self.get(&Key::Node(node_id)).await? {
            Some(Value::Node(node)) => Some(node),
            _ => None,
        })
    }

    pub(in crate::layer) async fn load_queue(&self) -> Result<CommitQueue> {
        Ok(match self.get(&Key::RevealQueue).await? {
            Some(Value::RevealQueue(queue)) => queue,
            _ => CommitQueue::default(),
        })
    }

    pub(in crate::layer) async fn load_overtime(&self) -> Result<OvertimeSet> {
        Ok(match self.get(&Key::Overtime).await? {
            Some(Value::Overtime(overtime)) => overtime,
            _ => OvertimeSet::default(),
        })
    }

    /// Appends `id` to an append-only id index.
    pub(in crate::layer) async fn append_index(&mut self, key: Key, id: u32) -> Result<()> {
        let mut ids = match self.get(&key).await? {
            Some(Value::ActionIds(ids)) => ids,
            _ => Vec::new(),
        };
        ids.push(id);
        self.insert(key, Value::ActionIds(ids));
        Ok(())
    }

    async fn balance_of(&self, asset: Asset, address: Address) -> Result<u64> {
        Ok(match self.get(&Key::Balance(asset, address)).await? {
            Some(Value::Balance(balance)) => balance,
            _ => 0,
        })
    }

    async fn lucky_fund(&self) -> Result<LuckyFund> {
        Ok(match self.get(&Key::LuckyFund).await? {
            Some(Value::LuckyFund(fund)) => fund,
            _ => LuckyFund::default(),
        })
    }

    /// Moves `amount` of `asset` between two parties and returns the transfer event.
    ///
    /// `Party::Null` mints when it is the source and burns when it is the destination.
    /// The lucky fund only holds energy.
    pub(in crate::layer) async fn move_balance(
        &mut self,
        asset: Asset,
        from: Party,
        to: Party,
        amount: u64,
    ) -> Result<Event, GreenboxError> {
        match from {
            Party::Account(address) => {
                let balance = self.balance_of(asset, address).await?;
                let remaining = balance
                    .checked_sub(amount)
                    .ok_or(GreenboxError::InsufficientBalance)?;
                self.insert(Key::Balance(asset, address), Value::Balance(remaining));
            }
            Party::LuckyFund => {
                let mut fund = self.lucky_fund().await?;
                fund.balance = fund
                    .balance
                    .checked_sub(amount)
                    .ok_or(GreenboxError::InsufficientLuckyFund)?;
                fund.dropped = fund
                    .dropped
                    .checked_add(amount)
                    .ok_or(GreenboxError::BalanceOverflow)?;
                self.insert(Key::LuckyFund, Value::LuckyFund(fund));
            }
            Party::Null => {}
        }

        match to {
            Party::Account(address) => {
                let balance = self.balance_of(asset, address).await?;
                let updated = balance
                    .checked_add(amount)
                    .ok_or(GreenboxError::BalanceOverflow)?;
                self.insert(Key::Balance(asset, address), Value::Balance(updated));
            }
            Party::LuckyFund => {
                let mut fund = self.lucky_fund().await?;
                fund.balance = fund
                    .balance
                    .checked_add(amount)
                    .ok_or(GreenboxError::BalanceOverflow)?;
                fund.deposited = fund
                    .deposited
                    .checked_add(amount)
                    .ok_or(GreenboxError::BalanceOverflow)?;
                self.insert(Key::LuckyFund, Value::LuckyFund(fund));
            }
            Party::Null => {}
        }

        Ok(Event::EnergyTransferred {
            asset,
            from,
            to,
            amount,
        })
    }

    /// Checks a manager-signed command and consumes the subject's nonce.
    ///
    /// Order: deadline, then nonce, then signature.
    pub(in crate::layer) async fn verify_manager_command(
        &mut self,
        command: &ManagerCommand,
        nonce: u64,
        deadline: u64,
        signature: &Signature,
    ) -> Result<(), GreenboxError> {
        if deadline < self.context.timestamp {
            return Err(GreenboxError::ExpiredDeadline);
        }

        let subject = command.subject();
        let key = Key::ManagerNonce(subject);
        let expected = match self.get(&key).await? {
            Some(Value::ManagerNonce(nonce)) => nonce,
            _ => 0,
        };
        if nonce != expected {
            return Err(GreenboxError::NonceNotMatch);
        }

        if !command.verify(&self.settings.manager, nonce, deadline, signature) {
            return Err(GreenboxError::WrongSignature);
        }

        self.insert(key, Value::ManagerNonce(expected + 1));
        Ok(())
    }
}
