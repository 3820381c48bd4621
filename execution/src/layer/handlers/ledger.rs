use super::super::*;
use greenbox_types::greenbox::{Address, Asset, LuckyFund, Party};
use tracing::info;

impl<'a, S: State> Layer<'a, S> {
    pub(in crate::layer) async fn handle_deposit_lucky_fund(
        &mut self,
        public: &PublicKey,
        amount: u64,
    ) -> Result<Vec<Event>, GreenboxError> {
        let depositor = Address::from_public(public);
        let transfer = self
            .move_balance(
                Asset::Energy,
                Party::Account(depositor),
                Party::LuckyFund,
                amount,
            )
            .await?;
        let fund = match self.get(&Key::LuckyFund).await? {
            Some(Value::LuckyFund(fund)) => fund,
            _ => LuckyFund::default(),
        };

        info!(%depositor, amount, balance = fund.balance, "lucky fund deposit");
        Ok(vec![
            transfer,
            Event::LuckyFundDeposited {
                depositor,
                amount,
                fund,
            },
        ])
    }

    pub(in crate::layer) async fn handle_mint(
        &mut self,
        public: &PublicKey,
        asset: Asset,
        to: Address,
        amount: u64,
    ) -> Result<Vec<Event>, GreenboxError> {
        self.require_owner(public)?;
        Ok(vec![
            self.move_balance(asset, Party::Null, Party::Account(to), amount)
                .await?,
        ])
    }

    pub(in crate::layer) async fn handle_transfer(
        &mut self,
        public: &PublicKey,
        asset: Asset,
        to: Address,
        amount: u64,
    ) -> Result<Vec<Event>, GreenboxError> {
        let from = Address::from_public(public);
        Ok(vec![
            self.move_balance(asset, Party::Account(from), Party::Account(to), amount)
                .await?,
        ])
    }
}
