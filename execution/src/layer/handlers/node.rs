use super::super::*;
use commonware_cryptography::ed25519::Signature;
use greenbox_types::greenbox::{
    Address, Asset, ManagerCommand, Node, Party, MAX_NODE_ID, MAX_NODE_PERCENTAGE,
};
use tracing::info;

impl<'a, S: State> Layer<'a, S> {
    #[allow(clippy::too_many_arguments)]
    pub(in crate::layer) async fn handle_buy_node(
        &mut self,
        public: &PublicKey,
        node_id: u32,
        percentage: u8,
        amount_energy: u64,
        nonce: u64,
        deadline: u64,
        signature: &Signature,
    ) -> Result<Vec<Event>, GreenboxError> {
        if self.load_node(node_id).await?.is_some() {
            return Err(GreenboxError::NodeSold);
        }
        if percentage > MAX_NODE_PERCENTAGE {
            return Err(GreenboxError::WrongPercentage);
        }
        if node_id > MAX_NODE_ID {
            return Err(GreenboxError::WrongNodeId);
        }

        let buyer = Address::from_public(public);
        let command = ManagerCommand::BuyNode {
            buyer,
            node_id,
            percentage,
            amount_energy,
        };
        self.verify_manager_command(&command, nonce, deadline, signature)
            .await?;

        let mut events = Vec::new();
        if amount_energy > 0 {
            events.push(
                self.move_balance(
                    Asset::Energy,
                    Party::Account(buyer),
                    Party::Null,
                    amount_energy,
                )
                .await?,
            );
        }

        self.insert(
            Key::Node(node_id),
            Value::Node(Node {
                node_id,
                owner: buyer,
                percentage,
                amount_energy,
            }),
        );
        self.append_index(Key::NodeIndex, node_id).await?;

        info!(node_id, %buyer, percentage, amount_energy, "node bought");
        events.push(Event::BuyNode {
            node_id,
            buyer,
            percentage,
            amount_energy,
        });
        Ok(events)
    }
}
