use super::super::*;
use commonware_cryptography::{ed25519::Signature, sha256::Digest};
use greenbox_types::{
    execution::Greenized,
    greenbox::{
        Action, ActionStatus, Address, Asset, DomainConfig, GreenAction, ManagerCommand,
        NodeShare, Party, QueueEntry, BOX_AMOUNT_MASK, SEED_PAYMENT_FLAG,
    },
};
use tracing::info;

/// A validated purchase that has not touched state yet.
struct Reservation {
    domain: DomainConfig,
    boxes: u16,
    price: u64,
    node: Option<NodeShare>,
}

impl<'a, S: State> Layer<'a, S> {
    /// Validates a purchase of `box_amount` on `domain_id` against the stored config.
    async fn reserve(
        &self,
        domain_id: u16,
        box_amount: u16,
    ) -> Result<Reservation, GreenboxError> {
        let domain = match self.load_domain(domain_id).await? {
            Some(domain) if domain.box_top != 0 => domain,
            _ => return Err(GreenboxError::EmptyDomain),
        };
        let boxes = box_amount & BOX_AMOUNT_MASK;
        if boxes == 0 {
            return Err(GreenboxError::ZeroBoxes);
        }
        if boxes as u32 > domain.remaining() {
            return Err(GreenboxError::OverLimit);
        }
        let price = domain
            .price(boxes)
            .ok_or(GreenboxError::PriceOverflow)?;
        let node = match domain.node() {
            Some(node_id) => Some(
                self.load_node(node_id)
                    .await?
                    .ok_or(GreenboxError::NodeNotExist)?
                    .share(),
            ),
            None => None,
        };

        Ok(Reservation {
            domain,
            boxes,
            price,
            node,
        })
    }

    /// Pays for a reservation: the node owner's share is transferred, the rest burned.
    async fn settle_payment(
        &mut self,
        asset: Asset,
        payer: Party,
        reservation: &Reservation,
    ) -> Result<Vec<Event>, GreenboxError> {
        let (to_owner, burned) = match &reservation.node {
            Some(node) => node.split(reservation.price),
            None => (0, reservation.price),
        };

        let mut events = Vec::new();
        if let Some(node) = &reservation.node {
            if to_owner > 0 {
                events.push(
                    self.move_balance(asset, payer, Party::Account(node.owner), to_owner)
                        .await?,
                );
            }
        }
        if burned > 0 {
            events.push(self.move_balance(asset, payer, Party::Null, burned).await?);
        }
        Ok(events)
    }

    /// Allocates the next action id, advances the domain counter, indexes the action and
    /// enqueues it for reveal.
    async fn record_action(
        &mut self,
        domain_id: u16,
        box_amount: u16,
        actor: Address,
        mut reservation: Reservation,
    ) -> Result<Greenized, GreenboxError> {
        let action_id = match self.get(&Key::ActionCounter).await? {
            Some(Value::ActionCounter(counter)) => counter,
            _ => 0,
        }
        .checked_add(1)
        .ok_or(GreenboxError::ActionOverflow)?;
        let commit_block =
            u32::try_from(self.context.height).map_err(|_| GreenboxError::HeightOverflow)?;
        let due_block = self
            .context
            .height
            .checked_add(self.settings.reveal_delay)
            .ok_or(GreenboxError::HeightOverflow)?;

        let boundaries = reservation.domain.boundaries();
        let box_start = reservation.domain.boxes_sold;
        reservation.domain.boxes_sold += reservation.boxes as u32;
        self.store_domain(domain_id, &reservation.domain);

        let green = GreenAction {
            commit_block,
            domain_id,
            box_start,
            box_amount,
            actor,
        };
        self.insert(Key::ActionCounter, Value::ActionCounter(action_id));
        self.insert(
            Key::Action(action_id),
            Value::Action(Action {
                action_id,
                green,
                boundaries,
                node: reservation.node,
                status: ActionStatus::Pending,
            }),
        );
        self.append_index(Key::UserActions(actor), action_id).await?;
        self.append_index(Key::DomainActions(domain_id), action_id)
            .await?;

        // Audit trail only; outcomes never depend on it.
        let commit_seed = self
            .hashes
            .latest()
            .map(|(_, hash)| *hash)
            .unwrap_or(Digest([0u8; 32]));
        let mut queue = self.load_queue().await?;
        queue.push(QueueEntry {
            action_id,
            due_block,
            commit_seed,
        });
        self.insert(Key::RevealQueue, Value::RevealQueue(queue));

        info!(
            action_id,
            domain_id,
            box_start,
            boxes = reservation.boxes,
            due_block,
            "boxes greenized"
        );
        Ok(Greenized {
            actor,
            action_id,
            commit_block,
            domain_id,
            box_start,
            box_amount,
        })
    }

    pub(in crate::layer) async fn handle_make_green_box(
        &mut self,
        public: &PublicKey,
        domain_id: u16,
        box_amount: u16,
        pixels: Option<Vec<u8>>,
    ) -> Result<Vec<Event>, GreenboxError> {
        let actor = Address::from_public(public);
        let reservation = self.reserve(domain_id, box_amount).await?;
        let asset = if box_amount & SEED_PAYMENT_FLAG != 0 {
            Asset::Seed
        } else {
            Asset::Energy
        };
        let mut events = self
            .settle_payment(asset, Party::Account(actor), &reservation)
            .await?;

        let node = reservation.node;
        let greenized = self
            .record_action(domain_id, box_amount, actor, reservation)
            .await?;
        events.push(match (node, pixels) {
            (None, None) => Event::DomainGreenized(greenized),
            (None, Some(pixels)) => Event::DomainGreenizedWithPixels { greenized, pixels },
            (Some(node), None) => Event::DomainGreenizedNode { greenized, node },
            (Some(node), Some(pixels)) => Event::DomainGreenizedNodeWithPixels {
                greenized,
                node,
                pixels,
            },
        });
        Ok(events)
    }

    pub(in crate::layer) async fn handle_make_green_box_lucky(
        &mut self,
        domain_id: u16,
        box_amount: u16,
        beneficiary: Address,
        nonce: u64,
        deadline: u64,
        signature: &Signature,
    ) -> Result<Vec<Event>, GreenboxError> {
        let command = ManagerCommand::Lucky {
            domain_id,
            box_amount,
            beneficiary,
        };
        self.verify_manager_command(&command, nonce, deadline, signature)
            .await?;

        // Lucky boxes are always paid in energy out of the fund.
        let reservation = self.reserve(domain_id, box_amount).await?;
        let mut events = self
            .settle_payment(Asset::Energy, Party::LuckyFund, &reservation)
            .await?;

        let node = reservation.node;
        let boxes = reservation.boxes;
        let greenized = self
            .record_action(domain_id, boxes, beneficiary, reservation)
            .await?;
        events.push(Event::DomainGreenizedLucky {
            greenized,
            node,
            nonce,
        });
        Ok(events)
    }
}
