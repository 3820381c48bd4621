use super::super::*;
use anyhow::anyhow;
use commonware_cryptography::sha256::Digest;
use greenbox_types::greenbox::{calculate_gifts, Action, ActionStatus, GiftReport};
use tracing::{debug, info, warn};

impl<'a, S: State> Layer<'a, S> {
    async fn load_action(&self, action_id: u32) -> Result<Action> {
        match self.get(&Key::Action(action_id)).await? {
            Some(Value::Action(action)) => Ok(action),
            _ => Err(anyhow!("queued action {action_id} is missing")),
        }
    }

    /// Stores `hash` as the resolution of an unrevealed action and decodes its boxes.
    async fn resolve(
        &mut self,
        action_id: u32,
        hash: Digest,
        recovered: bool,
    ) -> Result<Event, GreenboxError> {
        let mut action = self.load_action(action_id).await?;
        if action.status.is_revealed() {
            return Err(anyhow!("action {action_id} already revealed").into());
        }

        // Decoded under the tiers and node split recorded at purchase.
        let outcome = calculate_gifts(
            &action.boundaries,
            action_id,
            action.green.boxes(),
            &hash,
        );

        action.status = ActionStatus::Revealed { hash, recovered };
        let green = action.green;
        let node = action.node;
        self.insert(Key::Action(action_id), Value::Action(action));

        debug!(
            action_id,
            recovered,
            wins = outcome.total_wins(),
            "boxes revealed"
        );
        Ok(Event::BoxesRevealed(GiftReport {
            action_id,
            green,
            hash,
            node,
            recovered,
            outcome,
        }))
    }

    pub(in crate::layer) async fn handle_reveal_boxes(
        &mut self,
    ) -> Result<Vec<Event>, GreenboxError> {
        let height = self.context.height;
        let mut queue = self.load_queue().await?;
        let mut overtime = self.load_overtime().await?;
        let (mut revealed, mut expired) = (0u32, 0u32);

        let mut events = Vec::new();
        for _ in 0..self.settings.reveal_batch {
            let Some(entry) = queue.pop_due(height) else {
                break;
            };
            match self.hashes.get(entry.due_block).copied() {
                Some(hash) => {
                    events.push(self.resolve(entry.action_id, hash, false).await?);
                    revealed += 1;
                }
                None => {
                    let mut action = self.load_action(entry.action_id).await?;
                    action.status = ActionStatus::Overtime;
                    self.insert(Key::Action(entry.action_id), Value::Action(action));
                    events.push(Event::BoxesOvertime {
                        action_id: entry.action_id,
                        due_block: entry.due_block,
                    });
                    overtime.insert(entry);
                    expired += 1;
                }
            }
        }

        if revealed + expired > 0 {
            self.insert(Key::RevealQueue, Value::RevealQueue(queue));
            self.insert(Key::Overtime, Value::Overtime(overtime));
        }
        if expired > 0 {
            warn!(height, expired, "due block hashes fell out of the window");
        }
        info!(height, revealed, expired, "reveal pass");
        Ok(events)
    }

    pub(in crate::layer) async fn handle_reveal_boxes_with_hash(
        &mut self,
        public: &PublicKey,
        action_ids: &[u32],
        hashes: &[Digest],
    ) -> Result<Vec<Event>, GreenboxError> {
        self.require_owner(public)?;
        if action_ids.len() != hashes.len() {
            return Err(GreenboxError::WrongLength);
        }

        let mut overtime = self.load_overtime().await?;
        let mut events = Vec::new();
        for (&action_id, hash) in action_ids.iter().zip(hashes) {
            if overtime.remove(action_id).is_none() {
                debug!(action_id, "not in overtime; skipping");
                continue;
            }
            events.push(self.resolve(action_id, *hash, true).await?);
        }

        if !events.is_empty() {
            self.insert(Key::Overtime, Value::Overtime(overtime));
        }
        info!(recovered = events.len(), "overtime recovery");
        Ok(events)
    }
}
