use super::super::*;
use greenbox_types::greenbox::{DomainConfig, Word256};
use tracing::info;

impl<'a, S: State> Layer<'a, S> {
    pub(in crate::layer) async fn handle_register_domain(
        &mut self,
        public: &PublicKey,
        domain_id: u16,
        packed: &Word256,
        reset_sold: bool,
    ) -> Result<Vec<Event>, GreenboxError> {
        self.require_owner(public)?;

        // Raw per-10 000 values in, cumulative boundaries out.
        let mut stored = DomainConfig::from_word(packed).accumulate()?;

        if let Some(node_id) = stored.node() {
            if self.load_node(node_id).await?.is_none() {
                return Err(GreenboxError::NodeNotExist);
            }
        }

        let boxes_sold = match (reset_sold, self.load_domain(domain_id).await?) {
            (false, Some(existing)) => existing.boxes_sold,
            _ => 0,
        };
        if stored.box_top < boxes_sold {
            return Err(GreenboxError::OverLimit);
        }
        stored.boxes_sold = boxes_sold;
        self.store_domain(domain_id, &stored);

        info!(
            domain_id,
            box_top = stored.box_top,
            boxes_sold,
            node = ?stored.node(),
            "domain registered"
        );
        Ok(vec![Event::DomainRegistered {
            domain_id,
            packed: stored.to_word(),
        }])
    }
}
