use gavel_shared::{Bid, BidSummary};

use super::Outcome;

/// Bid history of one product plus its price summary.
///
/// Bids are appended in arrival order; the bus delivers a product's bids
/// from a single producer, so no re-sorting or de-duplication happens here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidBoard {
    bids: Vec<Bid>,
    summary: BidSummary,
}

impl BidBoard {
    pub fn new(bids: Vec<Bid>, summary: BidSummary) -> Self {
        Self { bids, summary }
    }

    pub fn bids(&self) -> &[Bid] {
        &self.bids
    }

    pub fn summary(&self) -> &BidSummary {
        &self.summary
    }

    /// Append an accepted bid and take the server's price and leader.
    ///
    /// The count comes from the event when present, otherwise the local
    /// count is incremented.
    pub fn apply_bid(
        &mut self,
        bid: Bid,
        current_price: i64,
        highest_bidder: String,
        bid_count: Option<u64>,
    ) -> Outcome {
        self.bids.push(bid);
        self.summary.current_price = current_price;
        self.summary.highest_bidder = Some(highest_bidder);
        self.summary.bid_count = bid_count.unwrap_or(self.summary.bid_count + 1);
        Outcome::Appended
    }
}
