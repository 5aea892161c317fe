use tracing::{debug, warn};

use gavel_shared::{OrderId, OrderStatus, StatusTransition};

use super::Outcome;

/// Current status of one order. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTracker {
    order: OrderId,
    status: OrderStatus,
}

impl OrderTracker {
    pub fn new(order: OrderId, status: OrderStatus) -> Self {
        Self { order, status }
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn apply_status(&mut self, order: OrderId, status: OrderStatus) -> Outcome {
        if order != self.order {
            warn!(expected = %self.order, got = %order, "Status event for another order");
            return Outcome::Ignored("other order");
        }

        match self.status.transition_to(status) {
            StatusTransition::Repeat => Outcome::Ignored("same status"),
            StatusTransition::Forward => {
                debug!(order = %order, from = %self.status, to = %status, "Order status advanced");
                self.status = status;
                Outcome::Advanced
            }
            StatusTransition::Rejected => {
                warn!(order = %order, from = %self.status, to = %status, "Ignoring backward status");
                Outcome::Ignored("backward status")
            }
        }
    }
}
