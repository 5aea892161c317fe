//! Topic naming for the live feeds.
//!
//! A destination is a pure function of the resource id and, for product
//! comments, of the viewer's role.

use gavel_shared::types::{OrderId, ProductId, ViewerRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiveTopic {
    /// Comment thread of a product. Sellers get unmasked author identities.
    ProductComments { product: ProductId, role: ViewerRole },
    /// Bid stream of a product.
    ProductBids { product: ProductId },
    /// Lifecycle updates of an order.
    OrderStatus { order: OrderId },
    /// Buyer/seller chat of an order.
    OrderChat { order: OrderId },
}

impl LiveTopic {
    pub fn destination(&self) -> String {
        match self {
            Self::ProductComments {
                product,
                role: ViewerRole::Public,
            } => format!("/topic/products/{product}/comments"),
            Self::ProductComments {
                product,
                role: ViewerRole::Seller,
            } => format!("/topic/products/{product}/comments/seller"),
            Self::ProductBids { product } => format!("/topic/products/{product}/bids"),
            Self::OrderStatus { order } => format!("/topic/orders/{order}/status"),
            Self::OrderChat { order } => format!("/topic/orders/{order}/chat"),
        }
    }

    /// Whether the broker only accepts this subscription from an
    /// authenticated connection.
    pub fn requires_token(&self) -> bool {
        match self {
            Self::ProductComments { role, .. } => *role == ViewerRole::Seller,
            Self::ProductBids { .. } => false,
            Self::OrderStatus { .. } | Self::OrderChat { .. } => true,
        }
    }

    /// Raw id of the scoped resource.
    pub fn resource_id(&self) -> i64 {
        match self {
            Self::ProductComments { product, .. } | Self::ProductBids { product } => product.0,
            Self::OrderStatus { order } | Self::OrderChat { order } => order.0,
        }
    }

    pub fn has_valid_resource(&self) -> bool {
        self.resource_id() > 0
    }
}

impl std::fmt::Display for LiveTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.destination())
    }
}
