pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod feeds;
pub mod guard;
pub mod handoff;
pub mod live;
pub mod reconcile;
pub mod session;
pub mod view;

use tracing_subscriber::{fmt, EnvFilter};

pub use api::{ApiClient, AuthApi, AuthGrant, OrderApi, ProductApi};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use feeds::{OrderFeed, ProductFeed};
pub use guard::{evaluate_guard, GuardDecision, GuardRequirement};
pub use handoff::HandoffStore;
pub use live::{LiveView, ViewHandle};
pub use reconcile::{Outcome, Reconcile, ViewInput};
pub use session::{Session, SessionEvent, SessionPhase, SessionStore};
pub use view::{OrderLiveView, ProductLiveView};

/// Install the global `tracing` subscriber.
///
/// Honours `RUST_LOG`; without it, this crate and the transport log at debug
/// and everything else at warn. Calling it again is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gavel_client=debug,gavel_net=debug,warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
