//! Realtime presence hub.
//!
//! - `Session`: one connected user and their viewing context
//! - `Hub` / `HubHandle`: the coordinating task and its command front door
//! - `DeliveryRouter`: message-vs-notification framing

mod event;
mod registry;
mod router;
mod session;

pub use event::ChatEvent;
pub use registry::{Hub, HubCommand, HubError, HubHandle, HubStats};
pub use router::{classify, DeliveryOutcome, DeliveryRouter, FrameKind};
pub use session::{DeliveryError, Session};
