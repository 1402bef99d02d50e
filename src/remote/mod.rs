//! Remote peers and their inbound media
//!
//! Producer announcements from the SFU become consumers; each consumer's
//! track lands in its peer's camera bundle or screen bundle depending on the
//! producer's media type tag.
//!
//! ```text
//!   new-producer(tag) ──► consume ──► Consumer
//!                                        │
//!                 tag = screen | screen-audio ?
//!                    ┌───────yes────────┴──────no────────┐
//!                    ▼                                   ▼
//!             peer.screen bundle                  peer.camera bundle
//! ```

pub mod peer;
pub mod store;

pub use peer::{PeerView, RemotePeer, UNKNOWN_PEER_NAME};
pub use store::RemotePeers;
