//! Session orchestration
//!
//! A session moves through `Idle → Joining → NegotiatingCapabilities →
//! CreatingTransports → Ready` and ends in `Terminated`. Producer
//! announcements that arrive before `Ready` wait in the [`ProducerGate`].

pub mod context;
pub mod driver;
pub mod gate;
pub mod local;
pub mod orchestrator;
pub mod state;

pub use context::JoinRequest;
pub use driver::{SessionCommand, SessionDriver, SessionHandle};
pub use gate::{Admission, ProducerGate};
pub use local::{LocalMedia, ScreenShare};
pub use orchestrator::{Session, SessionEvent};
pub use state::{SessionPhase, SessionState};
