//! Synchronization core: the poll-cycle state machine, the self-rearming
//! scheduler that drives it, and the activation gate that starts the
//! scheduler once credentials arrive.

pub mod engine;
pub mod gate;
pub mod scheduler;

pub use engine::{PollStats, SyncEngine};
pub use gate::ActivationGate;
pub use scheduler::Scheduler;
