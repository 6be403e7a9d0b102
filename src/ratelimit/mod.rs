//! Rate limiting logic and state management.

mod counter;
mod identifier;
mod limiter;
mod policy;
mod store;

pub use counter::{epoch_millis, Admission, CounterEntry, MemoryCounterStore};
pub use identifier::Identifier;
pub use limiter::{Decision, RateLimiter};
pub use policy::{Policy, PolicyTable};
pub use store::CounterStore;
