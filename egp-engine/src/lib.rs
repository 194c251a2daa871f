//! EGP Engine - governance lifecycle, object stores and HTTP surface.

pub mod advisors;
pub mod api;
pub mod cancel;
pub mod clock;
pub mod error;
pub mod ipfs;
pub mod lifecycle;
pub mod memory;
pub mod receipt;
pub mod store;

pub use advisors::{Advisors, Conflict, Degradation, Echo, Severity, Suggestions};
pub use api::{ApiError, EngineApiBuilder, EngineServiceConfig};
pub use cancel::{CancelHandle, Cancellation, Cancelled};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{EngineError, StoreError, RETRY_AFTER_SECS};
pub use ipfs::{IpfsStore, INFURA_API_URL};
pub use lifecycle::{
    LifecycleConfig, LifecycleEngine, LifecycleEngineBuilder, LEARNING_ARCHIVE_PLACEHOLDER,
};
pub use memory::InMemoryStore;
pub use receipt::{
    AdoptionReceipt, ProposalReceipt, RelationshipIds, ResolvedObject, SenseReceipt,
    TrialSchedule,
};
pub use store::{NullIndex, ObjectIndex, ObjectStore, StoredObject};
