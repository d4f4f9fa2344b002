pub mod backend;
pub mod error;
pub mod normalize;
pub mod orchestrator;
pub mod probe;
pub mod registry;
pub mod transport;
pub mod types;

pub use error::{FailureKind, ProviderFailure, ProviderFailureRecord, SummarizeError};
pub use orchestrator::{Orchestrator, ProviderAttempt, RetryPolicy};
pub use probe::{probe, Availability};
pub use registry::{ProviderConfig, ProviderRegistry};
pub use transport::{ReqwestTransport, Transport};
pub use types::{AiResponse, WireFormat};
