pub mod adapter;
pub mod client;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod keys;
pub mod normalize;
pub mod prompts;
pub mod providers;
pub mod retry;
pub mod router;
pub mod transport;

pub mod test_support;

pub use adapter::{Completion, CompletionBackend, CompletionRequest, LlmAdapter, ProviderAdapter};
pub use client::{ClientSlot, ProviderClient};
pub use error::{classify, BoxError, ErrorCode, ProviderError};
pub use extract::{extract_json, ExtractError};
pub use keys::KeyStore;
pub use providers::default_adapters;
pub use retry::{CallContext, RetryPolicy};
pub use router::{DispatchRequest, DispatchResult, Router};
pub use transport::{HttpReply, HttpTransport, ReqwestTransport, TransportError};
