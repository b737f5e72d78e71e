// Adapters for the ports declared in app::ports

pub mod http_client;
pub mod in_memory_sink;
pub mod rate_limiter_adapter;
pub mod tracing_sink;

pub use http_client::ReqwestFetcher;
pub use in_memory_sink::InMemoryEventSink;
pub use rate_limiter_adapter::RateLimiterAdapter;
pub use tracing_sink::TracingEventSink;
