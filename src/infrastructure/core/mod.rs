pub mod http_client_factory;
pub mod ttl_cache;

pub use http_client_factory::HttpClientFactory;
pub use ttl_cache::TtlCache;
