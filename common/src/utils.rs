pub mod bounded_log;
pub mod ttl_cache;
