//! Accès PostgreSQL/PostGIS

pub mod gateway;
pub mod identity;
pub mod pool;
pub mod refdata;
pub mod triggers;

pub use gateway::PostgresGateway;
pub use refdata::{RefDataRepository, ReferenceCache, ReferenceCaches};
