//! Source des objets cadastraux (PostgreSQL)

pub mod objects;
pub mod pool;

pub use objects::{fetch_objects, CadastralObject, FetchedObjects};
pub use pool::{create_pool, test_connection, DatabaseConfig, SslMode};
