pub mod connection;
pub mod debate_repo;

pub use connection::DatabaseConnection;
pub use debate_repo::SqliteDebateStore;
