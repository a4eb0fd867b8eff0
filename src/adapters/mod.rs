pub mod memory;
pub mod postgres;
mod postgres_reports;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
