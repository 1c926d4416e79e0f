//! Payment record persistence adapters.

mod in_memory;
mod postgres;

pub use in_memory::InMemoryPaymentRepository;
pub use postgres::PostgresPaymentRepository;
