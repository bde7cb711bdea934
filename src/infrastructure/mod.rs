pub mod loader;
pub mod mock;
pub mod stooq;
