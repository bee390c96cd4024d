// Core modules implementing store access, the range index capability,
// the transactional loader, the query engine, and error modeling.
pub mod error;
pub mod gri;
pub mod loader;
pub mod query;
pub mod store;
