//! Clinical data persistence: the store contract and the in-memory
//! reference implementation.

pub mod traits;

#[cfg(feature = "memory-store")]
pub mod memory;

pub use traits::ClinicalDataStore;

#[cfg(feature = "memory-store")]
pub use memory::MemoryDataStore;
