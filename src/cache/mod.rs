//! Cache Module
//!
//! Typed cache operations over a key-value backend.

mod store;


pub use store::RiakCacheStore;
