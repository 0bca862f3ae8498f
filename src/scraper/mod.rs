//! The resumable fetch, normalize and append pipeline.

pub mod normalizer;
pub mod session;
pub mod store;
