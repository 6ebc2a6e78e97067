//! Core data model types: addresses and index hits.

pub mod address;
pub mod hit;
