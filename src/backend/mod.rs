pub mod client;
pub mod wire;

pub use client::{BackendClient, FILE_FIELD};
pub use wire::{LookupMatch, LookupQuery, LookupResponse, RATIO_FIELD};
