//! Private provider registry binding

pub mod client;
pub mod payload;

pub use client::RegistryClient;
