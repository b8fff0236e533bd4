//! `rush-params` – namespace-scoped parameter store.
//!
//! Discovers parameters published in a [`ParamRegistry`] under one or more
//! namespaces and keeps a local, typed snapshot of them keyed by their name
//! relative to the namespace they were loaded from.
//!
//! # Modules
//!
//! - [`store`] – [`ParamStore`][store::ParamStore]: `load`, `reload`, `get`,
//!   `get_keys`.
//! - [`config`] – [`StoreConfig`][config::StoreConfig]: the grace period
//!   waited before each registry query.
//!
//! [`ParamRegistry`]: rush_registry::ParamRegistry

pub mod config;
pub mod store;

pub use config::StoreConfig;
pub use store::ParamStore;
