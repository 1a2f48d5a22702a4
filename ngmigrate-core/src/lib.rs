//! Embeddable core library for ngmigrate.
//!
//! Provides the clap-free dependency-repair loop and the checkout-and-update
//! pipeline. Process execution and progress output go through the port
//! traits in [`ports`]; [`adapters`] holds the default implementations.
//!
//! # Entry points
//!
//! - [`RepairLoop::run`](repair::RepairLoop::run): step a project to the
//!   latest major of a dependency
//! - [`checkout_and_update`](checkout::checkout_and_update): clone, repair,
//!   migrate and copy out a package

pub mod adapters;
pub mod checkout;
pub mod classify;
pub mod ports;
pub mod repair;
pub mod settings;

pub use checkout::{CheckoutOutcome, checkout_and_update, resolve_repository_url};
pub use repair::{RepairError, RepairLoop, RepairOutcome, RepairState};

// Re-export the registry port so embedders don't need ngmigrate-npm directly.
pub use ngmigrate_npm::{NpmRegistry, RegistryClient};
