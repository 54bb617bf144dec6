//! Shared configuration for the impf appointment notifier.

pub mod config;

pub use config::AlertConfig;
