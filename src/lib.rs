//! Automatic job applications on the HeadHunter platform.
//!
//! A harvest pass searches postings with a user's saved settings and applies
//! to each one that has no recorded outcome yet. Outbound requests share a
//! per-host sliding-window rate limiter and are retried on transient failures.

pub mod config;
pub mod http;
pub mod models;
pub mod platform;
pub mod repository;
pub mod schema;
pub mod services;
pub mod worker;

pub use config::{load_settings, Config, PlatformConfig, Settings};
pub use models::{ApplicationRecord, ApplicationStatus, PlatformProfile, SearchSettings, TokenPair};
