//! Recruiting platform integration.

pub mod dto;
pub mod duplicate;
pub mod gateway;

pub use dto::{PostingRef, Resume, SearchFilters, SearchPage, UserInfo};
pub use duplicate::{DuplicateDetector, ErrorValueDetector};
pub use gateway::PlatformGateway;
