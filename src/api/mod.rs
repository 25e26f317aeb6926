//! API client modules for the attendance service.
//!
//! Unlike JSON APIs, the attendance service speaks HTML forms: every
//! mutating request must replay an anti-forgery token scraped from a page
//! the server rendered, using the session cookie the server rotated at
//! login. The [`attendance`] module owns that whole protocol.

pub mod attendance;

// Re-export configuration structs for easier access from other modules
pub use attendance::AttendanceConfig;
