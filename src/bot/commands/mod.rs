//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Alert settings commands
pub mod alerts;

/// General utility commands
pub mod general;

/// Water level commands
pub mod levels;

// Export commands
pub use alerts::*;
pub use general::*;
pub use levels::*;
