//! Foundation module - Core utilities and types
//!
//! - Math types and the Vulkan-flavoured matrix helpers
//! - Frame timing driven by the window clock
//! - Logging initialisation

pub mod math;
pub mod time;
pub mod logging;
