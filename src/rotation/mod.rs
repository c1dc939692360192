//! # Rotation
//!
//! Clock, rotation window policy and the result records every lifecycle
//! step produces.

pub mod clock;
pub mod policy;
pub mod result;

pub use clock::{Clock, FixedClock, SystemClock};
pub use policy::{days_to_expire, should_rotate};
pub use result::{InspectionResult, RotationContext, RotationResult};
