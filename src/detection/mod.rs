//! Delete prevention detectors.
//!
//! A detector looks at one item and says whether its deletion should be
//! prevented, always with a reason. An area's items are deleted only when
//! none of the area's detectors prevent it.

mod detector;
mod context;

pub use context::{CarryOver, DetectionContext};
pub use detector::{format_age, Detection, Detector, ExcludePatterns};
