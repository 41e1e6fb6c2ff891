//! Price calculator: configurable rates plus the estimate formula.

pub mod estimate;
pub mod handlers;
pub mod settings;
