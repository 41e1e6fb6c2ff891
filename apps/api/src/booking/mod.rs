// Consultation booking: a linear wizard (service → schedule → contact → confirmation)
// validated step by step, then submitted once as a single schedule row.

pub mod handlers;
pub mod wizard;
