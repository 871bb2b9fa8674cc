//! Failure taxonomy and the classified error record.

mod category;
mod classified;

pub use category::ErrorCategory;
pub use classified::ClassifiedError;
