pub mod calculation;
pub mod grade;
pub mod period;

pub use calculation::*;
pub use grade::*;
pub use period::*;
