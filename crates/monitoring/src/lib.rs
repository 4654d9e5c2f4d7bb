pub mod alarm;
pub mod point;
pub mod time_range;

pub use alarm::*;
pub use point::*;
pub use time_range::*;
