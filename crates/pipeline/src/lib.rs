pub mod filter;
pub mod funnel;

pub use filter::*;
pub use funnel::*;
