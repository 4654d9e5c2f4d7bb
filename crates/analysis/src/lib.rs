pub mod pairs;
pub mod worker;

pub use pairs::*;
pub use worker::*;
