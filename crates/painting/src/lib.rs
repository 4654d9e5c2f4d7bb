pub mod drawable;
pub mod limiter;
pub mod scheduler;

pub use drawable::*;
pub use limiter::*;
pub use scheduler::*;
