pub mod error;
pub mod probe;
pub mod runtime;
pub mod waiter;

pub use error::*;
pub use probe::*;
pub use runtime::*;
pub use waiter::*;
