mod capabilities;
mod dashboard;
mod plan;
mod port;
mod selection;
mod service;
mod volume;

pub use capabilities::*;
pub use dashboard::*;
pub use plan::*;
pub use port::*;
pub use selection::*;
pub use service::*;
pub use volume::*;
