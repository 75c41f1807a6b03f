pub mod notifications;
pub mod points;
pub mod visits;

pub use notifications::*;
pub use points::*;
pub use visits::*;
