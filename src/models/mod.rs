pub mod lottery;
pub mod pagination;

pub use lottery::*;
pub use pagination::*;
