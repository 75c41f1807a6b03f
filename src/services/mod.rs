pub mod draw_service;
pub mod drawing_service;
pub mod entry_service;

pub use draw_service::*;
pub use drawing_service::*;
pub use entry_service::*;
