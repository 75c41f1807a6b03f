pub mod lottery_drawings;
pub mod lottery_entries;
pub mod lottery_winners;

pub use lottery_drawings as drawing_entity;
pub use lottery_entries as entry_entity;
pub use lottery_winners as winner_entity;

pub use lottery_drawings::{DrawingStatus, PrizeTier, PrizeType};
pub use lottery_entries::EntryCategory;
