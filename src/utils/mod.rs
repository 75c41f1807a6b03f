pub mod timefmt;
pub mod voucher;

pub use timefmt::human_time_until;
pub use voucher::generate_voucher_code;
