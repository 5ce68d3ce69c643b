pub mod filesystems;
pub mod raid;
pub mod units;
