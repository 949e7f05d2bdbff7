// Price history domain
pub mod bar;
pub mod date_range;

pub use bar::Bar;
pub use date_range::DateRange;
