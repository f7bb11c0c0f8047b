pub mod raw;
pub mod detector;
