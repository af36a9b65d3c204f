pub mod analysis;
pub mod property;
