pub mod allocation;
pub mod currency;
pub mod reporting;
