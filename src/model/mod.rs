pub mod comparison;
pub mod price;
