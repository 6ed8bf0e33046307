pub mod carts;
pub mod orders;
pub mod pricing;
