//! Model pricing and two-currency cost computation

mod table;

pub use table::{Cost, ModelPrice, PricingTable, TokenPrice, DEFAULT_USD_TO_BRL};
