// Pricing and totals
pub mod aggregation;
pub mod rates;

// Listing
pub mod filtering;
pub mod pagination;

// Sheets and delimited output
pub mod export;
