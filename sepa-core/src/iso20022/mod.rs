// ISO 20022 Message Support Module
// Schema models for the two SEPA message types handled by this crate

pub mod common;  // Shared components (must be first)
pub mod pain008; // CustomerDirectDebitInitiation - outgoing collections
pub mod camt053; // BankToCustomerStatement - incoming account statements

// Re-exports for convenience
pub use camt053::{parse_camt053, AccountStatement, BankToCustomerStatement, Camt053Document};
pub use pain008::{parse_pain008, CustomerDirectDebitInitiation, Pain008Document};
