//! SEPA Core
//!
//! Builds ISO 20022 SEPA Direct Debit Initiation documents (`pain.008.001.02`)
//! and reads Bank-to-Customer Statements (`camt.053.001.02`).
//!
//! # Architecture
//!
//! - **Builder**: mutable staging area for the group header, batches and transactions
//! - **Schema Model**: immutable serde tree mirroring the pain.008 XSD
//! - **Serializer**: renders a snapshot to XML, with or without `xsi:schemaLocation`
//!
//! # Invariants
//!
//! - `NbOfTxs` at every level equals the number of transactions beneath it
//! - `CtrlSum` at every level equals the exact decimal sum beneath it (2 fractional digits)
//! - Optional blocks are omitted, never rendered empty
//! - Rendering an unchanged message twice yields identical bytes

#![forbid(unsafe_code)]
#![warn(
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod builder;
pub mod config;
pub mod error;
pub mod iso20022;
pub mod serializer;
pub mod telemetry;

// Re-exports
pub use builder::{DirectDebitInitiation, Party, PaymentInstruction, Transaction};
pub use config::Config;
pub use error::{Error, Result};
pub use iso20022::camt053::{parse_camt053, BankToCustomerStatement, Camt053Document};
pub use iso20022::pain008::{parse_pain008, LocalInstrumentCode, Pain008Document, SequenceType};
pub use serializer::{to_xml_string, write_document, NamespaceMode};
