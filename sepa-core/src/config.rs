//! Configuration for building and rendering direct debit messages

use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{Error, Result};
use crate::iso20022::pain008::LocalInstrumentCode;

/// Builder and serializer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Local instrument written into every batch (`CORE`, `COR1` or `B2B`)
    pub local_instrument: LocalInstrumentCode,

    /// `BtchBookg` flag; omitted from the output when unset
    pub batch_booking: Option<bool>,

    /// Indentation width in spaces; `None` renders compact XML
    pub indent: Option<usize>,

    /// Reject batches whose collection date precedes the message creation date
    pub reject_past_collection_date: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            local_instrument: LocalInstrumentCode::CORE,
            batch_booking: None,
            indent: Some(2),
            reject_past_collection_date: false,
        }
    }
}

impl Config {
    /// Load configuration from the process environment (and `.env`, if present)
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(value) = lookup("SEPA_LOCAL_INSTRUMENT") {
            config.local_instrument = value.parse()?;
        }

        if let Some(value) = lookup("SEPA_BATCH_BOOKING") {
            config.batch_booking = Some(parse_bool("SEPA_BATCH_BOOKING", &value)?);
        }

        if let Some(value) = lookup("SEPA_XML_INDENT") {
            let width: usize = value.trim().parse().map_err(|_| {
                Error::Configuration(format!("SEPA_XML_INDENT must be a number, got {:?}", value))
            })?;
            config.indent = if width == 0 { None } else { Some(width) };
        }

        if let Some(value) = lookup("SEPA_REJECT_PAST_COLLECTION_DATE") {
            config.reject_past_collection_date =
                parse_bool("SEPA_REJECT_PAST_COLLECTION_DATE", &value)?;
        }

        Ok(config)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(Error::Configuration(format!(
            "{} must be a boolean, got {:?}",
            key, other
        ))),
    }
}
