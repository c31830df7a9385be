// ISO 20022 Common Types and Structures
// Component versions as used by pain.008.001.02 and camt.053.001.02

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Currency for every SEPA amount
pub const EUR: &str = "EUR";

/// Proprietary scheme name for SEPA creditor identifiers
pub const SEPA_SCHEME: &str = "SEPA";

/// Party Identification (PartyIdentification32)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PartyIdentification {
    #[serde(rename = "Nm", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "PstlAdr", skip_serializing_if = "Option::is_none")]
    pub postal_address: Option<PostalAddress>,

    #[serde(rename = "Id", skip_serializing_if = "Option::is_none")]
    pub identification: Option<Party>,
}

impl PartyIdentification {
    /// Named party with a postal address
    pub fn with_address(name: &str, country: &str, address_lines: &[String]) -> Self {
        Self {
            name: Some(name.to_string()),
            postal_address: Some(PostalAddress {
                country: Some(country.to_string()),
                address_line: address_lines.to_vec(),
            }),
            identification: None,
        }
    }

    /// Creditor scheme identification: `Id/PrvtId/Othr/{Id, SchmeNm/Prtry=SEPA}`
    pub fn sepa_creditor_scheme(scheme_id: &str) -> Self {
        Self {
            name: None,
            postal_address: None,
            identification: Some(Party {
                organisation_identification: None,
                private_identification: Some(PersonIdentification {
                    other: vec![GenericIdentification {
                        id: scheme_id.to_string(),
                        scheme_name: Some(SchemeName {
                            code: None,
                            proprietary: Some(SEPA_SCHEME.to_string()),
                        }),
                        issuer: None,
                    }],
                }),
            }),
        }
    }

    /// First private `Othr/Id`, i.e. the creditor scheme id when this is a `CdtrSchmeId`
    pub fn private_other_id(&self) -> Option<&str> {
        self.identification
            .as_ref()
            .and_then(|party| party.private_identification.as_ref())
            .and_then(|private| private.other.first())
            .map(|other| other.id.as_str())
    }
}

/// Postal Address (PostalAddress6, SEPA subset)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PostalAddress {
    #[serde(rename = "Ctry", skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(rename = "AdrLine", default, skip_serializing_if = "Vec::is_empty")]
    pub address_line: Vec<String>,
}

/// Party (Organisation or Person)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Party {
    #[serde(rename = "OrgId", skip_serializing_if = "Option::is_none")]
    pub organisation_identification: Option<OrganisationIdentification>,

    #[serde(rename = "PrvtId", skip_serializing_if = "Option::is_none")]
    pub private_identification: Option<PersonIdentification>,
}

/// Organisation Identification
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrganisationIdentification {
    #[serde(rename = "BICOrBEI", skip_serializing_if = "Option::is_none")]
    pub bic_or_bei: Option<String>,

    #[serde(rename = "Othr", default, skip_serializing_if = "Vec::is_empty")]
    pub other: Vec<GenericIdentification>,
}

/// Person Identification
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersonIdentification {
    #[serde(rename = "Othr", default, skip_serializing_if = "Vec::is_empty")]
    pub other: Vec<GenericIdentification>,
}

/// Generic Identification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericIdentification {
    #[serde(rename = "Id")]
    pub id: String,

    #[serde(rename = "SchmeNm", skip_serializing_if = "Option::is_none")]
    pub scheme_name: Option<SchemeName>,

    #[serde(rename = "Issr", skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
}

/// Scheme Name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeName {
    #[serde(rename = "Cd", skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(rename = "Prtry", skip_serializing_if = "Option::is_none")]
    pub proprietary: Option<String>,
}

/// Agent (BranchAndFinancialInstitutionIdentification4)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    #[serde(rename = "FinInstnId")]
    pub financial_institution_id: FinancialInstitutionIdentification,
}

impl Agent {
    /// Agent identified by BIC only
    pub fn from_bic(bic: &str) -> Self {
        Self {
            financial_institution_id: FinancialInstitutionIdentification {
                bic: Some(bic.to_string()),
                other: None,
            },
        }
    }
}

/// Financial Institution Identification (FinancialInstitutionIdentification7)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialInstitutionIdentification {
    #[serde(rename = "BIC", skip_serializing_if = "Option::is_none")]
    pub bic: Option<String>,

    #[serde(rename = "Othr", skip_serializing_if = "Option::is_none")]
    pub other: Option<GenericIdentification>,
}

/// Cash Account (CashAccount16)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashAccount {
    #[serde(rename = "Id")]
    pub id: AccountIdentification,

    #[serde(rename = "Ccy", skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl CashAccount {
    /// Account identified by IBAN only
    pub fn from_iban(iban: &str) -> Self {
        Self {
            id: AccountIdentification {
                iban: Some(iban.to_string()),
                other: None,
            },
            currency: None,
        }
    }

    /// IBAN, falling back to the proprietary identification
    pub fn account_number(&self) -> Option<&str> {
        self.id
            .iban
            .as_deref()
            .or_else(|| self.id.other.as_ref().map(|other| other.id.as_str()))
    }
}

/// Account Identification choice: IBAN or other
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentification {
    #[serde(rename = "IBAN", skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,

    #[serde(rename = "Othr", skip_serializing_if = "Option::is_none")]
    pub other: Option<GenericIdentification>,
}

/// Active or Historic Currency and Amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveOrHistoricCurrencyAndAmount {
    #[serde(rename = "@Ccy")]
    pub currency: String,

    #[serde(rename = "$text")]
    pub amount: String,
}

impl ActiveOrHistoricCurrencyAndAmount {
    /// Parse the text content; surrounding whitespace is ignored
    pub fn to_decimal(&self) -> Result<Decimal, rust_decimal::Error> {
        self.amount.trim().parse::<Decimal>()
    }

    /// Euro amount with exactly two fractional digits
    pub fn eur(amount: Decimal) -> Self {
        Self {
            currency: EUR.to_string(),
            amount: format_amount(amount),
        }
    }
}

/// Unstructured Remittance Information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemittanceInformation {
    #[serde(rename = "Ustrd", default, skip_serializing_if = "Vec::is_empty")]
    pub unstructured: Vec<String>,
}

/// Credit/Debit Code
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CreditDebitCode {
    CRDT, // Credit (money in)
    DBIT, // Debit (money out)
}

/// Render a decimal with exactly two fractional digits (`1` -> `1.00`, `1.5` -> `1.50`)
pub fn format_amount(amount: Decimal) -> String {
    let mut rounded = amount.round_dp(2);
    rounded.rescale(2);
    rounded.to_string()
}

/// Deserialize an ISODateTime, treating a missing offset as UTC
pub fn deserialize_iso_date_time<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_iso_date_time(&raw).map_err(serde::de::Error::custom)
}

fn parse_iso_date_time(raw: &str) -> Result<DateTime<FixedOffset>, String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt);
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc().fixed_offset())
        .map_err(|e| format!("invalid ISODateTime {:?}: {}", raw, e))
}
