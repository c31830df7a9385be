// ISO 20022 pain.008.001.02 - CustomerDirectDebitInitiation
// Sent by a creditor to its bank to collect SEPA direct debits from debtors
// Field order follows the XSD sequence; the serializer relies on it

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::common::{
    ActiveOrHistoricCurrencyAndAmount, Agent, CashAccount, PartyIdentification,
    RemittanceInformation,
};
use crate::error::{Error, Result};

/// Target namespace of the pain.008.001.02 schema
pub const NAMESPACE: &str = "urn:iso:std:iso:20022:tech:xsd:pain.008.001.02";

/// XML Schema instance namespace
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// `xsi:schemaLocation` value: namespace followed by the schema file
pub const SCHEMA_LOCATION: &str =
    "urn:iso:std:iso:20022:tech:xsd:pain.008.001.02 pain.008.001.02.xsd";

/// pain.008 Document - CustomerDirectDebitInitiation
///
/// Namespace attributes are not part of the model; the serializer adds them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "Document")]
pub struct Pain008Document {
    #[serde(rename = "CstmrDrctDbtInitn")]
    pub customer_direct_debit_initiation: CustomerDirectDebitInitiation,
}

/// Customer Direct Debit Initiation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDirectDebitInitiation {
    #[serde(rename = "GrpHdr")]
    pub group_header: GroupHeader,
    #[serde(rename = "PmtInf", default)]
    pub payment_information: Vec<PaymentInformation>,
}

/// Group Header (GroupHeader39)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupHeader {
    #[serde(rename = "MsgId")]
    pub message_id: String,
    #[serde(rename = "CreDtTm")]
    pub creation_date_time: String,
    #[serde(rename = "NbOfTxs")]
    pub number_of_transactions: String,
    #[serde(rename = "CtrlSum", skip_serializing_if = "Option::is_none")]
    pub control_sum: Option<String>,
    #[serde(rename = "InitgPty")]
    pub initiating_party: PartyIdentification,
}

/// Payment Information (PaymentInstructionInformation4)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInformation {
    #[serde(rename = "PmtInfId")]
    pub payment_information_id: String,
    #[serde(rename = "PmtMtd")]
    pub payment_method: PaymentMethod,
    #[serde(rename = "BtchBookg", skip_serializing_if = "Option::is_none")]
    pub batch_booking: Option<bool>,
    #[serde(rename = "NbOfTxs", skip_serializing_if = "Option::is_none")]
    pub number_of_transactions: Option<String>,
    #[serde(rename = "CtrlSum", skip_serializing_if = "Option::is_none")]
    pub control_sum: Option<String>,
    #[serde(rename = "PmtTpInf", skip_serializing_if = "Option::is_none")]
    pub payment_type_information: Option<PaymentTypeInformation>,
    #[serde(rename = "ReqdColltnDt")]
    pub requested_collection_date: String,
    #[serde(rename = "Cdtr")]
    pub creditor: PartyIdentification,
    #[serde(rename = "CdtrAcct")]
    pub creditor_account: CashAccount,
    #[serde(rename = "CdtrAgt")]
    pub creditor_agent: Agent,
    #[serde(rename = "ChrgBr", skip_serializing_if = "Option::is_none")]
    pub charge_bearer: Option<ChargeBearerType>,
    #[serde(rename = "CdtrSchmeId", skip_serializing_if = "Option::is_none")]
    pub creditor_scheme_identification: Option<PartyIdentification>,
    #[serde(rename = "DrctDbtTxInf", default)]
    pub direct_debit_transactions: Vec<DirectDebitTransactionInformation>,
}

/// Payment Method
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentMethod {
    DD, // Direct Debit
}

/// Payment Type Information (PaymentTypeInformation20)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTypeInformation {
    #[serde(rename = "SvcLvl", skip_serializing_if = "Option::is_none")]
    pub service_level: Option<ServiceLevel>,
    #[serde(rename = "LclInstrm", skip_serializing_if = "Option::is_none")]
    pub local_instrument: Option<LocalInstrument>,
    #[serde(rename = "SeqTp", skip_serializing_if = "Option::is_none")]
    pub sequence_type: Option<SequenceType>,
}

/// Service Level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLevel {
    #[serde(rename = "Cd")]
    pub code: String, // SEPA
}

/// Local Instrument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalInstrument {
    #[serde(rename = "Cd")]
    pub code: LocalInstrumentCode,
}

/// SEPA direct debit scheme
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LocalInstrumentCode {
    CORE, // Core scheme (consumers)
    COR1, // Core with D-1 collection
    B2B,  // Business-to-business scheme
}

impl LocalInstrumentCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocalInstrumentCode::CORE => "CORE",
            LocalInstrumentCode::COR1 => "COR1",
            LocalInstrumentCode::B2B => "B2B",
        }
    }
}

impl fmt::Display for LocalInstrumentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocalInstrumentCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CORE" => Ok(LocalInstrumentCode::CORE),
            "COR1" => Ok(LocalInstrumentCode::COR1),
            "B2B" => Ok(LocalInstrumentCode::B2B),
            other => Err(Error::Configuration(format!(
                "unknown local instrument {:?}",
                other
            ))),
        }
    }
}

/// Sequence Type (SequenceType1Code): position of a collection within its mandate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SequenceType {
    OOFF, // One-off
    FRST, // First of a series
    RCUR, // Recurring
    FNAL, // Final of a series
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            SequenceType::OOFF => "OOFF",
            SequenceType::FRST => "FRST",
            SequenceType::RCUR => "RCUR",
            SequenceType::FNAL => "FNAL",
        };
        f.write_str(code)
    }
}

/// Charge Bearer Type - who pays the charges
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChargeBearerType {
    DEBT, // Debtor bears all charges
    CRED, // Creditor bears all charges
    SHAR, // Shared
    SLEV, // Service level (mandatory for SEPA)
}

/// Direct Debit Transaction Information (DirectDebitTransactionInformation9)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectDebitTransactionInformation {
    #[serde(rename = "PmtId")]
    pub payment_identification: PaymentIdentification,
    #[serde(rename = "InstdAmt")]
    pub instructed_amount: ActiveOrHistoricCurrencyAndAmount,
    #[serde(rename = "DrctDbtTx")]
    pub direct_debit_transaction: DirectDebitTransaction,
    #[serde(rename = "DbtrAgt")]
    pub debtor_agent: Agent,
    #[serde(rename = "Dbtr")]
    pub debtor: PartyIdentification,
    #[serde(rename = "DbtrAcct")]
    pub debtor_account: CashAccount,
    #[serde(rename = "RmtInf", skip_serializing_if = "Option::is_none")]
    pub remittance_information: Option<RemittanceInformation>,
}

/// Payment Identification (PaymentIdentification1)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIdentification {
    #[serde(rename = "InstrId", skip_serializing_if = "Option::is_none")]
    pub instruction_id: Option<String>,
    #[serde(rename = "EndToEndId")]
    pub end_to_end_id: String,
}

/// Direct Debit Transaction (DirectDebitTransaction6)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectDebitTransaction {
    #[serde(rename = "MndtRltdInf")]
    pub mandate_related_information: MandateRelatedInformation,
    #[serde(rename = "CdtrSchmeId", skip_serializing_if = "Option::is_none")]
    pub creditor_scheme_identification: Option<PartyIdentification>,
}

/// Mandate Related Information (MandateRelatedInformation6)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MandateRelatedInformation {
    #[serde(rename = "MndtId")]
    pub mandate_id: String,
    #[serde(rename = "DtOfSgntr")]
    pub date_of_signature: String,
    #[serde(rename = "AmdmntInd", skip_serializing_if = "Option::is_none")]
    pub amendment_indicator: Option<bool>,
    #[serde(rename = "AmdmntInfDtls", skip_serializing_if = "Option::is_none")]
    pub amendment_information_details: Option<AmendmentInformationDetails>,
}

/// Amendment Information Details (AmendmentInformationDetails6), IBAN change only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmendmentInformationDetails {
    #[serde(rename = "OrgnlDbtrAcct", skip_serializing_if = "Option::is_none")]
    pub original_debtor_account: Option<CashAccount>,
}

impl Pain008Document {
    /// Transactions across all batches
    pub fn transactions(&self) -> impl Iterator<Item = &DirectDebitTransactionInformation> {
        self.customer_direct_debit_initiation
            .payment_information
            .iter()
            .flat_map(|pi| pi.direct_debit_transactions.iter())
    }
}

/// Parse pain.008 XML document
pub fn parse_pain008(xml: &str) -> Result<Pain008Document> {
    quick_xml::de::from_str(xml)
        .map_err(|e| Error::Parse(format!("Failed to parse pain.008 document: {}", e)))
}
