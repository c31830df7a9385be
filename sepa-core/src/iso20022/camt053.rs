// ISO 20022 camt.053.001.02 - BankToCustomerStatement
// End-of-day account statement sent by the bank to the account holder
// Read-only: only the fields needed to follow up on collections are modelled

use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use tracing::info;

use super::common::{
    deserialize_iso_date_time, ActiveOrHistoricCurrencyAndAmount, CashAccount, CreditDebitCode,
};
use crate::error::{Error, Result};

/// camt.053 Document - BankToCustomerStatement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "Document")]
pub struct Camt053Document {
    #[serde(rename = "BkToCstmrStmt")]
    pub bank_to_customer_statement: BankToCustomerStatement,
}

/// Bank to Customer Statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankToCustomerStatement {
    #[serde(rename = "GrpHdr")]
    pub group_header: GroupHeader,
    #[serde(rename = "Stmt", default)]
    pub statements: Vec<AccountStatement>,
}

/// Group Header (GroupHeader42)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupHeader {
    #[serde(rename = "MsgId")]
    pub message_id: String,
    #[serde(rename = "CreDtTm", deserialize_with = "deserialize_iso_date_time")]
    pub creation_date_time: DateTime<FixedOffset>,
    #[serde(rename = "MsgPgntn", skip_serializing_if = "Option::is_none")]
    pub message_pagination: Option<Pagination>,
}

/// Pagination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(rename = "PgNb")]
    pub page_number: String,
    #[serde(rename = "LastPgInd")]
    pub last_page_indicator: bool,
}

/// Account Statement (AccountStatement2)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStatement {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "ElctrncSeqNb", skip_serializing_if = "Option::is_none")]
    pub electronic_sequence_number: Option<u64>,
    #[serde(rename = "CreDtTm", deserialize_with = "deserialize_iso_date_time")]
    pub creation_date_time: DateTime<FixedOffset>,
    #[serde(rename = "FrToDt", skip_serializing_if = "Option::is_none")]
    pub from_to_date: Option<DateTimePeriod>,
    #[serde(rename = "Acct", skip_serializing_if = "Option::is_none")]
    pub account: Option<CashAccount>,
    #[serde(rename = "Bal", default)]
    pub balances: Vec<CashBalance>,
    #[serde(rename = "Ntry", default)]
    pub entries: Vec<ReportEntry>,
}

/// Date Period for statement coverage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateTimePeriod {
    #[serde(rename = "FrDtTm", deserialize_with = "deserialize_iso_date_time")]
    pub from_date_time: DateTime<FixedOffset>,
    #[serde(rename = "ToDtTm", deserialize_with = "deserialize_iso_date_time")]
    pub to_date_time: DateTime<FixedOffset>,
}

/// Cash Balance (CashBalance3)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashBalance {
    #[serde(rename = "Tp")]
    pub balance_type: BalanceType,
    #[serde(rename = "Amt")]
    pub amount: ActiveOrHistoricCurrencyAndAmount,
    #[serde(rename = "CdtDbtInd")]
    pub credit_debit_indicator: CreditDebitCode,
    #[serde(rename = "Dt")]
    pub date: DateAndDateTime,
}

/// Balance Type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceType {
    #[serde(rename = "CdOrPrtry")]
    pub code_or_proprietary: CodeOrProprietary,
}

/// Balance code (OPBD, CLBD, CLAV, ...) or proprietary type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeOrProprietary {
    #[serde(rename = "Cd", skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(rename = "Prtry", skip_serializing_if = "Option::is_none")]
    pub proprietary: Option<String>,
}

/// Date or DateTime choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateAndDateTime {
    #[serde(rename = "Dt", skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "DtTm", skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
}

impl DateAndDateTime {
    /// Calendar day of either alternative
    pub fn day(&self) -> Option<NaiveDate> {
        self.date.or_else(|| {
            self.date_time
                .as_deref()
                .and_then(|dt| DateTime::parse_from_rfc3339(dt.trim()).ok())
                .map(|dt| dt.date_naive())
        })
    }
}

/// Report Entry - one booking on the statement (ReportEntry2)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    #[serde(rename = "NtryRef", skip_serializing_if = "Option::is_none")]
    pub entry_reference: Option<String>,
    #[serde(rename = "Amt")]
    pub amount: ActiveOrHistoricCurrencyAndAmount,
    #[serde(rename = "CdtDbtInd")]
    pub credit_debit_indicator: CreditDebitCode,
    #[serde(rename = "Sts")]
    pub status: String, // BOOK, PDNG, INFO
    #[serde(rename = "BookgDt", skip_serializing_if = "Option::is_none")]
    pub booking_date: Option<DateAndDateTime>,
    #[serde(rename = "ValDt", skip_serializing_if = "Option::is_none")]
    pub value_date: Option<DateAndDateTime>,
    #[serde(rename = "AcctSvcrRef", skip_serializing_if = "Option::is_none")]
    pub account_servicer_reference: Option<String>,
}

impl Camt053Document {
    /// Read a statement document from a byte stream
    pub fn read<R: BufRead>(reader: R) -> Result<Self> {
        let doc: Camt053Document = quick_xml::de::from_reader(reader)
            .map_err(|e| Error::Parse(format!("Failed to parse camt.053 document: {}", e)))?;

        let header = &doc.bank_to_customer_statement.group_header;
        info!(
            message_id = %header.message_id,
            statements = doc.bank_to_customer_statement.statements.len(),
            "camt.053 statement read"
        );

        Ok(doc)
    }

    pub fn message_id(&self) -> &str {
        &self.bank_to_customer_statement.group_header.message_id
    }

    pub fn creation_date_time(&self) -> DateTime<FixedOffset> {
        self.bank_to_customer_statement.group_header.creation_date_time
    }

    pub fn pagination(&self) -> Option<&Pagination> {
        self.bank_to_customer_statement
            .group_header
            .message_pagination
            .as_ref()
    }

    pub fn statements(&self) -> &[AccountStatement] {
        &self.bank_to_customer_statement.statements
    }
}

impl AccountStatement {
    /// Start of the reporting period
    pub fn from_date_time(&self) -> Option<DateTime<FixedOffset>> {
        self.from_to_date.as_ref().map(|period| period.from_date_time)
    }

    /// End of the reporting period
    pub fn to_date_time(&self) -> Option<DateTime<FixedOffset>> {
        self.from_to_date.as_ref().map(|period| period.to_date_time)
    }

    /// IBAN (or other id) of the reported account
    pub fn account_number(&self) -> Option<&str> {
        self.account.as_ref().and_then(|acct| acct.account_number())
    }

    /// Signed amount of the first balance with the given type code; debit balances are negative
    pub fn balance(&self, code: &str) -> Result<Option<Decimal>> {
        let balance = self
            .balances
            .iter()
            .find(|bal| bal.balance_type.code_or_proprietary.code.as_deref() == Some(code));

        match balance {
            Some(bal) => {
                let amount = bal
                    .amount
                    .to_decimal()
                    .map_err(|e| Error::Parse(format!("Failed to parse balance {}: {}", code, e)))?;
                Ok(Some(match bal.credit_debit_indicator {
                    CreditDebitCode::CRDT => amount,
                    CreditDebitCode::DBIT => -amount,
                }))
            }
            None => Ok(None),
        }
    }
}

/// Parse camt.053 XML document
pub fn parse_camt053(xml: &str) -> Result<Camt053Document> {
    Camt053Document::read(xml.as_bytes())
}
