//! Direct Debit Initiation builder
//!
//! Staging area for a pain.008 message. Callers set the group header once, open one
//! batch ([`PaymentInstruction`]) per collection date / sequence type / creditor
//! account, and append [`Transaction`]s to each batch. [`DirectDebitInitiation::build`]
//! turns the staged data into an immutable [`Pain008Document`] snapshot; totals are
//! recomputed from the current transactions every time.
//!
//! ```ignore
//! let mut message = DirectDebitInitiation::new();
//! message.init_header("MSGID001", "IPNORGANISATIENAAM", created_at)?;
//!
//! message
//!     .add_payment_instruction("PAYID001", collection_date, SequenceType::OOFF, creditor, None)?
//!     .add_transaction(transaction)?;
//!
//! message.serialize(&mut out, NamespaceMode::Minimal)?;
//! ```

use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use std::io::Write;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::iso20022::common::{
    format_amount, ActiveOrHistoricCurrencyAndAmount, Agent, CashAccount, PartyIdentification,
    RemittanceInformation,
};
use crate::iso20022::pain008::{
    AmendmentInformationDetails, ChargeBearerType, CustomerDirectDebitInitiation,
    DirectDebitTransaction, DirectDebitTransactionInformation, GroupHeader, LocalInstrument,
    MandateRelatedInformation, Pain008Document, PaymentIdentification, PaymentInformation,
    PaymentMethod, PaymentTypeInformation, SequenceType, ServiceLevel,
};
use crate::serializer::{self, NamespaceMode};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Largest amount a single SEPA transaction may carry
fn max_amount() -> Decimal {
    Decimal::new(99_999_999_999, 2) // 999 999 999.99
}

/// Name, postal address and account of a creditor or debtor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Party {
    pub name: String,
    /// ISO 3166 alpha-2 country code
    pub country: String,
    /// Free-form `AdrLine`s, at most two for SEPA
    pub address_lines: Vec<String>,
    pub iban: String,
    pub bic: String,
}

impl Party {
    /// Party with name, country, address lines, IBAN and BIC
    pub fn new<I, S>(
        name: impl Into<String>,
        country: impl Into<String>,
        address_lines: I,
        iban: impl Into<String>,
        bic: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            country: country.into(),
            address_lines: address_lines.into_iter().map(Into::into).collect(),
            iban: iban.into(),
            bic: bic.into(),
        }
    }

    fn identification(&self) -> PartyIdentification {
        PartyIdentification::with_address(&self.name, &self.country, &self.address_lines)
    }
}

/// A single collection from one debtor under one mandate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub instruction_id: String,
    pub end_to_end_id: String,
    pub amount: Decimal,
    pub mandate_id: String,
    pub mandate_signature_date: NaiveDate,
    pub debtor: Party,
    pub remittance_information: String,
    /// Debtor IBAN the mandate was signed with, when reporting an IBAN change
    pub original_debtor_iban: Option<String>,
    /// IBAN to debit from now on, when reporting an IBAN change
    pub replacement_debtor_iban: Option<String>,
    /// Overrides the batch creditor scheme id for this transaction only
    pub creditor_scheme_id: Option<String>,
}

impl Transaction {
    /// Collection without IBAN change or creditor scheme id override
    pub fn new(
        instruction_id: impl Into<String>,
        end_to_end_id: impl Into<String>,
        amount: Decimal,
        mandate_id: impl Into<String>,
        mandate_signature_date: NaiveDate,
        debtor: Party,
        remittance_information: impl Into<String>,
    ) -> Self {
        Self {
            instruction_id: instruction_id.into(),
            end_to_end_id: end_to_end_id.into(),
            amount,
            mandate_id: mandate_id.into(),
            mandate_signature_date,
            debtor,
            remittance_information: remittance_information.into(),
            original_debtor_iban: None,
            replacement_debtor_iban: None,
            creditor_scheme_id: None,
        }
    }

    /// Render a transaction-level `CdtrSchmeId`, overriding the batch id
    pub fn with_creditor_scheme_id(mut self, scheme_id: impl Into<String>) -> Self {
        self.creditor_scheme_id = Some(scheme_id.into());
        self
    }

    /// Report a change of debtor account since the mandate was signed.
    ///
    /// `DbtrAcct` then carries `replacement_iban` and `original_iban` goes to
    /// `AmdmntInfDtls/OrgnlDbtrAcct`; `debtor.iban` is not rendered and must
    /// equal one of the two.
    pub fn with_iban_change(
        mut self,
        original_iban: impl Into<String>,
        replacement_iban: impl Into<String>,
    ) -> Self {
        self.original_debtor_iban = Some(original_iban.into());
        self.replacement_debtor_iban = Some(replacement_iban.into());
        self
    }

    /// Original and replacement IBAN, if this transaction reports an IBAN change.
    ///
    /// Both must be present or both absent.
    pub fn iban_change(&self) -> Result<Option<(&str, &str)>> {
        match (&self.original_debtor_iban, &self.replacement_debtor_iban) {
            (Some(original), Some(replacement)) => Ok(Some((original, replacement))),
            (None, None) => Ok(None),
            (Some(_), None) => Err(Error::InvalidAmendment(format!(
                "transaction {} has an original debtor IBAN but no replacement IBAN",
                self.end_to_end_id
            ))),
            (None, Some(_)) => Err(Error::InvalidAmendment(format!(
                "transaction {} has a replacement debtor IBAN but no original IBAN",
                self.end_to_end_id
            ))),
        }
    }

    /// IBAN written to `DbtrAcct`
    pub fn debtor_account_iban(&self) -> &str {
        self.replacement_debtor_iban
            .as_deref()
            .unwrap_or(&self.debtor.iban)
    }

    fn validate(&self) -> Result<()> {
        validate_amount(self.amount)?;

        if let Some(scheme_id) = &self.creditor_scheme_id {
            if scheme_id.trim().is_empty() {
                return Err(Error::InvalidState(format!(
                    "transaction {} has a blank creditor scheme id",
                    self.end_to_end_id
                )));
            }
        }

        if let Some((original, replacement)) = self.iban_change()? {
            if original.trim().is_empty() || replacement.trim().is_empty() {
                return Err(Error::InvalidAmendment(format!(
                    "transaction {} reports an IBAN change with a blank IBAN",
                    self.end_to_end_id
                )));
            }
            if self.debtor.iban != original && self.debtor.iban != replacement {
                return Err(Error::InvalidAmendment(format!(
                    "transaction {} debtor IBAN {} is neither the original {} nor the replacement {}",
                    self.end_to_end_id, self.debtor.iban, original, replacement
                )));
            }
        }
        Ok(())
    }

    fn to_schema(&self, batch_scheme_id: Option<&str>) -> DirectDebitTransactionInformation {
        if self.creditor_scheme_id.is_none() && batch_scheme_id.is_none() {
            warn!(
                end_to_end_id = %self.end_to_end_id,
                "Transaction has no creditor scheme id at batch or transaction level"
            );
        }

        // Validated on insertion; a partial pair cannot be staged.
        let original_iban = match (&self.original_debtor_iban, &self.replacement_debtor_iban) {
            (Some(original), Some(_)) => Some(original.as_str()),
            _ => None,
        };

        DirectDebitTransactionInformation {
            payment_identification: PaymentIdentification {
                instruction_id: Some(self.instruction_id.clone()),
                end_to_end_id: self.end_to_end_id.clone(),
            },
            instructed_amount: ActiveOrHistoricCurrencyAndAmount::eur(self.amount),
            direct_debit_transaction: DirectDebitTransaction {
                mandate_related_information: MandateRelatedInformation {
                    mandate_id: self.mandate_id.clone(),
                    date_of_signature: self.mandate_signature_date.format(DATE_FORMAT).to_string(),
                    amendment_indicator: original_iban.map(|_| true),
                    amendment_information_details: original_iban.map(|iban| {
                        AmendmentInformationDetails {
                            original_debtor_account: Some(CashAccount::from_iban(iban)),
                        }
                    }),
                },
                creditor_scheme_identification: self
                    .creditor_scheme_id
                    .as_deref()
                    .map(PartyIdentification::sepa_creditor_scheme),
            },
            debtor_agent: Agent::from_bic(&self.debtor.bic),
            debtor: self.debtor.identification(),
            debtor_account: CashAccount::from_iban(self.debtor_account_iban()),
            remittance_information: if self.remittance_information.is_empty() {
                None
            } else {
                Some(RemittanceInformation {
                    unstructured: vec![self.remittance_information.clone()],
                })
            },
        }
    }
}

/// Amount must be positive, carry at most two fractional digits and stay within the SEPA maximum
pub fn validate_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    if amount.normalize().scale() > 2 {
        return Err(Error::InvalidAmount(format!(
            "amount must have at most two fractional digits, got {}",
            amount
        )));
    }
    if amount > max_amount() {
        return Err(Error::InvalidAmount(format!(
            "amount {} exceeds the SEPA maximum of {}",
            amount,
            max_amount()
        )));
    }
    Ok(())
}

/// One batch of collections sharing creditor, collection date and sequence type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentInstruction {
    payment_info_id: String,
    requested_collection_date: NaiveDate,
    sequence_type: SequenceType,
    creditor: Party,
    creditor_scheme_id: Option<String>,
    transactions: Vec<Transaction>,
}

impl PaymentInstruction {
    pub fn payment_info_id(&self) -> &str {
        &self.payment_info_id
    }

    pub fn requested_collection_date(&self) -> NaiveDate {
        self.requested_collection_date
    }

    pub fn sequence_type(&self) -> SequenceType {
        self.sequence_type
    }

    pub fn creditor(&self) -> &Party {
        &self.creditor
    }

    pub fn creditor_scheme_id(&self) -> Option<&str> {
        self.creditor_scheme_id.as_deref()
    }

    /// Transactions in insertion order
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Append a transaction to this batch
    pub fn add_transaction(&mut self, transaction: Transaction) -> Result<&mut Self> {
        transaction.validate()?;

        debug!(
            payment_info_id = %self.payment_info_id,
            end_to_end_id = %transaction.end_to_end_id,
            amount = %transaction.amount,
            iban_change = transaction.original_debtor_iban.is_some(),
            "Transaction added"
        );

        self.transactions.push(transaction);
        Ok(self)
    }

    /// Creditor scheme id in force for `transaction`: its own override, else the batch id
    pub fn effective_creditor_scheme_id<'a>(&'a self, transaction: &'a Transaction) -> Option<&'a str> {
        transaction
            .creditor_scheme_id
            .as_deref()
            .or(self.creditor_scheme_id.as_deref())
    }

    /// `NbOfTxs` of this batch
    pub fn number_of_transactions(&self) -> usize {
        self.transactions.len()
    }

    /// `CtrlSum` of this batch, exact
    pub fn control_sum(&self) -> Decimal {
        self.transactions.iter().map(|tx| tx.amount).sum()
    }

    fn to_schema(&self, config: &Config) -> Result<PaymentInformation> {
        if self.transactions.is_empty() {
            return Err(Error::Serialization(format!(
                "payment instruction {} has no transactions",
                self.payment_info_id
            )));
        }

        let direct_debit_transactions = self
            .transactions
            .iter()
            .map(|tx| tx.to_schema(self.creditor_scheme_id.as_deref()))
            .collect();

        Ok(PaymentInformation {
            payment_information_id: self.payment_info_id.clone(),
            payment_method: PaymentMethod::DD,
            batch_booking: config.batch_booking,
            number_of_transactions: Some(self.number_of_transactions().to_string()),
            control_sum: Some(format_amount(self.control_sum())),
            payment_type_information: Some(PaymentTypeInformation {
                service_level: Some(ServiceLevel {
                    code: "SEPA".to_string(),
                }),
                local_instrument: Some(LocalInstrument {
                    code: config.local_instrument,
                }),
                sequence_type: Some(self.sequence_type),
            }),
            requested_collection_date: self.requested_collection_date.format(DATE_FORMAT).to_string(),
            creditor: self.creditor.identification(),
            creditor_account: CashAccount::from_iban(&self.creditor.iban),
            creditor_agent: Agent::from_bic(&self.creditor.bic),
            charge_bearer: Some(ChargeBearerType::SLEV),
            creditor_scheme_identification: self
                .creditor_scheme_id
                .as_deref()
                .map(PartyIdentification::sepa_creditor_scheme),
            direct_debit_transactions,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Header {
    message_id: String,
    initiating_party_name: String,
    created_at: DateTime<FixedOffset>,
}

/// Builder for pain.008 messages
#[derive(Debug, Clone)]
pub struct DirectDebitInitiation {
    config: Config,
    header: Option<Header>,
    payment_instructions: Vec<PaymentInstruction>,
}

impl Default for DirectDebitInitiation {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectDebitInitiation {
    /// Empty message with [`Config::default`]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            header: None,
            payment_instructions: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Set the group header. Allowed exactly once, before any batch is added.
    pub fn init_header(
        &mut self,
        message_id: impl Into<String>,
        initiating_party_name: impl Into<String>,
        created_at: impl Into<DateTime<FixedOffset>>,
    ) -> Result<()> {
        if let Some(header) = &self.header {
            return Err(Error::InvalidState(format!(
                "group header already set for message {}",
                header.message_id
            )));
        }

        let message_id = message_id.into();
        let initiating_party_name = initiating_party_name.into();

        if message_id.trim().is_empty() {
            return Err(Error::InvalidState("message id must not be empty".to_string()));
        }
        if initiating_party_name.trim().is_empty() {
            return Err(Error::InvalidState(
                "initiating party name must not be empty".to_string(),
            ));
        }

        debug!(message_id = %message_id, "Group header set");

        self.header = Some(Header {
            message_id,
            initiating_party_name,
            created_at: created_at.into(),
        });
        Ok(())
    }

    pub fn message_id(&self) -> Option<&str> {
        self.header.as_ref().map(|h| h.message_id.as_str())
    }

    pub fn creation_date_time(&self) -> Option<DateTime<FixedOffset>> {
        self.header.as_ref().map(|h| h.created_at)
    }

    /// Open a new batch and return it for adding transactions
    pub fn add_payment_instruction(
        &mut self,
        payment_info_id: impl Into<String>,
        requested_collection_date: NaiveDate,
        sequence_type: SequenceType,
        creditor: Party,
        creditor_scheme_id: Option<String>,
    ) -> Result<&mut PaymentInstruction> {
        let header = self.header.as_ref().ok_or_else(|| {
            Error::InvalidState("group header must be set before adding payment instructions".to_string())
        })?;

        let payment_info_id = payment_info_id.into();
        if payment_info_id.trim().is_empty() {
            return Err(Error::InvalidState(
                "payment information id must not be empty".to_string(),
            ));
        }
        if self
            .payment_instructions
            .iter()
            .any(|pi| pi.payment_info_id == payment_info_id)
        {
            return Err(Error::InvalidState(format!(
                "payment instruction {} already exists in message {}",
                payment_info_id, header.message_id
            )));
        }

        if let Some(scheme_id) = &creditor_scheme_id {
            if scheme_id.trim().is_empty() {
                return Err(Error::InvalidState(format!(
                    "payment instruction {} has a blank creditor scheme id",
                    payment_info_id
                )));
            }
        }

        let created_on = header.created_at.date_naive();
        if requested_collection_date < created_on {
            if self.config.reject_past_collection_date {
                return Err(Error::InvalidState(format!(
                    "collection date {} precedes message creation date {}",
                    requested_collection_date, created_on
                )));
            }
            warn!(
                payment_info_id = %payment_info_id,
                collection_date = %requested_collection_date,
                created_on = %created_on,
                "Requested collection date precedes message creation date"
            );
        }

        debug!(
            message_id = %header.message_id,
            payment_info_id = %payment_info_id,
            sequence_type = %sequence_type,
            "Payment instruction added"
        );

        self.payment_instructions.push(PaymentInstruction {
            payment_info_id,
            requested_collection_date,
            sequence_type,
            creditor,
            creditor_scheme_id,
            transactions: Vec::new(),
        });

        let index = self.payment_instructions.len() - 1;
        Ok(&mut self.payment_instructions[index])
    }

    /// Look up a previously added batch
    pub fn payment_instruction_mut(&mut self, payment_info_id: &str) -> Result<&mut PaymentInstruction> {
        self.payment_instructions
            .iter_mut()
            .find(|pi| pi.payment_info_id == payment_info_id)
            .ok_or_else(|| {
                Error::InvalidState(format!("no payment instruction with id {}", payment_info_id))
            })
    }

    pub fn payment_instructions(&self) -> &[PaymentInstruction] {
        &self.payment_instructions
    }

    /// `GrpHdr/NbOfTxs`: transactions across all batches
    pub fn number_of_transactions(&self) -> usize {
        self.payment_instructions
            .iter()
            .map(PaymentInstruction::number_of_transactions)
            .sum()
    }

    /// `GrpHdr/CtrlSum`: sum of all batch control sums
    pub fn control_sum(&self) -> Decimal {
        self.payment_instructions
            .iter()
            .map(PaymentInstruction::control_sum)
            .sum()
    }

    /// Snapshot the staged message as a schema document
    pub fn build(&self) -> Result<Pain008Document> {
        let header = self.header.as_ref().ok_or_else(|| {
            Error::Serialization("group header has not been set".to_string())
        })?;

        if self.payment_instructions.is_empty() {
            return Err(Error::Serialization(format!(
                "message {} has no payment instructions",
                header.message_id
            )));
        }

        let payment_information = self
            .payment_instructions
            .iter()
            .map(|pi| pi.to_schema(&self.config))
            .collect::<Result<Vec<_>>>()?;

        Ok(Pain008Document {
            customer_direct_debit_initiation: CustomerDirectDebitInitiation {
                group_header: GroupHeader {
                    message_id: header.message_id.clone(),
                    creation_date_time: header.created_at.format(DATE_TIME_FORMAT).to_string(),
                    number_of_transactions: self.number_of_transactions().to_string(),
                    control_sum: Some(format_amount(self.control_sum())),
                    initiating_party: PartyIdentification {
                        name: Some(header.initiating_party_name.clone()),
                        postal_address: None,
                        identification: None,
                    },
                },
                payment_information,
            },
        })
    }

    /// Render the message as XML into `sink`
    #[instrument(skip(self, sink), fields(message_id = self.message_id().unwrap_or_default()))]
    pub fn serialize<W: Write>(&self, sink: W, mode: NamespaceMode) -> Result<()> {
        let document = self.build()?;
        serializer::write_document(&document, mode, self.config.indent, sink)?;

        info!(
            batches = self.payment_instructions.len(),
            transactions = self.number_of_transactions(),
            control_sum = %format_amount(self.control_sum()),
            "pain.008 message serialized"
        );
        Ok(())
    }

    /// Render the message as an XML string
    pub fn to_xml(&self, mode: NamespaceMode) -> Result<String> {
        let document = self.build()?;
        serializer::to_xml_string(&document, mode, self.config.indent)
    }
}
