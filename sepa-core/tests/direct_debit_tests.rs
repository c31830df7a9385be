//! End-to-end tests for pain.008 generation
//!
//! Expected documents live in `tests/fixtures/`; comparison is structural
//! (both sides parsed into the schema model) so whitespace does not matter.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use sepa_core::{
    parse_pain008, Config, DirectDebitInitiation, Error, NamespaceMode, Party, SequenceType,
    Transaction,
};
use std::io::{self, Write};
use std::str::FromStr;

const ING_EXPECTED: &str = include_str!("fixtures/ing_pain008.xml");
const ABN_EXPECTED: &str = include_str!("fixtures/abn_pain008.xml");
const CHANGE_IBAN_EXPECTED: &str = include_str!("fixtures/ing_change_iban.xml");
const BATCH_SCHEME_EXPECTED: &str = include_str!("fixtures/ing_cdtr_schme_id_payment_instruction.xml");

fn created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2012, 2, 22, 9, 29, 54).unwrap()
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::from_str(s).unwrap()
}

fn amount(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn ing_creditor() -> Party {
    Party::new(
        "NAAM",
        "NL",
        ["Dorpstraat 1", "Amsterdam"],
        "NL28INGB0000000001",
        "INGBNL2A",
    )
}

fn ing_debtor(iban: &str, bic: &str) -> Party {
    Party::new(
        "NAAM",
        "DE",
        ["123, ABC street", "32547 Frankfurt Germany"],
        iban,
        bic,
    )
}

fn ing_transaction() -> Transaction {
    Transaction::new(
        "01-E30220000000382012",
        "E2EID001",
        amount("1.01"),
        "MANDAATIDNR001",
        date("2011-12-31"),
        ing_debtor("NL98INGB0000000002", "INGBNL2A"),
        "Omschrijving / vrije tekst",
    )
}

fn ing_message(transaction: Transaction, batch_scheme_id: Option<&str>) -> DirectDebitInitiation {
    sepa_core::telemetry::init_tracing();

    let mut message = DirectDebitInitiation::new();
    message
        .init_header("MSGID001", "IPNORGANISATIENAAM", created_at())
        .unwrap();
    message
        .add_payment_instruction(
            "PAYID001",
            date("2012-02-05"),
            SequenceType::OOFF,
            ing_creditor(),
            batch_scheme_id.map(str::to_string),
        )
        .unwrap()
        .add_transaction(transaction)
        .unwrap();
    message
}

fn assert_same_document(actual: &str, expected: &str) {
    let actual = parse_pain008(actual).expect("generated XML should parse");
    let expected = parse_pain008(expected).expect("fixture should parse");
    assert_eq!(actual, expected);
}

/// Raw text of every `<tag ...>text</tag>` occurrence, untrimmed
fn element_texts<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    xml.match_indices(&open)
        .filter_map(|(start, _)| {
            let rest = &xml[start..];
            let body = &rest[rest.find('>')? + 1..];
            Some(&body[..body.find(&close)?])
        })
        .collect()
}

fn position(xml: &str, needle: &str) -> usize {
    xml.find(needle)
        .unwrap_or_else(|| panic!("{} not found in output", needle))
}

#[test]
fn test_ing_example() {
    let message = ing_message(
        ing_transaction().with_creditor_scheme_id("NL89ZZZ011234567890"),
        None,
    );

    let xml = message.to_xml(NamespaceMode::Minimal).unwrap();
    assert_same_document(&xml, ING_EXPECTED);

    assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert!(xml.contains(r#"<Document xmlns="urn:iso:std:iso:20022:tech:xsd:pain.008.001.02">"#));
    assert!(!xml.contains("xmlns:xsi"));
    assert!(xml.contains("<NbOfTxs>1</NbOfTxs>"));
    assert!(xml.contains("<CtrlSum>1.01</CtrlSum>"));
    assert!(xml.contains(r#"<InstdAmt Ccy="EUR">1.01</InstdAmt>"#));
    assert!(xml.contains("<CreDtTm>2012-02-22T09:29:54+00:00</CreDtTm>"));
    assert!(xml.contains("<ReqdColltnDt>2012-02-05</ReqdColltnDt>"));
    assert!(xml.contains("<DtOfSgntr>2011-12-31</DtOfSgntr>"));
}

#[test]
fn test_abn_example() {
    let mut message = DirectDebitInitiation::new();
    message.init_header("1000004207", "Naam", created_at()).unwrap();

    let creditor = Party::new(
        "Naam",
        "NL",
        ["Dorpstraat 1", "Amsterdam"],
        "DE12345678901234567890",
        "ABNADEFFFRA",
    );
    let debtor = Party::new(
        "FICO Customer account",
        "DE",
        ["123, ABC street", "32547 Frankfurt Germany"],
        "DE12345678901234567890",
        "NBAGDE3E",
    );

    message
        .add_payment_instruction("1000004207", date("2012-02-21"), SequenceType::RCUR, creditor, None)
        .unwrap()
        .add_transaction(
            Transaction::new(
                "01-E30220000000382012",
                "2000000038",
                amount("1600.00"),
                "MANDAAT123456",
                date("2010-09-05"),
                debtor,
                "/INV/ 8/29/2011",
            )
            .with_creditor_scheme_id("NL89ZZZ011234567890"),
        )
        .unwrap();

    let xml = message.to_xml(NamespaceMode::Minimal).unwrap();
    assert_same_document(&xml, ABN_EXPECTED);
    assert!(xml.contains("<CtrlSum>1600.00</CtrlSum>"));
}

#[test]
fn test_payment_with_iban_changed() {
    let message = ing_message(
        ing_transaction()
            .with_creditor_scheme_id("NL89ZZZ011234567890")
            .with_iban_change("NL98INGB0000000002", "NL98INGB0000000011"),
        None,
    );

    let xml = message.to_xml(NamespaceMode::WithSchemaLocation).unwrap();
    assert_same_document(&xml, CHANGE_IBAN_EXPECTED);

    assert!(xml.contains(r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#));
    assert!(xml.contains(
        r#"xsi:schemaLocation="urn:iso:std:iso:20022:tech:xsd:pain.008.001.02 pain.008.001.02.xsd""#
    ));
    assert!(xml.contains("<AmdmntInd>true</AmdmntInd>"));
}

#[test]
fn test_creditor_scheme_id_in_payment_instruction() {
    sepa_core::telemetry::init_tracing();

    let mut message = DirectDebitInitiation::new();
    message
        .init_header("MSGID001", "IPNORGANISATIENAAM", created_at())
        .unwrap();
    message
        .add_payment_instruction(
            "PAYID001",
            date("2012-02-05"),
            SequenceType::OOFF,
            ing_creditor(),
            Some("NL89ZZZ011234567890".to_string()),
        )
        .unwrap()
        .add_transaction(ing_transaction())
        .unwrap()
        .add_transaction(Transaction::new(
            "01-E30220000000382013",
            "E2EID002",
            amount("1.03"),
            "MANDAATIDNR001",
            date("2011-12-31"),
            ing_debtor("NL98INGB0000000003", "INGBNL23"),
            "Omschrijving / vrije tekst",
        ))
        .unwrap();

    let xml = message.to_xml(NamespaceMode::WithSchemaLocation).unwrap();
    assert_same_document(&xml, BATCH_SCHEME_EXPECTED);

    // Batch-level id only, once, before the transactions
    assert_eq!(xml.matches("<CdtrSchmeId>").count(), 1);
    assert!(position(&xml, "<CdtrSchmeId>") < position(&xml, "<DrctDbtTxInf>"));
    assert!(xml.contains("<CtrlSum>2.04</CtrlSum>"));
}

#[test]
fn test_transaction_scheme_id_overrides_batch() {
    let message = ing_message(
        ing_transaction().with_creditor_scheme_id("DE98ZZZ09999999999"),
        Some("NL89ZZZ011234567890"),
    );

    let doc = message.build().unwrap();
    let batch = &doc.customer_direct_debit_initiation.payment_information[0];
    let tx = &batch.direct_debit_transactions[0];

    assert_eq!(
        batch
            .creditor_scheme_identification
            .as_ref()
            .and_then(|id| id.private_other_id()),
        Some("NL89ZZZ011234567890")
    );
    assert_eq!(
        tx.direct_debit_transaction
            .creditor_scheme_identification
            .as_ref()
            .and_then(|id| id.private_other_id()),
        Some("DE98ZZZ09999999999")
    );
}

#[test]
fn test_optional_blocks_absent() {
    let message = ing_message(ing_transaction(), None);
    let xml = message.to_xml(NamespaceMode::Minimal).unwrap();

    assert!(!xml.contains("AmdmntInd"));
    assert!(!xml.contains("AmdmntInfDtls"));
    assert!(!xml.contains("CdtrSchmeId"));
    assert!(!xml.contains("BtchBookg"));
    assert!(!xml.contains("/>"), "empty element rendered");
}

#[test]
fn test_blank_scheme_ids_never_rendered() {
    let mut message = DirectDebitInitiation::new();
    message
        .init_header("MSGID001", "IPNORGANISATIENAAM", created_at())
        .unwrap();

    let err = message
        .add_payment_instruction(
            "PAYID001",
            date("2012-02-05"),
            SequenceType::OOFF,
            ing_creditor(),
            Some(String::new()),
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));

    let batch = message
        .add_payment_instruction("PAYID001", date("2012-02-05"), SequenceType::OOFF, ing_creditor(), None)
        .unwrap();
    let err = batch
        .add_transaction(ing_transaction().with_creditor_scheme_id(""))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));

    batch.add_transaction(ing_transaction()).unwrap();
    let xml = message.to_xml(NamespaceMode::Minimal).unwrap();
    assert!(!xml.contains("CdtrSchmeId"));
    assert!(!xml.contains("/>"), "empty element rendered");
}

#[test]
fn test_element_order_follows_schema() {
    let message = ing_message(ing_transaction().with_creditor_scheme_id("NL89ZZZ011234567890"), None);
    let xml = message.to_xml(NamespaceMode::Minimal).unwrap();

    let order = [
        "<GrpHdr>",
        "<PmtInf>",
        "<PmtInfId>",
        "<PmtMtd>",
        "<PmtTpInf>",
        "<ReqdColltnDt>",
        "<Cdtr>",
        "<CdtrAcct>",
        "<CdtrAgt>",
        "<ChrgBr>",
        "<DrctDbtTxInf>",
        "<PmtId>",
        "<InstdAmt",
        "<DrctDbtTx>",
        "<DbtrAgt>",
        "<Dbtr>",
        "<DbtrAcct>",
        "<RmtInf>",
    ];
    for pair in order.windows(2) {
        assert!(
            position(&xml, pair[0]) < position(&xml, pair[1]),
            "{} should precede {}",
            pair[0],
            pair[1]
        );
    }

    assert!(position(&xml, "<AdrLine>Dorpstraat 1</AdrLine>") < position(&xml, "<AdrLine>Amsterdam</AdrLine>"));
}

#[test]
fn test_totals_across_batches() {
    let mut message = DirectDebitInitiation::new();
    message
        .init_header("MSGID001", "IPNORGANISATIENAAM", created_at())
        .unwrap();

    message
        .add_payment_instruction("FRST-1", date("2012-03-01"), SequenceType::FRST, ing_creditor(), None)
        .unwrap()
        .add_transaction(ing_transaction())
        .unwrap();

    let rcur = message
        .add_payment_instruction("RCUR-1", date("2012-03-01"), SequenceType::RCUR, ing_creditor(), None)
        .unwrap();
    for (i, value) in ["0.10", "0.20", "99.99"].iter().enumerate() {
        let mut tx = ing_transaction();
        tx.end_to_end_id = format!("E2E-R-{}", i);
        tx.amount = amount(value);
        rcur.add_transaction(tx).unwrap();
    }

    let doc = message.build().unwrap();
    let initiation = &doc.customer_direct_debit_initiation;

    assert_eq!(initiation.group_header.number_of_transactions, "4");
    assert_eq!(initiation.group_header.control_sum.as_deref(), Some("101.30"));
    assert_eq!(initiation.payment_information[0].control_sum.as_deref(), Some("1.01"));
    assert_eq!(initiation.payment_information[1].number_of_transactions.as_deref(), Some("3"));
    assert_eq!(initiation.payment_information[1].control_sum.as_deref(), Some("100.29"));
}

#[test]
fn test_serialize_is_idempotent() {
    let message = ing_message(ing_transaction(), Some("NL89ZZZ011234567890"));

    let mut first = Vec::new();
    let mut second = Vec::new();
    message.serialize(&mut first, NamespaceMode::WithSchemaLocation).unwrap();
    message.serialize(&mut second, NamespaceMode::WithSchemaLocation).unwrap();

    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert_eq!(
        String::from_utf8(first).unwrap(),
        message.to_xml(NamespaceMode::WithSchemaLocation).unwrap()
    );
}

#[test]
fn test_batch_without_transactions_fails_serialization() {
    let mut message = DirectDebitInitiation::new();
    message
        .init_header("MSGID001", "IPNORGANISATIENAAM", created_at())
        .unwrap();
    message
        .add_payment_instruction("PAYID001", date("2012-02-05"), SequenceType::OOFF, ing_creditor(), None)
        .unwrap();

    let mut sink = Vec::new();
    let err = message.serialize(&mut sink, NamespaceMode::Minimal).unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
    assert!(sink.is_empty());
}

#[test]
fn test_zero_and_negative_amounts_rejected() {
    let mut message = ing_message(ing_transaction(), None);
    let batch = message.payment_instruction_mut("PAYID001").unwrap();

    for value in ["0.00", "-1.01"] {
        let mut tx = ing_transaction();
        tx.amount = amount(value);
        assert!(matches!(batch.add_transaction(tx), Err(Error::InvalidAmount(_))));
    }
    assert_eq!(batch.number_of_transactions(), 1);
}

struct BrokenSink;

impl Write for BrokenSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_sink_failure_propagates_io_error() {
    let message = ing_message(ing_transaction(), None);
    let err = message.serialize(BrokenSink, NamespaceMode::Minimal).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_text_is_escaped() {
    let mut tx = ing_transaction();
    tx.remittance_information = "Contributie <2012> & borg".to_string();
    let message = ing_message(tx, None);

    let xml = message.to_xml(NamespaceMode::Minimal).unwrap();
    assert!(xml.contains("Contributie &lt;2012"));
    assert!(xml.contains("&amp; borg"));

    let parsed = parse_pain008(&xml).unwrap();
    let rmt = parsed.transactions().next().unwrap().remittance_information.as_ref().unwrap();
    assert_eq!(rmt.unstructured, vec!["Contributie <2012> & borg".to_string()]);
}

#[test]
fn test_config_shapes_output() {
    let config = Config {
        local_instrument: "B2B".parse().unwrap(),
        batch_booking: Some(true),
        indent: None,
        ..Config::default()
    };
    let mut message = DirectDebitInitiation::with_config(config);
    message
        .init_header("MSGID001", "IPNORGANISATIENAAM", created_at())
        .unwrap();
    message
        .add_payment_instruction("PAYID001", date("2012-02-05"), SequenceType::OOFF, ing_creditor(), None)
        .unwrap()
        .add_transaction(ing_transaction())
        .unwrap();

    let xml = message.to_xml(NamespaceMode::Minimal).unwrap();
    assert!(xml.contains("<LclInstrm><Cd>B2B</Cd></LclInstrm>"));
    assert!(xml.contains("<BtchBookg>true</BtchBookg>"));
    assert!(position(&xml, "<PmtMtd>") < position(&xml, "<BtchBookg>"));
    assert!(position(&xml, "<BtchBookg>") < position(&xml, "<NbOfTxs>1</NbOfTxs><CtrlSum>1.01</CtrlSum><PmtTpInf>"));
}

#[test]
fn test_amount_text_is_exact_when_indented() {
    for indent in [Some(2), Some(4), None] {
        let mut message = DirectDebitInitiation::with_config(Config {
            indent,
            ..Config::default()
        });
        message
            .init_header("MSGID001", "IPNORGANISATIENAAM", created_at())
            .unwrap();
        message
            .add_payment_instruction("PAYID001", date("2012-02-05"), SequenceType::OOFF, ing_creditor(), None)
            .unwrap()
            .add_transaction(ing_transaction())
            .unwrap()
            .add_transaction(Transaction {
                end_to_end_id: "E2EID002".to_string(),
                amount: amount("1600"),
                ..ing_transaction()
            })
            .unwrap();

        let xml = message.to_xml(NamespaceMode::WithSchemaLocation).unwrap();
        assert_eq!(element_texts(&xml, "InstdAmt"), vec!["1.01", "1600.00"], "indent {:?}", indent);
        assert_eq!(element_texts(&xml, "CtrlSum"), vec!["1601.01", "1601.01"], "indent {:?}", indent);
        assert_eq!(element_texts(&xml, "NbOfTxs"), vec!["2", "2"], "indent {:?}", indent);
    }
}
