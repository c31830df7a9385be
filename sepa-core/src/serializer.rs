//! XML rendering of pain.008 documents
//!
//! Both namespace variants share one serde model; only the root attributes differ.

use serde::Serialize;
use std::io::Write;
use tracing::debug;

use crate::error::{Error, Result};
use crate::iso20022::pain008::{
    CustomerDirectDebitInitiation, Pain008Document, NAMESPACE, SCHEMA_LOCATION, XSI_NAMESPACE,
};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Namespace declarations written on the root `Document` element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamespaceMode {
    /// Default namespace only
    #[default]
    Minimal,
    /// Default namespace plus `xmlns:xsi` and `xsi:schemaLocation`
    WithSchemaLocation,
}

#[derive(Serialize)]
#[serde(rename = "Document")]
struct DocumentEnvelope<'a> {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "@xmlns:xsi", skip_serializing_if = "Option::is_none")]
    xmlns_xsi: Option<&'static str>,
    #[serde(rename = "@xsi:schemaLocation", skip_serializing_if = "Option::is_none")]
    schema_location: Option<&'static str>,
    #[serde(rename = "CstmrDrctDbtInitn")]
    initiation: &'a CustomerDirectDebitInitiation,
}

impl<'a> DocumentEnvelope<'a> {
    fn new(document: &'a Pain008Document, mode: NamespaceMode) -> Self {
        let (xmlns_xsi, schema_location) = match mode {
            NamespaceMode::Minimal => (None, None),
            NamespaceMode::WithSchemaLocation => (Some(XSI_NAMESPACE), Some(SCHEMA_LOCATION)),
        };

        Self {
            xmlns: NAMESPACE,
            xmlns_xsi,
            schema_location,
            initiation: &document.customer_direct_debit_initiation,
        }
    }
}

/// Reject documents the schema cardinality does not allow
fn check_complete(document: &Pain008Document) -> Result<()> {
    let initiation = &document.customer_direct_debit_initiation;

    if initiation.payment_information.is_empty() {
        return Err(Error::Serialization(format!(
            "message {} has no payment information",
            initiation.group_header.message_id
        )));
    }

    if let Some(empty) = initiation
        .payment_information
        .iter()
        .find(|pi| pi.direct_debit_transactions.is_empty())
    {
        return Err(Error::Serialization(format!(
            "payment information {} has no transactions",
            empty.payment_information_id
        )));
    }

    Ok(())
}

/// Render a document to an XML string, declaration included
pub fn to_xml_string(
    document: &Pain008Document,
    mode: NamespaceMode,
    indent: Option<usize>,
) -> Result<String> {
    check_complete(document)?;

    let mut buffer = String::with_capacity(4096);
    buffer.push_str(XML_DECLARATION);
    buffer.push('\n');

    let mut serializer = quick_xml::se::Serializer::new(&mut buffer);
    if let Some(width) = indent {
        serializer.indent(' ', width);
    }

    DocumentEnvelope::new(document, mode)
        .serialize(serializer)
        .map(|_| ())
        .map_err(|e| Error::Serialization(format!("Failed to generate pain.008 XML: {}", e)))?;

    buffer.push('\n');
    Ok(buffer)
}

/// Render a document and write all bytes to `sink`.
///
/// On error the sink may hold a partial document and should be discarded.
pub fn write_document<W: Write>(
    document: &Pain008Document,
    mode: NamespaceMode,
    indent: Option<usize>,
    mut sink: W,
) -> Result<()> {
    let xml = to_xml_string(document, mode, indent)?;
    sink.write_all(xml.as_bytes())?;
    sink.flush()?;

    debug!(bytes = xml.len(), ?mode, "pain.008 document written");
    Ok(())
}
