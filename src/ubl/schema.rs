//! Structural validation of UBL 2.1 Invoice documents.
//!
//! The element model below covers the Invoice subset this service reads and
//! writes: sequence order, occurrence bounds, namespaces, typed leaf content
//! and mandatory attributes. Elements modelled as [`Content::Any`] are
//! accepted without inspecting their children.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::xml::XmlNode;
use super::{CAC_NS, CBC_NS, INVOICE_NS};

/// Stage one of document validation.
#[cfg_attr(test, mockall::automock)]
pub trait SchemaValidator: Send + Sync {
    /// Returns the first structural violation found in `document`.
    fn check(&self, document: &XmlNode) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy)]
enum Content {
    Complex(&'static [Particle]),
    Text,
    Identifier,
    Code,
    Date,
    /// Decimal with a mandatory `currencyID`
    Amount,
    /// Decimal with an optional `unitCode`
    Quantity,
    Any,
}

#[derive(Debug, Clone, Copy)]
struct Particle {
    ns: &'static str,
    prefix: &'static str,
    name: &'static str,
    min: u32,
    /// `None` is unbounded
    max: Option<u32>,
    content: Content,
}

impl Particle {
    const fn cbc(name: &'static str, min: u32, max: Option<u32>, content: Content) -> Self {
        Self {
            ns: CBC_NS,
            prefix: "cbc",
            name,
            min,
            max,
            content,
        }
    }

    const fn cac(
        name: &'static str,
        min: u32,
        max: Option<u32>,
        children: &'static [Particle],
    ) -> Self {
        Self {
            ns: CAC_NS,
            prefix: "cac",
            name,
            min,
            max,
            content: Content::Complex(children),
        }
    }

    const fn cac_any(name: &'static str, min: u32, max: Option<u32>) -> Self {
        Self {
            ns: CAC_NS,
            prefix: "cac",
            name,
            min,
            max,
            content: Content::Any,
        }
    }

    fn label(&self) -> String {
        format!("{}:{}", self.prefix, self.name)
    }

    fn matches(&self, node: &XmlNode) -> bool {
        node.name == self.name && node.namespace.as_deref() == Some(self.ns)
    }
}

const ONE: Option<u32> = Some(1);
const MANY: Option<u32> = None;

const ID_ONLY: &[Particle] = &[Particle::cbc("ID", 1, ONE, Content::Identifier)];

const PARTY_NAME: &[Particle] = &[Particle::cbc("Name", 1, ONE, Content::Text)];

const PARTY_LEGAL_ENTITY: &[Particle] = &[
    Particle::cbc("RegistrationName", 0, ONE, Content::Text),
    Particle::cbc("CompanyID", 0, ONE, Content::Identifier),
];

const PARTY: &[Particle] = &[
    Particle::cbc("EndpointID", 0, ONE, Content::Identifier),
    Particle::cac("PartyIdentification", 0, MANY, ID_ONLY),
    Particle::cac("PartyName", 0, MANY, PARTY_NAME),
    Particle::cac_any("PostalAddress", 0, ONE),
    Particle::cac_any("PartyTaxScheme", 0, MANY),
    Particle::cac("PartyLegalEntity", 0, MANY, PARTY_LEGAL_ENTITY),
    Particle::cac_any("Contact", 0, ONE),
];

const PARTY_WRAPPER: &[Particle] = &[Particle::cac("Party", 1, ONE, PARTY)];

const ORDER_REFERENCE: &[Particle] = &[
    Particle::cbc("ID", 1, ONE, Content::Identifier),
    Particle::cbc("SalesOrderID", 0, ONE, Content::Identifier),
    Particle::cbc("IssueDate", 0, ONE, Content::Date),
];

const PAYMENT_MEANS: &[Particle] = &[
    Particle::cbc("PaymentMeansCode", 1, ONE, Content::Code),
    Particle::cbc("PaymentDueDate", 0, ONE, Content::Date),
    Particle::cbc("PaymentID", 0, MANY, Content::Identifier),
    Particle::cac_any("PayeeFinancialAccount", 0, ONE),
];

const TAX_TOTAL: &[Particle] = &[
    Particle::cbc("TaxAmount", 1, ONE, Content::Amount),
    Particle::cac_any("TaxSubtotal", 0, MANY),
];

const MONETARY_TOTAL: &[Particle] = &[
    Particle::cbc("LineExtensionAmount", 0, ONE, Content::Amount),
    Particle::cbc("TaxExclusiveAmount", 0, ONE, Content::Amount),
    Particle::cbc("TaxInclusiveAmount", 0, ONE, Content::Amount),
    Particle::cbc("AllowanceTotalAmount", 0, ONE, Content::Amount),
    Particle::cbc("ChargeTotalAmount", 0, ONE, Content::Amount),
    Particle::cbc("PrepaidAmount", 0, ONE, Content::Amount),
    Particle::cbc("PayableRoundingAmount", 0, ONE, Content::Amount),
    Particle::cbc("PayableAmount", 1, ONE, Content::Amount),
];

const ITEM: &[Particle] = &[
    Particle::cbc("Description", 0, MANY, Content::Text),
    Particle::cbc("Name", 0, ONE, Content::Text),
    Particle::cac("BuyersItemIdentification", 0, ONE, ID_ONLY),
    Particle::cac("SellersItemIdentification", 0, ONE, ID_ONLY),
    Particle::cac("StandardItemIdentification", 0, ONE, ID_ONLY),
    Particle::cac_any("ClassifiedTaxCategory", 0, MANY),
    Particle::cac_any("AdditionalItemProperty", 0, MANY),
];

const PRICE: &[Particle] = &[
    Particle::cbc("PriceAmount", 1, ONE, Content::Amount),
    Particle::cbc("BaseQuantity", 0, ONE, Content::Quantity),
];

const LINE_REFERENCE: &[Particle] = &[Particle::cbc("LineID", 1, ONE, Content::Identifier)];

const INVOICE_LINE: &[Particle] = &[
    Particle::cbc("ID", 1, ONE, Content::Identifier),
    Particle::cbc("Note", 0, MANY, Content::Text),
    Particle::cbc("InvoicedQuantity", 0, ONE, Content::Quantity),
    Particle::cbc("LineExtensionAmount", 1, ONE, Content::Amount),
    Particle::cbc("AccountingCost", 0, ONE, Content::Text),
    Particle::cac("OrderLineReference", 0, MANY, LINE_REFERENCE),
    Particle::cac("Item", 1, ONE, ITEM),
    Particle::cac("Price", 0, ONE, PRICE),
];

const INVOICE: &[Particle] = &[
    Particle::cbc("UBLVersionID", 0, ONE, Content::Identifier),
    Particle::cbc("CustomizationID", 0, ONE, Content::Identifier),
    Particle::cbc("ProfileID", 0, ONE, Content::Identifier),
    Particle::cbc("ID", 1, ONE, Content::Identifier),
    Particle::cbc("UUID", 0, ONE, Content::Identifier),
    Particle::cbc("IssueDate", 1, ONE, Content::Date),
    Particle::cbc("DueDate", 0, ONE, Content::Date),
    Particle::cbc("InvoiceTypeCode", 0, ONE, Content::Code),
    Particle::cbc("Note", 0, MANY, Content::Text),
    Particle::cbc("TaxPointDate", 0, ONE, Content::Date),
    Particle::cbc("DocumentCurrencyCode", 0, ONE, Content::Code),
    Particle::cbc("TaxCurrencyCode", 0, ONE, Content::Code),
    Particle::cbc("AccountingCost", 0, ONE, Content::Text),
    Particle::cbc("BuyerReference", 0, ONE, Content::Text),
    Particle::cac_any("InvoicePeriod", 0, MANY),
    Particle::cac("OrderReference", 0, ONE, ORDER_REFERENCE),
    Particle::cac_any("BillingReference", 0, MANY),
    Particle::cac_any("DespatchDocumentReference", 0, MANY),
    Particle::cac_any("AdditionalDocumentReference", 0, MANY),
    Particle::cac("AccountingSupplierParty", 1, ONE, PARTY_WRAPPER),
    Particle::cac("AccountingCustomerParty", 1, ONE, PARTY_WRAPPER),
    Particle::cac_any("PayeeParty", 0, ONE),
    Particle::cac_any("Delivery", 0, MANY),
    Particle::cac("PaymentMeans", 0, MANY, PAYMENT_MEANS),
    Particle::cac_any("PaymentTerms", 0, MANY),
    Particle::cac_any("AllowanceCharge", 0, MANY),
    Particle::cac("TaxTotal", 0, MANY, TAX_TOTAL),
    Particle::cac("LegalMonetaryTotal", 1, ONE, MONETARY_TOTAL),
    Particle::cac("InvoiceLine", 1, MANY, INVOICE_LINE),
];

/// Structural model of a UBL 2.1 `Invoice`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UblInvoiceSchema;

impl SchemaValidator for UblInvoiceSchema {
    fn check(&self, document: &XmlNode) -> Result<(), String> {
        if document.name != "Invoice" || document.namespace.as_deref() != Some(INVOICE_NS) {
            return Err(format!(
                "Element '{}': No matching global declaration available for the validation root.",
                document.qualified_name()
            ));
        }
        check_sequence(document, "Invoice", INVOICE)
    }
}

fn check_sequence(node: &XmlNode, path: &str, particles: &[Particle]) -> Result<(), String> {
    if !node.trimmed_text().is_empty() {
        return Err(format!(
            "Element '{}': Character content is not allowed, because the content type is element-only.",
            path
        ));
    }

    let mut counts = vec![0u32; particles.len()];
    let mut cursor = 0usize;

    for child in &node.children {
        let child_path = format!("{}/{}", path, child.qualified_name());
        let position = particles[cursor..]
            .iter()
            .position(|p| p.matches(child))
            .map(|offset| cursor + offset);

        let Some(index) = position else {
            return Err(unexpected(&child_path, particles, cursor, &counts));
        };

        // Particles skipped over must already be satisfied.
        for skipped in cursor..index {
            if counts[skipped] < particles[skipped].min {
                return Err(unexpected(&child_path, particles, cursor, &counts));
            }
        }

        cursor = index;
        counts[index] += 1;
        if let Some(max) = particles[index].max {
            if counts[index] > max {
                return Err(format!(
                    "Element '{}': This element is not expected; it may occur at most {} time(s).",
                    child_path, max
                ));
            }
        }

        check_content(child, &child_path, particles[index].content)?;
    }

    for (idx, particle) in particles.iter().enumerate().skip(cursor) {
        if counts[idx] < particle.min {
            return Err(format!(
                "Element '{}': Missing child element(s). Expected is ( {} ).",
                path,
                particle.label()
            ));
        }
    }
    Ok(())
}

fn unexpected(child_path: &str, particles: &[Particle], cursor: usize, counts: &[u32]) -> String {
    // candidates run up to and including the first unsatisfied particle
    let mut expected = Vec::new();
    for (idx, particle) in particles.iter().enumerate().skip(cursor) {
        expected.push(particle.label());
        if counts[idx] < particle.min {
            break;
        }
    }
    format!(
        "Element '{}': This element is not expected. Expected is one of ( {} ).",
        child_path,
        expected.join(", ")
    )
}

fn leaf<'a>(node: &'a XmlNode, path: &str, kind: &str) -> Result<&'a str, String> {
    if !node.children.is_empty() {
        return Err(format!(
            "Element '{}': Element content is not allowed, because the type is {}.",
            path, kind
        ));
    }
    Ok(node.trimmed_text())
}

fn check_content(node: &XmlNode, path: &str, content: Content) -> Result<(), String> {
    match content {
        Content::Complex(children) => check_sequence(node, path, children),
        Content::Any => Ok(()),
        Content::Text => leaf(node, path, "a text type").map(|_| ()),
        Content::Identifier | Content::Code => {
            let value = leaf(node, path, "a token type")?;
            if value.is_empty() {
                return Err(format!("Element '{}': The value must not be empty.", path));
            }
            Ok(())
        }
        Content::Date => {
            let value = leaf(node, path, "xs:date")?;
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(|_| ())
                .map_err(|_| {
                    format!(
                        "Element '{}': '{}' is not a valid value of the atomic type 'xs:date'.",
                        path, value
                    )
                })
        }
        Content::Amount | Content::Quantity => {
            let value = leaf(node, path, "xs:decimal")?;
            Decimal::from_str(value).map_err(|_| {
                format!(
                    "Element '{}': '{}' is not a valid value of the atomic type 'xs:decimal'.",
                    path, value
                )
            })?;
            if matches!(content, Content::Amount) && node.attribute("currencyID").is_none() {
                return Err(format!(
                    "Element '{}': The attribute 'currencyID' is required but missing.",
                    path
                ));
            }
            Ok(())
        }
    }
}
