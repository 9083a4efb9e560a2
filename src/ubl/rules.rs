//! PEPPOL BIS / EN 16931 business rules over a structurally valid invoice.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use super::xml::XmlNode;
use crate::validation::{is_iso_4217, UnitCode};

/// A failed business rule, rendered as `[rule-id] message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleViolation {
    pub rule: &'static str,
    pub message: String,
}

impl RuleViolation {
    fn new(rule: &'static str, message: impl Into<String>) -> Self {
        Self {
            rule,
            message: message.into(),
        }
    }
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.rule, self.message)
    }
}

/// Stage two of document validation.
#[cfg_attr(test, mockall::automock)]
pub trait RuleSet: Send + Sync {
    /// Evaluates the rules in order and stops at the first failure.
    fn evaluate(&self, document: &XmlNode) -> Result<(), RuleViolation>;
}

type Rule = fn(&XmlNode) -> Result<(), RuleViolation>;

#[derive(Debug, Default, Clone, Copy)]
pub struct PeppolRules;

impl PeppolRules {
    const RULES: &'static [Rule] = &[
        invoice_number,
        document_currency,
        seller_name,
        buyer_name,
        buyer_or_order_reference,
        single_currency,
        unique_line_ids,
        non_negative_prices,
        line_amounts,
        line_total,
        unit_codes,
    ];
}

impl RuleSet for PeppolRules {
    fn evaluate(&self, document: &XmlNode) -> Result<(), RuleViolation> {
        Self::RULES.iter().try_for_each(|rule| rule(document))
    }
}

fn decimal(node: &XmlNode) -> Option<Decimal> {
    Decimal::from_str(node.trimmed_text()).ok()
}

fn party_name(document: &XmlNode, role: &str) -> Option<String> {
    let party = document.path(&[role, "Party"])?;
    party
        .text_at(&["PartyName", "Name"])
        .or_else(|| party.text_at(&["PartyLegalEntity", "RegistrationName"]))
        .map(str::to_string)
}

fn lines(document: &XmlNode) -> impl Iterator<Item = &XmlNode> {
    document.children_named("InvoiceLine")
}

fn invoice_number(document: &XmlNode) -> Result<(), RuleViolation> {
    match document.text_at(&["ID"]) {
        Some(_) => Ok(()),
        None => Err(RuleViolation::new(
            "BR-02",
            "An Invoice shall have an Invoice number (BT-1).",
        )),
    }
}

fn document_currency(document: &XmlNode) -> Result<(), RuleViolation> {
    match document.text_at(&["DocumentCurrencyCode"]) {
        Some(code) if is_iso_4217(code) => Ok(()),
        Some(code) => Err(RuleViolation::new(
            "BR-05",
            format!("Invoice currency code '{}' is not a valid ISO 4217 code (BT-5).", code),
        )),
        None => Err(RuleViolation::new(
            "BR-05",
            "An Invoice shall have an Invoice currency code (BT-5).",
        )),
    }
}

fn seller_name(document: &XmlNode) -> Result<(), RuleViolation> {
    party_name(document, "AccountingSupplierParty")
        .map(|_| ())
        .ok_or_else(|| RuleViolation::new("BR-06", "An Invoice shall contain the Seller name (BT-27)."))
}

fn buyer_name(document: &XmlNode) -> Result<(), RuleViolation> {
    party_name(document, "AccountingCustomerParty")
        .map(|_| ())
        .ok_or_else(|| RuleViolation::new("BR-07", "An Invoice shall contain the Buyer name (BT-44)."))
}

fn buyer_or_order_reference(document: &XmlNode) -> Result<(), RuleViolation> {
    if document.text_at(&["BuyerReference"]).is_some()
        || document.text_at(&["OrderReference", "ID"]).is_some()
    {
        return Ok(());
    }
    Err(RuleViolation::new(
        "PEPPOL-EN16931-R003",
        "A buyer reference or purchase order reference MUST be provided.",
    ))
}

fn single_currency(document: &XmlNode) -> Result<(), RuleViolation> {
    let Some(expected) = document.text_at(&["DocumentCurrencyCode"]) else {
        return Ok(());
    };
    for node in document.descendants() {
        if let Some(currency) = node.attribute("currencyID") {
            if currency != expected && node.name != "TaxAmount" {
                return Err(RuleViolation::new(
                    "PEPPOL-EN16931-R051",
                    format!(
                        "All currencyID attributes MUST have the same value as the invoice currency code ({}), found {} on {}.",
                        expected,
                        currency,
                        node.qualified_name()
                    ),
                ));
            }
        }
    }
    Ok(())
}

fn unique_line_ids(document: &XmlNode) -> Result<(), RuleViolation> {
    let mut seen = HashSet::new();
    for line in lines(document) {
        let id = line.text_at(&["ID"]).unwrap_or_default();
        if id.is_empty() || !seen.insert(id) {
            return Err(RuleViolation::new(
                "BR-21",
                format!("Each Invoice line (BG-25) shall have a unique Invoice line identifier (BT-126), '{}' is not.", id),
            ));
        }
    }
    Ok(())
}

fn non_negative_prices(document: &XmlNode) -> Result<(), RuleViolation> {
    for line in lines(document) {
        if let Some(price) = line.path(&["Price", "PriceAmount"]).and_then(decimal) {
            if price.is_sign_negative() && !price.is_zero() {
                return Err(RuleViolation::new(
                    "BR-27",
                    "The Item net price (BT-146) shall NOT be negative.",
                ));
            }
        }
    }
    Ok(())
}

fn line_amounts(document: &XmlNode) -> Result<(), RuleViolation> {
    for line in lines(document) {
        let quantity = line.child("InvoicedQuantity").and_then(decimal);
        let price = line.path(&["Price", "PriceAmount"]).and_then(decimal);
        let amount = line.child("LineExtensionAmount").and_then(decimal);
        let (Some(quantity), Some(price), Some(amount)) = (quantity, price, amount) else {
            continue;
        };
        let base = line
            .path(&["Price", "BaseQuantity"])
            .and_then(decimal)
            .filter(|b| !b.is_zero())
            .unwrap_or(Decimal::ONE);

        let Some(expected) = quantity
            .checked_mul(price)
            .and_then(|net| net.checked_div(base))
            .map(|net| net.round_dp(2))
        else {
            return Err(RuleViolation::new(
                "PEPPOL-EN16931-R120",
                format!(
                    "Invoice line net amount cannot be computed: {} * {} exceeds the supported range.",
                    quantity, price
                ),
            ));
        };
        if expected != amount.round_dp(2) {
            return Err(RuleViolation::new(
                "PEPPOL-EN16931-R120",
                format!(
                    "Invoice line net amount MUST equal (Invoiced quantity * (Item net price/item price base quantity)): expected {}, found {}.",
                    expected, amount
                ),
            ));
        }
    }
    Ok(())
}

fn line_total(document: &XmlNode) -> Result<(), RuleViolation> {
    let Some(declared) = document
        .path(&["LegalMonetaryTotal", "LineExtensionAmount"])
        .and_then(decimal)
    else {
        return Ok(());
    };
    let Some(sum) = lines(document)
        .filter_map(|line| line.child("LineExtensionAmount").and_then(decimal))
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
    else {
        return Err(RuleViolation::new(
            "BR-CO-10",
            "Sum of Invoice line net amounts exceeds the supported range.",
        ));
    };
    if sum.round_dp(2) != declared.round_dp(2) {
        return Err(RuleViolation::new(
            "BR-CO-10",
            format!(
                "Sum of Invoice line net amount (BT-106) = {} does not equal the sum of the line amounts ({}).",
                declared, sum
            ),
        ));
    }
    Ok(())
}

fn unit_codes(document: &XmlNode) -> Result<(), RuleViolation> {
    for line in lines(document) {
        let Some(code) = line
            .child("InvoicedQuantity")
            .and_then(|q| q.attribute("unitCode"))
        else {
            continue;
        };
        if UnitCode::from_str(&code.to_ascii_uppercase()).is_err() {
            return Err(RuleViolation::new(
                "BR-CL-23",
                format!("Unit code '{}' MUST be coded according to the UN/ECE Recommendation 20.", code),
            ));
        }
    }
    Ok(())
}
