use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;

use super::rules::{PeppolRules, RuleSet};
use super::schema::{SchemaValidator, UblInvoiceSchema};
use super::xml::parse_document;

pub const VALID_MESSAGE: &str = "Valid invoice";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ValidationOutcome {
    pub validated: bool,
    pub message: String,
}

impl ValidationOutcome {
    fn valid() -> Self {
        Self {
            validated: true,
            message: VALID_MESSAGE.to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            validated: false,
            message: message.into(),
        }
    }
}

/// Two-stage invoice validator: structure first, then business rules.
#[derive(Clone)]
pub struct DocumentValidator {
    schema: Arc<dyn SchemaValidator>,
    rules: Arc<dyn RuleSet>,
}

impl DocumentValidator {
    pub fn new(schema: Arc<dyn SchemaValidator>, rules: Arc<dyn RuleSet>) -> Self {
        Self { schema, rules }
    }

    /// UBL 2.1 Invoice structure with PEPPOL BIS rules.
    pub fn peppol() -> Self {
        Self::new(Arc::new(UblInvoiceSchema), Arc::new(PeppolRules))
    }

    /// Validates a UBL invoice. Failures are reported in the outcome, never as errors.
    #[instrument(skip_all, fields(bytes = xml.len()))]
    pub fn validate(&self, xml: &str) -> ValidationOutcome {
        let document = match parse_document(xml) {
            Ok(document) => document,
            Err(e) => {
                debug!(error = %e, "Invoice is not well-formed");
                return ValidationOutcome::invalid(e.to_string());
            }
        };

        if let Err(message) = self.schema.check(&document) {
            debug!(%message, "Invoice failed structural validation");
            return ValidationOutcome::invalid(message);
        }

        match self.rules.evaluate(&document) {
            Ok(()) => ValidationOutcome::valid(),
            Err(violation) => {
                debug!(rule = violation.rule, "Invoice failed business rules");
                ValidationOutcome::invalid(violation.to_string())
            }
        }
    }
}

impl Default for DocumentValidator {
    fn default() -> Self {
        Self::peppol()
    }
}

impl std::fmt::Debug for DocumentValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentValidator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ubl::rules::{MockRuleSet, RuleViolation};
    use crate::ubl::schema::MockSchemaValidator;

    const INVOICE: &str = r#"<Invoice xmlns="urn:oasis:names:specification:ubl:schema:xsd:Invoice-2"
  xmlns:cac="urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2"
  xmlns:cbc="urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2">
  <cbc:ID>1</cbc:ID>
  <cbc:IssueDate>2025-03-06</cbc:IssueDate>
  <cbc:DocumentCurrencyCode>USD</cbc:DocumentCurrencyCode>
  <cac:OrderReference><cbc:ID>ORD1</cbc:ID></cac:OrderReference>
  <cac:AccountingSupplierParty><cac:Party><cac:PartyName><cbc:Name>Acme</cbc:Name></cac:PartyName></cac:Party></cac:AccountingSupplierParty>
  <cac:AccountingCustomerParty><cac:Party><cac:PartyName><cbc:Name>ABC Corp</cbc:Name></cac:PartyName></cac:Party></cac:AccountingCustomerParty>
  <cac:LegalMonetaryTotal><cbc:PayableAmount currencyID="USD">500.00</cbc:PayableAmount></cac:LegalMonetaryTotal>
  <cac:InvoiceLine>
    <cbc:ID>1</cbc:ID>
    <cbc:InvoicedQuantity unitCode="EA">10</cbc:InvoicedQuantity>
    <cbc:LineExtensionAmount currencyID="USD">500.00</cbc:LineExtensionAmount>
    <cac:Item><cbc:Name>Widget</cbc:Name></cac:Item>
    <cac:Price><cbc:PriceAmount currencyID="USD">50.00</cbc:PriceAmount></cac:Price>
  </cac:InvoiceLine>
</Invoice>"#;

    #[test]
    fn accepts_a_valid_invoice() {
        let outcome = DocumentValidator::peppol().validate(INVOICE);
        assert_eq!(
            outcome,
            ValidationOutcome {
                validated: true,
                message: "Valid invoice".to_string()
            }
        );
    }

    #[test]
    fn duplicate_issue_date_fails_structurally() {
        let xml = INVOICE.replace(
            "<cbc:IssueDate>2025-03-06</cbc:IssueDate>",
            "<cbc:IssueDate>2025-03-06</cbc:IssueDate>\n  <cbc:IssueDate>2025-03-06</cbc:IssueDate>",
        );
        let outcome = DocumentValidator::peppol().validate(&xml);
        assert!(!outcome.validated);
        assert!(outcome.message.contains("IssueDate"), "{}", outcome.message);
    }

    #[test]
    fn business_rule_failures_carry_the_rule_id() {
        let xml = INVOICE.replace(
            "<cbc:PayableAmount currencyID=\"USD\">",
            "<cbc:PayableAmount currencyID=\"EUR\">",
        );
        let outcome = DocumentValidator::peppol().validate(&xml);
        assert!(!outcome.validated);
        assert!(outcome.message.starts_with("[PEPPOL-EN16931-R051]"), "{}", outcome.message);
    }

    #[test]
    fn maximum_quantity_is_reported_not_raised() {
        let xml = INVOICE.replace(
            ">10</cbc:InvoicedQuantity>",
            ">79228162514264337593543950335</cbc:InvoicedQuantity>",
        );
        let outcome = DocumentValidator::peppol().validate(&xml);
        assert!(!outcome.validated);
        assert!(outcome.message.starts_with("[PEPPOL-EN16931-R120]"), "{}", outcome.message);
    }

    #[test]
    fn malformed_xml_is_reported_not_raised() {
        let outcome = DocumentValidator::default().validate("<Invoice><cbc:ID>");
        assert!(!outcome.validated);
        assert!(!outcome.message.is_empty());
    }

    #[test]
    fn rules_are_skipped_when_structure_fails() {
        let mut schema = MockSchemaValidator::new();
        schema
            .expect_check()
            .times(1)
            .returning(|_| Err("Element 'cbc:ID': broken".to_string()));
        let mut rules = MockRuleSet::new();
        rules.expect_evaluate().times(0);

        let validator = DocumentValidator::new(Arc::new(schema), Arc::new(rules));
        let outcome = validator.validate(INVOICE);
        assert_eq!(outcome.message, "Element 'cbc:ID': broken");
    }

    #[test]
    fn rule_violation_is_formatted() {
        let mut schema = MockSchemaValidator::new();
        schema.expect_check().returning(|_| Ok(()));
        let mut rules = MockRuleSet::new();
        rules.expect_evaluate().times(1).returning(|_| {
            Err(RuleViolation {
                rule: "BR-02",
                message: "An Invoice shall have an Invoice number (BT-1).".to_string(),
            })
        });

        let outcome = DocumentValidator::new(Arc::new(schema), Arc::new(rules)).validate(INVOICE);
        assert!(!outcome.validated);
        assert_eq!(
            outcome.message,
            "[BR-02] An Invoice shall have an Invoice number (BT-1)."
        );
    }
}
