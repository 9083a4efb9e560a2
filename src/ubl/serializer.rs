//! Stored invoice to UBL 2.1 Invoice XML.

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use rust_decimal::Decimal;
use tracing::{debug, error};

use super::{CAC_NS, CBC_NS, INVOICE_NS};
use crate::errors::ServiceError;
use crate::services::invoices::InvoiceWithItems;

/// Amounts carry at least two fraction digits.
pub fn format_amount(amount: Decimal) -> String {
    let mut value = amount.normalize();
    if value.scale() < 2 {
        value.rescale(2);
    }
    value.to_string()
}

pub fn format_quantity(quantity: Decimal) -> String {
    quantity.normalize().to_string()
}

struct UblWriter {
    inner: Writer<Cursor<Vec<u8>>>,
}

impl UblWriter {
    fn new() -> Self {
        Self {
            inner: Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), ServiceError> {
        self.inner.write_event(event).map_err(|e| {
            error!(error = %e, "Failed to write invoice XML");
            ServiceError::InternalError(format!("XML write failed: {}", e))
        })
    }

    fn open(&mut self, name: &str) -> Result<(), ServiceError> {
        self.event(Event::Start(BytesStart::new(name)))
    }

    fn close(&mut self, name: &str) -> Result<(), ServiceError> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn leaf(&mut self, name: &str, text: &str) -> Result<(), ServiceError> {
        self.leaf_with(name, None, text)
    }

    fn leaf_with(
        &mut self,
        name: &str,
        attribute: Option<(&str, &str)>,
        text: &str,
    ) -> Result<(), ServiceError> {
        let mut start = BytesStart::new(name);
        if let Some(attr) = attribute {
            start.push_attribute(attr);
        }
        self.event(Event::Start(start))?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.close(name)
    }

    fn amount(&mut self, name: &str, currency: &str, amount: Decimal) -> Result<(), ServiceError> {
        self.leaf_with(name, Some(("currencyID", currency)), &format_amount(amount))
    }

    fn party(&mut self, role: &str, name: &str) -> Result<(), ServiceError> {
        self.open(role)?;
        self.open("cac:Party")?;
        self.open("cac:PartyName")?;
        self.leaf("cbc:Name", name)?;
        self.close("cac:PartyName")?;
        self.close("cac:Party")?;
        self.close(role)
    }

    fn identification(&mut self, wrapper: &str, id: &str) -> Result<(), ServiceError> {
        self.open(wrapper)?;
        self.leaf("cbc:ID", id)?;
        self.close(wrapper)
    }

    fn finish(self) -> Result<String, ServiceError> {
        String::from_utf8(self.inner.into_inner().into_inner())
            .map_err(|e| ServiceError::InternalError(format!("XML output is not UTF-8: {}", e)))
    }
}

/// Renders a fully loaded invoice as a UBL Invoice document.
///
/// Line ids run `1..N` in stored item order and each line amount is the
/// exact product of quantity and unit price.
pub fn serialize_invoice(
    invoice: &InvoiceWithItems,
    supplier_company_name: &str,
) -> Result<String, ServiceError> {
    let currency = invoice.currency_code.as_str();
    let line_amounts = invoice
        .items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.item_amount.checked_mul(item.item_price).ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "line {} of invoice {}: {} * {} overflows",
                    index + 1,
                    invoice.invoice_id,
                    item.item_amount,
                    item.item_price
                ))
            })
        })
        .collect::<Result<Vec<Decimal>, ServiceError>>()?;
    let mut w = UblWriter::new();

    w.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    w.event(Event::Start(BytesStart::new("Invoice").with_attributes([
        ("xmlns", INVOICE_NS),
        ("xmlns:cac", CAC_NS),
        ("xmlns:cbc", CBC_NS),
    ])))?;

    w.leaf("cbc:ID", &invoice.invoice_id.to_string())?;
    w.leaf("cbc:IssueDate", &invoice.issue_date.format("%Y-%m-%d").to_string())?;
    w.leaf("cbc:DocumentCurrencyCode", currency)?;
    w.identification("cac:OrderReference", &invoice.sales_order_id)?;
    w.party("cac:AccountingSupplierParty", supplier_company_name)?;
    w.party("cac:AccountingCustomerParty", &invoice.party_name_buyer)?;

    w.open("cac:LegalMonetaryTotal")?;
    w.amount("cbc:PayableAmount", currency, invoice.payable_amount)?;
    w.close("cac:LegalMonetaryTotal")?;

    for (index, (item, line_amount)) in invoice.items.iter().zip(line_amounts).enumerate() {
        w.open("cac:InvoiceLine")?;
        w.leaf("cbc:ID", &(index + 1).to_string())?;
        w.leaf_with(
            "cbc:InvoicedQuantity",
            Some(("unitCode", item.item_unit_code.as_str())),
            &format_quantity(item.item_amount),
        )?;
        w.amount("cbc:LineExtensionAmount", currency, line_amount)?;

        w.open("cac:Item")?;
        w.leaf("cbc:Description", &item.item_description)?;
        w.leaf("cbc:Name", &item.item_description)?;
        w.identification("cac:BuyersItemIdentification", &item.buyers_item_identification)?;
        w.identification("cac:SellersItemIdentification", &item.sellers_item_identification)?;
        w.close("cac:Item")?;

        w.open("cac:Price")?;
        w.amount("cbc:PriceAmount", currency, item.item_price)?;
        w.close("cac:Price")?;
        w.close("cac:InvoiceLine")?;
    }

    w.close("Invoice")?;
    let xml = w.finish()?;
    debug!(invoice_id = invoice.invoice_id, lines = invoice.items.len(), "Invoice serialized");
    Ok(xml)
}
