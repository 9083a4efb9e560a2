//! Turns raw XML or JSON bodies into one canonical [`TradeDocument`].
//!
//! Scalars are carried as text; typing and field rules are applied by the
//! order store so that its errors can name the offending field.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::xml::{parse_document, XmlNode};
use crate::errors::ServiceError;

/// Fields every trade document must carry, in reporting order.
pub const REQUIRED_FIELDS: [&str; 5] = [
    "SalesOrderID",
    "IssueDate",
    "PartyName",
    "PayableAmount",
    "CurrencyCode",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TradeDocument {
    #[serde(rename = "SalesOrderID")]
    pub sales_order_id: String,
    #[serde(rename = "UUID", skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(rename = "IssueDate")]
    pub issue_date: String,
    #[serde(rename = "PartyName")]
    pub party_name: String,
    #[serde(rename = "PartyNameSeller", skip_serializing_if = "Option::is_none")]
    pub party_name_seller: Option<String>,
    #[serde(rename = "PayableAmount")]
    pub payable_amount: String,
    #[serde(rename = "CurrencyCode")]
    pub currency_code: String,
    #[serde(rename = "Items")]
    pub items: Vec<TradeItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TradeItem {
    #[serde(rename = "ItemDescription")]
    pub description: String,
    #[serde(rename = "BuyersItemIdentification")]
    pub buyers_item_id: String,
    #[serde(rename = "SellersItemIdentification")]
    pub sellers_item_id: String,
    #[serde(rename = "ItemAmount")]
    pub quantity: String,
    #[serde(rename = "ItemUnitCode")]
    pub unit_code: String,
    #[serde(rename = "ItemPrice", skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Xml,
    Json,
}

impl DocumentFormat {
    /// Negotiates the wire format from a `Content-Type` header value.
    pub fn from_content_type(content_type: Option<&str>) -> Result<Self, ServiceError> {
        let raw = content_type.unwrap_or_default();
        let media_type = raw
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match media_type.as_str() {
            "application/xml" => Ok(Self::Xml),
            "application/json" => Ok(Self::Json),
            "" => Err(ServiceError::UnsupportedContentType(
                "missing Content-Type".to_string(),
            )),
            _ => Err(ServiceError::UnsupportedContentType(raw.to_string())),
        }
    }
}

pub fn normalize(raw_body: &[u8], content_type: Option<&str>) -> Result<TradeDocument, ServiceError> {
    let format = DocumentFormat::from_content_type(content_type)?;
    let body = std::str::from_utf8(raw_body)
        .map_err(|e| ServiceError::MalformedDocument(format!("body is not UTF-8: {}", e)))?;

    let document = match format {
        DocumentFormat::Xml => from_xml(body)?,
        DocumentFormat::Json => from_json(body)?,
    };

    debug!(
        sales_order_id = %document.sales_order_id,
        items = document.items.len(),
        ?format,
        "Normalized trade document"
    );
    Ok(document)
}

fn from_xml(body: &str) -> Result<TradeDocument, ServiceError> {
    let root =
        parse_document(body).map_err(|e| ServiceError::MalformedDocument(e.to_string()))?;

    match root.name.as_str() {
        "Order" => from_order(&root),
        "Invoice" => from_invoice(&root),
        other => Err(ServiceError::MalformedDocument(format!(
            "unsupported root element <{}>",
            other
        ))),
    }
}

/// Follows `steps`; a missing intermediate node is malformed, a missing leaf is `None`.
fn leaf<'a>(node: &'a XmlNode, steps: &[&str]) -> Result<Option<&'a XmlNode>, ServiceError> {
    let mut current = node;
    for (depth, step) in steps.iter().enumerate() {
        match current.child(step) {
            Some(next) => current = next,
            None if depth + 1 == steps.len() => return Ok(None),
            None => {
                return Err(ServiceError::MalformedDocument(format!(
                    "missing element {}/{}",
                    node.name,
                    steps[..=depth].join("/")
                )))
            }
        }
    }
    Ok(Some(current))
}

fn leaf_text(node: &XmlNode, steps: &[&str]) -> Result<Option<String>, ServiceError> {
    Ok(leaf(node, steps)?.map(|n| n.trimmed_text().to_string()))
}

fn optional_text(node: &XmlNode, steps: &[&str]) -> Option<String> {
    node.text_at(steps).map(str::to_string)
}

struct RequiredHeader {
    sales_order_id: Option<String>,
    issue_date: Option<String>,
    party_name: Option<String>,
    payable_amount: Option<String>,
    currency_code: Option<String>,
}

impl RequiredHeader {
    fn into_document(self) -> Result<TradeDocument, ServiceError> {
        let slots = [
            &self.sales_order_id,
            &self.issue_date,
            &self.party_name,
            &self.payable_amount,
            &self.currency_code,
        ];
        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .zip(slots)
            .filter(|(_, slot)| slot.is_none())
            .map(|(name, _)| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ServiceError::MissingRequiredFields(missing));
        }

        Ok(TradeDocument {
            sales_order_id: self.sales_order_id.unwrap_or_default(),
            issue_date: self.issue_date.unwrap_or_default(),
            party_name: self.party_name.unwrap_or_default(),
            payable_amount: self.payable_amount.unwrap_or_default(),
            currency_code: self.currency_code.unwrap_or_default(),
            ..TradeDocument::default()
        })
    }
}

fn from_order(root: &XmlNode) -> Result<TradeDocument, ServiceError> {
    let sales_order_id = match leaf_text(root, &["SalesOrderID"])? {
        Some(id) => Some(id),
        None => leaf_text(root, &["ID"])?,
    };
    let payable = leaf(root, &["AnticipatedMonetaryTotal", "PayableAmount"])?;
    let currency_code = match payable.and_then(|p| p.attribute("currencyID")) {
        Some(code) => Some(code.trim().to_string()),
        None => leaf_text(root, &["DocumentCurrencyCode"])?,
    };

    let header = RequiredHeader {
        sales_order_id,
        issue_date: leaf_text(root, &["IssueDate"])?,
        party_name: leaf_text(root, &["BuyerCustomerParty", "Party", "PartyName", "Name"])?,
        payable_amount: payable.map(|p| p.trimmed_text().to_string()),
        currency_code,
    };

    let mut document = header.into_document()?;
    document.uuid = optional_text(root, &["UUID"]);
    document.party_name_seller =
        optional_text(root, &["SellerSupplierParty", "Party", "PartyName", "Name"]);

    for line in root.children_named("OrderLine") {
        let line_item = line.child("LineItem").ok_or_else(|| {
            ServiceError::MalformedDocument("missing element Order/OrderLine/LineItem".to_string())
        })?;
        document.items.push(item_from_line(line_item, "Quantity")?);
    }
    Ok(document)
}

fn from_invoice(root: &XmlNode) -> Result<TradeDocument, ServiceError> {
    let payable = leaf(root, &["LegalMonetaryTotal", "PayableAmount"])?;
    let currency_code = match payable.and_then(|p| p.attribute("currencyID")) {
        Some(code) => Some(code.trim().to_string()),
        None => leaf_text(root, &["DocumentCurrencyCode"])?,
    };

    let header = RequiredHeader {
        sales_order_id: leaf_text(root, &["OrderReference", "ID"])?,
        issue_date: leaf_text(root, &["IssueDate"])?,
        party_name: leaf_text(
            root,
            &["AccountingCustomerParty", "Party", "PartyName", "Name"],
        )?,
        payable_amount: payable.map(|p| p.trimmed_text().to_string()),
        currency_code,
    };

    let mut document = header.into_document()?;
    document.uuid = optional_text(root, &["UUID"]);
    document.party_name_seller = optional_text(
        root,
        &["AccountingSupplierParty", "Party", "PartyName", "Name"],
    );

    for line in root.children_named("InvoiceLine") {
        document.items.push(item_from_line(line, "InvoicedQuantity")?);
    }
    Ok(document)
}

fn item_from_line(line: &XmlNode, quantity_element: &str) -> Result<TradeItem, ServiceError> {
    let item = line.child("Item").ok_or_else(|| {
        ServiceError::MalformedDocument(format!("missing element {}/Item", line.name))
    })?;
    let quantity = line.child(quantity_element);

    Ok(TradeItem {
        description: optional_text(item, &["Description"])
            .or_else(|| optional_text(item, &["Name"]))
            .unwrap_or_default(),
        buyers_item_id: optional_text(item, &["BuyersItemIdentification", "ID"])
            .unwrap_or_default(),
        sellers_item_id: optional_text(item, &["SellersItemIdentification", "ID"])
            .unwrap_or_default(),
        quantity: quantity
            .map(|q| q.trimmed_text().to_string())
            .unwrap_or_default(),
        unit_code: quantity
            .and_then(|q| q.attribute("unitCode"))
            .unwrap_or_default()
            .to_string(),
        price: optional_text(line, &["Price", "PriceAmount"]),
    })
}

fn from_json(body: &str) -> Result<TradeDocument, ServiceError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ServiceError::MalformedDocument(format!("invalid JSON: {}", e)))?;
    let object = value.as_object().ok_or_else(|| {
        ServiceError::MalformedDocument("JSON document must be an object".to_string())
    })?;

    let header = RequiredHeader {
        sales_order_id: optional_scalar(object, "SalesOrderID"),
        issue_date: optional_scalar(object, "IssueDate"),
        party_name: optional_scalar(object, "PartyName"),
        payable_amount: optional_scalar(object, "PayableAmount"),
        currency_code: optional_scalar(object, "CurrencyCode"),
    };

    let mut document = header.into_document()?;
    document.uuid = optional_scalar(object, "UUID");
    document.party_name_seller = optional_scalar(object, "PartyNameSeller");

    match object.get("Items") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            for (idx, item) in items.iter().enumerate() {
                let fields = item.as_object().ok_or_else(|| {
                    ServiceError::MalformedDocument(format!("Items[{}] must be an object", idx))
                })?;
                document.items.push(TradeItem {
                    description: optional_scalar(fields, "ItemDescription").unwrap_or_default(),
                    buyers_item_id: optional_scalar(fields, "BuyersItemIdentification")
                        .unwrap_or_default(),
                    sellers_item_id: optional_scalar(fields, "SellersItemIdentification")
                        .unwrap_or_default(),
                    quantity: optional_scalar(fields, "ItemAmount").unwrap_or_default(),
                    unit_code: optional_scalar(fields, "ItemUnitCode").unwrap_or_default(),
                    price: optional_scalar(fields, "ItemPrice"),
                });
            }
        }
        Some(_) => {
            return Err(ServiceError::MalformedDocument(
                "Items must be an array".to_string(),
            ))
        }
    }

    Ok(document)
}

fn optional_scalar(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    const ORDER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Order xmlns="urn:oasis:names:specification:ubl:schema:xsd:Order-2"
       xmlns:cac="urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2"
       xmlns:cbc="urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2">
  <cbc:ID>PO-77</cbc:ID>
  <cbc:SalesOrderID>ORD1</cbc:SalesOrderID>
  <cbc:UUID>6e8bc430-9c3a-11d9-9669-0800200c9a66</cbc:UUID>
  <cbc:IssueDate>2025-03-06</cbc:IssueDate>
  <cac:BuyerCustomerParty>
    <cac:Party><cac:PartyName><cbc:Name>ABC Corp</cbc:Name></cac:PartyName></cac:Party>
  </cac:BuyerCustomerParty>
  <cac:SellerSupplierParty>
    <cac:Party><cac:PartyName><cbc:Name>Widgets &amp; Co</cbc:Name></cac:PartyName></cac:Party>
  </cac:SellerSupplierParty>
  <cac:AnticipatedMonetaryTotal>
    <cbc:PayableAmount currencyID="USD">500</cbc:PayableAmount>
  </cac:AnticipatedMonetaryTotal>
  <cac:OrderLine>
    <cac:LineItem>
      <cbc:ID>1</cbc:ID>
      <cbc:Quantity unitCode="EA">10</cbc:Quantity>
      <cac:Price><cbc:PriceAmount currencyID="USD">50</cbc:PriceAmount></cac:Price>
      <cac:Item>
        <cbc:Description>Widget</cbc:Description>
        <cac:BuyersItemIdentification><cbc:ID>1</cbc:ID></cac:BuyersItemIdentification>
        <cac:SellersItemIdentification><cbc:ID>2</cbc:ID></cac:SellersItemIdentification>
      </cac:Item>
    </cac:LineItem>
  </cac:OrderLine>
</Order>"#;

    #[test]
    fn normalizes_ubl_order() {
        let doc = normalize(ORDER_XML.as_bytes(), Some("application/xml")).unwrap();
        assert_eq!(doc.sales_order_id, "ORD1");
        assert_eq!(doc.issue_date, "2025-03-06");
        assert_eq!(doc.party_name, "ABC Corp");
        assert_eq!(doc.party_name_seller.as_deref(), Some("Widgets & Co"));
        assert_eq!(doc.payable_amount, "500");
        assert_eq!(doc.currency_code, "USD");
        assert_eq!(doc.items.len(), 1);

        let item = &doc.items[0];
        assert_eq!(item.description, "Widget");
        assert_eq!(item.buyers_item_id, "1");
        assert_eq!(item.sellers_item_id, "2");
        assert_eq!(item.quantity, "10");
        assert_eq!(item.unit_code, "EA");
        assert_eq!(item.price.as_deref(), Some("50"));
    }

    #[test]
    fn order_without_buyer_party_is_malformed() {
        let xml = ORDER_XML.replace("BuyerCustomerParty", "OriginatorCustomerParty");
        assert_matches!(
            normalize(xml.as_bytes(), Some("application/xml")),
            Err(ServiceError::MalformedDocument(msg)) if msg.contains("BuyerCustomerParty")
        );
    }

    #[test]
    fn order_without_issue_date_reports_missing_field() {
        let xml = ORDER_XML.replace("<cbc:IssueDate>2025-03-06</cbc:IssueDate>", "");
        assert_matches!(
            normalize(xml.as_bytes(), Some("application/xml")),
            Err(ServiceError::MissingRequiredFields(fields)) if fields == vec!["IssueDate".to_string()]
        );
    }

    #[test]
    fn broken_xml_is_malformed() {
        assert_matches!(
            normalize(b"<Order><cbc:ID>1</Order>", Some("application/xml")),
            Err(ServiceError::MalformedDocument(_))
        );
    }

    #[test]
    fn normalizes_json_with_numbers() {
        let body = serde_json::json!({
            "SalesOrderID": "ORD1",
            "IssueDate": "2025-03-06",
            "PartyName": "ABC Corp",
            "PayableAmount": 500,
            "CurrencyCode": "USD",
            "Items": [{
                "ItemDescription": "Widget",
                "BuyersItemIdentification": 1,
                "SellersItemIdentification": "2",
                "ItemAmount": 10,
                "ItemUnitCode": "EA"
            }]
        })
        .to_string();

        let doc = normalize(body.as_bytes(), Some("application/json; charset=utf-8")).unwrap();
        assert_eq!(doc.payable_amount, "500");
        assert_eq!(doc.items[0].buyers_item_id, "1");
        assert_eq!(doc.items[0].quantity, "10");
        assert_eq!(doc.items[0].price, None);
        assert_eq!(doc.uuid, None);
    }

    #[test]
    fn json_missing_fields_are_listed_in_order() {
        let body = r#"{"SalesOrderID":"ORD1","PartyName":"ABC Corp","PayableAmount":null}"#;
        assert_matches!(
            normalize(body.as_bytes(), Some("application/json")),
            Err(ServiceError::MissingRequiredFields(fields))
                if fields == vec!["IssueDate", "PayableAmount", "CurrencyCode"]
        );
    }

    #[rstest]
    #[case("[1,2,3]")]
    #[case("{not json")]
    #[case(r#"{"SalesOrderID":"A","IssueDate":"2025-01-01","PartyName":"B","PayableAmount":1,"CurrencyCode":"USD","Items":{}}"#)]
    fn malformed_json(#[case] body: &str) {
        assert_matches!(
            normalize(body.as_bytes(), Some("application/json")),
            Err(ServiceError::MalformedDocument(_))
        );
    }

    #[rstest]
    #[case(None)]
    #[case(Some("text/plain"))]
    #[case(Some("multipart/form-data; boundary=x"))]
    fn unsupported_content_types(#[case] content_type: Option<&str>) {
        assert_matches!(
            normalize(b"{}", content_type),
            Err(ServiceError::UnsupportedContentType(_))
        );
    }

    #[test]
    fn content_type_is_case_insensitive() {
        assert_eq!(
            DocumentFormat::from_content_type(Some("Application/XML; charset=UTF-8")).unwrap(),
            DocumentFormat::Xml
        );
    }
}
