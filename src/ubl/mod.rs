//! UBL document handling: parsing, normalization, validation and invoice export.

pub mod normalizer;
pub mod rules;
pub mod schema;
pub mod serializer;
pub mod validator;
pub mod xml;

pub use normalizer::{normalize, TradeDocument, TradeItem};
pub use serializer::serialize_invoice;
pub use validator::{DocumentValidator, ValidationOutcome};

pub const INVOICE_NS: &str = "urn:oasis:names:specification:ubl:schema:xsd:Invoice-2";
pub const ORDER_NS: &str = "urn:oasis:names:specification:ubl:schema:xsd:Order-2";
pub const CAC_NS: &str =
    "urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2";
pub const CBC_NS: &str = "urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2";
