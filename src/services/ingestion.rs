use crate::{
    errors::ServiceError,
    services::{
        invoices::{InvoiceCreated, InvoiceService},
        orders::{OrderDraft, OrderItemDraft, OrderService},
    },
    session::{SessionResolver, UuidSource},
    ubl::{normalize, TradeDocument},
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Turns an inbound trade document into a stored order and its invoice.
///
/// The two stores commit separately: when invoice creation fails the
/// order stays in place and the caller sees the invoice error.
#[derive(Clone)]
pub struct IngestionService {
    sessions: Arc<dyn SessionResolver>,
    orders: OrderService,
    invoices: InvoiceService,
    uuids: Arc<dyn UuidSource>,
}

impl IngestionService {
    pub fn new(
        sessions: Arc<dyn SessionResolver>,
        orders: OrderService,
        invoices: InvoiceService,
        uuids: Arc<dyn UuidSource>,
    ) -> Self {
        Self {
            sessions,
            orders,
            invoices,
            uuids,
        }
    }

    #[instrument(skip(self, raw_body, session_id), fields(bytes = raw_body.len()))]
    pub async fn ingest(
        &self,
        raw_body: &[u8],
        content_type: Option<&str>,
        session_id: &str,
    ) -> Result<InvoiceCreated, ServiceError> {
        let session = self.sessions.resolve(session_id).await?;
        let document = normalize(raw_body, content_type)?;
        let draft = self.draft_from(document);

        let sales_order_id = self.orders.insert_order(draft).await?;
        let created = self
            .invoices
            .create_invoice_from_order(&sales_order_id)
            .await
            .map_err(|e| {
                warn!(
                    sales_order_id = %sales_order_id,
                    error = %e,
                    "Order stored but invoice creation failed"
                );
                e
            })?;

        info!(
            user_id = %session.user_id,
            sales_order_id = %sales_order_id,
            invoice_id = created.invoice_id,
            "Document ingested"
        );
        Ok(created)
    }

    fn draft_from(&self, document: TradeDocument) -> OrderDraft {
        let uuid = document
            .uuid
            .unwrap_or_else(|| self.uuids.next_uuid().hyphenated().to_string());

        OrderDraft {
            sales_order_id: document.sales_order_id,
            uuid,
            issue_date: document.issue_date,
            party_name_buyer: document.party_name,
            party_name_seller: document.party_name_seller,
            payable_amount: document.payable_amount,
            payable_currency_code: document.currency_code,
            items: document
                .items
                .into_iter()
                .map(|item| OrderItemDraft {
                    description: item.description,
                    buyers_item_identification: item.buyers_item_id,
                    sellers_item_identification: item.sellers_item_id,
                    amount: item.quantity,
                    unit_code: item.unit_code,
                    price: item.price,
                })
                .collect(),
        }
    }
}
