use crate::{
    db::{run_in_transaction, DbPool},
    entities::{invoice, invoice_item, order, order_item},
    errors::{DbStage, ServiceError},
    services::orders::LineItem,
    ubl::serialize_invoice,
    validation::parse_non_negative_decimal,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, NotSet, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceCreated {
    pub invoice_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceWithItems {
    pub invoice_id: i32,
    pub issue_date: NaiveDate,
    pub party_name_buyer: String,
    pub party_name_seller: Option<String>,
    #[schema(value_type = String)]
    pub payable_amount: Decimal,
    pub currency_code: String,
    pub sales_order_id: String,
    pub items: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSummary {
    pub invoice_id: i32,
    pub issue_date: NaiveDate,
    pub party_name_buyer: String,
    #[schema(value_type = String)]
    pub payable_amount: Decimal,
}

impl From<invoice::Model> for InvoiceSummary {
    fn from(model: invoice::Model) -> Self {
        Self {
            invoice_id: model.invoice_id,
            issue_date: model.issue_date,
            party_name_buyer: model.party_name_buyer,
            payable_amount: model.payable_amount,
        }
    }
}

impl From<invoice_item::Model> for LineItem {
    fn from(model: invoice_item::Model) -> Self {
        Self {
            item_description: model.item_description,
            buyers_item_identification: model.buyers_item_identification,
            sellers_item_identification: model.sellers_item_identification,
            item_amount: model.item_amount,
            item_unit_code: model.item_unit_code,
            item_price: model.item_price,
        }
    }
}

/// Fields an invoice may change after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceFieldUpdate {
    PayableAmount(Decimal),
}

impl InvoiceFieldUpdate {
    /// Parses a `(field, value)` pair from an update request.
    pub fn parse(field: &str, value: &str) -> Result<Self, ServiceError> {
        match field {
            "payableAmount" | "PayableAmount" | "payable_amount" => Ok(Self::PayableAmount(
                parse_non_negative_decimal("payableAmount", value)?,
            )),
            other => Err(ServiceError::invalid_field(
                other,
                "field cannot be updated; only payableAmount is updatable",
            )),
        }
    }
}

/// Transactional store for invoices derived from orders.
#[derive(Clone)]
pub struct InvoiceService {
    db_pool: Arc<DbPool>,
}

impl InvoiceService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Snapshots an order and its items into a new invoice.
    #[instrument(skip(self))]
    pub async fn create_invoice_from_order(
        &self,
        sales_order_id: &str,
    ) -> Result<InvoiceCreated, ServiceError> {
        let id = sales_order_id.to_string();

        let created = run_in_transaction(&self.db_pool, "create_invoice", move |txn| {
            Box::pin(async move {
                let order = order::Entity::find_by_id(id.clone())
                    .one(txn)
                    .await
                    .map_err(|e| ServiceError::database(DbStage::Query, e))?
                    .ok_or_else(|| ServiceError::OrderNotFound(id.clone()))?;

                let header = invoice::ActiveModel {
                    invoice_id: NotSet,
                    issue_date: Set(order.issue_date),
                    party_name_buyer: Set(order.party_name_buyer),
                    party_name_seller: Set(order.party_name_seller),
                    payable_amount: Set(order.payable_amount),
                    currency_code: Set(order.payable_currency_code),
                    sales_order_id: Set(order.sales_order_id),
                }
                .insert(txn)
                .await
                .map_err(|e| {
                    error!(error = %e, sales_order_id = %id, "Failed to insert invoice");
                    ServiceError::database(DbStage::InsertInvoice, e)
                })?;

                let items = order_item::Entity::find()
                    .filter(order_item::Column::SalesOrderId.eq(id.as_str()))
                    .order_by_asc(order_item::Column::ItemId)
                    .all(txn)
                    .await
                    .map_err(|e| ServiceError::database(DbStage::Query, e))?;
                if items.is_empty() {
                    return Err(ServiceError::NoItemsFound(id));
                }

                for item in items {
                    invoice_item::ActiveModel {
                        invoice_item_id: NotSet,
                        invoice_id: Set(header.invoice_id),
                        item_description: Set(item.item_description),
                        buyers_item_identification: Set(item.buyers_item_identification),
                        sellers_item_identification: Set(item.sellers_item_identification),
                        item_amount: Set(item.item_amount),
                        item_unit_code: Set(item.item_unit_code),
                        item_price: Set(item.item_price),
                    }
                    .insert(txn)
                    .await
                    .map_err(|e| ServiceError::database(DbStage::InsertInvoiceItem, e))?;
                }

                Ok(InvoiceCreated {
                    invoice_id: header.invoice_id,
                })
            })
        })
        .await?;

        info!(invoice_id = created.invoice_id, "Invoice created from order");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_invoice_by_id(&self, invoice_id: i32) -> Result<InvoiceWithItems, ServiceError> {
        let db = &*self.db_pool;

        let invoice = invoice::Entity::find_by_id(invoice_id)
            .one(db)
            .await
            .map_err(query_error)?
            .ok_or(ServiceError::InvoiceNotFound(invoice_id))?;

        let items = invoice_item::Entity::find()
            .filter(invoice_item::Column::InvoiceId.eq(invoice_id))
            .order_by_asc(invoice_item::Column::InvoiceItemId)
            .all(db)
            .await
            .map_err(query_error)?;

        Ok(InvoiceWithItems {
            invoice_id: invoice.invoice_id,
            issue_date: invoice.issue_date,
            party_name_buyer: invoice.party_name_buyer,
            party_name_seller: invoice.party_name_seller,
            payable_amount: invoice.payable_amount,
            currency_code: invoice.currency_code,
            sales_order_id: invoice.sales_order_id,
            items: items.into_iter().map(LineItem::from).collect(),
        })
    }

    #[instrument(skip(self))]
    pub async fn get_invoices_by_buyer_name(
        &self,
        buyer: &str,
    ) -> Result<Vec<InvoiceSummary>, ServiceError> {
        let invoices = invoice::Entity::find()
            .filter(invoice::Column::PartyNameBuyer.eq(buyer))
            .order_by_asc(invoice::Column::InvoiceId)
            .all(&*self.db_pool)
            .await
            .map_err(query_error)?;

        if invoices.is_empty() {
            return Err(ServiceError::NoInvoicesFound(buyer.to_string()));
        }
        Ok(invoices.into_iter().map(InvoiceSummary::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn update_invoice_field(
        &self,
        invoice_id: i32,
        update: InvoiceFieldUpdate,
    ) -> Result<(), ServiceError> {
        run_in_transaction(&self.db_pool, "update_invoice", move |txn| {
            Box::pin(async move {
                let statement = match update {
                    InvoiceFieldUpdate::PayableAmount(amount) => invoice::Entity::update_many()
                        .col_expr(invoice::Column::PayableAmount, Expr::value(amount)),
                };
                let result = statement
                    .filter(invoice::Column::InvoiceId.eq(invoice_id))
                    .exec(txn)
                    .await
                    .map_err(|e| ServiceError::database(DbStage::Update, e))?;
                if result.rows_affected == 0 {
                    return Err(ServiceError::InvoiceNotFound(invoice_id));
                }
                Ok(())
            })
        })
        .await?;

        info!(invoice_id, ?update, "Invoice updated");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_invoice_by_id(&self, invoice_id: i32) -> Result<(), ServiceError> {
        run_in_transaction(&self.db_pool, "delete_invoice", move |txn| {
            Box::pin(async move {
                invoice_item::Entity::delete_many()
                    .filter(invoice_item::Column::InvoiceId.eq(invoice_id))
                    .exec(txn)
                    .await
                    .map_err(|e| ServiceError::database(DbStage::Delete, e))?;

                let deleted = invoice::Entity::delete_by_id(invoice_id)
                    .exec(txn)
                    .await
                    .map_err(|e| ServiceError::database(DbStage::Delete, e))?;
                if deleted.rows_affected == 0 {
                    return Err(ServiceError::InvoiceNotFound(invoice_id));
                }
                Ok(())
            })
        })
        .await?;

        info!(invoice_id, "Invoice deleted");
        Ok(())
    }

    /// Loads the invoice completely, then renders it as UBL XML.
    #[instrument(skip(self, supplier_company_name))]
    pub async fn invoice_xml(
        &self,
        invoice_id: i32,
        supplier_company_name: &str,
    ) -> Result<String, ServiceError> {
        let invoice = self.get_invoice_by_id(invoice_id).await?;
        if invoice.items.is_empty() {
            warn!(invoice_id, "Invoice has no items to export");
        }
        serialize_invoice(&invoice, supplier_company_name)
    }
}

fn query_error(e: DbErr) -> ServiceError {
    error!(error = %e, "Invoice query failed");
    ServiceError::database(DbStage::Query, e)
}
