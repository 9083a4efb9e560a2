use crate::{
    db::{run_in_transaction, DbPool},
    entities::{order, order_item},
    errors::{DbStage, ServiceError},
    validation::{
        parse_issue_date, parse_non_negative_decimal, parse_unit_code, validate_currency_code,
        validate_description, validate_numeric_id, validate_party_name, validate_uuid,
    },
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, NotSet, QueryFilter, QueryOrder,
    QuerySelect, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

/// Unvalidated order as it arrives from a normalized document.
#[derive(Debug, Clone, Default)]
pub struct OrderDraft {
    pub sales_order_id: String,
    pub uuid: String,
    pub issue_date: String,
    pub party_name_buyer: String,
    pub party_name_seller: Option<String>,
    pub payable_amount: String,
    pub payable_currency_code: String,
    pub items: Vec<OrderItemDraft>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderItemDraft {
    pub description: String,
    pub buyers_item_identification: String,
    pub sellers_item_identification: String,
    pub amount: String,
    pub unit_code: String,
    /// Defaults to zero when absent
    pub price: Option<String>,
}

/// Line item as stored on an order or an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub item_description: String,
    pub buyers_item_identification: String,
    pub sellers_item_identification: String,
    #[schema(value_type = String)]
    pub item_amount: Decimal,
    pub item_unit_code: String,
    #[schema(value_type = String)]
    pub item_price: Decimal,
}

impl From<order_item::Model> for LineItem {
    fn from(model: order_item::Model) -> Self {
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithItems {
    pub sales_order_id: String,
    pub uuid: String,
    pub issue_date: NaiveDate,
    pub party_name_buyer: String,
    pub party_name_seller: Option<String>,
    #[schema(value_type = String)]
    pub payable_amount: Decimal,
    pub payable_currency_code: String,
    pub items: Vec<LineItem>,
}

impl OrderWithItems {
    fn from_models(order: order::Model, items: Vec<order_item::Model>) -> Self {
        Self {
            sales_order_id: order.sales_order_id,
            uuid: order.uuid,
            issue_date: order.issue_date,
            party_name_buyer: order.party_name_buyer,
            party_name_seller: order.party_name_seller,
            payable_amount: order.payable_amount,
            payable_currency_code: order.payable_currency_code,
            items: items.into_iter().map(LineItem::from).collect(),
        }
    }
}

/// Rows ready to insert, produced only once every field has passed validation.
struct ValidatedOrder {
    header: order::ActiveModel,
    items: Vec<order_item::ActiveModel>,
}

impl OrderDraft {
    /// Checks fields in a fixed order and stops at the first failure.
    fn validate(&self) -> Result<ValidatedOrder, ServiceError> {
        let sales_order_id = self.sales_order_id.trim().to_string();
        if sales_order_id.is_empty() {
            return Err(ServiceError::invalid_field(
                "SalesOrderID",
                "SalesOrderID must not be empty",
            ));
        }

        let uuid = validate_uuid("UUID", &self.uuid)?;
        let issue_date = parse_issue_date("IssueDate", &self.issue_date)?;
        let party_name_buyer = validate_party_name("PartyName", &self.party_name_buyer)?;
        let party_name_seller = self
            .party_name_seller
            .as_deref()
            .map(|name| validate_party_name("PartyNameSeller", name))
            .transpose()?;
        let payable_amount = parse_non_negative_decimal("PayableAmount", &self.payable_amount)?;
        let payable_currency_code =
            validate_currency_code("PayableCurrencyCode", &self.payable_currency_code)?;

        let header = order::ActiveModel {
            sales_order_id: Set(sales_order_id.clone()),
            uuid: Set(uuid.hyphenated().to_string()),
            issue_date: Set(issue_date),
            party_name_buyer: Set(party_name_buyer),
            party_name_seller: Set(party_name_seller),
            payable_amount: Set(payable_amount),
            payable_currency_code: Set(payable_currency_code),
        };

        let items = self
            .items
            .iter()
            .map(|item| item.validate(&sales_order_id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ValidatedOrder { header, items })
    }
}

impl OrderItemDraft {
    fn validate(&self, sales_order_id: &str) -> Result<order_item::ActiveModel, ServiceError> {
        let description = validate_description("ItemDescription", &self.description)?;
        let buyers_id =
            validate_numeric_id("BuyersItemIdentification", &self.buyers_item_identification)?;
        let sellers_id =
            validate_numeric_id("SellersItemIdentification", &self.sellers_item_identification)?;
        let amount = parse_non_negative_decimal("ItemAmount", &self.amount)?;
        let unit_code = parse_unit_code("ItemUnitCode", &self.unit_code)?;
        let price = match self.price.as_deref() {
            Some(price) => parse_non_negative_decimal("ItemPrice", price)?,
            None => Decimal::ZERO,
        };

        Ok(order_item::ActiveModel {
            item_id: NotSet,
            sales_order_id: Set(sales_order_id.to_string()),
            item_description: Set(description),
            buyers_item_identification: Set(buyers_id),
            sellers_item_identification: Set(sellers_id),
            item_amount: Set(amount),
            item_unit_code: Set(unit_code.to_string()),
            item_price: Set(price),
        })
    }
}

/// Transactional store for orders and their line items.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Validates and inserts an order with its items, returning the sales order id.
    #[instrument(skip(self, draft), fields(sales_order_id = %draft.sales_order_id, items = draft.items.len()))]
    pub async fn insert_order(&self, draft: OrderDraft) -> Result<String, ServiceError> {
        let db = &*self.db_pool;
        let sales_order_id = draft.sales_order_id.trim().to_string();

        // Advisory only; the primary key decides under concurrent inserts.
        let existing = order::Entity::find_by_id(sales_order_id.clone())
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to check for an existing order");
                ServiceError::database(DbStage::Query, e)
            })?;
        if existing.is_some() {
            warn!("Order already exists");
            return Err(ServiceError::DuplicateOrderId(sales_order_id));
        }

        let ValidatedOrder { header, items } = draft.validate()?;

        let id = sales_order_id.clone();
        let inserted = run_in_transaction(db, "insert_order", move |txn| {
            Box::pin(async move {
                header
                    .insert(txn)
                    .await
                    .map_err(|e| insert_order_error(&id, e))?;
                for item in items {
                    item.insert(txn).await.map_err(|e| {
                        error!(error = %e, sales_order_id = %id, "Failed to insert order item");
                        ServiceError::database(DbStage::InsertOrderItem, e)
                    })?;
                }
                Ok(id)
            })
        })
        .await?;

        info!(sales_order_id = %inserted, "Order created successfully");
        Ok(inserted)
    }

    /// Loads an order and its items in insertion order.
    #[instrument(skip(self))]
    pub async fn get_order_by_sales_order_id(
        &self,
        sales_order_id: &str,
    ) -> Result<OrderWithItems, ServiceError> {
        let db = &*self.db_pool;

        let order = order::Entity::find_by_id(sales_order_id.to_string())
            .one(db)
            .await
            .map_err(query_error)?
            .ok_or_else(|| ServiceError::OrderNotFound(sales_order_id.to_string()))?;

        let items = order_item::Entity::find()
            .filter(order_item::Column::SalesOrderId.eq(sales_order_id))
            .order_by_asc(order_item::Column::ItemId)
            .all(db)
            .await
            .map_err(query_error)?;

        Ok(OrderWithItems::from_models(order, items))
    }

    /// Sales order ids of every order placed by `party_name`.
    #[instrument(skip(self))]
    pub async fn get_order_ids_by_party_name(
        &self,
        party_name: &str,
    ) -> Result<Vec<String>, ServiceError> {
        let ids: Vec<String> = order::Entity::find()
            .select_only()
            .column(order::Column::SalesOrderId)
            .filter(order::Column::PartyNameBuyer.eq(party_name))
            .order_by_asc(order::Column::SalesOrderId)
            .into_tuple()
            .all(&*self.db_pool)
            .await
            .map_err(query_error)?;

        if ids.is_empty() {
            return Err(ServiceError::NoOrdersFound(party_name.to_string()));
        }
        Ok(ids)
    }

    /// Deletes an order and its items; derived invoices follow by cascade.
    #[instrument(skip(self))]
    pub async fn delete_order_by_id(&self, sales_order_id: &str) -> Result<(), ServiceError> {
        let id = sales_order_id.to_string();

        run_in_transaction(&self.db_pool, "delete_order", move |txn| {
            Box::pin(async move {
                order_item::Entity::delete_many()
                    .filter(order_item::Column::SalesOrderId.eq(id.as_str()))
                    .exec(txn)
                    .await
                    .map_err(|e| ServiceError::database(DbStage::Delete, e))?;

                let deleted = order::Entity::delete_by_id(id.clone())
                    .exec(txn)
                    .await
                    .map_err(|e| ServiceError::database(DbStage::Delete, e))?;
                if deleted.rows_affected == 0 {
                    return Err(ServiceError::OrderNotFound(id));
                }
                Ok(())
            })
        })
        .await?;

        info!(sales_order_id, "Order deleted");
        Ok(())
    }
}

fn query_error(e: DbErr) -> ServiceError {
    error!(error = %e, "Order query failed");
    ServiceError::database(DbStage::Query, e)
}

fn insert_order_error(sales_order_id: &str, e: DbErr) -> ServiceError {
    if let Some(SqlErr::UniqueConstraintViolation(_)) = e.sql_err() {
        warn!(sales_order_id, "Concurrent insert won the SalesOrderID");
        return ServiceError::DuplicateOrderId(sales_order_id.to_string());
    }
    error!(error = %e, sales_order_id, "Failed to insert order");
    ServiceError::database(DbStage::InsertOrder, e)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::memory_pool;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    pub(crate) fn widget_order(id: &str) -> OrderDraft {
        OrderDraft {
            sales_order_id: id.to_string(),
            uuid: "6f1c2a1e-3b7d-4c5a-9e8f-0a1b2c3d4e5f".to_string(),
            issue_date: "2025-03-06".to_string(),
            party_name_buyer: "ABC Corp".to_string(),
            party_name_seller: None,
            payable_amount: "500".to_string(),
            payable_currency_code: "USD".to_string(),
            items: vec![OrderItemDraft {
                description: "Widget".to_string(),
                buyers_item_identification: "1".to_string(),
                sellers_item_identification: "2".to_string(),
                amount: "10".to_string(),
                unit_code: "EA".to_string(),
                price: Some("50".to_string()),
            }],
        }
    }

    async fn service() -> OrderService {
        OrderService::new(Arc::new(memory_pool().await))
    }

    #[tokio::test]
    async fn inserts_and_reads_back() {
        let orders = service().await;
        let id = orders.insert_order(widget_order("ORD1")).await.unwrap();
        assert_eq!(id, "ORD1");

        let order = orders.get_order_by_sales_order_id("ORD1").await.unwrap();
        assert_eq!(order.party_name_buyer, "ABC Corp");
        assert_eq!(order.payable_amount, dec!(500));
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].item_unit_code, "EA");
        assert_eq!(order.items[0].item_price, dec!(50));
    }

    #[tokio::test]
    async fn duplicate_sales_order_id_is_rejected() {
        let orders = service().await;
        orders.insert_order(widget_order("ORD1")).await.unwrap();

        let mut second = widget_order("ORD1");
        second.party_name_buyer = "Globex".to_string();
        assert_matches!(
            orders.insert_order(second).await,
            Err(ServiceError::DuplicateOrderId(id)) if id == "ORD1"
        );

        let stored = orders.get_order_by_sales_order_id("ORD1").await.unwrap();
        assert_eq!(stored.party_name_buyer, "ABC Corp");
    }

    #[tokio::test]
    async fn first_invalid_field_wins_and_nothing_is_written() {
        let orders = service().await;
        let mut draft = widget_order("ORD2");
        draft.uuid = "not-a-uuid".to_string();
        draft.payable_amount = "-1".to_string();

        assert_matches!(
            orders.insert_order(draft).await,
            Err(ServiceError::InvalidField { field, .. }) if field == "UUID"
        );
        assert_matches!(
            orders.get_order_by_sales_order_id("ORD2").await,
            Err(ServiceError::OrderNotFound(_))
        );
    }

    #[tokio::test]
    async fn reading_an_order_twice_gives_the_same_result() {
        let orders = service().await;
        orders.insert_order(widget_order("ORD1")).await.unwrap();

        let first = orders.get_order_by_sales_order_id("ORD1").await.unwrap();
        let second = orders.get_order_by_sales_order_id("ORD1").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn amounts_beyond_column_precision_are_rejected_before_writing() {
        let orders = service().await;
        let mut draft = widget_order("ORD6");
        draft.payable_amount = "12345678901234567.89".to_string();
        assert_matches!(
            orders.insert_order(draft).await,
            Err(ServiceError::InvalidField { field, .. }) if field == "PayableAmount"
        );

        let mut draft = widget_order("ORD6");
        draft.items[0].amount = "100000000000000000000".to_string();
        draft.items[0].price = Some("100000000000000000000".to_string());
        assert_matches!(
            orders.insert_order(draft).await,
            Err(ServiceError::InvalidField { field, .. }) if field == "ItemAmount"
        );

        assert_matches!(
            orders.get_order_by_sales_order_id("ORD6").await,
            Err(ServiceError::OrderNotFound(_))
        );
    }

    #[tokio::test]
    async fn invalid_item_field_is_named() {
        let orders = service().await;
        let mut draft = widget_order("ORD3");
        draft.items[0].unit_code = "BARRELS".to_string();

        assert_matches!(
            orders.insert_order(draft).await,
            Err(ServiceError::InvalidField { field, .. }) if field == "ItemUnitCode"
        );
    }

    #[tokio::test]
    async fn missing_price_defaults_to_zero() {
        let orders = service().await;
        let mut draft = widget_order("ORD4");
        draft.items[0].price = None;
        orders.insert_order(draft).await.unwrap();

        let order = orders.get_order_by_sales_order_id("ORD4").await.unwrap();
        assert!(order.items[0].item_price.is_zero());
    }

    #[tokio::test]
    async fn lists_ids_by_party_name() {
        let orders = service().await;
        orders.insert_order(widget_order("ORD-B")).await.unwrap();
        orders.insert_order(widget_order("ORD-A")).await.unwrap();

        let ids = orders.get_order_ids_by_party_name("ABC Corp").await.unwrap();
        assert_eq!(ids, vec!["ORD-A".to_string(), "ORD-B".to_string()]);

        assert_matches!(
            orders.get_order_ids_by_party_name("Nobody").await,
            Err(ServiceError::NoOrdersFound(_))
        );
    }

    #[tokio::test]
    async fn delete_removes_order_and_reports_missing() {
        let orders = service().await;
        orders.insert_order(widget_order("ORD5")).await.unwrap();

        orders.delete_order_by_id("ORD5").await.unwrap();
        assert_matches!(
            orders.get_order_by_sales_order_id("ORD5").await,
            Err(ServiceError::OrderNotFound(_))
        );
        assert_matches!(
            orders.delete_order_by_id("ORD5").await,
            Err(ServiceError::OrderNotFound(id)) if id == "ORD5"
        );
    }
}
