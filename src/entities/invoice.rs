use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Invoice header. Buyer, seller, amount and currency are copied from the
/// originating order when the invoice is created and never follow later order edits.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key, column_name = "InvoiceID")]
    pub invoice_id: i32,
    #[sea_orm(column_name = "IssueDate")]
    pub issue_date: Date,
    #[sea_orm(column_name = "PartyNameBuyer")]
    pub party_name_buyer: String,
    #[sea_orm(column_name = "PartyNameSeller")]
    pub party_name_seller: Option<String>,
    #[sea_orm(column_name = "PayableAmount", column_type = "Decimal(Some((16, 4)))")]
    pub payable_amount: Decimal,
    #[sea_orm(column_name = "CurrencyCode")]
    pub currency_code: String,
    #[sea_orm(column_name = "SalesOrderID")]
    pub sales_order_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::SalesOrderId",
        to = "super::order::Column::SalesOrderId",
        on_delete = "Cascade"
    )]
    Order,
    #[sea_orm(has_many = "super::invoice_item::Entity")]
    InvoiceItem,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::invoice_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InvoiceItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
