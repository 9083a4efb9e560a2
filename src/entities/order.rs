use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_name = "SalesOrderID")]
    pub sales_order_id: String,
    #[sea_orm(column_name = "UUID")]
    pub uuid: String,
    #[sea_orm(column_name = "IssueDate")]
    pub issue_date: Date,
    #[sea_orm(column_name = "PartyName")]
    pub party_name_buyer: String,
    #[sea_orm(column_name = "PartyNameSeller")]
    pub party_name_seller: Option<String>,
    #[sea_orm(column_name = "PayableAmount", column_type = "Decimal(Some((16, 4)))")]
    pub payable_amount: Decimal,
    #[sea_orm(column_name = "PayableCurrencyCode")]
    pub payable_currency_code: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
    #[sea_orm(has_many = "super::invoice::Entity")]
    Invoice,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
