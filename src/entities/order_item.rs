use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key, column_name = "ItemID")]
    pub item_id: i32,
    #[sea_orm(column_name = "SalesOrderID")]
    pub sales_order_id: String,
    #[sea_orm(column_name = "ItemDescription")]
    pub item_description: String,
    #[sea_orm(column_name = "BuyersItemIdentification")]
    pub buyers_item_identification: String,
    #[sea_orm(column_name = "SellersItemIdentification")]
    pub sellers_item_identification: String,
    #[sea_orm(column_name = "ItemAmount", column_type = "Decimal(Some((16, 4)))")]
    pub item_amount: Decimal,
    #[sea_orm(column_name = "ItemUnitCode")]
    pub item_unit_code: String,
    #[sea_orm(column_name = "ItemPrice", column_type = "Decimal(Some((16, 4)))")]
    pub item_price: Decimal,
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
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
