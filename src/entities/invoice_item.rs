use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoice_items")]
pub struct Model {
    #[sea_orm(primary_key, column_name = "InvoiceItemID")]
    pub invoice_item_id: i32,
    #[sea_orm(column_name = "InvoiceID")]
    pub invoice_id: i32,
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
        belongs_to = "super::invoice::Entity",
        from = "Column::InvoiceId",
        to = "super::invoice::Column::InvoiceId",
        on_delete = "Cascade"
    )]
    Invoice,
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
