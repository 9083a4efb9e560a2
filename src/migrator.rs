use sea_orm_migration::prelude::*;


pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_orders_table::Migration),
            Box::new(m20250301_000002_create_order_items_table::Migration),
            Box::new(m20250301_000003_create_invoices_table::Migration),
            Box::new(m20250301_000004_create_invoice_items_table::Migration),
        ]
    }
}

// Column identifiers keep the relational names used by the stored documents.

mod m20250301_000001_create_orders_table {
    use sea_orm_migration::prelude::*;
    use crate::validation::{AMOUNT_PRECISION, AMOUNT_SCALE};

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Orders::SalesOrderId)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Orders::Uuid).string().not_null())
                        .col(ColumnDef::new(Orders::IssueDate).date().not_null())
                        .col(ColumnDef::new(Orders::PartyName).string().not_null())
                        .col(ColumnDef::new(Orders::PartyNameSeller).string().null())
                        .col(
                            ColumnDef::new(Orders::PayableAmount)
                                .decimal_len(AMOUNT_PRECISION, AMOUNT_SCALE)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::PayableCurrencyCode)
                                .string_len(3)
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_party_name")
                        .table(Orders::Table)
                        .col(Orders::PartyName)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Orders {
        Table,
        #[sea_orm(iden = "SalesOrderID")]
        SalesOrderId,
        #[sea_orm(iden = "UUID")]
        Uuid,
        #[sea_orm(iden = "IssueDate")]
        IssueDate,
        #[sea_orm(iden = "PartyName")]
        PartyName,
        #[sea_orm(iden = "PartyNameSeller")]
        PartyNameSeller,
        #[sea_orm(iden = "PayableAmount")]
        PayableAmount,
        #[sea_orm(iden = "PayableCurrencyCode")]
        PayableCurrencyCode,
    }
}

mod m20250301_000002_create_order_items_table {
    use super::m20250301_000001_create_orders_table::Orders;
    use sea_orm_migration::prelude::*;
    use crate::validation::{AMOUNT_PRECISION, AMOUNT_SCALE};

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_order_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::ItemId)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(OrderItems::SalesOrderId).string().not_null())
                        .col(
                            ColumnDef::new(OrderItems::ItemDescription)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderItems::BuyersItemIdentification)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderItems::SellersItemIdentification)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderItems::ItemAmount)
                                .decimal_len(AMOUNT_PRECISION, AMOUNT_SCALE)
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::ItemUnitCode).string().not_null())
                        .col(
                            ColumnDef::new(OrderItems::ItemPrice)
                                .decimal_len(AMOUNT_PRECISION, AMOUNT_SCALE)
                                .not_null()
                                .default(0),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_sales_order_id")
                                .from(OrderItems::Table, OrderItems::SalesOrderId)
                                .to(Orders::Table, Orders::SalesOrderId)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        #[sea_orm(iden = "ItemID")]
        ItemId,
        #[sea_orm(iden = "SalesOrderID")]
        SalesOrderId,
        #[sea_orm(iden = "ItemDescription")]
        ItemDescription,
        #[sea_orm(iden = "BuyersItemIdentification")]
        BuyersItemIdentification,
        #[sea_orm(iden = "SellersItemIdentification")]
        SellersItemIdentification,
        #[sea_orm(iden = "ItemAmount")]
        ItemAmount,
        #[sea_orm(iden = "ItemUnitCode")]
        ItemUnitCode,
        #[sea_orm(iden = "ItemPrice")]
        ItemPrice,
    }
}

mod m20250301_000003_create_invoices_table {
    use super::m20250301_000001_create_orders_table::Orders;
    use sea_orm_migration::prelude::*;
    use crate::validation::{AMOUNT_PRECISION, AMOUNT_SCALE};

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000003_create_invoices_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Invoices::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Invoices::InvoiceId)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Invoices::IssueDate).date().not_null())
                        .col(ColumnDef::new(Invoices::PartyNameBuyer).string().not_null())
                        .col(ColumnDef::new(Invoices::PartyNameSeller).string().null())
                        .col(
                            ColumnDef::new(Invoices::PayableAmount)
                                .decimal_len(AMOUNT_PRECISION, AMOUNT_SCALE)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Invoices::CurrencyCode)
                                .string_len(3)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Invoices::SalesOrderId).string().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_invoices_sales_order_id")
                                .from(Invoices::Table, Invoices::SalesOrderId)
                                .to(Orders::Table, Orders::SalesOrderId)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_invoices_party_name_buyer")
                        .table(Invoices::Table)
                        .col(Invoices::PartyNameBuyer)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Invoices::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Invoices {
        Table,
        #[sea_orm(iden = "InvoiceID")]
        InvoiceId,
        #[sea_orm(iden = "IssueDate")]
        IssueDate,
        #[sea_orm(iden = "PartyNameBuyer")]
        PartyNameBuyer,
        #[sea_orm(iden = "PartyNameSeller")]
        PartyNameSeller,
        #[sea_orm(iden = "PayableAmount")]
        PayableAmount,
        #[sea_orm(iden = "CurrencyCode")]
        CurrencyCode,
        #[sea_orm(iden = "SalesOrderID")]
        SalesOrderId,
    }
}

mod m20250301_000004_create_invoice_items_table {
    use super::m20250301_000003_create_invoices_table::Invoices;
    use sea_orm_migration::prelude::*;
    use crate::validation::{AMOUNT_PRECISION, AMOUNT_SCALE};

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000004_create_invoice_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InvoiceItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InvoiceItems::InvoiceItemId)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(InvoiceItems::InvoiceId).integer().not_null())
                        .col(
                            ColumnDef::new(InvoiceItems::ItemDescription)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InvoiceItems::BuyersItemIdentification)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InvoiceItems::SellersItemIdentification)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InvoiceItems::ItemAmount)
                                .decimal_len(AMOUNT_PRECISION, AMOUNT_SCALE)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InvoiceItems::ItemUnitCode)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InvoiceItems::ItemPrice)
                                .decimal_len(AMOUNT_PRECISION, AMOUNT_SCALE)
                                .not_null()
                                .default(0),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_invoice_items_invoice_id")
                                .from(InvoiceItems::Table, InvoiceItems::InvoiceId)
                                .to(Invoices::Table, Invoices::InvoiceId)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InvoiceItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum InvoiceItems {
        Table,
        #[sea_orm(iden = "InvoiceItemID")]
        InvoiceItemId,
        #[sea_orm(iden = "InvoiceID")]
        InvoiceId,
        #[sea_orm(iden = "ItemDescription")]
        ItemDescription,
        #[sea_orm(iden = "BuyersItemIdentification")]
        BuyersItemIdentification,
        #[sea_orm(iden = "SellersItemIdentification")]
        SellersItemIdentification,
        #[sea_orm(iden = "ItemAmount")]
        ItemAmount,
        #[sea_orm(iden = "ItemUnitCode")]
        ItemUnitCode,
        #[sea_orm(iden = "ItemPrice")]
        ItemPrice,
    }
}
