use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_catalog_tables::Migration),
            Box::new(m20240301_000002_create_orders_table::Migration),
            Box::new(m20240301_000003_create_order_items_table::Migration),
            Box::new(m20240301_000004_create_payments_table::Migration),
            Box::new(m20240301_000005_create_blocked_customers_table::Migration),
        ]
    }
}

mod m20240301_000001_create_catalog_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(BouquetTypes::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(BouquetTypes::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(BouquetTypes::Name).string().not_null().unique_key())
                        .col(ColumnDef::new(BouquetTypes::CreatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(FlowerTypes::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(FlowerTypes::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(FlowerTypes::Name).string().not_null().unique_key())
                        .col(ColumnDef::new(FlowerTypes::CreatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Bouquets::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Bouquets::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Bouquets::Name).string().not_null())
                        .col(ColumnDef::new(Bouquets::Description).text().null())
                        .col(ColumnDef::new(Bouquets::Price).decimal_len(12, 2).not_null())
                        .col(
                            ColumnDef::new(Bouquets::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Bouquets::PurchaseCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Bouquets::ViewCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Bouquets::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Bouquets::BouquetTypeId).uuid().null())
                        .col(ColumnDef::new(Bouquets::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Bouquets::UpdatedAt).timestamp_with_time_zone().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_bouquets_bouquet_type_id")
                                .from(Bouquets::Table, Bouquets::BouquetTypeId)
                                .to(BouquetTypes::Table, BouquetTypes::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BouquetFlowerTypes::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(BouquetFlowerTypes::BouquetId).uuid().not_null())
                        .col(ColumnDef::new(BouquetFlowerTypes::FlowerTypeId).uuid().not_null())
                        .primary_key(
                            Index::create()
                                .col(BouquetFlowerTypes::BouquetId)
                                .col(BouquetFlowerTypes::FlowerTypeId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_bouquet_flower_types_bouquet_id")
                                .from(BouquetFlowerTypes::Table, BouquetFlowerTypes::BouquetId)
                                .to(Bouquets::Table, Bouquets::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_bouquet_flower_types_flower_type_id")
                                .from(BouquetFlowerTypes::Table, BouquetFlowerTypes::FlowerTypeId)
                                .to(FlowerTypes::Table, FlowerTypes::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BouquetFlowerTypes::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Bouquets::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(FlowerTypes::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(BouquetTypes::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Bouquets {
        Table,
        Id,
        Name,
        Description,
        Price,
        Quantity,
        PurchaseCount,
        ViewCount,
        IsActive,
        BouquetTypeId,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum BouquetTypes {
        Table,
        Id,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum FlowerTypes {
        Table,
        Id,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum BouquetFlowerTypes {
        Table,
        BouquetId,
        FlowerTypeId,
    }
}

mod m20240301_000002_create_orders_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create orders table aligned with entities::order Model
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::CustomerName).string().not_null())
                        .col(ColumnDef::new(Orders::CustomerPhone).string().not_null())
                        .col(ColumnDef::new(Orders::CustomerEmail).string().not_null())
                        .col(ColumnDef::new(Orders::RecipientName).string().not_null())
                        .col(ColumnDef::new(Orders::RecipientPhone).string().not_null())
                        .col(ColumnDef::new(Orders::DeliveryMethod).string().not_null())
                        .col(ColumnDef::new(Orders::DeliveryCity).string().null())
                        .col(ColumnDef::new(Orders::DeliveryStreet).string().null())
                        .col(ColumnDef::new(Orders::DeliveryHouse).string().null())
                        .col(ColumnDef::new(Orders::DeliveryApartment).string().null())
                        .col(ColumnDef::new(Orders::DeliveryFloor).string().null())
                        .col(ColumnDef::new(Orders::DeliveryDate).timestamp_with_time_zone().null())
                        .col(ColumnDef::new(Orders::DeliveryTimeFrom).timestamp_with_time_zone().null())
                        .col(ColumnDef::new(Orders::DeliveryTimeTo).timestamp_with_time_zone().null())
                        .col(ColumnDef::new(Orders::Comment).text().null())
                        .col(ColumnDef::new(Orders::GreetingCardText).text().null())
                        .col(
                            ColumnDef::new(Orders::TotalAmount)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::Status).string().not_null())
                        .col(
                            ColumnDef::new(Orders::IsActive)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Orders::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(Orders::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Orders::UpdatedAt).timestamp_with_time_zone().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_customer_email")
                        .table(Orders::Table)
                        .col(Orders::CustomerEmail)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_created_at")
                        .table(Orders::Table)
                        .col(Orders::CreatedAt)
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
    enum Orders {
        Table,
        Id,
        CustomerName,
        CustomerPhone,
        CustomerEmail,
        RecipientName,
        RecipientPhone,
        DeliveryMethod,
        DeliveryCity,
        DeliveryStreet,
        DeliveryHouse,
        DeliveryApartment,
        DeliveryFloor,
        DeliveryDate,
        DeliveryTimeFrom,
        DeliveryTimeTo,
        Comment,
        GreetingCardText,
        TotalAmount,
        Status,
        IsActive,
        Version,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000003_create_order_items_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_order_items_table"
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
                            ColumnDef::new(OrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::BouquetId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(OrderItems::Price)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_bouquet_id")
                                .from(OrderItems::Table, OrderItems::BouquetId)
                                .to(Bouquets::Table, Bouquets::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
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
        Id,
        OrderId,
        BouquetId,
        Quantity,
        Price,
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Bouquets {
        Table,
        Id,
    }
}

mod m20240301_000004_create_payments_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_payments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Payments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Payments::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Payments::OrderId).uuid().not_null())
                        .col(
                            ColumnDef::new(Payments::Amount)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Payments::PaymentMethod).string().not_null())
                        .col(ColumnDef::new(Payments::Status).string().not_null())
                        .col(ColumnDef::new(Payments::TransactionId).string().null())
                        .col(ColumnDef::new(Payments::PaymentDate).timestamp_with_time_zone().null())
                        .col(ColumnDef::new(Payments::CreatedAt).timestamp_with_time_zone().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_payments_order_id")
                                .from(Payments::Table, Payments::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payments_order_id")
                        .table(Payments::Table)
                        .col(Payments::OrderId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Payments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Payments {
        Table,
        Id,
        OrderId,
        Amount,
        PaymentMethod,
        Status,
        TransactionId,
        PaymentDate,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
    }
}

mod m20240301_000005_create_blocked_customers_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_blocked_customers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(BlockedCustomers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BlockedCustomers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(BlockedCustomers::Email).string().not_null())
                        .col(ColumnDef::new(BlockedCustomers::Phone).string().null())
                        .col(
                            ColumnDef::new(BlockedCustomers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_blocked_customers_email")
                        .table(BlockedCustomers::Table)
                        .col(BlockedCustomers::Email)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BlockedCustomers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum BlockedCustomers {
        Table,
        Id,
        Email,
        Phone,
        CreatedAt,
    }
}
