use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m0002_inventory"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Inventory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Inventory::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Inventory::UserId).integer().not_null())
                    .col(ColumnDef::new(Inventory::Ndc).string().not_null())
                    .col(ColumnDef::new(Inventory::DrugName).string().not_null())
                    .col(ColumnDef::new(Inventory::QuantityOrdered).big_integer().not_null())
                    .col(
                        ColumnDef::new(Inventory::QuantityDisposed)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Inventory::Dosage).string().null())
                    .col(ColumnDef::new(Inventory::Manufacturer).string().null())
                    .col(ColumnDef::new(Inventory::Wholesaler).string().not_null())
                    .col(ColumnDef::new(Inventory::UploadTimestamp).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-inventory-user_id")
                            .from(Inventory::Table, Inventory::UserId)
                            .to(super::user::Users::Table, super::user::Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // The natural key. Upserts rely on this index to detect an existing record.
        manager
            .create_index(
                Index::create()
                    .name("idx-inventory-natural_key")
                    .table(Inventory::Table)
                    .col(Inventory::UserId)
                    .col(Inventory::Ndc)
                    .col(Inventory::Wholesaler)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Inventory::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
pub enum Inventory {
    Table,
    Id,
    UserId,
    Ndc,
    DrugName,
    QuantityOrdered,
    QuantityDisposed,
    Dosage,
    Manufacturer,
    Wholesaler,
    UploadTimestamp,
}
