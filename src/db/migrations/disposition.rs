use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m0003_dispositions"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Dispositions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Dispositions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Dispositions::InventoryId).integer().not_null())
                    .col(ColumnDef::new(Dispositions::QuantityDisposed).big_integer().not_null())
                    .col(ColumnDef::new(Dispositions::Wholesaler).string().null())
                    .col(ColumnDef::new(Dispositions::RecordedAt).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-dispositions-inventory_id")
                            .from(Dispositions::Table, Dispositions::InventoryId)
                            .to(
                                super::inventory_record::Inventory::Table,
                                super::inventory_record::Inventory::Id,
                            ),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-dispositions-inventory_id")
                    .table(Dispositions::Table)
                    .col(Dispositions::InventoryId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Dispositions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Dispositions {
    Table,
    Id,
    InventoryId,
    QuantityDisposed,
    Wholesaler,
    RecordedAt,
}
