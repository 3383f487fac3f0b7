use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::NotSet;
use sea_orm::ActiveValue::Set;
use sea_orm::JoinType;
use sea_orm::QueryOrder;
use sea_orm::QuerySelect;
use serde::Deserialize;
use serde::Serialize;
use tracing::instrument;

use crate::db::driver::DatabaseDriver;
use crate::db::DBProvider;
use crate::db::SeaStore;
use crate::disposition::DispositionAudit;
use crate::disposition::DispositionEntry;
use crate::types::Result;

/// One audit entry: the quantity a record's disposition was set to, and when.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dispositions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id:                i32,
    pub inventory_id:      i32,
    pub quantity_disposed: i64,
    pub wholesaler:        Option<String>,
    pub recorded_at:       String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory_record::Entity",
        from = "Column::InventoryId",
        to = "super::inventory_record::Column::Id"
    )]
    InventoryRecord,
}

impl ActiveModelBehavior for ActiveModel {}

#[async_trait]
impl<D: DatabaseDriver> DispositionAudit for SeaStore<D> {
    #[instrument(level = "trace", skip(self))]
    async fn record(&self, entry: &DispositionEntry) -> Result<()> {
        ActiveModel {
            id:                NotSet,
            inventory_id:      Set(entry.inventory_id),
            quantity_disposed: Set(entry.quantity),
            wholesaler:        Set(Some(entry.wholesaler.clone())),
            recorded_at:       Set(entry.recorded_at.clone()),
        }
        .insert(&self.db_connection())
        .await?;

        Ok(())
    }

    #[instrument(level = "trace", skip(self))]
    async fn history(&self, user_id: i32, inventory_id: i32) -> Result<Vec<Model>> {
        Ok(Entity::find()
            .join(JoinType::InnerJoin, Relation::InventoryRecord.def())
            .filter(Column::InventoryId.eq(inventory_id))
            .filter(super::inventory_record::Column::UserId.eq(user_id))
            .order_by_asc(Column::Id)
            .all(&self.db_connection())
            .await?)
    }
}
