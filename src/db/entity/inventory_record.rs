use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::OnConflict;
use sea_orm::ActiveValue::NotSet;
use sea_orm::ActiveValue::Set;
use sea_orm::Condition;
use sea_orm::QueryOrder;
use sea_orm::TryInsertResult;
use serde::Deserialize;
use serde::Serialize;
use tracing::instrument;

use crate::db::driver::DatabaseDriver;
use crate::db::DBProvider;
use crate::db::SeaStore;
use crate::ledger::LedgerStore;
use crate::sheet::InventoryRow;
use crate::types::LedgerError;
use crate::types::Result;
use crate::types::UpsertOutcome;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id:                i32,
    pub user_id:           i32,
    pub ndc:               String,
    pub drug_name:         String,
    pub quantity_ordered:  i64,
    pub quantity_disposed: i64,
    pub dosage:            Option<String>,
    pub manufacturer:      Option<String>,
    pub wholesaler:        String,
    /// When the upload that last touched this record was received, ISO-8601.
    pub upload_timestamp:  String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl ActiveModelBehavior for ActiveModel {}

fn natural_key(user_id: i32, ndc: &str, wholesaler: &str) -> Condition {
    Condition::all()
        .add(Column::UserId.eq(user_id))
        .add(Column::Ndc.eq(ndc))
        .add(Column::Wholesaler.eq(wholesaler))
}

#[async_trait]
impl<D: DatabaseDriver> LedgerStore for SeaStore<D> {
    // Insert guarded by the natural key index; a conflict means the record exists and gets overwritten instead.
    #[instrument(level = "trace", skip(self, row), fields(ndc = %row.ndc, wholesaler = %row.wholesaler))]
    async fn upsert(&self, user_id: i32, row: &InventoryRow, upload_timestamp: &str) -> Result<UpsertOutcome> {
        let db = self.db_connection();

        let record = ActiveModel {
            id:                NotSet,
            user_id:           Set(user_id),
            ndc:               Set(row.ndc.clone()),
            drug_name:         Set(row.drug_name.clone()),
            quantity_ordered:  Set(row.quantity_ordered),
            quantity_disposed: Set(0),
            dosage:            Set(row.dosage.clone()),
            manufacturer:      Set(row.manufacturer.clone()),
            wholesaler:        Set(row.wholesaler.clone()),
            upload_timestamp:  Set(upload_timestamp.to_owned()),
        };

        let inserted = Entity::insert(record)
            .on_conflict(
                OnConflict::columns([Column::UserId, Column::Ndc, Column::Wholesaler])
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec(&db)
            .await?;

        match inserted {
            TryInsertResult::Inserted(_) => Ok(UpsertOutcome::Inserted),
            TryInsertResult::Conflicted => {
                Entity::update_many()
                    .col_expr(Column::DrugName, Expr::value(row.drug_name.clone()))
                    .col_expr(Column::QuantityOrdered, Expr::value(row.quantity_ordered))
                    .col_expr(Column::Dosage, Expr::value(row.dosage.clone()))
                    .col_expr(Column::Manufacturer, Expr::value(row.manufacturer.clone()))
                    .col_expr(Column::UploadTimestamp, Expr::value(upload_timestamp))
                    .filter(natural_key(user_id, &row.ndc, &row.wholesaler))
                    .exec(&db)
                    .await?;
                Ok(UpsertOutcome::Updated)
            }
            TryInsertResult::Empty => Err(LedgerError::internal("upsert produced no insert statement")),
        }
    }

    #[instrument(level = "trace", skip(self))]
    async fn find_by_natural_key(&self, user_id: i32, ndc: &str, wholesaler: &str) -> Result<Option<Model>> {
        Ok(Entity::find()
            .filter(natural_key(user_id, ndc, wholesaler))
            .one(&self.db_connection())
            .await?)
    }

    #[instrument(level = "trace", skip(self))]
    async fn find_owned(&self, user_id: i32, id: i32) -> Result<Option<Model>> {
        Ok(Entity::find_by_id(id)
            .filter(Column::UserId.eq(user_id))
            .one(&self.db_connection())
            .await?)
    }

    #[instrument(level = "trace", skip(self))]
    async fn set_disposed(&self, user_id: i32, id: i32, quantity: i64) -> Result<bool> {
        let res = Entity::update_many()
            .col_expr(Column::QuantityDisposed, Expr::value(quantity))
            .filter(Column::Id.eq(id))
            .filter(Column::UserId.eq(user_id))
            .exec(&self.db_connection())
            .await?;

        Ok(res.rows_affected > 0)
    }

    #[instrument(level = "trace", skip(self))]
    async fn all_for_user(&self, user_id: i32) -> Result<Vec<Model>> {
        Ok(Entity::find()
            .filter(Column::UserId.eq(user_id))
            .order_by_asc(Column::Id)
            .all(&self.db_connection())
            .await?)
    }
}
