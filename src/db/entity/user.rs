use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::NotSet;
use sea_orm::ActiveValue::Set;
use sea_orm::SqlErr;
use serde::Deserialize;
use serde::Serialize;
use tracing::instrument;

use crate::auth::UserStore;
use crate::db::driver::DatabaseDriver;
use crate::db::DBProvider;
use crate::db::SeaStore;
use crate::types::LedgerError;
use crate::types::Result;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id:            i32,
    #[sea_orm(unique, indexed)]
    pub username:      String,
    /// Argon2 PHC string. Never leaves the server.
    #[serde(skip_serializing)]
    pub password:      String,
    pub pharmacy_code: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[async_trait]
impl<D: DatabaseDriver> UserStore for SeaStore<D> {
    #[instrument(level = "trace", skip(self, password_hash, pharmacy_code))]
    async fn create_user(&self, username: &str, password_hash: String, pharmacy_code: &str) -> Result<Model> {
        let user = ActiveModel {
            id:            NotSet,
            username:      Set(username.to_owned()),
            password:      Set(password_hash),
            pharmacy_code: Set(pharmacy_code.to_owned()),
        };

        user.insert(&self.db_connection()).await.map_err(|err| {
            if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                LedgerError::Conflict("Username already exists.".to_owned())
            }
            else {
                err.into()
            }
        })
    }

    #[instrument(level = "trace", skip(self))]
    async fn find_user(&self, username: &str) -> Result<Option<Model>> {
        Ok(Entity::find()
            .filter(Column::Username.eq(username))
            .one(&self.db_connection())
            .await?)
    }
}
