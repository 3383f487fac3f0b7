pub mod disposition;
pub mod inventory_record;
pub mod user;

use sea_orm_migration::prelude::*;

pub struct Migrator;

impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(user::Migration),
            Box::new(inventory_record::Migration),
            Box::new(disposition::Migration),
        ]
    }
}
