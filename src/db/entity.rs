pub mod disposition;
pub mod inventory_record;
pub mod user;

pub use disposition::Entity as Dispositions;
pub use disposition::Model as Disposition;
pub use inventory_record::Entity as InventoryRecords;
pub use inventory_record::Model as InventoryRecord;
pub use user::Entity as Users;
pub use user::Model as User;
