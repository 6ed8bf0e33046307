use crate::entities;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Schema};

/// Creates any missing tables from the entity definitions. Used by the
/// sqlite profiles and the test harness; production deployments point
/// `database_url` at an already-migrated database.
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut statements = vec![
        schema.create_table_from_entity(entities::User),
        schema.create_table_from_entity(entities::Address),
        schema.create_table_from_entity(entities::Product),
        schema.create_table_from_entity(entities::CartItem),
        schema.create_table_from_entity(entities::Order),
        schema.create_table_from_entity(entities::OrderItem),
    ];

    for statement in &mut statements {
        statement.if_not_exists();
        db.execute(backend.build(&*statement)).await?;
    }

    Ok(())
}
