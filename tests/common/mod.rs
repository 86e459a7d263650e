#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Query, State},
};
use chrono::NaiveDate;
use gridcrate::{
    ColumnDefinition, DataGrid, GridError, GridRequest, NumberFormat, NumberFormats,
    RelationSearchMap, Relations,
};
use sea_orm::{
    ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr,
    RelationTrait, Schema, Set,
};
use sea_orm_migration::prelude::*;

pub mod users {
    use sea_orm::entity::prelude::*;
    use serde::Serialize;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub name: String,
        pub email: String,
        pub active: bool,
        pub score: f64,
        pub created_at: DateTime,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::orders::Entity")]
        Orders,
    }

    impl Related<super::orders::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Orders.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod orders {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "orders")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub user_id: i32,
        pub status: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::users::Entity",
            from = "Column::UserId",
            to = "super::users::Column::Id"
        )]
        User,
        #[sea_orm(has_many = "super::items::Entity")]
        Items,
    }

    impl Related<super::users::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::User.def()
        }
    }

    impl Related<super::items::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Items.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod items {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "items")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub order_id: i32,
        pub sku: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::orders::Entity",
            from = "Column::OrderId",
            to = "super::orders::Column::Id"
        )]
        Order,
    }

    impl Related<super::orders::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Order.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// Grid over `users`, searching its name and the status of its orders.
pub struct UserGrid;

impl DataGrid for UserGrid {
    type EntityType = users::Entity;

    fn columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("Name", "name").searchable().sortable(),
            ColumnDefinition::new("Order status", "orders.status").searchable(),
            ColumnDefinition::new("Email", "email").sortable(),
            ColumnDefinition::new("Score", "score").sortable(),
        ]
    }

    fn relations() -> Result<Relations, GridError> {
        Relations::new()
            .with_def("orders", &users::Relation::Orders.def())?
            .with_def("orders.items", &orders::Relation::Items.def())
    }

    fn relation_search() -> RelationSearchMap {
        RelationSearchMap::new()
            .direct("orders", ["status"])
            .nested("orders", "items", ["sku"])
    }

    fn number_formats() -> NumberFormats {
        NumberFormats::new().with("score", NumberFormat::new(".", ","))
    }
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateGridTables)]
    }
}

pub struct CreateGridTables;

#[async_trait::async_trait]
impl MigrationName for CreateGridTables {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_grid_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateGridTables {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());
        manager
            .create_table(schema.create_table_from_entity(users::Entity))
            .await?;
        manager
            .create_table(schema.create_table_from_entity(orders::Entity))
            .await?;
        manager
            .create_table(schema.create_table_from_entity(items::Entity))
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in ["items", "orders", "users"] {
            manager
                .drop_table(Table::drop().table(Alias::new(table)).to_owned())
                .await?;
        }
        Ok(())
    }
}

fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .expect("valid test timestamp")
}

async fn insert_user(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
    active: bool,
    score: f64,
    created_at: chrono::NaiveDateTime,
) -> Result<users::Model, DbErr> {
    users::ActiveModel {
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        active: Set(active),
        score: Set(score),
        created_at: Set(created_at),
        ..Default::default()
    }
    .insert(db)
    .await
}

async fn insert_order(db: &DatabaseConnection, user_id: i32, status: &str) -> Result<orders::Model, DbErr> {
    orders::ActiveModel {
        user_id: Set(user_id),
        status: Set(status.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
}

async fn insert_item(db: &DatabaseConnection, order_id: i32, sku: &str) -> Result<items::Model, DbErr> {
    items::ActiveModel {
        order_id: Set(order_id),
        sku: Set(sku.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Log to the test output, filtered by `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    init_tracing();
    let db = Database::connect("sqlite::memory:").await?;

    // Run migrations
    Migrator::up(&db, None).await?;

    Ok(db)
}

/// Four users, their orders and order items:
///
/// | id | name        | email            | active | score  | created_at       | orders (items)               |
/// |----|-------------|------------------|--------|--------|------------------|------------------------------|
/// | 1  | Ann Lee     | ann@example.com  | true   | 91.5   | 2024-01-05 10:00 | shipped (AB-100, CD-200)     |
/// | 2  | Bob Stone   | bob@test.org     | false  | 47.0   | 2024-01-20 09:30 | pending (XY-300)             |
/// | 3  | Dee_Dee     | dee@example.com  | true   | 1250.0 | 2024-02-02 00:00 |                              |
/// | 4  | Eve Shipped |                  | false  | 5.25   | 2024-02-29 23:59 | cancelled                    |
pub async fn seed(db: &DatabaseConnection) -> Result<(), DbErr> {
    let ann = insert_user(db, "Ann Lee", "ann@example.com", true, 91.5, at(2024, 1, 5, 10, 0)).await?;
    let bob = insert_user(db, "Bob Stone", "bob@test.org", false, 47.0, at(2024, 1, 20, 9, 30)).await?;
    insert_user(db, "Dee_Dee", "dee@example.com", true, 1250.0, at(2024, 2, 2, 0, 0)).await?;
    let eve = insert_user(db, "Eve Shipped", "", false, 5.25, at(2024, 2, 29, 23, 59)).await?;

    let shipped = insert_order(db, ann.id, "shipped").await?;
    insert_item(db, shipped.id, "AB-100").await?;
    insert_item(db, shipped.id, "CD-200").await?;
    let pending = insert_order(db, bob.id, "pending").await?;
    insert_item(db, pending.id, "XY-300").await?;
    insert_order(db, eve.id, "cancelled").await?;

    Ok(())
}

/// In-memory SQLite database holding the [`seed`] rows.
pub async fn setup_seeded_db() -> Result<DatabaseConnection, DbErr> {
    let db = setup_test_db().await?;
    seed(&db).await?;
    Ok(db)
}

/// Seeded tables inside a throwaway schema of the PostgreSQL database at `DATABASE_URL`.
pub struct PostgresFixture {
    pub db: DatabaseConnection,
    admin: DatabaseConnection,
    schema: String,
}

impl PostgresFixture {
    /// Connect, migrate and seed; `None` when `DATABASE_URL` is unset or not PostgreSQL.
    pub async fn setup() -> Result<Option<Self>, DbErr> {
        init_tracing();
        let url = match std::env::var("DATABASE_URL") {
            Ok(url) if url.starts_with("postgres://") || url.starts_with("postgresql://") => url,
            _ => {
                eprintln!("DATABASE_URL is not a PostgreSQL URL, skipping");
                return Ok(None);
            }
        };

        let admin = Database::connect(&url).await?;
        let schema = format!("gridcrate_{}", uuid::Uuid::new_v4().simple());
        admin
            .execute_unprepared(&format!("CREATE SCHEMA \"{schema}\""))
            .await?;

        let mut options = ConnectOptions::new(url);
        options.max_connections(2).set_schema_search_path(schema.clone());
        let db = Database::connect(options).await?;
        Migrator::up(&db, None).await?;
        seed(&db).await?;

        Ok(Some(Self { db, admin, schema }))
    }

    pub async fn teardown(self) -> Result<(), DbErr> {
        self.db.close().await?;
        self.admin
            .execute_unprepared(&format!("DROP SCHEMA \"{}\" CASCADE", self.schema))
            .await?;
        self.admin.close().await
    }
}

/// Sorted names, for order-independent assertions
pub fn names(rows: &[users::Model]) -> Vec<&str> {
    let mut names: Vec<&str> = rows.iter().map(|row| row.name.as_str()).collect();
    names.sort_unstable();
    names
}

async fn list_users(
    State(db): State<DatabaseConnection>,
    Query(request): Query<GridRequest>,
) -> Result<Json<Vec<users::Model>>, GridError> {
    let rows = UserGrid::request_query(&db, &request).await?.all(&db).await?;
    Ok(Json(rows))
}

pub fn setup_test_app(db: DatabaseConnection) -> Router {
    let api = Router::new()
        .route("/users", axum::routing::get(list_users))
        .with_state(db);

    Router::new().nest("/api/v1", api)
}
