use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Schema, Set,
};
use tracing::info;

use super::{AppRecordStore, FieldUpdate, StoreError};
use crate::db::entities::{model, model_app};
use crate::db::{AppRecord, ModelAppState, ModelRecord};

/// Creates the `models` and `model_apps` tables when they do not exist yet.
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut models_table = schema.create_table_from_entity(model::Entity);
    models_table.if_not_exists();
    db.execute(backend.build(&models_table)).await?;

    let mut apps_table = schema.create_table_from_entity(model_app::Entity);
    apps_table.if_not_exists();
    db.execute(backend.build(&apps_table)).await?;

    info!("Database schema is ready.");
    Ok(())
}

/// Record store backed by the relational database through SeaORM.
#[derive(Clone)]
pub struct DbAppStore {
    db: DatabaseConnection,
}

impl DbAppStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn classify_update(
        &self,
        id: i32,
        rows_affected: u64,
    ) -> Result<Option<FieldUpdate>, StoreError> {
        let record = model_app::Entity::find_by_id(id).one(&self.db).await?;
        Ok(record.map(|record| {
            if rows_affected > 0 {
                FieldUpdate::Applied(record)
            } else {
                FieldUpdate::Unchanged(record)
            }
        }))
    }
}

#[async_trait]
impl AppRecordStore for DbAppStore {
    async fn find_app(&self, id: i32) -> Result<Option<AppRecord>, StoreError> {
        Ok(model_app::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_all_apps(&self) -> Result<Vec<AppRecord>, StoreError> {
        Ok(model_app::Entity::find()
            .order_by_asc(model_app::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn find_app_by_model(&self, model_id: i32) -> Result<Option<AppRecord>, StoreError> {
        Ok(model_app::Entity::find()
            .filter(model_app::Column::ModelId.eq(model_id))
            .one(&self.db)
            .await?)
    }

    async fn find_model(&self, model_id: i32) -> Result<Option<ModelRecord>, StoreError> {
        Ok(model::Entity::find_by_id(model_id).one(&self.db).await?)
    }

    async fn set_state(
        &self,
        id: i32,
        state: ModelAppState,
    ) -> Result<Option<FieldUpdate>, StoreError> {
        // Single statement; the `ne` filter turns a same-value write into a no-op.
        let result = model_app::Entity::update_many()
            .col_expr(model_app::Column::State, Expr::value(state.to_value()))
            .col_expr(model_app::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(model_app::Column::Id.eq(id))
            .filter(model_app::Column::State.ne(state.to_value()))
            .exec(&self.db)
            .await?;
        self.classify_update(id, result.rows_affected).await
    }

    async fn set_image_name(
        &self,
        id: i32,
        image_name: &str,
    ) -> Result<Option<FieldUpdate>, StoreError> {
        let result = model_app::Entity::update_many()
            .col_expr(model_app::Column::ImageName, Expr::value(image_name))
            .col_expr(model_app::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(model_app::Column::Id.eq(id))
            .filter(model_app::Column::ImageName.ne(image_name))
            .exec(&self.db)
            .await?;
        self.classify_update(id, result.rows_affected).await
    }

    async fn upsert_app_for_model(
        &self,
        model_id: i32,
        name: &str,
        url: &str,
    ) -> Result<AppRecord, StoreError> {
        let now = Utc::now();
        match self.find_app_by_model(model_id).await? {
            Some(existing) if existing.name == name && existing.url == url => Ok(existing),
            Some(existing) => {
                let mut active_app: model_app::ActiveModel = existing.into();
                active_app.name = Set(name.to_string());
                active_app.url = Set(url.to_string());
                active_app.updated_at = Set(now);
                Ok(active_app.update(&self.db).await?)
            }
            None => {
                let new_app = model_app::ActiveModel {
                    model_id: Set(model_id),
                    name: Set(name.to_string()),
                    url: Set(url.to_string()),
                    image_name: Set(String::new()),
                    state: Set(ModelAppState::Stopped),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                Ok(new_app.insert(&self.db).await?)
            }
        }
    }
}
