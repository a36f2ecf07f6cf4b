use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Published model an app can be attached to. Only the columns the app host reads.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "models")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub model_version_id: Option<i32>,
    pub bot_group_url: Option<String>,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::model_app::Entity")]
    ModelApp,
}

impl Related<super::model_app::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ModelApp.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
