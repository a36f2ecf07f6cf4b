use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a hosted app. Stored as text using the variant names.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "model_app_state_enum")]
pub enum ModelAppState {
    #[sea_orm(string_value = "Stopped")]
    Stopped,
    #[sea_orm(string_value = "Building")]
    Building,
    #[sea_orm(string_value = "Running")]
    Running,
    #[sea_orm(string_value = "RuntimeError")]
    RuntimeError,
    #[sea_orm(string_value = "BuildError")]
    BuildError,
}

/// How a state change relates to the documented transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Same state written again (duplicate or late report).
    Unchanged,
    /// Listed in the transition table.
    Expected,
    /// Not in the table. Still applied: reports are last-write-wins.
    OutOfBand,
}

impl ModelAppState {
    pub const ALL: [ModelAppState; 5] = [
        ModelAppState::Stopped,
        ModelAppState::Building,
        ModelAppState::Running,
        ModelAppState::RuntimeError,
        ModelAppState::BuildError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelAppState::Stopped => "Stopped",
            ModelAppState::Building => "Building",
            ModelAppState::Running => "Running",
            ModelAppState::RuntimeError => "RuntimeError",
            ModelAppState::BuildError => "BuildError",
        }
    }

    /// Human-facing label shown next to the app name.
    pub fn label(&self) -> &'static str {
        match self {
            ModelAppState::Stopped => "Stopped",
            ModelAppState::Building => "Building",
            ModelAppState::Running => "Running",
            ModelAppState::RuntimeError => "Runtime Error",
            ModelAppState::BuildError => "Build Error",
        }
    }

    pub fn is_building(&self) -> bool {
        matches!(self, ModelAppState::Building)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ModelAppState::RuntimeError | ModelAppState::BuildError)
    }

    /// Transition table:
    ///
    /// | from                                      | to             | trigger               |
    /// |-------------------------------------------|----------------|-----------------------|
    /// | any                                       | `Building`     | sync request          |
    /// | `Building`                                | `Running`      | build-complete report |
    /// | `Building`                                | `BuildError`   | failed build report   |
    /// | `Running`                                 | `RuntimeError` | runtime report        |
    pub fn transition_to(&self, next: ModelAppState) -> Transition {
        use ModelAppState::*;
        if *self == next {
            return Transition::Unchanged;
        }
        match (self, next) {
            (_, Building) => Transition::Expected,
            (Building, Running) | (Building, BuildError) => Transition::Expected,
            (Running, RuntimeError) => Transition::Expected,
            _ => Transition::OutOfBand,
        }
    }
}

impl fmt::Display for ModelAppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown app state '{0}'")]
pub struct UnknownAppState(pub String);

impl FromStr for ModelAppState {
    type Err = UnknownAppState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelAppState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| UnknownAppState(s.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "model_apps")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub model_id: i32,
    pub name: String,
    pub url: String,
    pub image_name: String,
    pub state: ModelAppState,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::model::Entity",
        from = "Column::ModelId",
        to = "super::model::Column::Id",
        on_delete = "Cascade"
    )]
    Model,
}

impl Related<super::model::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Model.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
