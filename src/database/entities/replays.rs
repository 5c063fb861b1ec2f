use crate::database::DbResult;
use crate::utils::types::PlayerId;
use sea_orm::sea_query::OnConflict;
use sea_orm::{prelude::*, ActiveValue::Set, DatabaseConnection};
use serde::Serialize;
use std::future::Future;

/// Replay artifact row, stored once per unique content hash. Multiple
/// matches referencing the same hash is a cheating signal handled by
/// the ingestion pipeline, not a storage error.
#[derive(Serialize, Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "replays")]
pub struct Model {
    /// SHA-256 content hash, lowercase hex
    #[sea_orm(primary_key, auto_increment = false)]
    pub hash: String,
    pub uploaded_at: DateTimeUtc,
    pub uploader_id: PlayerId,
    /// Game duration in seconds as reported by the parser
    pub duration_secs: Option<i32>,
    /// Map name as reported by the game itself
    pub map_name: Option<String>,
    /// Object store URL, or a local path when the upload fell back
    pub pointer: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn all(db: &DatabaseConnection) -> impl Future<Output = DbResult<Vec<Self>>> + Send + '_ {
        Entity::find().all(db)
    }

    /// Inserts the artifact; a re-upload of the same content refreshes
    /// the pointer and timestamp
    pub fn upsert(
        db: &DatabaseConnection,
        model: Model,
    ) -> impl Future<Output = DbResult<()>> + Send + '_ {
        let insert = Entity::insert(ActiveModel {
            hash: Set(model.hash),
            uploaded_at: Set(model.uploaded_at),
            uploader_id: Set(model.uploader_id),
            duration_secs: Set(model.duration_secs),
            map_name: Set(model.map_name),
            pointer: Set(model.pointer),
        })
        .on_conflict(
            OnConflict::column(Column::Hash)
                .update_columns([Column::UploadedAt, Column::Pointer])
                .to_owned(),
        )
        .exec(db);

        async move {
            insert.await?;
            Ok(())
        }
    }
}
