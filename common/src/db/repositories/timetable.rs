// Persisted extraction results, linked 1:1 to the Job that produced them.
// Follows the same repository-per-aggregate pattern as the other
// repositories; stored as JSONB since the shape is read back whole, never
// queried by field.

use crate::db::DbPool;
use crate::errors::StoreError;
use crate::models::ExtractedTimetable;
use uuid::Uuid;

pub struct TimetableRepository {
    pool: DbPool,
}

impl TimetableRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, timetable: &ExtractedTimetable) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let payload =
            serde_json::to_value(timetable).map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        sqlx::query("INSERT INTO timetables (id, data) VALUES ($1, $2)")
            .bind(id)
            .bind(payload)
            .execute(self.pool.pool())
            .await?;

        Ok(id)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ExtractedTimetable>, StoreError> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT data FROM timetables WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool.pool())
                .await?;

        match row {
            Some((data,)) => {
                let timetable = serde_json::from_value(data)
                    .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
                Ok(Some(timetable))
            }
            None => Ok(None),
        }
    }
}
