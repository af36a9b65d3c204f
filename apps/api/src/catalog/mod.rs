//! Read-only access to the property catalog. The catalog itself is managed
//! elsewhere; the CMA pipeline only ever resolves listings by id.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::property::PropertyRow;

pub async fn get_property(pool: &PgPool, id: Uuid) -> Result<Option<PropertyRow>, sqlx::Error> {
    sqlx::query_as::<_, PropertyRow>("SELECT * FROM properties WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}
