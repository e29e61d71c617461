pub mod catalog;
pub mod channel_sync;
pub mod inventory;
pub mod locations;
pub mod orders;
pub mod picking;
pub mod purchasing;
pub mod receiving;
pub mod replenishment;
pub mod shipments;

use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, Set};

use crate::entities::sequence_counter;
use crate::errors::{ServiceError, ServiceResult};

/// Allocate the next number in a document series (PO-000001, RCV-000001,
/// ...). The counter row serializes concurrent allocations; callers pass
/// their open transaction so the number commits or rolls back with the
/// document.
pub(crate) async fn next_document_number<C: ConnectionTrait>(
    conn: &C,
    series: &str,
    prefix: &str,
) -> ServiceResult<String> {
    let next = match sequence_counter::Entity::find_by_id(series.to_string())
        .one(conn)
        .await?
    {
        Some(row) => {
            let next = row.value + 1;
            let mut active: sequence_counter::ActiveModel = row.into();
            active.value = Set(next);
            active.update(conn).await?;
            next
        }
        None => {
            sequence_counter::ActiveModel {
                name: Set(series.to_string()),
                value: Set(1),
            }
            .insert(conn)
            .await?;
            1
        }
    };
    Ok(format!("{prefix}-{next:06}"))
}

/// Translate a unique-index violation into the Conflict kind; everything
/// else stays a database error.
pub(crate) fn map_unique_violation(err: DbErr, what: &str) -> ServiceError {
    let msg = err.to_string().to_lowercase();
    if msg.contains("unique") || msg.contains("duplicate") {
        ServiceError::Conflict(format!("{what} already exists"))
    } else {
        ServiceError::Database(err)
    }
}

