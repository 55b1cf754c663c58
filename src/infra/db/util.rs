use crate::application::repos::RepoError;

// Postgres SQLSTATE classes; message text varies with locale and server
// version, the codes do not.
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const NOT_NULL_VIOLATION: &str = "23502";
const CHECK_VIOLATION: &str = "23514";
const INVALID_TEXT_REPRESENTATION: &str = "22P02";
const QUERY_CANCELED: &str = "57014";

/// Translates driver errors into the repository error the services branch
/// on. Unique violations keep their constraint name so callers can tell a
/// duplicate email (`users_email_key`) from a repeat vote
/// (`concern_votes_pkey`).
pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some(UNIQUE_VIOLATION) => RepoError::Duplicate {
                constraint: db.constraint().unwrap_or("unknown").to_string(),
            },
            Some(FOREIGN_KEY_VIOLATION) | Some(INVALID_TEXT_REPRESENTATION) => {
                RepoError::InvalidInput {
                    message: db.message().to_string(),
                }
            }
            Some(NOT_NULL_VIOLATION) | Some(CHECK_VIOLATION) => RepoError::Integrity {
                message: db.message().to_string(),
            },
            Some(QUERY_CANCELED) => RepoError::Timeout,
            _ => RepoError::Persistence(db.message().to_string()),
        },
        other => RepoError::from_persistence(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_row_maps_to_not_found() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            RepoError::NotFound
        ));
    }

    #[test]
    fn exhausted_pool_maps_to_timeout() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            RepoError::Timeout
        ));
    }

    #[test]
    fn other_driver_errors_map_to_persistence() {
        let err = map_sqlx_error(sqlx::Error::WorkerCrashed);
        assert!(matches!(err, RepoError::Persistence(_)));
    }
}
