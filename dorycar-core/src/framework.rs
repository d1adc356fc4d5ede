use sqlx::PgPool;

/// Executes the `kanau` query processors declared next to each entity.
#[derive(Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}
