// Database layer: PostgreSQL connection pool and repository-per-aggregate
// pattern, following this workspace's module shape.

pub mod pool;
pub mod repositories;

pub use pool::DbPool;
pub use repositories::{JobRepository, RetryLogRepository, TimetableRepository, WebhookRepository};
