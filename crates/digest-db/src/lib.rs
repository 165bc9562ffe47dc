//! Durable storage for the daily digest task processor: task/article/batch
//! models, connection pooling and migrations, and the query layer
//! implementing the Task Store's atomic operations.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
