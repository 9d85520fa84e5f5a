pub mod cloud_sql;
pub mod sqlite;
pub mod storage;
