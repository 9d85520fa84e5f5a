//! # Shared Constants
//!
//! This module provides a centralized location for constants that are shared across
//! the `sqlchat` workspace. Using these constants helps to avoid "magic strings"
//! and ensures consistency between the library, the server and the tests.

/// Returned instead of calling the model when a prompt is empty or whitespace.
pub const EMPTY_PROMPT_REPLY: &str = "Please provide a valid prompt.";

/// The query used to feed the schema training plan during assistant setup.
pub const INFORMATION_SCHEMA_QUERY: &str = "SELECT * FROM INFORMATION_SCHEMA.COLUMNS";

/// Qdrant collection holding question/SQL pairs.
pub const SQL_COLLECTION: &str = "sql";
/// Qdrant collection holding DDL statements.
pub const DDL_COLLECTION: &str = "ddl";
/// Qdrant collection holding free-form documentation.
pub const DOCUMENTATION_COLLECTION: &str = "documentation";

/// Suffixes appended to stored ids so removal can be routed to a collection.
pub const SQL_ID_SUFFIX: &str = "-sql";
pub const DDL_ID_SUFFIX: &str = "-ddl";
pub const DOCUMENTATION_ID_SUFFIX: &str = "-doc";

/// The assistant instance is rebuilt after this many seconds.
pub const DEFAULT_ASSISTANT_TTL_SECS: u64 = 3600;

/// Number of rows shown to the model when asking for follow-up questions.
pub const FOLLOWUP_PREVIEW_ROWS: usize = 25;

/// Default number of follow-up questions requested from the model.
pub const DEFAULT_FOLLOWUP_COUNT: usize = 5;

/// Frames with more distinct categorical values than this are not drawn as a pie.
pub const PIE_MAX_CATEGORIES: usize = 10;
