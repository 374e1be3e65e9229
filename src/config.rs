// Configuration constants for reqparse
use std::env;
use std::path::PathBuf;

// How many approval rows the extraction window admits after the header line.
pub const APPROVAL_WINDOW: usize = 2;

// Get database path from environment or use default
pub fn database_path() -> PathBuf {
    env::var("REQPARSE_DB")
        .unwrap_or_else(|_| "requests.db".to_string())
        .into()
}
