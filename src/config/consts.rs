// src/config/consts.rs

// Table file
pub const DEFAULT_TABLE_FILE: &str = "results.csv";
pub const TABLE_PATH_ENV: &str = "RO_PARTS_TABLE";
pub const LOCK_SUFFIX: &str = ".lock";
pub const TABLE_DELIM: u8 = b',';

// Row shape
pub const KEY_COLUMN: &str = "Car";
pub const VALUE_SEP: &str = "; ";

// Values
pub const UNKNOWN: &str = "unknown";
pub const NOT_APPLICABLE: &str = "N/A";

// Collaborators
pub const SOURCE_CMD_ENV: &str = "RO_PARTS_SOURCE_CMD";
pub const EXTRACT_CMD_ENV: &str = "RO_PARTS_EXTRACT_CMD";

// Logging
pub const DEFAULT_LOG_FILTER: &str = "ro_parts=info";
pub const VERBOSE_LOG_FILTER: &str = "ro_parts=debug";
