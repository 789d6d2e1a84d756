/// Error code registry for disttable
///
/// Error codes are organized by category:
/// - 1000-1999: Construction errors
/// - 2000-2999: Type promotion errors
/// - 3000-3999: Collection and length errors
/// - 4000-4999: Upstream compute errors
/// - 5000-5999: Local table schema errors
/// - 6000-6999: I/O errors
pub struct ErrorCode;

impl ErrorCode {
    // Construction errors (1000-1999)
    pub const CONSTRUCTION_GENERIC: u16 = 1000;
    pub const CONSTRUCTION_NO_CHUNKS: u16 = 1001;
    pub const CONSTRUCTION_DOMAIN_MISMATCH: u16 = 1002;
    pub const CONSTRUCTION_BAD_PARTITIONING: u16 = 1003;
    pub const CONSTRUCTION_PENDING_CHUNK: u16 = 1004;

    // Type promotion errors (2000-2999)
    pub const PROMOTION_GENERIC: u16 = 2000;
    pub const PROMOTION_COLUMN_MISMATCH: u16 = 2001;

    // Collection and length errors (3000-3999)
    pub const EMPTY_TABLE: u16 = 3001;
    pub const UNKNOWN_LENGTH: u16 = 3002;

    // Upstream compute errors (4000-4999)
    pub const UPSTREAM_COMPUTE: u16 = 4000;

    // Schema errors (5000-5999)
    pub const SCHEMA_GENERIC: u16 = 5000;
    pub const SCHEMA_RAGGED_COLUMNS: u16 = 5001;
    pub const SCHEMA_UNKNOWN_COLUMN: u16 = 5002;
    pub const SCHEMA_ARITY_MISMATCH: u16 = 5003;

    // I/O errors (6000-6999)
    pub const IO_GENERIC: u16 = 6000;
    pub const IO_CSV: u16 = 6001;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        ErrorCode::CONSTRUCTION_GENERIC => "Distributed table could not be constructed",
        ErrorCode::CONSTRUCTION_NO_CHUNKS => "At least one chunk is required",
        ErrorCode::CONSTRUCTION_DOMAIN_MISMATCH => "Supplied domains do not match the chunk list",
        ErrorCode::CONSTRUCTION_BAD_PARTITIONING => "Partitioning does not fit the source table",
        ErrorCode::CONSTRUCTION_PENDING_CHUNK => "Pending chunk supplied to a synchronous build",
        ErrorCode::PROMOTION_GENERIC => "Chunk types share no common representation",
        ErrorCode::PROMOTION_COLUMN_MISMATCH => "Chunks disagree on column names",
        ErrorCode::EMPTY_TABLE => "Operation requires at least one chunk",
        ErrorCode::UNKNOWN_LENGTH => "Row count is unknown until the table is computed",
        ErrorCode::UPSTREAM_COMPUTE => "A scheduled unit of work failed",
        ErrorCode::SCHEMA_GENERIC => "Malformed local table",
        ErrorCode::SCHEMA_RAGGED_COLUMNS => "Columns have different lengths",
        ErrorCode::SCHEMA_UNKNOWN_COLUMN => "Column does not exist",
        ErrorCode::SCHEMA_ARITY_MISMATCH => "Row width does not match the schema",
        ErrorCode::IO_GENERIC => "I/O failure",
        ErrorCode::IO_CSV => "CSV read or write failure",
        _ => "Unknown error",
    }
}
