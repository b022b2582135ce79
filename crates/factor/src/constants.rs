/// flops charged per stored entry of a triangular solve (one multiply, one subtract)
pub const MULTSUB_FLOPS: f64 = 2.0;
/// flops charged per division by a diagonal entry
pub const DIV_FLOPS: f64 = 1.0;

//Arena growth defaults
//---------------------

/// initial arena size used by the builder, in units
pub const DEFAULT_INITIAL_UNITS: usize = 1024;
/// over-allocation factor applied when the arena must grow
pub const DEFAULT_GROWTH_FACTOR: f64 = 1.2;
/// compaction attempts before the arena is grown
pub const DEFAULT_MAX_COMPACTIONS: usize = 1;

//File format
//-----------

/// leading bytes of a saved numeric object
pub const MAGIC: [u8; 8] = *b"LUNUMRC\0";
pub const FORMAT_VERSION: u64 = 1;
/// EMPTY sentinel of the flat position arrays
pub const EMPTY: i64 = -1;
/// objects read from a file per call, bounding allocation ahead of the data
pub const READ_CHUNK: usize = 1 << 16;
