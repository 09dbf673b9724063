//! Process exit codes.

pub const SUCCESS: i32 = 0;
/// Processing failed, including the case where no recording could be processed
pub const EXECUTION_ERROR: i32 = 1;
/// Bad arguments, missing input directory or unreadable mapping file
pub const INPUT_ERROR: i32 = 2;
