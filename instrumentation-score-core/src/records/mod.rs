//! Record store: the per-job text files exchanged between collection and
//! evaluation.

mod codec;
mod files;

pub use codec::{
    RECORD_HEADER, RecordParseError, format_record, format_records, parse_record, parse_records,
};
pub use files::{
    JOB_FILE_EXTENSION, JobFilesSummary, job_file_name, list_job_files, read_job_file,
    sanitize_job_name, write_job_file, write_job_files,
};
