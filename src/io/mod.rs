mod file_reader;
mod http_reader;
mod range_reader;
mod s3_reader;

pub use file_reader::FileRangeReader;
pub use http_reader::{HttpRangeReader, DEFAULT_HTTP_TIMEOUT};
pub use range_reader::{
    check_length, check_range, read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u64_be,
    read_u64_le, RangeReader,
};
pub use s3_reader::{create_s3_client, S3RangeReader};
