use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};

use super::range_reader::check_range;
use super::RangeReader;
use crate::error::IoError;

/// Local-file implementation of RangeReader.
///
/// Opens the file per read, so the reader itself holds no descriptor.
#[derive(Debug, Clone)]
pub struct FileRangeReader {
    path: PathBuf,
    size: u64,
    identifier: String,
}

impl FileRangeReader {
    pub async fn new(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref().to_path_buf();
        let identifier = path.display().to_string();

        let metadata = tokio::fs::metadata(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IoError::NotFound(identifier.clone())
            } else {
                IoError::File(e.to_string())
            }
        })?;

        Ok(Self {
            path,
            size: metadata.len(),
            identifier,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RangeReader for FileRangeReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        check_range(offset, len, self.size)?;

        let mut file = File::open(&self.path)
            .await
            .map_err(|e| IoError::File(e.to_string()))?;
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| IoError::File(e.to_string()))?;

        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                IoError::ShortRead {
                    offset,
                    requested: len as u64,
                    received: 0,
                }
            } else {
                IoError::File(e.to_string())
            }
        })?;

        Ok(Bytes::from(buffer))
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
