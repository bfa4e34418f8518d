use crate::error::{ErrorKind, Result};
use crate::fnv::{OFFSET_BASIS, fnv1a64};
use crate::{BLOCK_SIZE, Fingerprint, THRESHOLD};
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

/// Which bytes of a file of a given size make up its fingerprint sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    /// The first `n` bytes, i.e. the whole file.
    Whole(u64),
    /// Head, middle and tail blocks of [`BLOCK_SIZE`] bytes, by start offset.
    Blocks([u64; 3]),
}

impl Sample {
    pub fn plan(size: u64) -> Self {
        if size < THRESHOLD {
            return Self::Whole(size);
        }
        let middle = size / 2 - BLOCK_SIZE / 2;
        Self::Blocks([0, middle, size - BLOCK_SIZE])
    }

    /// Number of bytes the sample covers.
    pub fn len(&self) -> u64 {
        match self {
            Self::Whole(size) => *size,
            Self::Blocks(offsets) => BLOCK_SIZE * offsets.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fold the sampled bytes and the file size into a [`Fingerprint`].
///
/// Exposed so callers holding the bytes already (tests, in-memory sources)
/// get the exact same value as [`crate::fingerprint`] would for the file.
pub fn digest(sample: &[u8], size: u64) -> Fingerprint {
    let hash = fnv1a64(sample, OFFSET_BASIS);
    Fingerprint::from_u64(fnv1a64(&size.to_le_bytes(), hash))
}

pub(crate) async fn fingerprint_file(path: &Path) -> Result<Fingerprint> {
    let mut file = File::open(path).await.map_err(|err| ErrorKind::from_io(err, path))?;
    let size = file.metadata().await.map_err(|err| ErrorKind::from_io(err, path))?.len();
    let sample = Sample::plan(size);
    let bytes = read_sample(&mut file, sample).await.map_err(|err| ErrorKind::from_io(err, path))?;
    let fingerprint = digest(&bytes, size);
    tracing::trace!(path = %path.display(), size, sampled = bytes.len(), %fingerprint, "Fingerprinted file");
    Ok(fingerprint)
}

async fn read_sample<R>(reader: &mut R, sample: Sample) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    match sample {
        Sample::Whole(size) => {
            let mut buffer = Vec::with_capacity(size as usize);
            (&mut *reader).take(size).read_to_end(&mut buffer).await?;
            Ok(buffer)
        },
        Sample::Blocks(offsets) => {
            let mut buffer = vec![0u8; sample.len() as usize];
            for (block, offset) in buffer.chunks_exact_mut(BLOCK_SIZE as usize).zip(offsets) {
                reader.seek(SeekFrom::Start(offset)).await?;
                reader.read_exact(block).await?;
            }
            Ok(buffer)
        },
    }
}
