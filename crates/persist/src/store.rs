use crate::codec::{self, PersistError};
use raystage_kernel::FrameBuffer;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::Path;

/// Write `fb` to `path` atomically.
///
/// The bytes go to a temporary file next to the destination, which is then
/// renamed over it. A failed save leaves any previous file in place.
pub fn save(fb: &FrameBuffer, path: impl AsRef<Path>) -> Result<(), PersistError> {
    let path = path.as_ref();
    let bytes = codec::encode(fb)?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;

    tracing::info!(
        path = %path.display(),
        width = fb.width(),
        height = fb.height(),
        layout = %fb.layout(),
        sha256 = %codec::hex(&Sha256::digest(&bytes)[..8]),
        "frame buffer saved"
    );
    Ok(())
}

/// Read and verify a file written by [`save`].
pub fn read(path: impl AsRef<Path>) -> Result<FrameBuffer, PersistError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let fb = codec::decode(&bytes)?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "frame buffer read");
    Ok(fb)
}
