//! Binary layout of a frame-buffer file:
//! ```text
//! "RSFB"                      magic
//! u32 version                 currently 1
//! u32 width, u32 height
//! u32 channel count
//! (u8 len, ASCII name) * n    channel names in layout order
//! f32 * w * h * n             samples, row-major, top row first
//! [u8; 32]                    SHA-256 of everything above
//! ```
//! All integers and floats are little-endian.

use raystage_kernel::{Channel, ChannelLayout, FrameBuffer};
use sha2::{Digest, Sha256};

pub const MAGIC: [u8; 4] = *b"RSFB";
pub const FORMAT_VERSION: u32 = 1;

const DIGEST_LEN: usize = 32;

/// Errors reading or writing frame-buffer files.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame buffer has not been rendered")]
    EmptyFrameBuffer,
    #[error("not a frame-buffer file (magic {0:?})")]
    BadMagic([u8; 4]),
    #[error("unsupported format version {version}, expected {expected}")]
    UnsupportedVersion { version: u32, expected: u32 },
    #[error("file truncated while reading {0}")]
    Truncated(&'static str),
    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },
    #[error("invalid channel layout: {0}")]
    InvalidLayout(String),
    #[error("{0} unexpected bytes after the samples")]
    TrailingBytes(usize),
}

/// Serialize a rendered frame buffer.
pub fn encode(fb: &FrameBuffer) -> Result<Vec<u8>, PersistError> {
    if !fb.is_rendered() {
        return Err(PersistError::EmptyFrameBuffer);
    }
    let channels = fb.layout().channels();
    let mut out = Vec::with_capacity(
        20 + channels.len() * 2 + fb.samples().len() * 4 + DIGEST_LEN,
    );
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&fb.width().to_le_bytes());
    out.extend_from_slice(&fb.height().to_le_bytes());
    out.extend_from_slice(&(channels.len() as u32).to_le_bytes());
    for channel in channels {
        let name = channel.name().as_bytes();
        out.push(name.len() as u8);
        out.extend_from_slice(name);
    }
    let bits: Vec<u32> = fb.samples().iter().map(|s| s.to_bits().to_le()).collect();
    out.extend_from_slice(bytemuck::cast_slice(&bits));
    let digest = Sha256::digest(&out);
    out.extend_from_slice(&digest);
    Ok(out)
}

/// Verify and parse bytes produced by [`encode`].
pub fn decode(bytes: &[u8]) -> Result<FrameBuffer, PersistError> {
    let Some(body_len) = bytes.len().checked_sub(DIGEST_LEN) else {
        return Err(PersistError::Truncated("digest"));
    };
    let (body, trailer) = bytes.split_at(body_len);

    let mut cursor = Cursor { buf: body };
    let magic = cursor.array::<4>("magic")?;
    if magic != MAGIC {
        return Err(PersistError::BadMagic(magic));
    }
    let version = cursor.u32("version")?;
    if version != FORMAT_VERSION {
        return Err(PersistError::UnsupportedVersion {
            version,
            expected: FORMAT_VERSION,
        });
    }

    let actual = hex(&Sha256::digest(body));
    let expected = hex(trailer);
    if actual != expected {
        return Err(PersistError::IntegrityMismatch { expected, actual });
    }

    let width = cursor.u32("width")?;
    let height = cursor.u32("height")?;
    let count = cursor.u32("channel count")? as usize;
    let mut channels = Vec::with_capacity(count.min(8));
    for _ in 0..count {
        let len = cursor.array::<1>("channel name")?[0] as usize;
        let name = cursor.take(len, "channel name")?;
        let channel = std::str::from_utf8(name)
            .ok()
            .and_then(Channel::from_name)
            .ok_or_else(|| {
                PersistError::InvalidLayout(format!(
                    "unknown channel {}",
                    String::from_utf8_lossy(name)
                ))
            })?;
        channels.push(channel);
    }
    let layout = ChannelLayout::from_channels(channels)
        .map_err(|reason| PersistError::InvalidLayout(reason.to_string()))?;

    let sample_count = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(layout.len()))
        .ok_or(PersistError::Truncated("samples"))?;
    let byte_len = sample_count
        .checked_mul(4)
        .ok_or(PersistError::Truncated("samples"))?;
    let raw = cursor.take(byte_len, "samples")?;
    if !cursor.buf.is_empty() {
        return Err(PersistError::TrailingBytes(cursor.buf.len()));
    }
    // `raw` has no alignment guarantee, so copy out rather than cast in place
    let samples = bytemuck::pod_collect_to_vec::<u8, u32>(raw)
        .into_iter()
        .map(|bits| f32::from_bits(u32::from_le(bits)))
        .collect();

    // sample count was derived from the header, so the sizes always agree
    FrameBuffer::from_parts(layout, width, height, samples)
        .map_err(|err| PersistError::InvalidLayout(err.to_string()))
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

struct Cursor<'a> {
    buf: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], PersistError> {
        if self.buf.len() < n {
            return Err(PersistError::Truncated(what));
        }
        let (head, rest) = self.buf.split_at(n);
        self.buf = rest;
        Ok(head)
    }

    fn array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N], PersistError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    fn u32(&mut self, what: &'static str) -> Result<u32, PersistError> {
        self.array::<4>(what).map(u32::from_le_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_buffer() -> FrameBuffer {
        let layout = ChannelLayout::parse("rgbaz").unwrap();
        let samples = (0..2 * 3 * 5).map(|i| i as f32 * 0.25).collect();
        FrameBuffer::from_parts(layout, 2, 3, samples).unwrap()
    }

    #[test]
    fn header_layout() {
        let bytes = encode(&sample_buffer()).unwrap();
        assert_eq!(&bytes[..4], b"RSFB");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 1);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(bytes[12..16].try_into().unwrap()), 3);
        assert_eq!(u32::from_le_bytes(bytes[16..20].try_into().unwrap()), 5);
        assert_eq!(&bytes[20..22], &[1, b'r']);
        // header + names + samples + digest
        assert_eq!(bytes.len(), 20 + 5 * 2 + 30 * 4 + 32);
        // samples follow the names, little-endian
        assert_eq!(&bytes[30..34], &0.0f32.to_le_bytes());
        assert_eq!(&bytes[34..38], &0.25f32.to_le_bytes());
        assert_eq!(&bytes[146..150], &7.25f32.to_le_bytes());
    }

    #[test]
    fn decode_reads_samples_at_odd_offsets() {
        // one leading byte of slack puts the samples off 4-byte alignment
        let layout = ChannelLayout::parse("z").unwrap();
        let fb = FrameBuffer::from_parts(layout, 3, 1, vec![-1.5, f32::MAX, 1e-3]).unwrap();
        let mut padded = vec![0u8];
        padded.extend(encode(&fb).unwrap());
        let back = decode(&padded[1..]).unwrap();
        assert_eq!(back.samples(), &[-1.5, f32::MAX, 1e-3]);
    }

    #[test]
    fn encode_is_deterministic() {
        assert_eq!(
            encode(&sample_buffer()).unwrap(),
            encode(&sample_buffer()).unwrap()
        );
    }

    #[test]
    fn decode_restores_buffer() {
        let fb = sample_buffer();
        let back = decode(&encode(&fb).unwrap()).unwrap();
        assert_eq!(back, fb);
    }

    #[test]
    fn unrendered_buffer_is_rejected() {
        let fb = FrameBuffer::new(ChannelLayout::parse("rgb").unwrap());
        assert!(matches!(encode(&fb), Err(PersistError::EmptyFrameBuffer)));
    }

    #[test]
    fn flipped_sample_bit_fails_integrity() {
        let mut bytes = encode(&sample_buffer()).unwrap();
        bytes[40] ^= 0x01;
        assert!(matches!(
            decode(&bytes),
            Err(PersistError::IntegrityMismatch { .. })
        ));
    }

    #[test]
    fn bad_magic_and_version() {
        let mut bytes = encode(&sample_buffer()).unwrap();
        bytes[0] = b'X';
        assert!(matches!(decode(&bytes), Err(PersistError::BadMagic(_))));

        let mut bytes = encode(&sample_buffer()).unwrap();
        bytes[4] = 9;
        assert!(matches!(
            decode(&bytes),
            Err(PersistError::UnsupportedVersion { version: 9, .. })
        ));
    }

    #[test]
    fn truncated_file() {
        let bytes = encode(&sample_buffer()).unwrap();
        assert!(matches!(
            decode(&bytes[..10]),
            Err(PersistError::Truncated(_))
        ));
        // cutting samples also breaks the digest
        assert!(decode(&bytes[..bytes.len() - 4]).is_err());
    }
}
