use serde::{Deserialize, Serialize};
use std::fmt;

/// One named channel of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Red,
    Green,
    Blue,
    Alpha,
    /// Distance from the camera to the first hit, 0 where nothing was hit.
    Depth,
}

impl Channel {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "r" => Some(Self::Red),
            "g" => Some(Self::Green),
            "b" => Some(Self::Blue),
            "a" => Some(Self::Alpha),
            "z" => Some(Self::Depth),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Red => "r",
            Self::Green => "g",
            Self::Blue => "b",
            Self::Alpha => "a",
            Self::Depth => "z",
        }
    }
}

/// Ordered set of channels, parsed from strings such as `"rgba"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelLayout(Vec<Channel>);

impl ChannelLayout {
    pub fn parse(layout: &str) -> Result<Self, &'static str> {
        if layout.is_empty() {
            return Err("layout has no channels");
        }
        let mut channels = Vec::with_capacity(layout.len());
        for c in layout.chars() {
            let mut buf = [0u8; 4];
            let channel =
                Channel::from_name(c.encode_utf8(&mut buf)).ok_or("unknown channel name")?;
            if channels.contains(&channel) {
                return Err("channel listed twice");
            }
            channels.push(channel);
        }
        Ok(Self(channels))
    }

    pub fn from_channels(channels: Vec<Channel>) -> Result<Self, &'static str> {
        let names: String = channels.iter().map(|c| c.name()).collect();
        Self::parse(&names)
    }

    pub fn channels(&self) -> &[Channel] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn position(&self, channel: Channel) -> Option<usize> {
        self.0.iter().position(|&c| c == channel)
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.0 {
            f.write_str(c.name())?;
        }
        Ok(())
    }
}

/// Errors constructing frame buffer contents.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameBufferError {
    #[error("expected {expected} samples for the frame buffer, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// Pixel store with a named channel layout.
///
/// Samples are row-major, top row first, channels interleaved per pixel.
/// Dimensions are 0x0 until a render has been committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameBuffer {
    layout: ChannelLayout,
    width: u32,
    height: u32,
    samples: Vec<f32>,
}

impl FrameBuffer {
    /// An empty frame buffer with unset dimensions.
    pub fn new(layout: ChannelLayout) -> Self {
        Self {
            layout,
            width: 0,
            height: 0,
            samples: Vec::new(),
        }
    }

    pub fn from_parts(
        layout: ChannelLayout,
        width: u32,
        height: u32,
        samples: Vec<f32>,
    ) -> Result<Self, FrameBufferError> {
        let expected = width as usize * height as usize * layout.len();
        if samples.len() != expected {
            return Err(FrameBufferError::SizeMismatch {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            layout,
            width,
            height,
            samples,
        })
    }

    pub fn layout(&self) -> &ChannelLayout {
        &self.layout
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channel_count(&self) -> usize {
        self.layout.len()
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether a render has been committed into this buffer.
    pub fn is_rendered(&self) -> bool {
        self.pixel_count() > 0
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// All channel values of the pixel at (`x`, `y`).
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[f32]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let n = self.channel_count();
        let start = (y as usize * self.width as usize + x as usize) * n;
        self.samples.get(start..start + n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rgba() {
        let layout = ChannelLayout::parse("rgba").unwrap();
        assert_eq!(layout.len(), 4);
        assert_eq!(layout.position(Channel::Alpha), Some(3));
        assert_eq!(layout.to_string(), "rgba");
    }

    #[test]
    fn parse_rejects_bad_layouts() {
        assert!(ChannelLayout::parse("").is_err());
        assert!(ChannelLayout::parse("rgbx").is_err());
        assert!(ChannelLayout::parse("rgbr").is_err());
    }

    #[test]
    fn new_buffer_has_unset_dimensions() {
        let fb = FrameBuffer::new(ChannelLayout::parse("rgb").unwrap());
        assert!(!fb.is_rendered());
        assert_eq!((fb.width(), fb.height()), (0, 0));
        assert!(fb.pixel(0, 0).is_none());
    }

    #[test]
    fn from_parts_checks_sample_count() {
        let layout = ChannelLayout::parse("rg").unwrap();
        let err = FrameBuffer::from_parts(layout.clone(), 2, 2, vec![0.0; 7]).unwrap_err();
        assert_eq!(
            err,
            FrameBufferError::SizeMismatch {
                expected: 8,
                actual: 7
            }
        );
        let samples: Vec<f32> = (0..8).map(|i| i as f32).collect();
        let fb = FrameBuffer::from_parts(layout, 2, 2, samples).unwrap();
        assert_eq!(fb.pixel(1, 1), Some(&[6.0, 7.0][..]));
    }
}
