//! Typed writes into an allocated block.
//!
//! [`BlockWriter`] borrows exactly the bytes of one block from the mapped
//! store. Every write takes a block-relative offset and returns the offset
//! just past what it wrote, so calls chain:
//!
//! ```text
//! let next = writer.write_vec3(0, position);
//! let next = writer.write_vec2(next, uv);
//! writer.write_color(next, tint);
//! ```
//!
//! Values are written as native-endian raw bytes, matching what a device
//! reading the uploaded buffer on the same host expects.

/// Cursor-style writer over one allocated block.
///
/// Created by [`Arena::writer`](crate::Arena::writer). Bounds are checked
/// against the block, not the whole store: running past the block's end is
/// a caller bug and panics.
pub struct BlockWriter<'a> {
    bytes: &'a mut [u8],
}

impl<'a> BlockWriter<'a> {
    pub(crate) fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    /// Capacity of the underlying block in bytes.
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Copy raw bytes to `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset + data.len()` exceeds the block capacity.
    pub fn write_bytes(&mut self, offset: usize, data: &[u8]) -> usize {
        let end = self.span(offset, data.len());
        self.bytes[offset..end].copy_from_slice(data);
        end
    }

    /// Write a single byte.
    pub fn write_byte(&mut self, offset: usize, value: u8) -> usize {
        let end = self.span(offset, 1);
        self.bytes[offset] = value;
        end
    }

    /// Write an `f32`.
    pub fn write_f32(&mut self, offset: usize, value: f32) -> usize {
        self.write_bytes(offset, &value.to_ne_bytes())
    }

    /// Write an RGBA color packed into four bytes.
    ///
    /// Each component is expected in `[0, 1]` and is quantized to
    /// `round(component * 255)`; out-of-range components saturate.
    pub fn write_color(&mut self, offset: usize, rgba: [f32; 4]) -> usize {
        self.span(offset, 4);
        rgba.iter().fold(offset, |at, &c| self.write_byte(at, quantize(c)))
    }

    /// Write a two-component float vector (8 bytes).
    pub fn write_vec2(&mut self, offset: usize, v: [f32; 2]) -> usize {
        self.write_floats(offset, &v)
    }

    /// Write a three-component float vector (12 bytes).
    pub fn write_vec3(&mut self, offset: usize, v: [f32; 3]) -> usize {
        self.write_floats(offset, &v)
    }

    /// Write a four-component float vector (16 bytes).
    pub fn write_vec4(&mut self, offset: usize, v: [f32; 4]) -> usize {
        self.write_floats(offset, &v)
    }

    fn write_floats(&mut self, offset: usize, values: &[f32]) -> usize {
        self.span(offset, std::mem::size_of_val(values));
        values.iter().fold(offset, |at, &v| self.write_f32(at, v))
    }

    /// End offset of a `len`-byte write at `offset`, asserting it fits.
    fn span(&self, offset: usize, len: usize) -> usize {
        let end = offset.checked_add(len);
        match end {
            Some(end) if end <= self.bytes.len() => end,
            _ => panic!(
                "write of {len} bytes at offset {offset} overruns block of {} bytes",
                self.bytes.len()
            ),
        }
    }
}

fn quantize(component: f32) -> u8 {
    (component.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_chain_offsets() {
        let mut buf = [0u8; 40];
        let mut w = BlockWriter::new(&mut buf);
        let next = w.write_vec3(0, [1.0, 2.0, 3.0]);
        assert_eq!(next, 12);
        let next = w.write_vec2(next, [4.0, 5.0]);
        assert_eq!(next, 20);
        let next = w.write_color(next, [1.0, 0.0, 0.5, 1.0]);
        assert_eq!(next, 24);
        let next = w.write_vec4(next, [6.0, 7.0, 8.0, 9.0]);
        assert_eq!(next, 40);

        assert_eq!(&buf[0..4], &1.0f32.to_ne_bytes());
        assert_eq!(&buf[8..12], &3.0f32.to_ne_bytes());
        assert_eq!(&buf[16..20], &5.0f32.to_ne_bytes());
        assert_eq!(&buf[20..24], &[255, 0, 128, 255]);
        assert_eq!(&buf[36..40], &9.0f32.to_ne_bytes());
    }

    #[test]
    fn color_quantization_rounds() {
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(1.0), 255);
        assert_eq!(quantize(0.5), 128);
        assert_eq!(quantize(0.2), 51);
        assert_eq!(quantize(-1.0), 0);
        assert_eq!(quantize(2.0), 255);
    }

    #[test]
    fn byte_and_raw_writes() {
        let mut buf = [0u8; 6];
        let mut w = BlockWriter::new(&mut buf);
        let next = w.write_byte(0, 7);
        let next = w.write_bytes(next, &[1, 2, 3]);
        assert_eq!(next, 4);
        let next = w.write_bytes(next, &[]);
        assert_eq!(next, 4);
        assert_eq!(buf, [7, 1, 2, 3, 0, 0]);
    }

    #[test]
    fn write_exactly_to_end_succeeds() {
        let mut buf = [0u8; 4];
        let mut w = BlockWriter::new(&mut buf);
        assert_eq!(w.write_f32(0, 1.5), 4);
    }

    #[test]
    #[should_panic(expected = "overruns block")]
    fn write_past_end_panics() {
        let mut buf = [0u8; 4];
        BlockWriter::new(&mut buf).write_f32(1, 1.0);
    }

    #[test]
    #[should_panic(expected = "overruns block")]
    fn vector_write_checks_whole_span_first() {
        let mut buf = [0u8; 10];
        let mut w = BlockWriter::new(&mut buf);
        w.write_vec3(0, [1.0, 2.0, 3.0]);
    }

    #[test]
    #[should_panic(expected = "overruns block")]
    fn color_write_checks_whole_span_first() {
        let mut buf = [0u8; 3];
        BlockWriter::new(&mut buf).write_color(0, [1.0; 4]);
    }
}
