/// Little-endian writer over a borrowed payload buffer.
pub struct BytesMut<'a> {
    data: &'a mut [u8],
    len: usize,
}

impl<'a> BytesMut<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, len: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.len
    }

    /// # Panics
    ///
    /// Will panic if fewer than `src.len()` bytes of space remain
    #[inline]
    pub fn put_slice(&mut self, src: &[u8]) {
        assert!(
            self.remaining() >= src.len(),
            "payload overflow: {} bytes remaining, tried to add {}",
            self.remaining(),
            src.len(),
        );
        self.data[self.len..self.len + src.len()].copy_from_slice(src);
        self.len += src.len();
    }

    /// # Panics
    ///
    /// Will panic if no space remains in the buffer
    #[inline]
    pub fn put_u8(&mut self, val: u8) {
        self.put_slice(&[val]);
    }

    /// # Panics
    ///
    /// Will panic if no space remains in the buffer
    #[inline]
    pub fn put_i8(&mut self, val: i8) {
        self.put_slice(&[val as u8]);
    }
}

macro_rules! put_le {
    ($($putter:ident($ty:ty)),* $(,)?) => {
        impl BytesMut<'_> {
            $(
                /// # Panics
                ///
                /// Will panic if fewer bytes of space remain than the type needs
                #[inline]
                pub fn $putter(&mut self, val: $ty) {
                    self.put_slice(&val.to_le_bytes());
                }
            )*
        }
    };
}

put_le! {
    put_u16_le(u16),
    put_i16_le(i16),
    put_u32_le(u32),
    put_i32_le(i32),
    put_u64_le(u64),
    put_i64_le(i64),
    put_f32_le(f32),
    put_f64_le(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_little_endian() {
        let mut data = [0u8; 5];
        let mut buf = BytesMut::new(&mut data);
        buf.put_u32_le(0x0403_0201);
        buf.put_u8(0x05);
        assert_eq!(buf.len(), 5);
        assert_eq!(data, [0x01, 0x02, 0x03, 0x04, 0x05]);
    }

    #[test]
    #[should_panic(expected = "payload overflow")]
    fn overflow_panics() {
        let mut data = [0u8; 1];
        let mut buf = BytesMut::new(&mut data);
        buf.put_u16_le(1);
    }
}
