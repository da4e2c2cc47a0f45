use std::io;

/// Little-endian reader over a borrowed payload buffer.
pub struct Bytes<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Bytes<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    fn take<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        if self.remaining() < N {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "payload underflow: need {N} bytes, {} remaining",
                    self.remaining()
                ),
            ));
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    /// # Errors
    ///
    /// Will return an error if nothing remains in the buffer
    #[inline]
    pub fn get_u8(&mut self) -> io::Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    /// # Errors
    ///
    /// Will return an error if nothing remains in the buffer
    #[inline]
    pub fn get_i8(&mut self) -> io::Result<i8> {
        Ok(self.take::<1>()?[0] as i8)
    }
}

macro_rules! get_le {
    ($($getter:ident -> $ty:ty),* $(,)?) => {
        impl Bytes<'_> {
            $(
                /// # Errors
                ///
                /// Will return an error if fewer bytes remain than the type needs
                #[inline]
                pub fn $getter(&mut self) -> io::Result<$ty> {
                    Ok(<$ty>::from_le_bytes(self.take()?))
                }
            )*
        }
    };
}

get_le! {
    get_u16_le -> u16,
    get_i16_le -> i16,
    get_u32_le -> u32,
    get_i32_le -> i32,
    get_u64_le -> u64,
    get_i64_le -> i64,
    get_f32_le -> f32,
    get_f64_le -> f64,
}
