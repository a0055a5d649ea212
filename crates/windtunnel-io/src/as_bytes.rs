use glam::Vec3;

/// Fixed-size binary representation. STL files are little-endian and legacy VTK files are
/// big-endian, so reading and writing use different byte orders.
pub trait AsBytes<const N: usize> {
    fn read_le(b: [u8; N]) -> Self;

    fn write_be(self) -> [u8; N];
}

impl AsBytes<1> for u8 {
    fn read_le(b: [u8; 1]) -> Self {
        b[0]
    }

    fn write_be(self) -> [u8; 1] {
        [self]
    }
}

impl AsBytes<2> for u16 {
    fn read_le(b: [u8; 2]) -> Self {
        u16::from_le_bytes(b)
    }

    fn write_be(self) -> [u8; 2] {
        self.to_be_bytes()
    }
}

impl AsBytes<4> for u32 {
    fn read_le(b: [u8; 4]) -> Self {
        u32::from_le_bytes(b)
    }

    fn write_be(self) -> [u8; 4] {
        self.to_be_bytes()
    }
}

impl AsBytes<4> for i32 {
    fn read_le(b: [u8; 4]) -> Self {
        i32::from_le_bytes(b)
    }

    fn write_be(self) -> [u8; 4] {
        self.to_be_bytes()
    }
}

impl AsBytes<4> for f32 {
    fn read_le(b: [u8; 4]) -> Self {
        f32::from_le_bytes(b)
    }

    fn write_be(self) -> [u8; 4] {
        self.to_be_bytes()
    }
}

impl AsBytes<12> for Vec3 {
    fn read_le(b: [u8; 12]) -> Self {
        Vec3::new(
            f32::read_le(chunk(&b, 0)),
            f32::read_le(chunk(&b, 4)),
            f32::read_le(chunk(&b, 8)),
        )
    }

    fn write_be(self) -> [u8; 12] {
        let mut b = [0; 12];
        b[0..4].copy_from_slice(&self.x.write_be());
        b[4..8].copy_from_slice(&self.y.write_be());
        b[8..12].copy_from_slice(&self.z.write_be());
        b
    }
}

#[inline]
fn chunk<const N: usize>(b: &[u8], at: usize) -> [u8; N] {
    std::array::from_fn(|i| b[at + i])
}
