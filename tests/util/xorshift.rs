/// The 32-bit variant of the Xorshift PRNG algorithm.
///
/// Not worth pulling in the `rand` crate for socket names and patterned payloads.
#[repr(transparent)]
#[derive(Copy, Clone, Debug)]
pub struct Xorshift32(pub u32);
impl Xorshift32 {
    /// Seeds the generator from an arbitrary string, distinct strings giving distinct streams.
    pub fn from_id(id: &str) -> Self {
        // FNV-1a, folded to a nonzero seed since xorshift gets stuck on zero
        let mut hash = 0x811c_9dc5_u32;
        for byte in id.bytes() {
            hash ^= u32::from(byte);
            hash = hash.wrapping_mul(0x0100_0193);
        }
        Self(hash | 1)
    }
    pub fn next(&mut self) -> u32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        self.0
    }
    pub fn next_byte(&mut self) -> u8 {
        self.next().to_le_bytes()[0]
    }
}
impl Iterator for Xorshift32 {
    type Item = u32;
    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next())
    }
}
