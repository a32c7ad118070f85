/*!
 * Shared test helpers
 */

/// Byte buffer with a known base alignment, so offsets in assertions do not
/// depend on where the stack or heap placed it
#[repr(C, align(16))]
pub struct Aligned<const N: usize>(pub [u8; N]);

impl<const N: usize> Aligned<N> {
    pub fn new() -> Box<Self> {
        Box::new(Self([0; N]))
    }

    pub fn bytes(&mut self) -> &mut [u8] {
        &mut self.0
    }
}
