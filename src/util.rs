use rand::{CryptoRng, RngCore};

// object safe bundle of the rng traits, so algo tables can store plain fn pointers
pub trait CryptoRngCore: CryptoRng + RngCore {}

impl<T: CryptoRng + RngCore> CryptoRngCore for T {}

// `&mut dyn CryptoRngCore` does not itself satisfy `CryptoRng + RngCore` bounds
pub struct DynRng<'a>(pub &'a mut dyn CryptoRngCore);

impl RngCore for DynRng<'_> {
    fn next_u32(&mut self) -> u32 { self.0.next_u32() }
    fn next_u64(&mut self) -> u64 { self.0.next_u64() }
    fn fill_bytes(&mut self, dest: &mut [u8]) { self.0.fill_bytes(dest) }
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        self.0.try_fill_bytes(dest)
    }
}

impl CryptoRng for DynRng<'_> {}
