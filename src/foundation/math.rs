/// 64-bit FNV-1a digest used for plan and URI-set identity.
///
/// Not a cryptographic hash; only stable across runs and platforms.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Fingerprint(u64);

impl Default for Fingerprint {
    fn default() -> Self {
        Self(0xcbf2_9ce4_8422_2325)
    }
}

impl Fingerprint {
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    pub(crate) fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        for &b in bytes {
            self.0 = (self.0 ^ u64::from(b)).wrapping_mul(Self::PRIME);
        }
        self
    }

    pub(crate) fn tag(&mut self, tag: u8) -> &mut Self {
        self.bytes(&[tag])
    }

    pub(crate) fn u64(&mut self, v: u64) -> &mut Self {
        self.bytes(&v.to_le_bytes())
    }

    /// Bit pattern, so `-0.0` and `0.0` differ.
    pub(crate) fn f64s(&mut self, vals: &[f64]) -> &mut Self {
        for v in vals {
            self.u64(v.to_bits());
        }
        self
    }

    /// Length-prefixed so adjacent strings cannot run together.
    pub(crate) fn str(&mut self, s: &str) -> &mut Self {
        self.u64(s.len() as u64).bytes(s.as_bytes())
    }

    pub(crate) fn value(&self) -> u64 {
        self.0
    }
}

/// `c * a / 255`, rounded to nearest.
pub(crate) fn mul_alpha(c: u16, a: u16) -> u16 {
    let t = u32::from(c) * u32::from(a) + 128;
    ((t + (t >> 8)) >> 8) as u16
}
