//! Fault-injection hardened comparison.
//!
//! A glitched clock or supply rail can skip an instruction or flip a bit in
//! a register.  An attacker who can do that at the right moment turns an
//! ordinary `memcmp`-then-branch into a forged "match": skip the early-out
//! branch, or flip the single bit that distinguishes true from false on the
//! return path.  The comparison used for trailer magic (and for any other
//! security decision in the wider bootloader) is built to deny both tricks:
//!
//! - every byte is examined, even after a mismatch is already known, so no
//!   single skipped iteration changes the outcome;
//! - the result is a multi-bit sentinel, not a boolean, so no single bit
//!   flip converts failure into success;
//! - the loop counter is cross-checked against the input length before a
//!   success may be produced.
//!
//! The strength is selected at build time.  `fih-off` degrades to a plain
//! comparison (sentinel-typed, so callers are unchanged), `fih-low` drops
//! the counter cross-check, `fih-high` adds a second reverse-order pass and
//! a redundant complement word inside [`FihResult`].  With none of those
//! features set the MEDIUM profile above is what you get.  At most one
//! profile feature should be enabled.

#[cfg(not(feature = "fih-off"))]
use core::hint::black_box;

const POSITIVE: u32 = 0x1aaa_aaaa;
const NEGATIVE: u32 = 0x1555_5555;

#[cfg(feature = "fih-high")]
const MASK: u32 = 0xa5c3_5a3c;

/// Outcome of a hardened comparison.
///
/// Only the exact success encoding is success.  Anything that is neither the
/// success nor the failure sentinel is evidence of a fault and is fatal.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FihResult {
    val: u32,
    #[cfg(feature = "fih-high")]
    msk: u32,
}

impl FihResult {
    pub const SUCCESS: FihResult = FihResult {
        val: POSITIVE,
        #[cfg(feature = "fih-high")]
        msk: POSITIVE ^ MASK,
    };

    pub const FAILURE: FihResult = FihResult {
        val: NEGATIVE,
        #[cfg(feature = "fih-high")]
        msk: NEGATIVE ^ MASK,
    };

    /// Decode the sentinel.  Panics on an encoding that matches neither
    /// sentinel: a fault has corrupted the comparison result, and halting is
    /// the only safe reaction.
    pub fn is_success(self) -> bool {
        #[cfg(feature = "fih-high")]
        if self.val ^ MASK != self.msk {
            panic!("fault detected");
        }
        if self.val == POSITIVE {
            true
        } else if self.val == NEGATIVE {
            false
        } else {
            panic!("fault detected");
        }
    }
}

/// Hardened byte-wise equality.
pub fn eq(a: &[u8], b: &[u8]) -> FihResult {
    eq_counted(a, b).0
}

/// Hardened equality, also reporting how many byte positions were examined.
/// The count doubles as the loop-completion cross-check and lets callers
/// verify that no early exit shortened the comparison.
pub fn eq_counted(a: &[u8], b: &[u8]) -> (FihResult, usize) {
    if a.len() != b.len() {
        return (FihResult::FAILURE, 0);
    }

    #[cfg(feature = "fih-off")]
    {
        return if a == b {
            (FihResult::SUCCESS, a.len())
        } else {
            (FihResult::FAILURE, a.len())
        };
    }

    #[cfg(not(feature = "fih-off"))]
    {
        let mut diff: u8 = 0;
        let mut steps: usize = 0;
        for i in 0..a.len() {
            diff |= black_box(a[i]) ^ black_box(b[i]);
            steps += 1;
        }

        #[cfg(feature = "fih-high")]
        {
            // Independent second pass, opposite order.  Both must agree.
            let mut diff2: u8 = 0;
            for i in (0..a.len()).rev() {
                diff2 |= black_box(a[i]) ^ black_box(b[i]);
            }
            if black_box(diff2) != diff {
                return (FihResult::FAILURE, steps);
            }
        }

        #[cfg(not(feature = "fih-low"))]
        if black_box(steps) != a.len() {
            return (FihResult::FAILURE, steps);
        }

        if black_box(diff) == 0 {
            return (FihResult::SUCCESS, steps);
        }
        return (FihResult::FAILURE, steps);
    }
}
