//! Progressive slippage ladder (§4.2): the ordered sequence of slippage
//! tolerances an attempt escalates through on a recoverable failure.

/// Hard ceiling on any attempt's slippage tolerance (10%).
pub const SLIPPAGE_CEILING_BPS: u16 = 1000;

const CANONICAL_RUNGS: [u16; 4] = [150, 300, 500, 1000];

/// Builds the strictly-increasing ladder starting from `requested_bps`,
/// capped at [`SLIPPAGE_CEILING_BPS`]. The canonical rungs above the
/// requested value are appended in order; rungs not greater than the
/// previous entry are skipped.
pub fn build_ladder(requested_bps: u16) -> Vec<u16> {
    let mut ladder = vec![requested_bps.min(SLIPPAGE_CEILING_BPS)];
    for &rung in CANONICAL_RUNGS.iter() {
        let last = *ladder.last().expect("ladder always has an initial rung");
        if rung > last && rung <= SLIPPAGE_CEILING_BPS {
            ladder.push(rung);
        }
    }
    ladder
}

/// Phrases the external swap program is known to surface for a slippage
/// failure, plus the "6001" (SlippageToleranceExceeded) program error code.
const SLIPPAGE_PHRASES: [&str; 8] = [
    "slippage",
    "price moved",
    "insufficient output amount",
    "would result in a loss",
    "price impact too high",
    "exceeds desired slippage",
    "minimum received",
    "slippage tolerance",
];

/// Classifies an error's textual form as a recoverable slippage failure.
/// Anything else is treated as fatal and aborts the ladder immediately.
pub fn is_slippage_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    SLIPPAGE_PHRASES.iter().any(|phrase| lower.contains(phrase)) || lower.contains("6001")
}
