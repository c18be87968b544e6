//! The fixed seed set written by `InitLedger`.

use share_types::Share;

/// Price of every seed share.
pub const SEED_PRICE: u64 = 1000;

/// `(id, owner)` of each seed share, in write order.
pub const SEED_OWNERS: [(&str, &str); 5] = [
    ("0", "Enterprise"),
    ("1", "Enterprise"),
    ("2", "Enterprise"),
    ("3", "CEO"),
    ("4", "CEO"),
];

/// The seed shares, freshly issued with no owner history.
///
/// Seed owners are literal: they do not follow the configured issuer.
pub fn seed_shares() -> Vec<Share> {
    SEED_OWNERS
        .iter()
        .map(|(id, owner)| Share::issue(*id, *owner, SEED_PRICE))
        .collect()
}
