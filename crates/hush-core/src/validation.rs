//! Private-state validation rules.
//!
//! Pure functions: inputs fully determine outputs, no I/O. The mediator
//! decides per call site whether a failed check is fatal (outbound) or a
//! silent drop (inbound); the rules themselves don't know the direction.

use std::collections::{BTreeMap, BTreeSet};

use hush_crypto::PublicKey;
use hush_payload::{EncodedPayload, PrivacyMode, TxHash};

/// The first referenced transaction whose privacy mode differs from the
/// new payload's, if any.
///
/// Every transaction in a dependency chain must carry the same mode;
/// mixing modes would let a weaker payload leak decisions made under a
/// stricter one.
pub fn find_privacy_mode_mismatch<'a>(
    mode: PrivacyMode,
    affected: &'a BTreeMap<TxHash, EncodedPayload>,
) -> Option<&'a TxHash> {
    affected
        .iter()
        .find(|(_, affected_tx)| affected_tx.privacy_mode() != mode)
        .map(|(tx_hash, _)| tx_hash)
}

/// Order-insensitive set equality over two recipient lists.
pub fn recipients_equal(ours: &[PublicKey], theirs: &[PublicKey]) -> bool {
    let ours: BTreeSet<&PublicKey> = ours.iter().collect();
    let theirs: BTreeSet<&PublicKey> = theirs.iter().collect();
    ours == theirs
}

/// Whether an inbound payload's sender plausibly belongs to the
/// dependency graph it claims.
///
/// Returns false when fewer references resolved locally than the payload
/// claims (the shape of a recipient-discovery probe: an adversary lists
/// hashes it suspects we hold to learn whether we have them), or when
/// any resolved transaction does not list the sender among its
/// recipients.
pub fn sender_is_genuine(
    sender: &PublicKey,
    claimed_count: usize,
    resolved: &BTreeMap<TxHash, EncodedPayload>,
) -> bool {
    if resolved.len() != claimed_count {
        return false;
    }
    resolved
        .values()
        .all(|affected_tx| affected_tx.recipient_keys().contains(sender))
}
