use ed25519_dalek::{SigningKey, VerifyingKey};
use pbft_round_state::types::validators::ValidatorSet;
use rand_core::OsRng;

/// Generate `n` fresh verifying keys.
pub(crate) fn verifying_keys(n: usize) -> Vec<VerifyingKey> {
    let mut csprg = OsRng {};
    (0..n)
        .map(|_| SigningKey::generate(&mut csprg).verifying_key())
        .collect()
}

/// Generate `n` fresh verifying keys, and a validator set containing exactly them.
pub(crate) fn validator_set(n: usize) -> (Vec<VerifyingKey>, ValidatorSet) {
    let keys = verifying_keys(n);
    let validator_set = ValidatorSet::new(keys.iter().copied());
    (keys, validator_set)
}
