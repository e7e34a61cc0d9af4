/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that store information about the validators eligible to vote in a round.

use borsh::{BorshDeserialize, BorshSerialize};
use std::slice;

pub use ed25519_dalek::{SigningKey, VerifyingKey};

/// Byte representation of a [`VerifyingKey`]. This is also the canonical identity of a validator: its
/// position in every ordering used by this crate is decided by these bytes.
pub type VerifyingKeyBytes = [u8; 32];

/// Stores the identities of the validators eligible to vote in a round.
///
/// ## Ordering of validators
///
/// `ValidatorSet` internally maintains the list of validators in ascending order of their
/// `VerifyingKey`s' bytes, and avails the method [`validators`](ValidatorSet::validators) that users
/// can use to get them in this order.
///
/// ## Immutability
///
/// A `ValidatorSet` cannot be changed after it is created. A change in membership is expressed by
/// creating a new `ValidatorSet`, and with it a new [`RoundState`](crate::round::state::RoundState), so that
/// votes collected under one membership are never counted under another.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ValidatorSet {
    // The verifying keys of validators are included here in ascending order.
    validators: Vec<VerifyingKey>,
}

impl ValidatorSet {
    /// Create a validator set containing `validators`. Repeated keys are only included once.
    pub fn new(validators: impl IntoIterator<Item = VerifyingKey>) -> ValidatorSet {
        let mut validators: Vec<VerifyingKey> = validators.into_iter().collect();
        validators.sort_by_key(|v| v.to_bytes());
        validators.dedup();
        Self { validators }
    }

    /// Check whether the validator set contains `validator`.
    pub fn contains(&self, validator: &VerifyingKey) -> bool {
        self.contains_bytes(&validator.to_bytes())
    }

    /// Check whether the validator set contains a validator whose verifying key has the given bytes.
    pub fn contains_bytes(&self, validator: &VerifyingKeyBytes) -> bool {
        self.validators
            .binary_search_by(|v| v.to_bytes().cmp(validator))
            .is_ok()
    }

    /// Get an iterator through validators' verifying keys which walks through them in ascending order.
    pub fn validators(&self) -> slice::Iter<VerifyingKey> {
        self.validators.iter()
    }

    /// Get the number of validators in the validator set.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Check whether the validator set is empty (i.e., `self.len() == 0`).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The maximum number of faulty validators the validator set tolerates: `f = (n - 1) / 3`.
    ///
    /// An empty validator set tolerates no faults.
    pub fn max_faulty(&self) -> usize {
        self.len().saturating_sub(1) / 3
    }

    /// The number of matching votes from distinct validators that must be collected for a value to count
    /// as certified: `2f + 1`.
    pub fn quorum(&self) -> usize {
        2 * self.max_faulty() + 1
    }
}

/// Intermediate representation of [`ValidatorSet`] for safe serialization and deserialization.
///
/// To serialize an instance of `ValidatorSet`, convert it into a `ValidatorSetBytes` using the former
/// type's implementation of `From<&ValidatorSet>`, then serialize the `ValidatorSetBytes` using Borsh.
/// Reverse the steps to deserialize a `ValidatorSet`.
///
/// ## Rationale
///
/// [`ed25519_dalek::VerifyingKey`] does not implement the Borsh traits, so it cannot appear directly in a
/// type that derives them. Instances of this type are not guaranteed to contain valid Ed25519 verifying
/// keys, nor to list them in canonical order, so conversion into `ValidatorSet` is fallible.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub(crate) struct ValidatorSetBytes {
    // Strictly ascending.
    validators: Vec<VerifyingKeyBytes>,
}

impl From<&ValidatorSet> for ValidatorSetBytes {
    fn from(value: &ValidatorSet) -> Self {
        ValidatorSetBytes {
            validators: value.validators.iter().map(|v| v.to_bytes()).collect(),
        }
    }
}

impl TryFrom<ValidatorSetBytes> for ValidatorSet {
    type Error = ValidatorSetBytesError;

    fn try_from(value: ValidatorSetBytes) -> Result<Self, Self::Error> {
        if !value.validators.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(ValidatorSetBytesError::NotCanonical);
        }

        let validators = value
            .validators
            .iter()
            .map(|bytes| {
                VerifyingKey::from_bytes(bytes)
                    .map_err(|_| ValidatorSetBytesError::InvalidVerifyingKey { key: *bytes })
            })
            .collect::<Result<Vec<VerifyingKey>, ValidatorSetBytesError>>()?;

        Ok(ValidatorSet { validators })
    }
}

/// Enumerates the ways in which a [`ValidatorSetBytes`] can fail to be a valid [`ValidatorSet`].
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ValidatorSetBytesError {
    /// The validators are not listed in strictly ascending order of their bytes.
    NotCanonical,

    /// One of the listed keys is not a valid Ed25519 verifying key.
    InvalidVerifyingKey { key: VerifyingKeyBytes },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;

    fn keys(n: usize) -> Vec<VerifyingKey> {
        (0..n)
            .map(|_| SigningKey::generate(&mut OsRng).verifying_key())
            .collect()
    }

    #[test]
    fn quorum_thresholds() {
        let expected = [(0, 0, 1), (1, 0, 1), (3, 0, 1), (4, 1, 3), (6, 1, 3), (7, 2, 5), (10, 3, 7)];
        for (n, f, q) in expected {
            let validator_set = ValidatorSet::new(keys(n));
            assert_eq!(validator_set.max_faulty(), f, "f for n = {}", n);
            assert_eq!(validator_set.quorum(), q, "q for n = {}", n);
        }
    }

    #[test]
    fn validators_are_sorted_and_deduplicated() {
        let mut ks = keys(5);
        ks.push(ks[0]);
        let validator_set = ValidatorSet::new(ks.clone());
        assert_eq!(validator_set.len(), 5);

        let bytes: Vec<VerifyingKeyBytes> = validator_set.validators().map(|v| v.to_bytes()).collect();
        assert!(bytes.windows(2).all(|pair| pair[0] < pair[1]));
        for k in &ks {
            assert!(validator_set.contains(k));
        }
        assert!(!validator_set.contains(&keys(1)[0]));
    }

    #[test]
    fn bytes_conversion_rejects_unsorted_validators() {
        let validator_set = ValidatorSet::new(keys(3));
        let mut bytes = ValidatorSetBytes::from(&validator_set);
        assert_eq!(ValidatorSet::try_from(bytes.clone()), Ok(validator_set));

        bytes.validators.reverse();
        assert_eq!(
            ValidatorSet::try_from(bytes),
            Err(ValidatorSetBytesError::NotCanonical)
        );
    }
}
