use std::collections::HashMap;
use std::sync::Mutex;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::catalog::{
    HEART_RATE_CHARACTERISTIC, STEPS_COUNT_CHARACTERISTIC, TEMPERATURE_CHARACTERISTIC,
};
use crate::{Error, ErrorType, Result};

pub const HEART_RATES: &[&str] = &["60", "70", "80", "90", "100", "120", "140"];
pub const STEPS: &[&str] = &[
    "25", "36", "42", "50", "66", "79", "82", "95", "104", "118", "245", "331",
];
pub const TEMPERATURES: &[&str] = &["97", "98", "99", "100", "101"];

/// Supplies characteristic values on demand.
pub trait DataSource: Send + Sync {
    /// Returns one value for the characteristic. Only fails when the source
    /// knows nothing about it.
    fn sample(&self, characteristic: &Uuid) -> Result<Vec<u8>>;
}

/// Picks values uniformly from a fixed candidate set per characteristic.
#[derive(Debug)]
pub struct SyntheticSource {
    candidates: HashMap<Uuid, Vec<Vec<u8>>>,
    rng: Mutex<StdRng>,
}

impl SyntheticSource {
    pub fn empty() -> Self {
        Self {
            candidates: HashMap::new(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Candidate sets for the standard catalog, as ASCII decimal strings.
    pub fn standard() -> Self {
        let mut source = Self::empty();
        for (characteristic, values) in [
            (HEART_RATE_CHARACTERISTIC, HEART_RATES),
            (STEPS_COUNT_CHARACTERISTIC, STEPS),
            (TEMPERATURE_CHARACTERISTIC, TEMPERATURES),
        ] {
            source.candidates.insert(
                characteristic,
                values.iter().map(|v| v.as_bytes().to_vec()).collect(),
            );
        }
        source
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    pub fn with_candidates<I, V>(mut self, characteristic: Uuid, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Vec<u8>>,
    {
        let values: Vec<Vec<u8>> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(Error::from_string(
                format!("no candidate values for {characteristic}"),
                ErrorType::UnknownCharacteristic,
            ));
        }
        self.candidates.insert(characteristic, values);
        Ok(self)
    }

    pub fn candidates(&self, characteristic: &Uuid) -> Option<&[Vec<u8>]> {
        self.candidates.get(characteristic).map(Vec::as_slice)
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::standard()
    }
}

impl DataSource for SyntheticSource {
    fn sample(&self, characteristic: &Uuid) -> Result<Vec<u8>> {
        let values = self.candidates.get(characteristic).ok_or_else(|| {
            Error::from_string(
                format!("no data bound to {characteristic}"),
                ErrorType::UnknownCharacteristic,
            )
        })?;
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        values.choose(&mut *rng).cloned().ok_or_else(|| {
            Error::from_string(
                format!("empty candidate set for {characteristic}"),
                ErrorType::UnknownCharacteristic,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_come_from_candidate_set() {
        let source = SyntheticSource::standard().with_seed(7);
        for (characteristic, expected) in [
            (HEART_RATE_CHARACTERISTIC, HEART_RATES),
            (STEPS_COUNT_CHARACTERISTIC, STEPS),
            (TEMPERATURE_CHARACTERISTIC, TEMPERATURES),
        ] {
            for _ in 0..50 {
                let value = source.sample(&characteristic).unwrap();
                let text = String::from_utf8(value).unwrap();
                assert!(expected.contains(&text.as_str()), "{text} not in {expected:?}");
            }
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let first = SyntheticSource::standard().with_seed(42);
        let second = SyntheticSource::standard().with_seed(42);
        let draw = |source: &SyntheticSource| -> Vec<Vec<u8>> {
            (0..20)
                .map(|_| source.sample(&STEPS_COUNT_CHARACTERISTIC).unwrap())
                .collect()
        };
        let a = draw(&first);
        let b = draw(&second);
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_characteristic_is_an_error() {
        let error = SyntheticSource::standard().sample(&Uuid::nil()).unwrap_err();
        assert_eq!(error.kind(), ErrorType::UnknownCharacteristic);
    }

    #[test]
    fn custom_candidates_must_not_be_empty() {
        let characteristic = Uuid::from_u128(9);
        assert!(SyntheticSource::empty()
            .with_candidates(characteristic, Vec::<Vec<u8>>::new())
            .is_err());

        let source = SyntheticSource::empty()
            .with_candidates(characteristic, ["on"])
            .unwrap();
        assert_eq!(source.sample(&characteristic).unwrap(), b"on".to_vec());
        assert_eq!(source.candidates(&characteristic).map(<[_]>::len), Some(1));
    }
}
