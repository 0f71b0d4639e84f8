// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-iteration ordering of the training sample

use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resample {
    /// Records in their given order
    #[default]
    Sequential,
    /// A fresh permutation every iteration
    Shuffle,
    /// Same number of records drawn with replacement
    Bootstrap,
}

impl Resample {
    /// Record indices to visit this iteration
    pub fn indices<R: Rng + ?Sized>(self, len: usize, rng: &mut R) -> Vec<usize> {
        match self {
            Resample::Sequential => (0..len).collect(),
            Resample::Shuffle => {
                let mut indices: Vec<usize> = (0..len).collect();
                indices.shuffle(rng);
                indices
            }
            Resample::Bootstrap => {
                if len == 0 {
                    return Vec::new();
                }
                (0..len).map(|_| rng.gen_range(0..len)).collect()
            }
        }
    }
}

impl fmt::Display for Resample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resample::Sequential => "sequential",
            Resample::Shuffle => "shuffle",
            Resample::Bootstrap => "bootstrap",
        };
        f.write_str(name)
    }
}

impl FromStr for Resample {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sequential" => Ok(Resample::Sequential),
            "shuffle" => Ok(Resample::Shuffle),
            "bootstrap" => Ok(Resample::Bootstrap),
            other => Err(format!("unknown resample strategy '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sequential_keeps_order() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(Resample::Sequential.indices(4, &mut rng), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut indices = Resample::Shuffle.indices(10, &mut rng);
        indices.sort_unstable();
        assert_eq!(indices, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_bootstrap_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let indices = Resample::Bootstrap.indices(5, &mut rng);
        assert_eq!(indices.len(), 5);
        assert!(indices.iter().all(|&i| i < 5));
        assert!(Resample::Bootstrap.indices(0, &mut rng).is_empty());
    }

    #[test]
    fn test_parse() {
        assert_eq!("Shuffle".parse::<Resample>(), Ok(Resample::Shuffle));
        assert!("random".parse::<Resample>().is_err());
    }
}
