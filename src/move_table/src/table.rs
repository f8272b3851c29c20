use cube_core::{Action, Cube, CubeError, StateKey, TwistEngine, encode};
use fxhash::FxHashMap;
use itertools::Itertools;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error(transparent)]
    Cube(#[from] CubeError),
    #[error("Following the recorded actions from {0:?} never reaches the start configuration")]
    NoPathToStart(StateKey),
}

/// Maps every discovered configuration to the twist that brings it one step closer to the start.
///
/// Entries are only ever added; the first action recorded for a key is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTable {
    n: usize,
    entries: FxHashMap<StateKey, Action>,
}

impl LookupTable {
    #[must_use]
    pub fn new(n: usize) -> LookupTable {
        LookupTable {
            n,
            entries: FxHashMap::default(),
        }
    }

    /// The cube size the keys belong to
    #[must_use]
    pub fn size(&self) -> usize {
        self.n
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &StateKey) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn get(&self, key: &StateKey) -> Option<Action> {
        self.entries.get(key).copied()
    }

    /// Record `action` for `key` unless the key already has an entry. Returns whether it was added.
    pub fn insert_first(&mut self, key: StateKey, action: Action) -> bool {
        match self.entries.entry(key) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(action);
                true
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StateKey, Action)> {
        self.entries.iter().map(|(key, &action)| (key, action))
    }

    /// The entries ordered by key, independent of hashing
    #[must_use]
    pub fn sorted_entries(&self) -> Vec<(&StateKey, Action)> {
        self.iter().sorted_unstable_by(|a, b| a.0.cmp(b.0)).collect()
    }

    /// Follow recorded actions from `cube` until `goal` is reached.
    ///
    /// Returns `None` if `cube` is neither the goal nor in the table.
    ///
    /// # Errors
    ///
    /// Fails if a recorded action cannot be applied or the chain of actions never reaches `goal`
    pub fn solve(
        &self,
        engine: &TwistEngine,
        cube: &Cube,
        goal: &StateKey,
    ) -> Result<Option<Vec<Action>>, TableError> {
        let mut cube = cube.clone();
        let mut key = encode(&cube);
        let mut moves = Vec::new();

        if &key != goal && !self.contains(&key) {
            return Ok(None);
        }

        while &key != goal {
            let Some(action) = self.get(&key) else {
                return Err(TableError::NoPathToStart(key));
            };

            if moves.len() > self.len() {
                return Err(TableError::NoPathToStart(key));
            }

            engine.apply_in_place(&mut cube, action)?;
            moves.push(action);
            key = encode(&cube);
        }

        Ok(Some(moves))
    }

    /// Compute the number of twists between every entry and `start` by following recorded actions.
    ///
    /// # Errors
    ///
    /// Fails if some entry's chain of actions does not lead to `start`
    pub fn depths(
        &self,
        engine: &TwistEngine,
        start: &StateKey,
    ) -> Result<FxHashMap<StateKey, u32>, TableError> {
        let mut depths = FxHashMap::default();
        depths.insert(start.clone(), 0);

        for key in self.entries.keys() {
            if depths.contains_key(key) {
                continue;
            }

            // Walk towards the start until reaching something with a known depth
            let mut path = vec![key.clone()];
            let known = loop {
                let last = path.last().unwrap_or(key);

                if let Some(&depth) = depths.get(last) {
                    path.pop();
                    break depth;
                }

                if path.len() > self.len() + 1 {
                    return Err(TableError::NoPathToStart(key.clone()));
                }

                let Some(action) = self.get(last) else {
                    return Err(TableError::NoPathToStart(key.clone()));
                };

                let cube = cube_core::decode(self.n, last)?;
                path.push(encode(&engine.apply(&cube, action)?));
            };

            for (steps, key) in path.into_iter().rev().enumerate() {
                depths.insert(key, known + steps as u32 + 1);
            }
        }

        depths.remove(start);

        Ok(depths)
    }
}
