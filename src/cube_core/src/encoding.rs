use std::fmt;

use crate::{
    Cube, CubeError, Facelet,
    cube::{Validation, check_size},
};

/// A packed, exact serialization of a [`Cube`], usable as a hash key.
///
/// Facelets are stored in the cube's internal order (faces in [`Facelet::ALL`] order, cells
/// row-major), two per byte with the earlier facelet in the low nibble. Keys of the same cube
/// size always have the same length.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey(Box<[u8]>);

impl StateKey {
    /// The number of bytes in the key of a cube of size `n`
    #[must_use]
    pub const fn len_for(n: usize) -> usize {
        (6 * n * n).div_ceil(2)
    }

    /// Wrap raw key bytes read back from storage
    ///
    /// # Errors
    ///
    /// Fails if the length does not match `n`. The contents are checked by [`decode`].
    pub fn from_bytes(n: usize, bytes: impl Into<Box<[u8]>>) -> Result<StateKey, CubeError> {
        check_size(n)?;

        let bytes = bytes.into();
        let expected = StateKey::len_for(n);

        if bytes.len() != expected {
            return Err(CubeError::MalformedShape {
                expected,
                found: bytes.len(),
            });
        }

        Ok(StateKey(bytes))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateKey(")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

/// Serialize a cube into its key
#[must_use]
pub fn encode(cube: &Cube) -> StateKey {
    let bytes = cube
        .facelets()
        .chunks(2)
        .map(|pair| {
            let low = u8::from(pair[0]);
            let high = pair.get(1).map_or(0, |&v| u8::from(v));
            low | (high << 4)
        })
        .collect();

    StateKey(bytes)
}

/// Rebuild the cube of size `n` that produced `key`
///
/// # Errors
///
/// Fails if the key has the wrong length or holds a nibble that does not name a face
pub fn decode(n: usize, key: &StateKey) -> Result<Cube, CubeError> {
    check_size(n)?;

    let count = 6 * n * n;
    if key.0.len() != StateKey::len_for(n) {
        return Err(CubeError::MalformedShape {
            expected: StateKey::len_for(n),
            found: key.0.len(),
        });
    }

    let facelets = key
        .0
        .iter()
        .flat_map(|byte| [byte & 0x0f, byte >> 4])
        .take(count)
        .map(|nibble| Facelet::from_index(nibble).map_err(|_| CubeError::InvalidFaceletValue(nibble)))
        .collect::<Result<Vec<_>, _>>()?;

    Cube::from_facelets(n, facelets, Validation::Shape)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{Action, TwistEngine};

    #[test]
    fn key_lengths() {
        assert_eq!(StateKey::len_for(2), 12);
        assert_eq!(StateKey::len_for(3), 27);

        for n in 2..=5 {
            let cube = Cube::solved(n).unwrap();
            assert_eq!(encode(&cube).as_bytes().len(), StateKey::len_for(n));
        }
    }

    #[test]
    fn decode_inverts_encode() {
        let engine = TwistEngine::new(3).unwrap();
        let mut rng = fastrand::Rng::with_seed(3);
        let cube = engine
            .apply_all(
                &Cube::solved(3).unwrap(),
                (0..30).map(|_| Action::sample(3, &mut rng)),
            )
            .unwrap();

        assert_eq!(decode(3, &encode(&cube)).unwrap(), cube);
    }

    #[test]
    fn single_cell_changes_the_key() {
        let solved = Cube::solved(3).unwrap();
        let solved_key = encode(&solved);

        for index in 0..54 {
            for replacement in Facelet::ALL {
                let mut facelets = solved.facelets().to_vec();
                if facelets[index] == replacement {
                    continue;
                }
                facelets[index] = replacement;

                let cube = Cube::from_facelets(3, facelets, Validation::Shape).unwrap();
                assert_ne!(encode(&cube), solved_key, "cell {index} -> {replacement}");
            }
        }
    }

    #[test]
    fn rejects_bad_keys() {
        assert!(matches!(
            StateKey::from_bytes(3, vec![0; 26]),
            Err(CubeError::MalformedShape {
                expected: 27,
                found: 26
            })
        ));

        let key = StateKey::from_bytes(2, vec![0xff; 12]).unwrap();
        assert!(matches!(
            decode(2, &key),
            Err(CubeError::InvalidFaceletValue(15))
        ));
        assert!(decode(3, &key).is_err());
    }
}
