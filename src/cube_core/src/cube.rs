use std::fmt;

use itertools::Itertools;

use crate::{CubeError, Facelet};

/// The largest supported edge length. Slice distances and sizes fit in a byte with this bound.
pub const MAX_SIZE: usize = 255;

/// The order in which faces are stacked by [`Cube::observation`]
pub const OBSERVATION_ORDER: [Facelet; 6] = [
    Facelet::Front,
    Facelet::Left,
    Facelet::Back,
    Facelet::Right,
    Facelet::Up,
    Facelet::Down,
];

/// How thoroughly an externally supplied configuration is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validation {
    /// Check the shape and that every value names a face
    #[default]
    Shape,
    /// Additionally require every identity to occur exactly n² times
    Strict,
}

/// A configuration of an n×n×n cube: six n×n grids of facelets.
///
/// The facelets live in one buffer indexed by `face * n² + row * n + col` with faces in
/// [`Facelet::ALL`] order. Every grid is read as seen from outside the cube.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Cube {
    n: usize,
    facelets: Box<[Facelet]>,
}

/// A read-only view of one face of a [`Cube`]
#[derive(Clone, Copy, Debug)]
pub struct FaceGrid<'a> {
    face: Facelet,
    n: usize,
    cells: &'a [Facelet],
}

pub(crate) fn check_size(n: usize) -> Result<(), CubeError> {
    if (2..=MAX_SIZE).contains(&n) {
        Ok(())
    } else {
        Err(CubeError::InvalidSize(n))
    }
}

impl Cube {
    /// Create the solved cube with edge length `n`
    ///
    /// # Errors
    ///
    /// Returns `CubeError::InvalidSize` unless `2 <= n <= MAX_SIZE`
    pub fn solved(n: usize) -> Result<Cube, CubeError> {
        check_size(n)?;

        let facelets = Facelet::ALL
            .iter()
            .flat_map(|&face| std::iter::repeat_n(face, n * n))
            .collect();

        Ok(Cube { n, facelets })
    }

    /// Build a cube from a flat list of facelets in the internal layout.
    ///
    /// # Errors
    ///
    /// Fails if the length is not `6 * n * n`, or if `validation` is strict and the counts of
    /// each identity are not all n².
    pub fn from_facelets(
        n: usize,
        facelets: Vec<Facelet>,
        validation: Validation,
    ) -> Result<Cube, CubeError> {
        check_size(n)?;

        if facelets.len() != 6 * n * n {
            return Err(CubeError::MalformedShape {
                expected: 6 * n * n,
                found: facelets.len(),
            });
        }

        let cube = Cube {
            n,
            facelets: facelets.into_boxed_slice(),
        };

        if validation == Validation::Strict {
            cube.check_conservation()?;
        }

        Ok(cube)
    }

    /// Build a cube from six face grids given in [`Facelet::ALL`] order, each row-major.
    ///
    /// # Errors
    ///
    /// Fails if any grid does not have n² cells, or as in [`Cube::from_facelets`].
    pub fn from_faces(
        n: usize,
        faces: &[Vec<Facelet>; 6],
        validation: Validation,
    ) -> Result<Cube, CubeError> {
        check_size(n)?;

        if let Some(bad) = faces.iter().find(|grid| grid.len() != n * n) {
            return Err(CubeError::MalformedShape {
                expected: n * n,
                found: bad.len(),
            });
        }

        Cube::from_facelets(n, faces.concat(), validation)
    }

    /// Rebuild a cube from an observation array laid out as by [`Cube::observation`].
    ///
    /// # Errors
    ///
    /// Fails if the length is not `n * n * 6`, a value does not name a face, or strict
    /// validation fails.
    pub fn from_observation(
        n: usize,
        observation: &[u8],
        validation: Validation,
    ) -> Result<Cube, CubeError> {
        check_size(n)?;

        if observation.len() != 6 * n * n {
            return Err(CubeError::MalformedShape {
                expected: 6 * n * n,
                found: observation.len(),
            });
        }

        let mut facelets = vec![Facelet::Left; 6 * n * n];

        for (cell, stacked) in observation.chunks_exact(6).enumerate() {
            for (&face, &value) in OBSERVATION_ORDER.iter().zip(stacked) {
                facelets[face.index() * n * n + cell] =
                    Facelet::from_index(value).map_err(|_| CubeError::InvalidFaceletValue(value))?;
            }
        }

        Cube::from_facelets(n, facelets, validation)
    }

    /// The edge length
    #[must_use]
    pub fn size(&self) -> usize {
        self.n
    }

    /// All facelets in the internal layout
    #[must_use]
    pub fn facelets(&self) -> &[Facelet] {
        &self.facelets
    }

    pub(crate) fn facelets_mut(&mut self) -> &mut [Facelet] {
        &mut self.facelets
    }

    #[must_use]
    pub fn face(&self, face: Facelet) -> FaceGrid<'_> {
        let area = self.n * self.n;
        let start = face.index() * area;

        FaceGrid {
            face,
            n: self.n,
            cells: &self.facelets[start..start + area],
        }
    }

    /// Iterate over every face grid in [`Facelet::ALL`] order
    pub fn faces(&self) -> impl Iterator<Item = FaceGrid<'_>> {
        Facelet::ALL.into_iter().map(|face| self.face(face))
    }

    /// Whether every face is uniformly its own identity
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.faces().all(|grid| grid.is_uniform())
    }

    /// The number of facelets of each identity, indexed by [`Facelet::index`]
    #[must_use]
    pub fn identity_counts(&self) -> [usize; 6] {
        let mut counts = [0; 6];

        for facelet in &self.facelets {
            counts[facelet.index()] += 1;
        }

        counts
    }

    /// Check that every identity occurs exactly n² times
    ///
    /// # Errors
    ///
    /// Returns `CubeError::ConservationViolated` naming the first identity with the wrong count
    pub fn check_conservation(&self) -> Result<(), CubeError> {
        let area = self.n * self.n;

        match self
            .identity_counts()
            .iter()
            .zip(Facelet::ALL)
            .find(|(count, _)| **count != area)
        {
            Some((&count, facelet)) => Err(CubeError::ConservationViolated {
                facelet,
                count,
                expected: area,
            }),
            None => Ok(()),
        }
    }

    /// Stack the faces in [`OBSERVATION_ORDER`] into an `(n, n, 6)` array, flattened row-major
    #[must_use]
    pub fn observation(&self) -> Vec<u8> {
        let area = self.n * self.n;
        let mut out = Vec::with_capacity(6 * area);

        for cell in 0..area {
            for face in OBSERVATION_ORDER {
                out.push(u8::from(self.facelets[face.index() * area + cell]));
            }
        }

        out
    }
}

impl<'a> FaceGrid<'a> {
    #[must_use]
    pub fn face(&self) -> Facelet {
        self.face
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Facelet {
        self.cells[row * self.n + col]
    }

    /// The cells in row-major order
    #[must_use]
    pub fn cells(&self) -> &'a [Facelet] {
        self.cells
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a [Facelet]> {
        self.cells.chunks_exact(self.n)
    }

    #[must_use]
    pub fn row(&self, row: usize) -> Vec<Facelet> {
        self.cells[row * self.n..(row + 1) * self.n].to_vec()
    }

    #[must_use]
    pub fn column(&self, col: usize) -> Vec<Facelet> {
        self.rows().map(|row| row[col]).collect()
    }

    #[must_use]
    pub fn is_uniform(&self) -> bool {
        self.cells.iter().all(|&cell| cell == self.face)
    }
}

impl fmt::Debug for Cube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cube")
            .field("n", &self.n)
            .field(
                "facelets",
                &self.facelets.iter().map(|v| v.symbol()).collect::<String>(),
            )
            .finish()
    }
}

/// Prints the standard net: Up on top, then Left Front Right Back, then Down
impl fmt::Display for Cube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pad = " ".repeat(2 * self.n + 1);
        let row_str = |face: Facelet, row: usize| {
            self.face(face)
                .row(row)
                .iter()
                .map(|v| v.symbol())
                .join(" ")
        };

        for row in 0..self.n {
            writeln!(f, "{pad}{}", row_str(Facelet::Up, row))?;
        }
        writeln!(f)?;

        for row in 0..self.n {
            writeln!(
                f,
                "{}",
                [Facelet::Left, Facelet::Front, Facelet::Right, Facelet::Back]
                    .into_iter()
                    .map(|face| row_str(face, row))
                    .join("  ")
            )?;
        }
        writeln!(f)?;

        for row in 0..self.n {
            writeln!(f, "{pad}{}", row_str(Facelet::Down, row))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn solved_is_complete() {
        for n in 2..=6 {
            let cube = Cube::solved(n).unwrap();
            assert!(cube.is_complete());
            assert_eq!(cube.identity_counts(), [n * n; 6]);
            assert_eq!(cube.facelets().len(), 6 * n * n);
        }
    }

    #[test]
    fn bad_sizes() {
        assert!(matches!(Cube::solved(0), Err(CubeError::InvalidSize(0))));
        assert!(matches!(Cube::solved(1), Err(CubeError::InvalidSize(1))));
        assert!(Cube::solved(MAX_SIZE + 1).is_err());
    }

    #[test]
    fn observation_round_trip() {
        let mut cube = Cube::solved(3).unwrap();
        cube.facelets_mut()[0] = Facelet::Up;
        cube.facelets_mut()[4 * 9 + 4] = Facelet::Down;

        let obs = cube.observation();
        assert_eq!(obs.len(), 54);
        // First cell stacks F L B R U D
        assert_eq!(&obs[..6], &[2, 4, 3, 1, 4, 5]);

        let back = Cube::from_observation(3, &obs, Validation::Shape).unwrap();
        assert_eq!(back, cube);
        assert!(matches!(
            Cube::from_observation(3, &obs, Validation::Strict),
            Err(CubeError::ConservationViolated { .. })
        ));
    }

    #[test]
    fn rejects_malformed_observation() {
        let obs = Cube::solved(3).unwrap().observation();

        assert!(matches!(
            Cube::from_observation(3, &obs[1..], Validation::Shape),
            Err(CubeError::MalformedShape {
                expected: 54,
                found: 53
            })
        ));
        assert!(matches!(
            Cube::from_observation(2, &obs, Validation::Shape),
            Err(CubeError::MalformedShape { .. })
        ));

        let mut bad = obs.clone();
        bad[10] = 6;
        assert!(matches!(
            Cube::from_observation(3, &bad, Validation::Shape),
            Err(CubeError::InvalidFaceletValue(6))
        ));
    }

    #[test]
    fn from_faces_checks_grids() {
        let mut faces = Facelet::ALL.map(|face| vec![face; 4]);
        assert!(Cube::from_faces(2, &faces, Validation::Strict).unwrap().is_complete());

        faces[3].pop();
        assert!(matches!(
            Cube::from_faces(2, &faces, Validation::Shape),
            Err(CubeError::MalformedShape {
                expected: 4,
                found: 3
            })
        ));
    }

    #[test]
    fn face_views() {
        let mut cube = Cube::solved(3).unwrap();
        // Up, row 1, col 2
        cube.facelets_mut()[4 * 9 + 5] = Facelet::Back;

        let up = cube.face(Facelet::Up);
        assert_eq!(up.get(1, 2), Facelet::Back);
        assert_eq!(up.row(1), vec![Facelet::Up, Facelet::Up, Facelet::Back]);
        assert_eq!(up.column(2), vec![Facelet::Up, Facelet::Back, Facelet::Up]);
        assert_eq!(up.rows().count(), 3);
        assert!(!up.is_uniform());
        assert!(!cube.is_complete());
    }

    #[test]
    fn net_layout() {
        let cube = Cube::solved(2).unwrap();

        assert_eq!(
            cube.to_string(),
            "     U U\n     U U\n\nL L  F F  R R  B B\nL L  F F  R R  B B\n\n     D D\n     D D\n"
        );
    }
}
