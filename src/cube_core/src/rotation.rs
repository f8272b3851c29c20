use std::fmt;

use crate::{
    CubeError, Facelet,
    cube::{Cube, check_size},
    facelet::Vec3,
};

/// The direction of a twist, as seen looking at the named face from outside the cube
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Direction {
    Anticlockwise = 0,
    Clockwise = 1,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Anticlockwise, Direction::Clockwise];

    /// # Errors
    ///
    /// Returns `CubeError::InvalidDirection` unless `index` is 0 or 1
    pub fn from_index(index: u8) -> Result<Direction, CubeError> {
        match index {
            0 => Ok(Direction::Anticlockwise),
            1 => Ok(Direction::Clockwise),
            _ => Err(CubeError::InvalidDirection(index)),
        }
    }

    #[must_use]
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::Anticlockwise => Direction::Clockwise,
            Direction::Clockwise => Direction::Anticlockwise,
        }
    }
}

/// The largest slice distance allowed on a cube of size `n`
#[must_use]
pub const fn max_slice(n: usize) -> u8 {
    ((n - 1) / 2) as u8
}

/// A 90° twist of one layer of the cube.
///
/// Only constructed through checked constructors, so the slice distance is always valid for the
/// cube size it was built for. [`TwistEngine`] still checks it against its own size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Action {
    face: Facelet,
    direction: Direction,
    slice: u8,
}

impl Action {
    /// # Errors
    ///
    /// Fails if `n` is not a valid cube size or `slice` is deeper than `(n - 1) / 2`
    pub fn new(
        face: Facelet,
        direction: Direction,
        slice: u8,
        n: usize,
    ) -> Result<Action, CubeError> {
        check_size(n)?;

        let max = max_slice(n);
        if slice > max {
            return Err(CubeError::InvalidSlice { slice, max, n });
        }

        Ok(Action {
            face,
            direction,
            slice,
        })
    }

    /// Build an action from the numeric triple used by external callers and the table format
    ///
    /// # Errors
    ///
    /// Fails if any of the three fields is out of its domain
    pub fn from_raw(face: u8, direction: u8, slice: u8, n: usize) -> Result<Action, CubeError> {
        Action::new(
            Facelet::from_index(face)?,
            Direction::from_index(direction)?,
            slice,
            n,
        )
    }

    #[must_use]
    pub fn to_raw(self) -> [u8; 3] {
        [self.face as u8, self.direction as u8, self.slice]
    }

    /// Draw a uniformly random valid action for a cube of size `n`
    ///
    /// # Panics
    ///
    /// Panics if `n` is not a valid cube size
    pub fn sample(n: usize, rng: &mut fastrand::Rng) -> Action {
        assert!(check_size(n).is_ok(), "Invalid cube size {n}");

        Action {
            face: Facelet::ALL[rng.usize(0..6)],
            direction: Direction::ALL[rng.usize(0..2)],
            slice: rng.u8(0..=max_slice(n)),
        }
    }

    /// Every action of a cube of size `n`, ordered by face, then direction, then slice.
    ///
    /// With `deep_slices` false only the outer layers are included.
    ///
    /// # Errors
    ///
    /// Fails if `n` is not a valid cube size
    pub fn all(n: usize, deep_slices: bool) -> Result<Vec<Action>, CubeError> {
        check_size(n)?;
        Ok(Action::enumerate(n, deep_slices))
    }

    /// [`Action::all`] for a size that has already been checked
    fn enumerate(n: usize, deep_slices: bool) -> Vec<Action> {
        let deepest = if deep_slices { max_slice(n) } else { 0 };
        let mut out = Vec::with_capacity(12 * (usize::from(deepest) + 1));

        for face in Facelet::ALL {
            for direction in Direction::ALL {
                for slice in 0..=deepest {
                    out.push(Action {
                        face,
                        direction,
                        slice,
                    });
                }
            }
        }

        out
    }

    #[must_use]
    pub fn face(self) -> Facelet {
        self.face
    }

    #[must_use]
    pub fn direction(self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn slice(self) -> u8 {
        self.slice
    }

    /// The same layer turned the other way
    #[must_use]
    pub fn inverse(self) -> Action {
        Action {
            direction: self.direction.opposite(),
            ..self
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.face)?;
        if self.direction == Direction::Anticlockwise {
            write!(f, "'")?;
        }
        if self.slice > 0 {
            write!(f, "@{}", self.slice)?;
        }
        Ok(())
    }
}

/// The facelet movements of a single twist, as `(destination, source)` index pairs
#[derive(Debug, Clone)]
struct Twist {
    moves: Box<[(u32, u32)]>,
}

/// Applies twists to cubes of one size.
///
/// The facelet permutation of every twist is derived once from the cube's geometry: each facelet
/// is placed at a point on the cube's surface, and the points in the twisted layer are rotated a
/// quarter turn about the named face's outward normal.
#[derive(Debug, Clone)]
pub struct TwistEngine {
    n: usize,
    twists: Box<[Twist]>,
}

fn dot(a: Vec3, b: Vec3) -> i32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Rotate `p` a quarter turn about the unit axis `axis`, clockwise when looking down the axis
/// towards the origin
fn quarter_turn(p: Vec3, axis: Vec3, direction: Direction) -> Vec3 {
    let along = dot(axis, p);
    let turned = match direction {
        Direction::Clockwise => cross(p, axis),
        Direction::Anticlockwise => cross(axis, p),
    };

    [
        turned[0] + along * axis[0],
        turned[1] + along * axis[1],
        turned[2] + along * axis[2],
    ]
}

/// The surface point of a facelet, in half-cubie units from the cube's centre
fn sticker_point(n: usize, index: usize) -> Vec3 {
    let area = n * n;
    let face = Facelet::ALL[index / area];
    let row = ((index % area) / n) as i32;
    let col = (index % n) as i32;
    let n = n as i32;

    let (normal, right, down) = (face.normal(), face.right(), face.down());
    let u = 2 * col - (n - 1);
    let v = 2 * row - (n - 1);

    [0, 1, 2].map(|i| n * normal[i] + u * right[i] + v * down[i])
}

fn sticker_index(n: usize, p: Vec3) -> usize {
    let n_i = n as i32;

    let Some(face) = Facelet::ALL
        .into_iter()
        .find(|face| dot(face.normal(), p) == n_i)
    else {
        unreachable!("{p:?} is not on the surface of a cube of size {n}");
    };

    let col = ((dot(face.right(), p) + n_i - 1) / 2) as usize;
    let row = ((dot(face.down(), p) + n_i - 1) / 2) as usize;

    face.index() * n * n + row * n + col
}

impl TwistEngine {
    /// Derive every twist of a cube of size `n`
    ///
    /// # Errors
    ///
    /// Fails if `n` is not a valid cube size
    pub fn new(n: usize) -> Result<TwistEngine, CubeError> {
        check_size(n)?;

        let n_i = n as i32;
        let layers = usize::from(max_slice(n)) + 1;

        // Facelets in each (face, slice) layer
        let mut members = vec![Vec::new(); 6 * layers];

        for index in 0..6 * n * n {
            let p = sticker_point(n, index);

            for face in Facelet::ALL {
                let depth = dot(face.normal(), p);

                let slice = if depth == n_i {
                    0
                } else if depth >= 0 && (n_i - 1 - depth) % 2 == 0 {
                    ((n_i - 1 - depth) / 2) as usize
                } else {
                    continue;
                };

                if slice < layers {
                    members[face.index() * layers + slice].push(index);
                }
            }
        }

        let mut twists = Vec::with_capacity(12 * layers);

        for face in Facelet::ALL {
            for direction in Direction::ALL {
                for slice in 0..layers {
                    let moves = members[face.index() * layers + slice]
                        .iter()
                        .map(|&src| {
                            let dest =
                                sticker_index(n, quarter_turn(sticker_point(n, src), face.normal(), direction));
                            (dest as u32, src as u32)
                        })
                        .collect();

                    twists.push(Twist { moves });
                }
            }
        }

        Ok(TwistEngine {
            n,
            twists: twists.into_boxed_slice(),
        })
    }

    /// The cube size this engine twists
    #[must_use]
    pub fn size(&self) -> usize {
        self.n
    }

    /// Every action of this engine's cube size; see [`Action::all`]
    #[must_use]
    pub fn actions(&self, deep_slices: bool) -> Vec<Action> {
        Action::enumerate(self.n, deep_slices)
    }

    fn twist_for(&self, cube: &Cube, action: Action) -> Result<&Twist, CubeError> {
        if cube.size() != self.n {
            return Err(CubeError::SizeMismatch {
                engine: self.n,
                cube: cube.size(),
            });
        }

        let max = max_slice(self.n);
        if action.slice > max {
            return Err(CubeError::InvalidSlice {
                slice: action.slice,
                max,
                n: self.n,
            });
        }

        let layers = usize::from(max) + 1;
        let idx = (action.face.index() * 2 + action.direction as usize) * layers
            + usize::from(action.slice);

        Ok(&self.twists[idx])
    }

    /// Return a twisted copy of `cube`
    ///
    /// # Errors
    ///
    /// Fails without touching anything if the action or cube does not fit this engine
    pub fn apply(&self, cube: &Cube, action: Action) -> Result<Cube, CubeError> {
        let twist = self.twist_for(cube, action)?;

        let mut out = cube.clone();
        let (from, to) = (cube.facelets(), out.facelets_mut());
        for &(dest, src) in &twist.moves {
            to[dest as usize] = from[src as usize];
        }

        Ok(out)
    }

    /// Twist `cube` in place
    ///
    /// # Errors
    ///
    /// Fails without touching the cube if the action or cube does not fit this engine
    pub fn apply_in_place(&self, cube: &mut Cube, action: Action) -> Result<(), CubeError> {
        let twist = self.twist_for(cube, action)?;

        let facelets = cube.facelets_mut();
        let moved = twist
            .moves
            .iter()
            .map(|&(_, src)| facelets[src as usize])
            .collect::<Vec<_>>();

        for (&(dest, _), value) in twist.moves.iter().zip(moved) {
            facelets[dest as usize] = value;
        }

        Ok(())
    }

    /// Apply a sequence of actions in order, returning the final cube
    ///
    /// # Errors
    ///
    /// Fails on the first invalid action. The input cube is never modified.
    pub fn apply_all(
        &self,
        cube: &Cube,
        actions: impl IntoIterator<Item = Action>,
    ) -> Result<Cube, CubeError> {
        let mut out = cube.clone();

        for action in actions {
            self.apply_in_place(&mut out, action)?;
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn scrambled(engine: &TwistEngine, seed: u64) -> Cube {
        let mut rng = fastrand::Rng::with_seed(seed);
        let n = engine.size();

        engine
            .apply_all(
                &Cube::solved(n).unwrap(),
                (0..10 * n).map(|_| Action::sample(n, &mut rng)),
            )
            .unwrap()
    }

    #[test]
    fn left_clockwise_cycles_columns() {
        let engine = TwistEngine::new(3).unwrap();
        let col = |cube: &Cube, face, c| cube.face(face).column(c);
        let rev = |mut v: Vec<Facelet>| {
            v.reverse();
            v
        };

        // Scrambles repeat colours within a face, so check several to catch swapped cells
        for seed in 0..8 {
            let before = scrambled(&engine, seed);
            let after = engine
                .apply(
                    &before,
                    Action::new(Facelet::Left, Direction::Clockwise, 0, 3).unwrap(),
                )
                .unwrap();

            assert_eq!(col(&after, Facelet::Down, 0), col(&before, Facelet::Front, 0));
            assert_eq!(col(&after, Facelet::Front, 0), col(&before, Facelet::Up, 0));
            assert_eq!(col(&after, Facelet::Up, 0), rev(col(&before, Facelet::Back, 2)));
            assert_eq!(col(&after, Facelet::Back, 2), rev(col(&before, Facelet::Down, 0)));

            // The Left face turns clockwise: its bottom-left corner becomes its top-left corner
            let left_before = before.face(Facelet::Left);
            let left_after = after.face(Facelet::Left);
            for row in 0..3 {
                for c in 0..3 {
                    assert_eq!(left_after.get(row, c), left_before.get(2 - c, row));
                }
            }

            // Nothing else moves
            assert_eq!(
                after.face(Facelet::Right).cells(),
                before.face(Facelet::Right).cells()
            );
            for face in [Facelet::Down, Facelet::Front, Facelet::Up] {
                for c in 1..3 {
                    assert_eq!(col(&after, face, c), col(&before, face, c));
                }
            }
            for c in 0..2 {
                assert_eq!(col(&after, Facelet::Back, c), col(&before, Facelet::Back, c));
            }
        }
    }

    #[test]
    fn up_clockwise_moves_front_to_left() {
        let engine = TwistEngine::new(4).unwrap();
        let solved = Cube::solved(4).unwrap();

        let after = engine
            .apply(
                &solved,
                Action::new(Facelet::Up, Direction::Clockwise, 1, 4).unwrap(),
            )
            .unwrap();

        assert_eq!(after.face(Facelet::Left).row(1), vec![Facelet::Front; 4]);
        assert_eq!(after.face(Facelet::Back).row(1), vec![Facelet::Left; 4]);
        assert_eq!(after.face(Facelet::Right).row(1), vec![Facelet::Back; 4]);
        assert_eq!(after.face(Facelet::Front).row(1), vec![Facelet::Right; 4]);
        // An inner slice leaves the named face alone
        assert!(after.face(Facelet::Up).is_uniform());
        assert_eq!(after.face(Facelet::Left).row(0), vec![Facelet::Left; 4]);
    }

    #[test]
    fn inverse_undoes_every_action() {
        for n in 2..=5 {
            let engine = TwistEngine::new(n).unwrap();

            for start in [Cube::solved(n).unwrap(), scrambled(&engine, n as u64)] {
                for action in engine.actions(true) {
                    let there = engine.apply(&start, action).unwrap();
                    let back = engine.apply(&there, action.inverse()).unwrap();
                    assert_eq!(back, start, "{action} on n = {n}");
                }
            }
        }
    }

    #[test]
    fn four_quarter_turns_are_identity() {
        for n in 2..=5 {
            let engine = TwistEngine::new(n).unwrap();
            let solved = Cube::solved(n).unwrap();

            for start in [solved.clone(), scrambled(&engine, 100 + n as u64)] {
                for action in engine.actions(true) {
                    let mut cube = start.clone();
                    for i in 0..4 {
                        if i > 0 && start == solved {
                            assert_ne!(cube, start, "{action} has order {i} on n = {n}");
                        }
                        engine.apply_in_place(&mut cube, action).unwrap();
                    }
                    assert_eq!(cube, start, "{action} on n = {n}");
                }
            }
        }
    }

    #[test]
    fn single_outer_twist_never_solves() {
        for n in 2..=5 {
            let engine = TwistEngine::new(n).unwrap();
            let solved = Cube::solved(n).unwrap();
            assert!(solved.is_complete());

            for action in engine.actions(false) {
                let cube = engine.apply(&solved, action).unwrap();
                assert!(!cube.is_complete(), "{action} on n = {n}");
                cube.check_conservation().unwrap();
            }
        }
    }

    #[test]
    fn opposite_slices_share_a_layer() {
        // On odd cubes the middle slice is reachable from both sides
        let engine = TwistEngine::new(3).unwrap();
        let solved = Cube::solved(3).unwrap();

        let from_left = engine
            .apply(
                &solved,
                Action::new(Facelet::Left, Direction::Clockwise, 1, 3).unwrap(),
            )
            .unwrap();
        let from_right = engine
            .apply(
                &solved,
                Action::new(Facelet::Right, Direction::Anticlockwise, 1, 3).unwrap(),
            )
            .unwrap();

        assert_eq!(from_left, from_right);
    }

    #[test]
    fn rejects_invalid_actions() {
        assert!(matches!(
            Action::from_raw(6, 0, 0, 3),
            Err(CubeError::InvalidFace(6))
        ));
        assert!(matches!(
            Action::from_raw(0, 2, 0, 3),
            Err(CubeError::InvalidDirection(2))
        ));
        assert!(matches!(
            Action::from_raw(0, 0, 2, 4),
            Err(CubeError::InvalidSlice {
                slice: 2,
                max: 1,
                n: 4
            })
        ));
        assert_eq!(Action::from_raw(5, 1, 2, 5).unwrap().to_raw(), [5, 1, 2]);

        // Valid for a 5x5 but too deep for this engine
        let engine = TwistEngine::new(3).unwrap();
        let deep = Action::new(Facelet::Up, Direction::Clockwise, 2, 5).unwrap();
        let mut cube = Cube::solved(3).unwrap();
        assert!(matches!(
            engine.apply_in_place(&mut cube, deep),
            Err(CubeError::InvalidSlice { .. })
        ));
        assert!(cube.is_complete());

        let other = Cube::solved(4).unwrap();
        assert!(matches!(
            engine.apply(&other, Action::from_raw(0, 0, 0, 3).unwrap()),
            Err(CubeError::SizeMismatch { engine: 3, cube: 4 })
        ));
    }

    #[test]
    fn action_listing() {
        let outer = Action::all(3, false).unwrap();
        assert_eq!(outer.len(), 12);
        assert_eq!(outer[0].to_raw(), [0, 0, 0]);
        assert_eq!(outer[1].to_raw(), [0, 1, 0]);
        assert_eq!(outer, TwistEngine::new(3).unwrap().actions(false));

        assert_eq!(Action::all(5, true).unwrap().len(), 36);
        assert_eq!(Action::all(2, true).unwrap().len(), 12);
        for n in 2..=7 {
            let engine = TwistEngine::new(n).unwrap();
            for deep_slices in [false, true] {
                assert_eq!(Action::all(n, deep_slices).unwrap(), engine.actions(deep_slices));
            }
        }

        let mut rng = fastrand::Rng::with_seed(1);
        for _ in 0..100 {
            let action = Action::sample(4, &mut rng);
            assert!(action.slice() <= 1);
        }
    }

    #[test]
    fn display() {
        assert_eq!(Action::from_raw(0, 1, 0, 3).unwrap().to_string(), "L");
        assert_eq!(Action::from_raw(4, 0, 0, 3).unwrap().to_string(), "U'");
        assert_eq!(Action::from_raw(2, 0, 1, 4).unwrap().to_string(), "F'@1");
    }
}
