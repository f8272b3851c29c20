use std::fmt;

use crate::CubeError;

/// The identity of a face, and of every facelet that starts out on it.
///
/// The discriminants are the numeric indices used by the action triple and the table file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Facelet {
    Left = 0,
    Right = 1,
    Front = 2,
    Back = 3,
    Up = 4,
    Down = 5,
}

/// The sticker colour of each face on a physical cube
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Orange,
    Red,
    White,
    Yellow,
    Blue,
    Green,
}

/// A point or direction in the cube's frame, in half-cubie units.
///
/// `x` points from Left to Right, `y` from Down to Up and `z` from Back to Front.
pub(crate) type Vec3 = [i32; 3];

impl Facelet {
    /// Every face in index order
    pub const ALL: [Facelet; 6] = [
        Facelet::Left,
        Facelet::Right,
        Facelet::Front,
        Facelet::Back,
        Facelet::Up,
        Facelet::Down,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Get the facelet with the given numeric index
    ///
    /// # Errors
    ///
    /// Returns `CubeError::InvalidFace` if `index` is not in `0..6`
    pub fn from_index(index: u8) -> Result<Facelet, CubeError> {
        Facelet::ALL
            .get(usize::from(index))
            .copied()
            .ok_or(CubeError::InvalidFace(index))
    }

    /// The letter used for this face in nets and logs
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Facelet::Left => 'L',
            Facelet::Right => 'R',
            Facelet::Front => 'F',
            Facelet::Back => 'B',
            Facelet::Up => 'U',
            Facelet::Down => 'D',
        }
    }

    #[must_use]
    pub const fn color(self) -> Color {
        match self {
            Facelet::Left => Color::Orange,
            Facelet::Right => Color::Red,
            Facelet::Front => Color::White,
            Facelet::Back => Color::Yellow,
            Facelet::Up => Color::Blue,
            Facelet::Down => Color::Green,
        }
    }

    #[must_use]
    pub const fn opposite(self) -> Facelet {
        match self {
            Facelet::Left => Facelet::Right,
            Facelet::Right => Facelet::Left,
            Facelet::Front => Facelet::Back,
            Facelet::Back => Facelet::Front,
            Facelet::Up => Facelet::Down,
            Facelet::Down => Facelet::Up,
        }
    }

    /// The outward normal of the face
    pub(crate) const fn normal(self) -> Vec3 {
        match self {
            Facelet::Left => [-1, 0, 0],
            Facelet::Right => [1, 0, 0],
            Facelet::Front => [0, 0, 1],
            Facelet::Back => [0, 0, -1],
            Facelet::Up => [0, 1, 0],
            Facelet::Down => [0, -1, 0],
        }
    }

    /// The direction of increasing column, looking at the face from outside
    pub(crate) const fn right(self) -> Vec3 {
        match self {
            Facelet::Left => [0, 0, 1],
            Facelet::Right => [0, 0, -1],
            Facelet::Front | Facelet::Up | Facelet::Down => [1, 0, 0],
            Facelet::Back => [-1, 0, 0],
        }
    }

    /// The direction of increasing row, looking at the face from outside
    pub(crate) const fn down(self) -> Vec3 {
        match self {
            Facelet::Left | Facelet::Right | Facelet::Front | Facelet::Back => [0, -1, 0],
            Facelet::Up => [0, 0, 1],
            Facelet::Down => [0, 0, -1],
        }
    }
}

impl TryFrom<u8> for Facelet {
    type Error = CubeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Facelet::from_index(value)
    }
}

impl From<Facelet> for u8 {
    fn from(value: Facelet) -> Self {
        value as u8
    }
}

impl fmt::Display for Facelet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl Color {
    /// The single letter name of the colour
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Color::Orange => 'O',
            Color::Red => 'R',
            Color::White => 'W',
            Color::Yellow => 'Y',
            Color::Blue => 'B',
            Color::Green => 'G',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_round_trip() {
        for face in Facelet::ALL {
            assert_eq!(Facelet::from_index(face.index() as u8).unwrap(), face);
        }

        assert!(matches!(
            Facelet::from_index(6),
            Err(CubeError::InvalidFace(6))
        ));
    }

    #[test]
    fn frames_are_viewed_from_outside() {
        fn cross(a: Vec3, b: Vec3) -> Vec3 {
            [
                a[1] * b[2] - a[2] * b[1],
                a[2] * b[0] - a[0] * b[2],
                a[0] * b[1] - a[1] * b[0],
            ]
        }

        for face in Facelet::ALL {
            let normal = face.normal();
            let inward = normal.map(|v| -v);
            assert_eq!(cross(face.right(), face.down()), inward, "{face}");
            assert_eq!(face.opposite().normal(), inward);
        }
    }

    #[test]
    fn symbols_and_colors_are_distinct() {
        let symbols = Facelet::ALL.map(Facelet::symbol);
        let colors = Facelet::ALL.map(|f| f.color().letter());

        for i in 0..6 {
            for j in (i + 1)..6 {
                assert_ne!(symbols[i], symbols[j]);
                assert_ne!(colors[i], colors[j]);
            }
        }
    }
}
