//! Ship orientations and the four compass directions.
use rand::{
    distributions::{Distribution, Standard},
    Rng,
};
use serde::{Deserialize, Serialize};

use crate::board::Offset;

/// Facing of a ship, or the direction of a multi-shot volley. Variants are ordered by
/// counter-clockwise quarter turns starting from `Right`, which is the orientation ship
/// footprints are authored in.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Right,
    Up,
    Left,
    Down,
}

impl Orientation {
    /// All orientations in rotation order.
    pub const ALL: [Orientation; 4] = [
        Orientation::Right,
        Orientation::Up,
        Orientation::Left,
        Orientation::Down,
    ];

    /// Get the orientation with the given rotation index (`0..4`).
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }

    /// Number of counter-clockwise quarter turns from `Right`.
    pub fn index(self) -> u8 {
        match self {
            Orientation::Right => 0,
            Orientation::Up => 1,
            Orientation::Left => 2,
            Orientation::Down => 3,
        }
    }

    /// The orientation one quarter turn counter-clockwise from this one.
    pub fn rotate_counterclockwise(self) -> Self {
        Self::ALL[usize::from((self.index() + 1) % 4)]
    }

    /// Rotate an offset authored for `Right` into this orientation.
    pub fn rotate(self, offset: Offset) -> Offset {
        let Offset { dx, dy } = offset;
        match self {
            Orientation::Right => Offset::new(dx, dy),
            Orientation::Up => Offset::new(-dy, dx),
            Orientation::Left => Offset::new(-dx, -dy),
            Orientation::Down => Offset::new(dy, -dx),
        }
    }

    /// Unit step in this direction.
    pub fn step(self) -> Offset {
        self.rotate(Offset::new(1, 0))
    }

    /// True for `Up` and `Down`, where a footprint's width and height trade places.
    pub fn is_vertical(self) -> bool {
        matches!(self, Orientation::Up | Orientation::Down)
    }
}

impl Distribution<Orientation> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Orientation {
        Orientation::ALL[rng.gen_range(0, 4)]
    }
}
