// Copyright 2020 Zachary Stewart
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::board::{Offset, RectDimensions, ShipPose};

/// Linear board indexes covered by a ship in a particular pose.
pub type ShapeProjection = Vec<usize>;

/// The shape of a ship: offsets of each of its parts from the pivot, pivot first.
///
/// Footprints are authored facing [`Right`][crate::board::Orientation::Right] and must
/// keep every part in the quadrant `dx >= 0, dy <= 0`, i.e. the ship extends right and
/// down from its pivot. The order of the parts is the order of the ship's slice of the
/// damage track.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Footprint(Vec<Offset>);

impl Footprint {
    /// Construct a footprint from its parts.
    pub fn new(parts: Vec<Offset>) -> Self {
        Footprint(parts)
    }

    /// A straight ship with the specified length. Panics if len is 0.
    pub fn line(len: usize) -> Self {
        assert!(len > 0);
        Footprint((0..len as i32).map(|dx| Offset::new(dx, 0)).collect())
    }

    /// A solid rectangle, filled row by row from the pivot. Panics if either side is 0.
    pub fn rect(width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0);
        let mut parts = Vec::with_capacity(width * height);
        for dy in 0..height as i32 {
            for dx in 0..width as i32 {
                parts.push(Offset::new(dx, -dy));
            }
        }
        Footprint(parts)
    }

    /// Number of cells this ship covers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Offsets of every part, pivot first.
    pub fn parts(&self) -> &[Offset] {
        &self.0
    }

    /// Width and height of the footprint's bounding box, facing right.
    pub fn extents(&self) -> (usize, usize) {
        let span = |values: &mut dyn Iterator<Item = i32>| {
            let (min, max) = values.fold((i32::max_value(), i32::min_value()), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
            if min > max {
                0
            } else {
                (max - min) as usize + 1
            }
        };
        (
            span(&mut self.0.iter().map(|p| p.dx)),
            span(&mut self.0.iter().map(|p| p.dy)),
        )
    }

    /// Returns true if the pivot comes first, no part repeats, and every part lies in the
    /// authoring quadrant.
    pub fn is_canonical(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.0.len());
        self.0.first() == Some(&Offset::ZERO)
            && self
                .0
                .iter()
                .all(|part| part.dx >= 0 && part.dy <= 0 && seen.insert(*part))
    }

    /// Check whether the bounding box of this footprint fits on the board in the given
    /// pose. Cheaper than [`project`][Self::project] and agrees with it for canonical
    /// footprints.
    pub fn fits(&self, pose: ShipPose, dim: &RectDimensions) -> bool {
        let (width, height) = self.extents();
        dim.fits(width, height, pose.pivot, pose.orientation)
    }

    /// Compute the board cells this ship occupies in the given pose, in part order.
    /// Returns `None` if any part falls off the board.
    pub fn project(&self, pose: ShipPose, dim: &RectDimensions) -> Option<ShapeProjection> {
        self.0
            .iter()
            .map(|&part| {
                pose.pivot
                    .offset(pose.orientation.rotate(part))
                    .and_then(|coord| dim.try_linearize(&coord))
            })
            .collect()
    }
}
