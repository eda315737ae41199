use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// The buttons held down on the gamepad during a single frame, as a bitmask.
/// This is the primary output of the agent, and the label on every tree edge.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ButtonSet(u32);

impl ButtonSet {
    /// The empty set: no buttons pressed this frame.
    pub const EMPTY: ButtonSet = ButtonSet(0);

    pub fn new(bits: u32) -> Self {
        ButtonSet(bits)
    }

    /// Raw bitmask value.
    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Check whether every button of `other` is held in this set.
    pub fn contains(&self, other: ButtonSet) -> bool {
        self.0 & other.0 == other.0
    }

    /// Number of buttons held in this set.
    pub fn button_count(&self) -> u32 {
        self.0.count_ones()
    }

    /// All distinct button sets formable by independently toggling each bit of
    /// `mask` while keeping the bits of `base` held. Always contains `base`
    /// itself; bits shared between `base` and `mask` cannot be released, so the
    /// result has exactly `2^popcount(mask & !base)` entries, none duplicated.
    pub fn combinations(base: ButtonSet, mask: ButtonSet) -> Vec<ButtonSet> {
        let toggleable = mask.0 & !base.0;
        let mut result = Vec::with_capacity(1 << toggleable.count_ones());

        // Standard submask walk; subset 0 contributes the base itself.
        let mut subset = 0u32;
        loop {
            result.push(ButtonSet(base.0 | subset));
            subset = subset.wrapping_sub(toggleable) & toggleable;
            if subset == 0 {
                break;
            }
        }

        result
    }
}

impl BitOr for ButtonSet {
    type Output = ButtonSet;

    fn bitor(self, rhs: ButtonSet) -> ButtonSet {
        ButtonSet(self.0 | rhs.0)
    }
}

impl BitOrAssign for ButtonSet {
    fn bitor_assign(&mut self, rhs: ButtonSet) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for ButtonSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010b}", self.0)
    }
}

/// The legal one-frame inputs for a gamepad: a set of mutually exclusive
/// directional values (at most one may be active per frame) crossed with a
/// freely-combinable auxiliary button mask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSpace {
    /// One entry per d-pad direction. Keeping these as whole sets rather than
    /// a mask guarantees opposing directions are never pressed together.
    pub directions: Vec<ButtonSet>,
    /// Buttons that may be pressed simultaneously with anything.
    pub buttons: ButtonSet,
}

impl InputSpace {
    pub fn new(directions: Vec<ButtonSet>, buttons: ButtonSet) -> Self {
        InputSpace {
            directions,
            buttons,
        }
    }

    /// Upper bound on the number of legal inputs, assuming the directional
    /// values do not overlap the auxiliary mask.
    pub fn combination_count(&self) -> usize {
        self.directions.len() << self.buttons.button_count()
    }

    /// Every legal input: for each direction, every auxiliary combination
    /// unioned with it.
    pub fn all_inputs(&self) -> Vec<ButtonSet> {
        let mut inputs = Vec::with_capacity(self.combination_count());

        for direction in &self.directions {
            inputs.extend(ButtonSet::combinations(*direction, self.buttons));
        }

        debug_assert_eq!(inputs.len(), self.combination_count());
        inputs
    }

    /// Sample one legal input uniformly enough for rollouts: a random
    /// direction unioned with a random submask of the auxiliary buttons.
    pub fn random_input<R: Rng>(&self, rng: &mut R) -> ButtonSet {
        self.random_direction(rng) | self.random_buttons(rng)
    }

    fn random_direction<R: Rng>(&self, rng: &mut R) -> ButtonSet {
        if self.directions.is_empty() {
            ButtonSet::EMPTY
        } else {
            self.directions[rng.gen_range(0..self.directions.len())]
        }
    }

    fn random_buttons<R: Rng>(&self, rng: &mut R) -> ButtonSet {
        ButtonSet(rng.next_u32() & self.buttons.0)
    }
}
