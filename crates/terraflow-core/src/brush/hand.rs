//! The hand: a bounded carried-material inventory
//!
//! One hand exists per active brush session. It persists across strokes
//! and is reset only by explicit user action.

use serde::{Deserialize, Serialize};
use terraflow_simulation::HandMaterial;

/// Carried-material inventory. Invariant: `0 <= carried <= capacity`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Hand {
    material: HandMaterial,
    carried: f32,
    capacity: f32,
}

impl Hand {
    pub fn new(material: HandMaterial, capacity: f32) -> Self {
        Self {
            material,
            carried: 0.0,
            capacity: capacity.max(0.0),
        }
    }

    pub fn material(&self) -> HandMaterial {
        self.material
    }

    pub fn carried(&self) -> f32 {
        self.carried
    }

    pub fn capacity(&self) -> f32 {
        self.capacity
    }

    pub fn free_space(&self) -> f32 {
        (self.capacity - self.carried).max(0.0)
    }

    /// At/above this fraction of capacity the hand refuses pickups
    pub fn is_full(&self, full_fraction: f32) -> bool {
        self.carried >= self.capacity * full_fraction
    }

    /// At/below this fraction of capacity the hand refuses deposits
    pub fn is_empty(&self, empty_fraction: f32) -> bool {
        self.carried <= self.capacity * empty_fraction
    }

    /// Add picked-up mass, clamped to capacity. Returns the mass stored.
    pub fn store(&mut self, mass: f32) -> f32 {
        let stored = mass.max(0.0).min(self.free_space());
        self.carried += stored;
        stored
    }

    /// Remove deposited mass, clamped to what is carried. Returns the
    /// mass taken.
    pub fn take(&mut self, mass: f32) -> f32 {
        let taken = mass.max(0.0).min(self.carried);
        self.carried -= taken;
        taken
    }

    /// Re-bind the hand to a new material. Carried mass is dropped; the
    /// economy only permits this when the hand is effectively empty.
    pub fn rebind(&mut self, material: HandMaterial) {
        self.material = material;
        self.carried = 0.0;
    }

    /// Change the capacity; carried mass is clamped into the new bound.
    pub fn set_capacity(&mut self, capacity: f32) {
        self.capacity = capacity.max(0.0);
        self.carried = self.carried.min(self.capacity);
    }

    /// Explicit user reset: drop everything carried.
    pub fn reset(&mut self) {
        self.carried = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_and_take_respect_bounds() {
        let mut hand = Hand::new(HandMaterial::Soil, 10.0);
        assert_eq!(hand.store(4.0), 4.0);
        assert_eq!(hand.store(100.0), 6.0);
        assert_eq!(hand.carried(), 10.0);

        assert_eq!(hand.take(3.0), 3.0);
        assert_eq!(hand.take(100.0), 7.0);
        assert_eq!(hand.carried(), 0.0);
    }

    #[test]
    fn fullness_thresholds() {
        let mut hand = Hand::new(HandMaterial::Rock, 100.0);
        hand.store(99.0);
        assert!(hand.is_full(0.99));
        assert!(!hand.is_full(0.999));

        hand.reset();
        hand.store(1.0);
        assert!(hand.is_empty(0.01));
        hand.store(1.0);
        assert!(!hand.is_empty(0.01));
    }

    #[test]
    fn capacity_shrink_clamps_carried() {
        let mut hand = Hand::new(HandMaterial::Lava, 50.0);
        hand.store(40.0);
        hand.set_capacity(20.0);
        assert_eq!(hand.carried(), 20.0);
        assert_eq!(hand.capacity(), 20.0);
    }
}
