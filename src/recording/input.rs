// src/recording/input.rs
//! Pointer-move throttling
//!
//! Pointer moves arrive far more often than anything else. A move is kept
//! only once the pointer has travelled more than `threshold` pixels on
//! either axis since the last kept move.

/// Drops pointer moves that barely moved
#[derive(Debug, Clone, Default)]
pub struct PointerThrottle {
    threshold: i32,
    last: Option<(i32, i32)>,
}

impl PointerThrottle {
    /// `threshold` of 0 keeps every move
    pub fn new(threshold: i32) -> Self {
        Self {
            threshold,
            last: None,
        }
    }

    /// Whether a move to (`x`, `y`) should be recorded
    pub fn admit(&mut self, x: i32, y: i32) -> bool {
        if self.threshold <= 0 {
            return true;
        }

        // Without a previous position the raw coordinates are compared
        let (dx, dy) = match self.last {
            Some((last_x, last_y)) => ((last_x - x).abs(), (last_y - y).abs()),
            None => (x, y),
        };

        if dx > self.threshold || dy > self.threshold {
            self.last = Some((x, y));
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
