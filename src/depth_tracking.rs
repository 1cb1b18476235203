use crate::{element::Element, MAX_DEPTH};

/// Returned when an element would nest deeper than [`MAX_DEPTH`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthExceeded;

#[derive(Clone, Debug, Default)]
pub struct DepthTracker {
    tracking: Vec<usize>,
}

impl DepthTracker {
    /// Create a new depth tracker
    pub fn new() -> Self {
        Self {
            tracking: Vec::new(),
        }
    }

    /// Update the depth tracker on each new element to serialize or parse.
    pub fn update_elem(&mut self, elem: &Element) -> Result<(), DepthExceeded> {
        // Subtract from count for next element
        if let Some(v) = self.tracking.last_mut() {
            *v = v.saturating_sub(1);
        }

        // Increase nest depth if this is a nesting element
        match elem {
            Element::Map(len) => self.tracking.push(len.saturating_mul(2)), // 2 elements per map item
            Element::Array(len) => self.tracking.push(*len),
            _ => (),
        }

        // Empty containers close immediately, so they never count against the limit
        self.purge_zeros();
        if self.tracking.len() > MAX_DEPTH {
            return Err(DepthExceeded);
        }
        Ok(())
    }

    /// Drop any depth tracking elements that have hit zero
    pub fn purge_zeros(&mut self) {
        while let Some(0) = self.tracking.last() {
            self.tracking.pop();
        }
    }

    /// Drop a depth before we've seen enough elements. Used by map/seq serializers that didn't
    /// know their total length ahead of time: they push a maximally-sized placeholder, run
    /// through the tracker as normal, then call this when done.
    pub fn early_end(&mut self) {
        self.tracking.pop();
        self.purge_zeros();
    }
}
