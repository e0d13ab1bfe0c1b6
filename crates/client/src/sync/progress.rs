//! Status-progress animation state.
//!
//! A UI rendering an order's fulfillment track animates the highlighted step
//! toward the order's current status one step per tick, never skipping and
//! never moving backwards. This module owns only the step arithmetic; the
//! tick interval and the rendering belong to the UI.

use shoplive_core::OrderStatus;

/// Displayed-step state for one order's fulfillment track.
///
/// The displayed index is monotone: a target earlier than the displayed
/// step (which the canonical ordering rules out anyway) never moves the
/// display backwards. `Cancelled` has no step on the track; the display
/// freezes where it is and the UI shows the cancelled state directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusProgress {
    displayed: usize,
}

impl StatusProgress {
    #[must_use]
    pub const fn new() -> Self {
        Self { displayed: 0 }
    }

    /// Start from an already-rendered step (e.g. after a re-mount).
    #[must_use]
    pub const fn starting_at(step: usize) -> Self {
        Self { displayed: step }
    }

    /// The currently displayed step index.
    #[must_use]
    pub const fn displayed_step(self) -> usize {
        self.displayed
    }

    /// Advance one step toward the target status. Call once per tick.
    ///
    /// Returns the displayed step after the advance. A `Cancelled` target
    /// does not animate: there is no step to walk toward.
    pub fn advance_toward(&mut self, target: OrderStatus) -> usize {
        if let Some(target_index) = target.step_index()
            && self.displayed < target_index
        {
            self.displayed += 1;
        }
        self.displayed
    }

    /// Whether the display has caught up with the target.
    ///
    /// `Cancelled` counts as reached: it is shown as its own state, not
    /// animated along the track.
    #[must_use]
    pub fn has_reached(self, target: OrderStatus) -> bool {
        target
            .step_index()
            .is_none_or(|target_index| self.displayed >= target_index)
    }
}
