//! Distinguishes "this section was already out when the student loaded"
//! from "this section just dropped while they were working".
//!
//! The reconciler keeps a baseline of release indices it has already
//! accounted for and only reacts to genuinely new ones, so a student who
//! joins late is not greeted by a stack of stale notifications, and a
//! retransmitted or out-of-order push from the live channel is a no-op.

use std::collections::BTreeSet;

use crate::model::ReleasedSections;

/// Where the student currently is in their workflow, as reported by the
/// session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentStep {
    /// Actively reading a section.
    Reading,
    /// Reviewing their answers for a section.
    Review,
    /// Finished everything released and parked on the "waiting for the
    /// next section" screen.
    Waiting,
}

/// What the UI should do in response to a live release update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReleaseOutcome {
    /// Move the student straight to this section, no notification. Only
    /// produced for students already waiting on it.
    pub auto_advance_to: Option<usize>,
    /// Pop a dismissible "new section available" notification for this
    /// section.
    pub notify: Option<usize>,
}

impl ReleaseOutcome {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.auto_advance_to.is_none() && self.notify.is_none()
    }
}

/// Stateful watcher over the live release feed.
///
/// Monotonic by construction: the baseline only ever grows, which turns
/// at-least-once, unordered delivery from the push channel into
/// idempotent, order-independent convergence. A stale update with fewer
/// entries than the baseline diffs to the empty set and changes nothing.
#[derive(Debug, Clone)]
pub struct ReleaseReconciler {
    known_released: BTreeSet<usize>,
    pending_notification: Option<usize>,
}

impl ReleaseReconciler {
    /// Seeds the baseline with the sections already released at session
    /// load time. Those are discovered facts, not news, and must never
    /// produce a notification.
    #[must_use]
    pub fn new(baseline: &ReleasedSections) -> Self {
        Self {
            known_released: baseline.indices().clone(),
            pending_notification: None,
        }
    }

    /// Release indices already accounted for.
    #[must_use]
    pub fn known_released(&self) -> &BTreeSet<usize> {
        &self.known_released
    }

    /// The section a pending notification advertises, if any.
    #[must_use]
    pub fn pending(&self) -> Option<usize> {
        self.pending_notification
    }

    /// Folds a live-status release set into the baseline and decides
    /// what, if anything, the student should see.
    ///
    /// A waiting student whose immediately-next section arrives is moved
    /// there directly; that is the expected outcome of waiting, so no
    /// notification fires. A student mid-reading or mid-review gets at
    /// most one pending notification, advertising only the next section
    /// rather than an arbitrarily distant one.
    pub fn on_live_update(
        &mut self,
        released: &ReleasedSections,
        step: StudentStep,
        current_section: usize,
    ) -> ReleaseOutcome {
        let newly_released: BTreeSet<usize> = released
            .iter()
            .filter(|index| !self.known_released.contains(index))
            .collect();

        if newly_released.is_empty() {
            return ReleaseOutcome::default();
        }

        let mut outcome = ReleaseOutcome::default();
        let next_section = current_section + 1;

        if step == StudentStep::Waiting && newly_released.contains(&next_section) {
            outcome.auto_advance_to = Some(next_section);
        } else if matches!(step, StudentStep::Reading | StudentStep::Review) {
            // Non-empty set, so max exists.
            let max_newly = *newly_released.iter().next_back().unwrap_or(&0);
            if max_newly > current_section && self.pending_notification.is_none() {
                let target = max_newly.min(next_section);
                self.pending_notification = Some(target);
                outcome.notify = Some(target);
            }
        }

        self.known_released.extend(newly_released);
        outcome
    }

    /// Clears the pending notification without touching navigation.
    pub fn dismiss(&mut self) {
        self.pending_notification = None;
    }

    /// Consumes the pending notification, returning the section the
    /// student chose to jump to.
    pub fn accept(&mut self) -> Option<usize> {
        self.pending_notification.take()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
