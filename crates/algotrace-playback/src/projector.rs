//! State projector: derives per-subject visual roles from steps.
//!
//! [`project`] is a pure function of the previous [`VisualState`] and one
//! [`Step`]. Folding it over a trace prefix one step at a time (as playback
//! does) gives the same state as [`project_prefix`] over the same prefix,
//! which is what scrubbing relies on.

use indexmap::IndexMap;

use algotrace_core::{Role, Step, StepEvent, Subject, TraceResult};

/// Role of every subject that is not `Normal`.
///
/// Persistent roles (pivot, min, sorted, ...) live in `roles`. The
/// single-step roles `Comparing` and `Swapping` live in `overlay`, which is
/// emptied at the start of every step, so a comparison shows on top of a
/// pivot without erasing it. Equality ignores insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisualState {
    roles: IndexMap<Subject, Role>,
    overlay: IndexMap<Subject, Role>,
}

impl VisualState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Displayed role of `subject`: its transient role if it has one, else
    /// its persistent role. Absent subjects are `Normal`.
    pub fn role(&self, subject: &Subject) -> Role {
        self.overlay
            .get(subject)
            .or_else(|| self.roles.get(subject))
            .copied()
            .unwrap_or_default()
    }

    /// Persistent role of `subject`, ignoring this step's transient role.
    pub fn base_role(&self, subject: &Subject) -> Role {
        self.roles.get(subject).copied().unwrap_or_default()
    }

    /// Displayed role of every non-normal subject, persistent holders first
    /// in the order they gained a role.
    pub fn roles(&self) -> Vec<(Subject, Role)> {
        let persistent = self.roles.keys();
        let transient_only = self
            .overlay
            .keys()
            .filter(|s| !self.roles.contains_key(*s));
        persistent
            .chain(transient_only)
            .map(|s| (*s, self.role(s)))
            .collect()
    }

    /// Subjects holding `role`. Transient roles are looked up in this step's
    /// overlay, persistent roles in the base layer.
    pub fn holders(&self, role: Role) -> Vec<Subject> {
        let layer = if role.is_transient() {
            &self.overlay
        } else {
            &self.roles
        };
        layer
            .iter()
            .filter(|(_, r)| **r == role)
            .map(|(s, _)| *s)
            .collect()
    }

    /// Number of subjects with a non-normal displayed role.
    pub fn len(&self) -> usize {
        self.roles.len()
            + self
                .overlay
                .keys()
                .filter(|s| !self.roles.contains_key(*s))
                .count()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.overlay.is_empty()
    }

    fn set(&mut self, subject: Subject, role: Role) {
        if role == Role::Normal {
            self.roles.shift_remove(&subject);
        } else {
            self.roles.insert(subject, role);
        }
    }

    /// Assigns `role` unless that would overwrite a settled result role.
    /// Transient roles go to the overlay and never touch the base layer.
    fn tag(&mut self, subject: Subject, role: Role) {
        if role.is_transient() {
            self.overlay.insert(subject, role);
            return;
        }
        if is_settled(self.base_role(&subject)) && !is_settled(role) {
            return;
        }
        self.set(subject, role);
    }

    fn tag_all(&mut self, step: &Step, role: Role) {
        for subject in &step.subjects {
            self.tag(*subject, role);
        }
    }

    fn clear_role(&mut self, role: Role) {
        self.roles.retain(|_, r| *r != role);
    }

    /// Applies one step in place.
    pub fn apply(&mut self, step: &Step) {
        self.overlay.clear();

        match &step.event {
            StepEvent::Compare { .. } => self.tag_all(step, Role::Comparing),
            StepEvent::Swap { .. } | StepEvent::MutateValue { .. } => {
                self.tag_all(step, Role::Swapping)
            }
            StepEvent::Visit { .. } | StepEvent::VisitNode { .. } => {
                self.tag_all(step, Role::Visited)
            }
            StepEvent::MarkRange { .. } => {
                self.clear_role(Role::Range);
                self.tag_all(step, Role::Range);
            }
            StepEvent::SetRole { role } => {
                if role.is_exclusive() {
                    self.clear_role(*role);
                }
                self.tag_all(step, *role);
            }
            StepEvent::Insert { .. } | StepEvent::Call { .. } | StepEvent::Move(_) => {
                self.tag_all(step, Role::Active)
            }
            StepEvent::Remove { .. } => {
                for subject in &step.subjects {
                    self.roles.shift_remove(subject);
                }
            }
            StepEvent::BaseCase { .. } => self.tag_all(step, Role::BaseCase),
            StepEvent::Return { .. } => self.tag_all(step, Role::Completed),
            StepEvent::Found { .. } => self.tag_all(step, Role::Found),
            StepEvent::NotFound => self.clear_role(Role::Range),
            StepEvent::FinalResult { result } => {
                if let TraceResult::Sorted(_) = result {
                    self.tag_all(step, Role::Sorted);
                }
            }
            StepEvent::Fault { .. } => {}
        }
    }
}

/// Roles that record an outcome and are not overwritten by activity roles.
fn is_settled(role: Role) -> bool {
    matches!(role, Role::Sorted | Role::Found)
}

/// Next visual state after `step`.
pub fn project(state: &VisualState, step: &Step) -> VisualState {
    let mut next = state.clone();
    next.apply(step);
    next
}

/// Folds [`project`] over `steps` starting from the default state.
pub fn project_prefix<'a>(steps: impl IntoIterator<Item = &'a Step>) -> VisualState {
    steps
        .into_iter()
        .fold(VisualState::default(), |state, step| project(&state, step))
}

#[cfg(test)]
mod tests {
    use super::*;
    use algotrace_core::{ElementId, Operand};

    fn el(i: u32) -> Subject {
        Subject::Element(ElementId(i))
    }

    fn compare(a: u32, b: u32) -> Step {
        Step::new(
            StepEvent::Compare {
                index: a as usize,
                with: Operand::Index(b as usize),
            },
            "compare",
        )
        .with_subjects([el(a), el(b)])
    }

    fn set_role(role: Role, subject: Subject) -> Step {
        Step::new(StepEvent::SetRole { role }, "role").with_subject(subject)
    }

    #[test]
    fn transient_roles_last_one_step() {
        let state = project(&VisualState::new(), &compare(0, 1));
        assert_eq!(state.role(&el(0)), Role::Comparing);
        let state = project(&state, &set_role(Role::Sorted, el(2)));
        assert_eq!(state.role(&el(0)), Role::Normal);
        assert_eq!(state.role(&el(2)), Role::Sorted);
    }

    #[test]
    fn exclusive_roles_move_to_the_newest_holder() {
        let state = project_prefix(&[set_role(Role::Pivot, el(0)), set_role(Role::Pivot, el(3))]);
        assert_eq!(state.holders(Role::Pivot), vec![el(3)]);

        let state = project_prefix(&[set_role(Role::Visited, el(0)), set_role(Role::Visited, el(3))]);
        assert_eq!(state.holders(Role::Visited).len(), 2);
    }

    #[test]
    fn ranges_replace_and_never_downgrade_found() {
        let range = |subjects: Vec<Subject>| {
            Step::new(StepEvent::MarkRange { low: 0, high: 0 }, "range").with_subjects(subjects)
        };
        let found = Step::new(StepEvent::Found { index: 1 }, "found").with_subject(el(1));
        let state = project_prefix(&[range(vec![el(0), el(1), el(2)]), found, range(vec![el(1), el(2)])]);
        assert_eq!(state.role(&el(0)), Role::Normal);
        assert_eq!(state.role(&el(1)), Role::Found);
        assert_eq!(state.role(&el(2)), Role::Range);
    }

    #[test]
    fn comparison_shows_over_a_persistent_role_without_erasing_it() {
        let state = project_prefix(&[set_role(Role::Pivot, el(3)), compare(0, 3)]);
        assert_eq!(state.role(&el(3)), Role::Comparing);
        assert_eq!(state.base_role(&el(3)), Role::Pivot);
        assert_eq!(state.holders(Role::Pivot), vec![el(3)]);
        assert_eq!(state.holders(Role::Comparing), vec![el(0), el(3)]);
        assert_eq!(state.len(), 2);

        let state = project(&state, &set_role(Role::Sorted, el(1)));
        assert_eq!(state.role(&el(3)), Role::Pivot);
        assert!(state.holders(Role::Comparing).is_empty());
        assert_eq!(state.roles(), vec![(el(3), Role::Pivot), (el(1), Role::Sorted)]);
    }

    #[test]
    fn remove_drops_the_subject() {
        let insert = Step::new(StepEvent::Insert { position: 0, value: 4 }, "insert")
            .with_subject(el(7));
        let remove = Step::new(StepEvent::Remove { position: 0, value: 4 }, "remove")
            .with_subject(el(7));
        let state = project_prefix(&[insert, remove]);
        assert!(state.is_empty());
    }

    #[test]
    fn not_found_clears_the_range() {
        let range = Step::new(StepEvent::MarkRange { low: 0, high: 1 }, "range")
            .with_subjects([el(0), el(1)]);
        let state = project_prefix(&[range, Step::new(StepEvent::NotFound, "missing")]);
        assert!(state.holders(Role::Range).is_empty());
    }
}
