//! # Outcome Grouping
//!
//! Presentation view over a raw outcome sequence: outcomes are stably
//! ordered by [`TestGroup`] so that equal groups are contiguous, while
//! outcomes inside a group keep the order the engine reported them in.
//!
//! The view borrows from the input and never reorders it.

use crate::result::{TestGroup, TestOutcome, TestStatus};

/// A contiguous run of outcomes belonging to one group.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeGroup<'a> {
    pub group: TestGroup,
    pub outcomes: Vec<&'a TestOutcome>,
}

impl<'a> OutcomeGroup<'a> {
    /// Worst status in the group (Failed > Warning > Passed > Skipped).
    pub fn worst_status(&self) -> Option<TestStatus> {
        self.outcomes.iter().map(|o| o.status).max_by_key(|s| match s {
            TestStatus::Skipped => 0,
            TestStatus::Passed => 1,
            TestStatus::Warning => 2,
            TestStatus::Failed => 3,
        })
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Group `outcomes` by test group, in group declaration order.
pub fn group_outcomes(outcomes: &[TestOutcome]) -> Vec<OutcomeGroup<'_>> {
    let mut ordered: Vec<&TestOutcome> = outcomes.iter().collect();
    // `sort_by_key` is stable: within-group order is the input order.
    ordered.sort_by_key(|o| o.group);

    let mut groups: Vec<OutcomeGroup<'_>> = Vec::new();
    for outcome in ordered {
        match groups.last_mut() {
            Some(last) if last.group == outcome.group => last.outcomes.push(outcome),
            _ => groups.push(OutcomeGroup {
                group: outcome.group,
                outcomes: vec![outcome],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{CheckKind, Confidence};
    use proptest::prelude::*;

    fn outcome(name: &str, group: TestGroup, status: TestStatus) -> TestOutcome {
        TestOutcome {
            name: name.to_string(),
            group,
            status,
            confidence: Confidence::FULL,
            kind: CheckKind::Visual,
            cross_matches: None,
        }
    }

    #[test]
    fn test_groups_are_contiguous_and_stable() {
        let outcomes = vec![
            outcome("b1", TestGroup::Biometric, TestStatus::Passed),
            outcome("d1", TestGroup::Document, TestStatus::Passed),
            outcome("b2", TestGroup::Biometric, TestStatus::Failed),
        ];

        let groups = group_outcomes(&outcomes);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].group, TestGroup::Document);
        assert_eq!(groups[1].group, TestGroup::Biometric);
        let names: Vec<_> = groups[1].outcomes.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["b1", "b2"]);

        // Input untouched.
        assert_eq!(outcomes[0].name, "b1");
    }

    #[test]
    fn test_empty_input() {
        assert!(group_outcomes(&[]).is_empty());
    }

    #[test]
    fn test_worst_status() {
        let outcomes = vec![
            outcome("a", TestGroup::Rfid, TestStatus::Skipped),
            outcome("b", TestGroup::Rfid, TestStatus::Warning),
            outcome("c", TestGroup::Rfid, TestStatus::Passed),
        ];
        let groups = group_outcomes(&outcomes);
        assert_eq!(groups[0].worst_status(), Some(TestStatus::Warning));
    }

    const GROUPS: [TestGroup; 6] = [
        TestGroup::Document,
        TestGroup::Barcode,
        TestGroup::Biometric,
        TestGroup::Rfid,
        TestGroup::AntiSpoofing,
        TestGroup::Unknown,
    ];

    proptest! {
        #[test]
        fn prop_grouping_is_contiguous_and_order_preserving(
            picks in proptest::collection::vec(0..GROUPS.len(), 0..40)
        ) {
            let outcomes: Vec<TestOutcome> = picks
                .iter()
                .enumerate()
                .map(|(i, g)| outcome(&i.to_string(), GROUPS[*g], TestStatus::Passed))
                .collect();

            let groups = group_outcomes(&outcomes);

            // Each group appears exactly once.
            let mut seen = std::collections::HashSet::new();
            for g in &groups {
                prop_assert!(seen.insert(g.group));
            }

            // Within a group, indices are strictly increasing (input order).
            for g in &groups {
                let idx: Vec<usize> = g.outcomes.iter().map(|o| o.name.parse().unwrap()).collect();
                prop_assert!(idx.windows(2).all(|w| w[0] < w[1]));
            }

            let total: usize = groups.iter().map(OutcomeGroup::len).sum();
            prop_assert_eq!(total, outcomes.len());
        }
    }
}
