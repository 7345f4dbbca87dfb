use tracing::{debug, info, warn};

use crate::domain::{Amount, LedgerState, Member, Snapshot};

/// Merges a snapshot of current counters into the ledger. Never settles.
///
/// Order matters: every `is_leaving` flag is cleared first, then departures
/// are detected, so a member is flagged as leaving for exactly the one call in
/// which they first go missing.
pub fn reconcile(mut state: LedgerState, snapshot: &Snapshot, now: i64) -> LedgerState {
    let mut departed = 0usize;
    let mut joined = 0usize;

    for member in state.members.values_mut() {
        member.is_leaving = false;
    }

    for (key, member) in state.members.iter_mut() {
        if snapshot.contains_key(key) || member.absent {
            continue;
        }
        member.absent = true;
        member.is_leaving = true;
        member.is_new = false;
        departed += 1;
        info!(member = %member.name, "member left");
    }

    for (name, &amount) in snapshot {
        match state.members.get_mut(name) {
            None => {
                state
                    .members
                    .insert(name.clone(), Member::joined(name, amount, now));
                joined += 1;
                info!(member = %name, amount, "member joined");
            }
            Some(member) => apply_reading(member, amount, now),
        }
    }

    info!(
        readings = snapshot.len(),
        joined, departed, "snapshot reconciled"
    );
    state
}

fn apply_reading(member: &mut Member, amount: Amount, now: i64) {
    member.absent = false;
    member.is_new = false;

    if amount > member.current {
        let diff = amount - member.current;
        member.previous = member.current;
        member.current = amount;
        member.period_total = member.period_total.saturating_add(diff);
        member.total = member.total.saturating_add(diff);
        debug!(member = %member.name, diff, "contribution credited");
    } else {
        if amount < member.current {
            // Counter went backwards: the reading replaces `current` but
            // credits nothing.
            warn!(
                member = %member.name,
                stored = member.current,
                observed = amount,
                "donation counter rolled back"
            );
        }
        member.current = amount;
    }

    member.last_seen = now;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LedgerDefaults, ledger::DEFAULT_QUOTA_PER_DAY};

    fn empty() -> LedgerState {
        LedgerState::new(LedgerDefaults {
            quota_per_day: DEFAULT_QUOTA_PER_DAY,
            now: 0,
        })
    }

    fn snapshot(rows: &[(&str, Amount)]) -> Snapshot {
        rows.iter().map(|(n, a)| (n.to_string(), *a)).collect()
    }

    #[test]
    fn new_member_is_bootstrapped_from_its_first_reading() {
        let state = reconcile(empty(), &snapshot(&[("Ana", 40_000)]), 5);
        let ana = &state.members["Ana"];
        assert_eq!(ana.previous, 40_000);
        assert_eq!(ana.current, 40_000);
        assert_eq!(ana.period_total, 0);
        assert_eq!(ana.total, 0);
        assert_eq!(ana.bank, 0);
        assert_eq!(ana.last_seen, 5);
        assert!(ana.is_new);
        assert!(!ana.absent);
    }

    #[test]
    fn positive_delta_credits_period_and_total() {
        let state = reconcile(empty(), &snapshot(&[("Ana", 40_000)]), 1);
        let state = reconcile(state, &snapshot(&[("Ana", 55_000)]), 2);
        let ana = &state.members["Ana"];
        assert_eq!(ana.previous, 40_000);
        assert_eq!(ana.current, 55_000);
        assert_eq!(ana.period_total, 15_000);
        assert_eq!(ana.total, 15_000);
        assert!(!ana.is_new);
        assert_eq!(ana.last_seen, 2);
    }

    #[test]
    fn rollback_only_moves_current() {
        let state = reconcile(empty(), &snapshot(&[("Ana", 40_000)]), 1);
        let state = reconcile(state, &snapshot(&[("Ana", 50_000)]), 2);
        let state = reconcile(state, &snapshot(&[("Ana", 10_000)]), 3);
        let ana = &state.members["Ana"];
        assert_eq!(ana.current, 10_000);
        assert_eq!(ana.previous, 40_000);
        assert_eq!(ana.period_total, 10_000);
        assert_eq!(ana.total, 10_000);
        assert_eq!(ana.last_seen, 3);
    }

    #[test]
    fn unchanged_reading_credits_nothing() {
        let state = reconcile(empty(), &snapshot(&[("Ana", 40_000)]), 1);
        let state = reconcile(state, &snapshot(&[("Ana", 40_000)]), 2);
        let ana = &state.members["Ana"];
        assert_eq!(ana.period_total, 0);
        assert_eq!(ana.total, 0);
        assert!(!ana.is_new);
    }

    #[test]
    fn departure_and_return_cycle() {
        let state = reconcile(empty(), &snapshot(&[("M", 100), ("N", 1)]), 1);
        let state = reconcile(state, &snapshot(&[("M", 200), ("N", 2)]), 2);

        let state = reconcile(state, &snapshot(&[("N", 3)]), 3);
        let m = &state.members["M"];
        assert!(m.absent && m.is_leaving);

        let state = reconcile(state, &snapshot(&[("N", 4)]), 4);
        let m = &state.members["M"];
        assert!(m.absent && !m.is_leaving);

        let state = reconcile(state, &snapshot(&[("M", 900), ("N", 5)]), 5);
        let m = &state.members["M"];
        assert!(!m.absent && !m.is_leaving && !m.is_new);
        assert_eq!(m.current, 900);
        assert_eq!(m.total, 800);
    }

    #[test]
    fn new_member_leaving_right_away_is_not_both_new_and_leaving() {
        let state = reconcile(empty(), &snapshot(&[("Kim", 10)]), 1);
        let state = reconcile(state, &snapshot(&[("Lee", 10)]), 2);
        let kim = &state.members["Kim"];
        assert!(kim.absent && kim.is_leaving && !kim.is_new);
    }

    #[test]
    fn departure_is_detected_by_map_key() {
        let mut state = empty();
        let mut stale = Member::joined("ana", 10, 0);
        stale.is_new = false;
        state.members.insert("Ana".to_string(), stale);

        let state = reconcile(state, &snapshot(&[("Ana", 20)]), 1);
        let ana = &state.members["Ana"];
        assert!(!ana.absent);
        assert!(!ana.is_leaving);
        assert_eq!(ana.total, 10);
    }

    #[test]
    fn names_are_case_sensitive() {
        let state = reconcile(empty(), &snapshot(&[("ana", 1), ("Ana", 2)]), 1);
        assert_eq!(state.members.len(), 2);
    }

    #[test]
    fn total_never_decreases_across_readings() {
        let readings = [10, 50, 20, 20, 90, 5, 400];
        let mut state = empty();
        let mut last = 0;
        for (t, amount) in readings.into_iter().enumerate() {
            state = reconcile(state, &snapshot(&[("Z", amount)]), t as i64);
            let total = state.members["Z"].total;
            assert!(total >= last);
            last = total;
        }
        // 40 + 70 + 395
        assert_eq!(last, 505);
    }
}
