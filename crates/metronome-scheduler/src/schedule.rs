use chrono::{DateTime, Utc};

/// Truncate to whole seconds. The loop compares instants at second
/// resolution only; sub-second components are discarded everywhere.
pub fn truncate_to_second(t: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(t.timestamp(), 0).unwrap_or(t)
}

/// Next instant matching `schedule` strictly after `anchor`, at second
/// resolution.
///
/// Returns `None` when the expression yields no future instant (e.g. a
/// fixed-date expression whose date has passed).
pub fn next_occurrence(
    schedule: &cron::Schedule,
    anchor: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    schedule.after(&anchor).next().map(truncate_to_second)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn truncate_drops_subsecond_component() {
        let t = DateTime::from_timestamp(1_700_000_000, 937_000_000).unwrap();
        assert_eq!(truncate_to_second(t), at(1_700_000_000));
    }

    #[test]
    fn truncate_is_identity_on_whole_seconds() {
        assert_eq!(truncate_to_second(at(42)), at(42));
    }

    #[test]
    fn every_second_expression_yields_next_second() {
        let sched = cron::Schedule::from_str("* * * * * *").unwrap();
        assert_eq!(next_occurrence(&sched, at(1_700_000_000)), Some(at(1_700_000_001)));
    }

    #[test]
    fn occurrence_is_strictly_after_anchor() {
        // Anchor exactly on a matching instant must not be returned again.
        let sched = cron::Schedule::from_str("*/10 * * * * *").unwrap();
        let anchor = at(1_700_000_000); // 1_700_000_000 % 10 == 0
        assert_eq!(next_occurrence(&sched, anchor), Some(at(1_700_000_010)));
    }

    #[test]
    fn minute_boundary_expression() {
        let sched = cron::Schedule::from_str("0 * * * * *").unwrap();
        let anchor = at(1_700_000_005);
        let next = next_occurrence(&sched, anchor).unwrap();
        assert_eq!(next.timestamp() % 60, 0);
        assert!(next > anchor);
    }
}
