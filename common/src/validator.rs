// Timeline Validator. Repairs an extracted timetable's
// per-day block sequence in place: overlaps are shrunk, small gaps are
// extended to close them, larger gaps are filled with a synthetic block,
// and a final pass flags days that still don't cover the school day.
// Idempotent by construction: running it twice produces the same result
// as running it once, since every repair either removes the condition that
// triggered it or is itself a no-op on a second pass.

use crate::models::{ExtractedTimetable, RecurringBlock, TimeBlock, Weekday};

const SMALL_GAP_MINUTES: u16 = 5;
const TRANSITION_CUTOFF_MINUTES: u16 = 10;
const SCHOOL_DAY_START: u16 = 9 * 60;
const SCHOOL_DAY_END: u16 = 15 * 60;

pub fn validate(mut timetable: ExtractedTimetable) -> ExtractedTimetable {
    for day in Weekday::ALL {
        repair_day(&mut timetable, day);
    }
    flag_missing_coverage(&mut timetable);
    timetable
}

fn repair_day(timetable: &mut ExtractedTimetable, day: Weekday) {
    let mut day_blocks: Vec<TimeBlock> = timetable
        .blocks
        .iter()
        .filter(|b| b.day == day)
        .cloned()
        .collect();
    if day_blocks.is_empty() {
        return;
    }
    timetable.blocks.retain(|b| b.day != day);
    day_blocks.sort_by_key(|b| b.start_time);

    let mut warnings = Vec::new();

    // Pass 1: sweep left to right, resolving overlaps into a stack of
    // disjoint blocks. Shrinking the earlier block only makes sense when
    // it actually starts before the one it overlaps; when two blocks share
    // a start time (or one wholly contains the other) the shorter one
    // carries no information the other doesn't already cover, so it's
    // dropped instead of shrunk down to a zero-length block.
    let mut merged: Vec<TimeBlock> = Vec::with_capacity(day_blocks.len());
    for block in day_blocks {
        let Some(last) = merged.last_mut() else {
            merged.push(block);
            continue;
        };

        if block.start_time >= last.end_time {
            merged.push(block);
            continue;
        }

        if block.end_time <= last.end_time {
            warnings.push(format!(
                "{day}: \"{}\" is fully overlapped by \"{}\" and was dropped",
                block.event_name, last.event_name
            ));
        } else if block.start_time > last.start_time {
            warnings.push(format!(
                "{day}: overlap between \"{}\" and \"{}\" resolved by shrinking the earlier block",
                last.event_name, block.event_name
            ));
            last.end_time = block.start_time;
            merged.push(block);
        } else {
            warnings.push(format!(
                "{day}: \"{}\" is fully overlapped by \"{}\" and was dropped",
                last.event_name, block.event_name
            ));
            *last = block;
        }
    }

    // Pass 2: close or flag the gaps left between the now-disjoint blocks.
    let mut synthesized = Vec::new();
    for i in 0..merged.len().saturating_sub(1) {
        let prev_end = merged[i].end_time;
        let next_start = merged[i + 1].start_time;
        if prev_end == next_start {
            continue;
        }
        let gap = next_start - prev_end;

        if covered_by_recurring(timetable, day, prev_end, next_start) {
            warnings.push(format!(
                "{day}: gap {prev_end}-{next_start} covered by a recurring block"
            ));
            continue;
        }

        if gap <= SMALL_GAP_MINUTES {
            merged[i].end_time = next_start;
            warnings.push(format!(
                "{day}: small gap of {gap} min after \"{}\" closed",
                merged[i].event_name
            ));
        } else {
            let event_name = if gap < TRANSITION_CUTOFF_MINUTES {
                "Transition"
            } else {
                "Free Period"
            };
            warnings.push(format!(
                "{day}: gap of {gap} min between \"{}\" and \"{}\" filled with a {event_name} block",
                merged[i].event_name, merged[i + 1].event_name
            ));
            synthesized.push(TimeBlock {
                day,
                start_time: prev_end,
                end_time: next_start,
                event_name: event_name.to_string(),
                notes: Some(format!("Auto-inserted to fill {gap}-minute gap")),
                color: None,
                confidence: None,
                is_fixed: false,
            });
        }
    }

    let mut day_result = merged;
    day_result.extend(synthesized);
    day_result.sort_by_key(|b| b.start_time);

    timetable.blocks.extend(day_result);
    timetable.warnings.extend(warnings);
}

fn covered_by_recurring(
    timetable: &ExtractedTimetable,
    day: Weekday,
    start: u16,
    end: u16,
) -> bool {
    timetable
        .recurring_blocks
        .iter()
        .any(|r: &RecurringBlock| r.applies_to(day) && r.intersects(start, end))
}

/// Second pass: flag days whose coverage still doesn't reach into
/// the school day on either end, after all repairs above. Does not
/// synthesize anything further; it only records a warning.
fn flag_missing_coverage(timetable: &mut ExtractedTimetable) {
    for day in Weekday::ALL {
        let mut blocks: Vec<&TimeBlock> = timetable.blocks_for(day);
        if blocks.is_empty() {
            continue;
        }
        blocks.sort_by_key(|b| b.start_time);

        let earliest_start = blocks.first().map(|b| b.start_time).unwrap_or(0);
        let latest_end = blocks.iter().map(|b| b.end_time).max().unwrap_or(0);

        let mut missing = Vec::new();
        if earliest_start > SCHOOL_DAY_START {
            missing.push(format!("starts at {earliest_start}, after 09:00"));
        }
        if latest_end < SCHOOL_DAY_END {
            missing.push(format!("ends at {latest_end}, before 15:00"));
        }

        if !missing.is_empty() {
            timetable.warnings.push(format!(
                "{day}: missing_coverage ({})",
                missing.join(", ")
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(day: Weekday, start: u16, end: u16, name: &str) -> TimeBlock {
        TimeBlock {
            day,
            start_time: start,
            end_time: end,
            event_name: name.to_string(),
            notes: None,
            color: None,
            confidence: None,
            is_fixed: false,
        }
    }

    #[test]
    fn overlap_shrinks_the_earlier_block() {
        let timetable = ExtractedTimetable {
            blocks: vec![
                block(Weekday::Monday, 540, 600, "Maths"),
                block(Weekday::Monday, 590, 650, "English"),
            ],
            ..Default::default()
        };
        let validated = validate(timetable);
        let maths = validated
            .blocks
            .iter()
            .find(|b| b.event_name == "Maths")
            .unwrap();
        assert_eq!(maths.end_time, 590);
    }

    #[test]
    fn small_gap_is_closed() {
        let timetable = ExtractedTimetable {
            blocks: vec![
                block(Weekday::Monday, 540, 600, "Maths"),
                block(Weekday::Monday, 603, 660, "English"),
            ],
            ..Default::default()
        };
        let validated = validate(timetable);
        let maths = validated
            .blocks
            .iter()
            .find(|b| b.event_name == "Maths")
            .unwrap();
        assert_eq!(maths.end_time, 603);
    }

    #[test]
    fn large_gap_is_filled_with_free_period() {
        let timetable = ExtractedTimetable {
            blocks: vec![
                block(Weekday::Monday, 540, 600, "Maths"),
                block(Weekday::Monday, 660, 720, "English"),
            ],
            ..Default::default()
        };
        let validated = validate(timetable);
        assert!(validated
            .blocks
            .iter()
            .any(|b| b.event_name == "Free Period" && b.start_time == 600 && b.end_time == 660));
    }

    #[test]
    fn short_gap_over_five_minutes_is_a_transition() {
        let timetable = ExtractedTimetable {
            blocks: vec![
                block(Weekday::Monday, 540, 600, "Maths"),
                block(Weekday::Monday, 608, 660, "English"),
            ],
            ..Default::default()
        };
        let validated = validate(timetable);
        assert!(validated
            .blocks
            .iter()
            .any(|b| b.event_name == "Transition" && b.start_time == 600 && b.end_time == 608));
    }

    #[test]
    fn gap_covered_by_recurring_block_is_left_alone() {
        let timetable = ExtractedTimetable {
            blocks: vec![
                block(Weekday::Monday, 540, 600, "Maths"),
                block(Weekday::Monday, 660, 720, "English"),
            ],
            recurring_blocks: vec![RecurringBlock {
                start_time: 600,
                end_time: 660,
                event_name: "Lunch".to_string(),
                applies_daily: true,
                notes: None,
            }],
            ..Default::default()
        };
        let validated = validate(timetable);
        assert!(!validated.blocks.iter().any(|b| b.event_name == "Free Period"));
        assert!(validated
            .warnings
            .iter()
            .any(|w| w.contains("covered by a recurring block")));
    }

    #[test]
    fn validation_is_idempotent() {
        let timetable = ExtractedTimetable {
            blocks: vec![
                block(Weekday::Monday, 540, 600, "Maths"),
                block(Weekday::Monday, 590, 650, "English"),
                block(Weekday::Monday, 720, 780, "History"),
            ],
            ..Default::default()
        };
        let once = validate(timetable);
        let twice = validate(once.clone());
        assert_eq!(once.blocks.len(), twice.blocks.len());
        for (a, b) in once.blocks.iter().zip(twice.blocks.iter()) {
            assert_eq!(a.start_time, b.start_time);
            assert_eq!(a.end_time, b.end_time);
            assert_eq!(a.event_name, b.event_name);
        }
    }

    #[test]
    fn missing_coverage_is_flagged_without_synthesizing_blocks() {
        let timetable = ExtractedTimetable {
            blocks: vec![block(Weekday::Monday, 660, 700, "Late Start")],
            ..Default::default()
        };
        let validated = validate(timetable);
        assert_eq!(validated.blocks.len(), 1);
        assert!(validated
            .warnings
            .iter()
            .any(|w| w.contains("missing_coverage")));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::collection::vec as pvec;
    use proptest::prelude::*;

    /// Random, possibly-overlapping blocks on a single day, each
    /// individually valid (`start < end`) but with no guarantee about how
    /// they relate to one another.
    fn arb_blocks() -> impl Strategy<Value = Vec<TimeBlock>> {
        pvec((0u16..1380, 1u16..60), 0..8).prop_map(|pairs| {
            pairs
                .into_iter()
                .enumerate()
                .map(|(i, (start, span))| TimeBlock {
                    day: Weekday::Monday,
                    start_time: start,
                    end_time: (start + span).min(1439),
                    event_name: format!("Event{i}"),
                    notes: None,
                    color: None,
                    confidence: None,
                    is_fixed: false,
                })
                .filter(|b| b.start_time < b.end_time)
                .collect()
        })
    }

    proptest! {
        /// Universal invariant 1: after validation, a day's blocks sorted
        /// by start time never overlap.
        #[test]
        fn validated_day_has_no_overlaps(blocks in arb_blocks()) {
            let timetable = ExtractedTimetable { blocks, ..Default::default() };
            let validated = validate(timetable);

            let mut day_blocks: Vec<&TimeBlock> = validated.blocks_for(Weekday::Monday);
            day_blocks.sort_by_key(|b| b.start_time);

            for pair in day_blocks.windows(2) {
                prop_assert!(pair[0].start_time < pair[0].end_time);
                prop_assert!(pair[0].end_time <= pair[1].start_time);
            }
        }

        /// Universal invariant 2: validating an already-validated timetable
        /// changes nothing about its block timeline.
        #[test]
        fn validation_is_idempotent_under_random_input(blocks in arb_blocks()) {
            let timetable = ExtractedTimetable { blocks, ..Default::default() };
            let once = validate(timetable);
            let twice = validate(once.clone());

            prop_assert_eq!(once.blocks.len(), twice.blocks.len());
            let mut once_sorted = once.blocks.clone();
            let mut twice_sorted = twice.blocks.clone();
            once_sorted.sort_by_key(|b| (b.start_time, b.end_time, b.event_name.clone()));
            twice_sorted.sort_by_key(|b| (b.start_time, b.end_time, b.event_name.clone()));
            for (a, b) in once_sorted.iter().zip(twice_sorted.iter()) {
                prop_assert_eq!(a.start_time, b.start_time);
                prop_assert_eq!(a.end_time, b.end_time);
            }
        }
    }
}
