// Read-side projection for `GET /jobs/{jobId}/fullcalendar`. Pure
// transform from `ExtractedTimetable` into FullCalendar's recurring-event
// JSON shape (`daysOfWeek`/`startTime`/`endTime`): no day, just a weekly
// pattern, which matches how a teacher timetable is actually shaped.

use crate::models::{ExtractedTimetable, RecurringBlock, TimeBlock, Weekday};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct FullCalendarEvent {
    pub title: String,
    #[serde(rename = "daysOfWeek")]
    pub days_of_week: Vec<u8>,
    #[serde(rename = "startTime")]
    pub start_time: String,
    #[serde(rename = "endTime")]
    pub end_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "extendedProps", skip_serializing_if = "Option::is_none")]
    pub extended_props: Option<serde_json::Value>,
}

fn weekday_index(day: Weekday) -> u8 {
    match day {
        Weekday::Monday => 1,
        Weekday::Tuesday => 2,
        Weekday::Wednesday => 3,
        Weekday::Thursday => 4,
        Weekday::Friday => 5,
    }
}

fn minutes_to_clock(minutes: u16) -> String {
    format!("{:02}:{:02}:00", minutes / 60, minutes % 60)
}

fn block_event(block: &TimeBlock) -> FullCalendarEvent {
    FullCalendarEvent {
        title: block.event_name.clone(),
        days_of_week: vec![weekday_index(block.day)],
        start_time: minutes_to_clock(block.start_time),
        end_time: minutes_to_clock(block.end_time),
        color: block.color.clone(),
        extended_props: block
            .notes
            .as_ref()
            .map(|notes| serde_json::json!({ "notes": notes })),
    }
}

fn recurring_event(block: &RecurringBlock) -> FullCalendarEvent {
    let days_of_week = if block.applies_daily {
        (1..=5).collect()
    } else {
        Weekday::ALL
            .into_iter()
            .filter(|day| block.applies_to(*day))
            .map(weekday_index)
            .collect()
    };

    FullCalendarEvent {
        title: block.event_name.clone(),
        days_of_week,
        start_time: minutes_to_clock(block.start_time),
        end_time: minutes_to_clock(block.end_time),
        color: None,
        extended_props: block
            .notes
            .as_ref()
            .map(|notes| serde_json::json!({ "notes": notes })),
    }
}

pub fn to_fullcalendar_events(timetable: &ExtractedTimetable) -> Vec<FullCalendarEvent> {
    let mut events: Vec<FullCalendarEvent> =
        timetable.blocks.iter().map(block_event).collect();
    events.extend(timetable.recurring_blocks.iter().map(recurring_event));
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeBlock;

    #[test]
    fn block_maps_to_single_weekday_index() {
        let timetable = ExtractedTimetable {
            blocks: vec![TimeBlock {
                day: Weekday::Wednesday,
                start_time: 540,
                end_time: 600,
                event_name: "Maths".into(),
                notes: None,
                color: None,
                confidence: None,
                is_fixed: false,
            }],
            ..Default::default()
        };
        let events = to_fullcalendar_events(&timetable);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].days_of_week, vec![3]);
        assert_eq!(events[0].start_time, "09:00:00");
        assert_eq!(events[0].end_time, "10:00:00");
    }

    #[test]
    fn daily_recurring_block_covers_all_five_weekdays() {
        let timetable = ExtractedTimetable {
            recurring_blocks: vec![RecurringBlock {
                start_time: 600,
                end_time: 630,
                event_name: "Break".into(),
                applies_daily: true,
                notes: None,
            }],
            ..Default::default()
        };
        let events = to_fullcalendar_events(&timetable);
        assert_eq!(events[0].days_of_week, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn enumerated_recurring_block_covers_only_listed_days() {
        let timetable = ExtractedTimetable {
            recurring_blocks: vec![RecurringBlock {
                start_time: 600,
                end_time: 630,
                event_name: "Club".into(),
                applies_daily: false,
                notes: Some("Mon, Wed".into()),
            }],
            ..Default::default()
        };
        let events = to_fullcalendar_events(&timetable);
        assert_eq!(events[0].days_of_week, vec![1, 3]);
    }
}
