// Read-side view of `ExtractedTimetable` for the Status/Result API.
// The internal model stores times as minute-of-day (`u16`) so the
// validator can do plain integer arithmetic; the external job-status
// response renders them as `HH:MM` strings per the documented contract.
// Distinct from `calendar::to_fullcalendar_events`, which maps onto
// FullCalendar's own event shape rather than this pipeline's native one.

use crate::models::{ExtractedTimetable, RecurringBlock, TimeBlock, Weekday};
use serde::Serialize;

fn minutes_to_hhmm(minutes: u16) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeBlockView {
    pub day: Weekday,
    #[serde(rename = "startTime")]
    pub start_time: String,
    #[serde(rename = "endTime")]
    pub end_time: String,
    #[serde(rename = "eventName")]
    pub event_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(rename = "isFixed")]
    pub is_fixed: bool,
}

impl From<&TimeBlock> for TimeBlockView {
    fn from(block: &TimeBlock) -> Self {
        Self {
            day: block.day,
            start_time: minutes_to_hhmm(block.start_time),
            end_time: minutes_to_hhmm(block.end_time),
            event_name: block.event_name.clone(),
            notes: block.notes.clone(),
            color: block.color.clone(),
            confidence: block.confidence,
            is_fixed: block.is_fixed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecurringBlockView {
    #[serde(rename = "startTime")]
    pub start_time: String,
    #[serde(rename = "endTime")]
    pub end_time: String,
    #[serde(rename = "eventName")]
    pub event_name: String,
    #[serde(rename = "appliesDaily")]
    pub applies_daily: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<&RecurringBlock> for RecurringBlockView {
    fn from(block: &RecurringBlock) -> Self {
        Self {
            start_time: minutes_to_hhmm(block.start_time),
            end_time: minutes_to_hhmm(block.end_time),
            event_name: block.event_name.clone(),
            applies_daily: block.applies_daily,
            notes: block.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedTimetableView {
    #[serde(rename = "teacherName", skip_serializing_if = "Option::is_none")]
    pub teacher_name: Option<String>,
    #[serde(rename = "className", skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week: Option<String>,
    pub blocks: Vec<TimeBlockView>,
    #[serde(rename = "recurringBlocks")]
    pub recurring_blocks: Vec<RecurringBlockView>,
    pub warnings: Vec<String>,
}

impl From<&ExtractedTimetable> for ExtractedTimetableView {
    fn from(timetable: &ExtractedTimetable) -> Self {
        Self {
            teacher_name: timetable.teacher_name.clone(),
            class_name: timetable.class_name.clone(),
            term: timetable.term.clone(),
            week: timetable.week.clone(),
            blocks: timetable.blocks.iter().map(TimeBlockView::from).collect(),
            recurring_blocks: timetable
                .recurring_blocks
                .iter()
                .map(RecurringBlockView::from)
                .collect(),
            warnings: timetable.warnings.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Weekday;

    #[test]
    fn renders_minute_of_day_as_hh_mm() {
        let block = TimeBlock {
            day: Weekday::Monday,
            start_time: 9 * 60 + 5,
            end_time: 10 * 60,
            event_name: "Maths".into(),
            notes: None,
            color: None,
            confidence: None,
            is_fixed: false,
        };
        let view = TimeBlockView::from(&block);
        assert_eq!(view.start_time, "09:05");
        assert_eq!(view.end_time, "10:00");
    }
}
