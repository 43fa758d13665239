//! Release timeline generation.
//!
//! Every plan gets the same fixed schedule of promotional tasks relative to
//! the release date. Labels are templated with the release title and artist.

use chrono::{Days, NaiveDate};

use crate::db::models::releases::TaskCreateDBRequest;
use crate::types::PlanId;

/// One entry of the fixed offset table.
struct TimelineEntry {
    day_offset: i32,
    label: &'static str,
    channel: &'static str,
}

/// Fixed schedule, in timeline order. T+0 carries two tasks.
const TIMELINE: &[TimelineEntry] = &[
    TimelineEntry {
        day_offset: -7,
        label: "Announce \"{title}\" by {artist}",
        channel: "all socials",
    },
    TimelineEntry {
        day_offset: -5,
        label: "Post teaser clip for \"{title}\"",
        channel: "instagram, tiktok",
    },
    TimelineEntry {
        day_offset: -3,
        label: "Push presave link for \"{title}\"",
        channel: "link hub, stories",
    },
    TimelineEntry {
        day_offset: -1,
        label: "Countdown post: \"{title}\" drops tomorrow",
        channel: "all socials",
    },
    TimelineEntry {
        day_offset: 0,
        label: "Release day: \"{title}\" by {artist} is out now",
        channel: "all socials",
    },
    TimelineEntry {
        day_offset: 0,
        label: "Go live / stories takeover for \"{title}\"",
        channel: "instagram, tiktok",
    },
    TimelineEntry {
        day_offset: 1,
        label: "Thank-you post with first-day stats for \"{title}\"",
        channel: "all socials",
    },
    TimelineEntry {
        day_offset: 3,
        label: "Highlights recap for \"{title}\"",
        channel: "youtube, instagram",
    },
];

fn offset_date(release_date: NaiveDate, day_offset: i32) -> NaiveDate {
    if day_offset >= 0 {
        release_date
            .checked_add_days(Days::new(day_offset as u64))
            .unwrap_or(release_date)
    } else {
        release_date
            .checked_sub_days(Days::new((-day_offset) as u64))
            .unwrap_or(release_date)
    }
}

/// Build the task rows for a plan.
pub fn generate_tasks(plan_id: PlanId, title: &str, artist: &str, release_date: NaiveDate) -> Vec<TaskCreateDBRequest> {
    TIMELINE
        .iter()
        .map(|entry| TaskCreateDBRequest {
            plan_id,
            day_offset: entry.day_offset,
            due_date: offset_date(release_date, entry.day_offset),
            label: entry.label.replace("{title}", title).replace("{artist}", artist),
            channel: entry.channel.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_generates_eight_tasks_in_order() {
        let tasks = generate_tasks(Uuid::new_v4(), "Night Drive", "DJ Cali", date(2026, 9, 18));

        assert_eq!(tasks.len(), 8);
        let offsets: Vec<i32> = tasks.iter().map(|t| t.day_offset).collect();
        assert_eq!(offsets, vec![-7, -5, -3, -1, 0, 0, 1, 3]);
    }

    #[test]
    fn test_due_dates_follow_offsets() {
        let release = date(2026, 9, 18);
        let tasks = generate_tasks(Uuid::new_v4(), "Night Drive", "DJ Cali", release);

        assert_eq!(tasks[0].due_date, date(2026, 9, 11)); // T-7
        assert_eq!(tasks[3].due_date, date(2026, 9, 17)); // T-1
        assert_eq!(tasks[4].due_date, release); // T+0
        assert_eq!(tasks[7].due_date, date(2026, 9, 21)); // T+3
    }

    #[test]
    fn test_offsets_cross_month_boundary() {
        let tasks = generate_tasks(Uuid::new_v4(), "First", "A", date(2026, 10, 2));
        assert_eq!(tasks[0].due_date, date(2026, 9, 25));
    }

    #[test]
    fn test_labels_are_templated() {
        let tasks = generate_tasks(Uuid::new_v4(), "Night Drive", "DJ Cali", date(2026, 9, 18));

        assert_eq!(tasks[0].label, "Announce \"Night Drive\" by DJ Cali");
        assert!(tasks[4].label.contains("Night Drive"));
        assert!(tasks[4].label.contains("DJ Cali"));
        assert!(!tasks.iter().any(|t| t.label.contains("{title}") || t.label.contains("{artist}")));
    }

    #[test]
    fn test_release_day_has_two_tasks() {
        let tasks = generate_tasks(Uuid::new_v4(), "T", "A", date(2026, 9, 18));
        assert_eq!(tasks.iter().filter(|t| t.day_offset == 0).count(), 2);
    }
}
