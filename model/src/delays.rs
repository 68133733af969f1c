//! Classifies the `.cty` `DelayNames` slots into typed schedules. Map authors
//! wrote these by hand in Russian or English; anything the well-known table
//! misses is mined for a time range and a weekday tag.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ids::{TextId, TextIndexTable};

const RUSH_HOURS: &[&str] = &["08:00-10:00", "17:00-19:00"];
const DAY_RANGES: &[&str] = &["08:00-20:00"];
const NIGHT_RANGES: &[&str] = &["20:00-24:00", "00:00-05:00"];
const EVENING_RANGES: &[&str] = &["19:00-24:00"];
const MORNING_RANGES: &[&str] = &["05:00-08:00"];

const WORK_DAYS: &str = "workdays";
const WEEK_END: &str = "weekend";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DelayScheme {
    pub kind: String,
    pub name_text_id: Option<TextId>,
    pub ranges: Option<Vec<String>>,
    pub weekdays: Option<String>,
}

struct KnownDelay {
    name: &'static str,
    kind: &'static str,
    ranges: Option<&'static [&'static str]>,
    weekdays: Option<&'static str>,
}

const KNOWN_DELAYS: &[KnownDelay] = &[
    KnownDelay { name: "Day", kind: "day", ranges: Some(DAY_RANGES), weekdays: None },
    KnownDelay { name: "День", kind: "day", ranges: Some(DAY_RANGES), weekdays: None },
    KnownDelay { name: "Выходной", kind: "day", ranges: Some(DAY_RANGES), weekdays: Some(WEEK_END) },
    KnownDelay { name: "День (вых.)", kind: "day", ranges: Some(DAY_RANGES), weekdays: Some(WEEK_END) },
    KnownDelay { name: "День (раб.)", kind: "day", ranges: Some(DAY_RANGES), weekdays: Some(WORK_DAYS) },
    KnownDelay { name: "Night", kind: "night", ranges: Some(NIGHT_RANGES), weekdays: None },
    KnownDelay { name: "Ночь", kind: "night", ranges: Some(NIGHT_RANGES), weekdays: None },
    KnownDelay { name: "Вечер (вых.)", kind: "evening", ranges: Some(EVENING_RANGES), weekdays: Some(WEEK_END) },
    KnownDelay { name: "Вечер (раб.)", kind: "evening", ranges: Some(EVENING_RANGES), weekdays: Some(WORK_DAYS) },
    KnownDelay { name: "после 19.00", kind: "evening", ranges: Some(EVENING_RANGES), weekdays: None },
    KnownDelay { name: "Утро", kind: "morning", ranges: Some(MORNING_RANGES), weekdays: None },
    KnownDelay { name: "Час-пик", kind: "rush", ranges: Some(RUSH_HOURS), weekdays: Some(WORK_DAYS) },
    KnownDelay { name: "Без пересадок", kind: "direct", ranges: None, weekdays: None },
    KnownDelay { name: "Запад-Север", kind: "west-north", ranges: None, weekdays: None },
    KnownDelay { name: "Запад-Юг", kind: "west-south", ranges: None, weekdays: None },
    KnownDelay { name: "Север-Запад", kind: "north-west", ranges: None, weekdays: None },
    KnownDelay { name: "Север-Юг", kind: "north-south", ranges: None, weekdays: None },
    KnownDelay { name: "Юг-Запад", kind: "south-west", ranges: None, weekdays: None },
    KnownDelay { name: "Юг-Север", kind: "south-north", ranges: None, weekdays: None },
];

static TIME_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})[.:](\d{1,2})\s*[\s-]\s*(\d{1,2})[.:](\d{1,2})").unwrap()
});
static WEEKDAYS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("ПнПт|СбВс|Пн|Вт|Ср|Чт|Пт|Сб|Вс").unwrap());

const KNOWN_WEEKDAYS: &[(&str, &str)] = &[
    ("Пн", "monday"),
    ("Вт", "tuesday"),
    ("Ср", "wednesday"),
    ("Чт", "thursday"),
    ("Пт", "friday"),
    ("Сб", "saturday"),
    ("Вс", "sunday"),
    ("ПнПт", WORK_DAYS),
    ("СбВс", WEEK_END),
];

pub fn classify_delay_names(names: &[String], texts: &mut TextIndexTable) -> Vec<DelayScheme> {
    names.iter().map(|name| classify(name, texts)).collect()
}

fn classify(slot: &str, texts: &mut TextIndexTable) -> DelayScheme {
    if let Some(known) = KNOWN_DELAYS.iter().find(|k| k.name == slot) {
        return DelayScheme {
            kind: known.kind.to_string(),
            name_text_id: None,
            ranges: known
                .ranges
                .map(|r| r.iter().map(|s| s.to_string()).collect()),
            weekdays: known.weekdays.map(|w| w.to_string()),
        };
    }

    let mut name = slot.split_whitespace().next().map(|n| n.to_string());

    let range_matches: Vec<_> = TIME_RANGE.captures_iter(slot).collect();
    let ranges = if range_matches.len() == 1 {
        if !slot.contains(char::is_whitespace) {
            // The whole slot is just a time range.
            name = None;
        }
        let c = &range_matches[0];
        let (h1, m1, h2, m2): (u32, u32, u32, u32) = (
            c[1].parse().unwrap_or(0),
            c[2].parse().unwrap_or(0),
            c[3].parse().unwrap_or(0),
            c[4].parse().unwrap_or(0),
        );
        Some(vec![format!("{:02}:{:02}-{:02}:{:02}", h1, m1, h2, m2)])
    } else {
        None
    };

    let weekday_matches: Vec<&str> = WEEKDAYS.find_iter(slot).map(|m| m.as_str()).collect();
    let weekdays = if weekday_matches.len() == 1 {
        KNOWN_WEEKDAYS
            .iter()
            .find(|(abbr, _)| *abbr == weekday_matches[0])
            .map(|(_, tag)| tag.to_string())
    } else {
        None
    };

    DelayScheme {
        kind: "custom".to_string(),
        name_text_id: name.map(|n| texts.as_text_id(&n)),
        ranges,
        weekdays,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_names() {
        let mut texts = TextIndexTable::new();
        let schemes =
            classify_delay_names(&["Day".to_string(), "Ночь".to_string()], &mut texts);
        assert_eq!(schemes[0].kind, "day");
        assert_eq!(
            schemes[0].ranges,
            Some(vec!["08:00-20:00".to_string()])
        );
        assert_eq!(schemes[1].kind, "night");
        assert_eq!(schemes[1].ranges.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn bare_time_range_has_no_name() {
        let mut texts = TextIndexTable::new();
        let schemes = classify_delay_names(&["7.30-9.15".to_string()], &mut texts);
        assert_eq!(schemes[0].kind, "custom");
        assert_eq!(schemes[0].name_text_id, None);
        assert_eq!(schemes[0].ranges, Some(vec!["07:30-09:15".to_string()]));
    }

    #[test]
    fn weekday_tag_is_recognized() {
        let mut texts = TextIndexTable::new();
        let schemes = classify_delay_names(&["День СбВс".to_string()], &mut texts);
        assert_eq!(schemes[0].weekdays, Some("weekend".to_string()));
        assert!(schemes[0].name_text_id.is_some());
    }
}
