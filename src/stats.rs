//! Pure reporting over the session ledger.
//!
//! Every function takes the session slice and the caller's notion of "today"
//! so the math is deterministic under test. Seconds in, hours out only at the
//! display edges.

use std::collections::HashMap;

use chrono::{Datelike, Days, Local, Months, NaiveDate, Weekday};
use serde::Serialize;

use crate::ledger::Session;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub today_seconds: u64,
    pub today_sessions: usize,
    pub week_seconds: u64,
    pub week_sessions: usize,
    pub total_sessions: usize,
    pub top_label: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSlice {
    pub label: String,
    pub seconds: u64,
    pub sessions: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartRange {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub hours: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalReport {
    pub daily_percent: f64,
    pub weekly_percent: f64,
    pub streak_days: u32,
    pub best_day: Option<DayTotal>,
    pub best_week: Option<WeekTotal>,
    pub this_week_seconds: u64,
    pub last_week_seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayTotal {
    pub date: NaiveDate,
    pub seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekTotal {
    pub week_start: NaiveDate,
    pub seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapCell {
    pub date: NaiveDate,
    pub seconds: u64,
    pub level: u8,
}

/// The heatmap shows roughly the last quarter, padded back to a Monday so
/// the columns are whole weeks.
pub const HEATMAP_SPAN_DAYS: u64 = 91;

fn daily_totals(sessions: &[Session]) -> HashMap<NaiveDate, u64> {
    let mut totals = HashMap::new();
    for session in sessions {
        *totals.entry(session.date).or_insert(0) += session.duration;
    }
    totals
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(date.weekday().num_days_from_monday() as u64)
}

pub fn dashboard_summary(sessions: &[Session], today: NaiveDate) -> DashboardSummary {
    let monday = week_start(today);
    let mut summary = DashboardSummary {
        today_seconds: 0,
        today_sessions: 0,
        week_seconds: 0,
        week_sessions: 0,
        total_sessions: sessions.len(),
        top_label: None,
    };
    let mut label_totals: HashMap<&str, u64> = HashMap::new();
    for session in sessions {
        if session.date == today {
            summary.today_seconds += session.duration;
            summary.today_sessions += 1;
        }
        if session.date >= monday && session.date <= today {
            summary.week_seconds += session.duration;
            summary.week_sessions += 1;
            *label_totals.entry(session.label.as_str()).or_insert(0) += session.duration;
        }
    }
    summary.top_label = label_totals
        .into_iter()
        .max_by_key(|(_, secs)| *secs)
        .map(|(label, _)| label.to_string());
    summary
}

/// Share of total focus time per label, largest first.
pub fn label_breakdown(sessions: &[Session]) -> Vec<LabelSlice> {
    let mut totals: HashMap<&str, (u64, usize)> = HashMap::new();
    let mut grand_total = 0u64;
    for session in sessions {
        let entry = totals.entry(session.label.as_str()).or_insert((0, 0));
        entry.0 += session.duration;
        entry.1 += 1;
        grand_total += session.duration;
    }
    let mut slices: Vec<LabelSlice> = totals
        .into_iter()
        .map(|(label, (seconds, count))| LabelSlice {
            label: label.to_string(),
            seconds,
            sessions: count,
            percent: if grand_total == 0 {
                0.0
            } else {
                seconds as f64 / grand_total as f64 * 100.0
            },
        })
        .collect();
    slices.sort_by(|a, b| b.seconds.cmp(&a.seconds).then(a.label.cmp(&b.label)));
    slices
}

/// Bucketed hours for the trends chart. Buckets are emitted oldest first and
/// include empty ones, so the chart never has gaps.
pub fn chart_data(sessions: &[Session], range: ChartRange, today: NaiveDate) -> Vec<ChartPoint> {
    let totals = daily_totals(sessions);
    match range {
        ChartRange::Daily => (0u64..14)
            .rev()
            .map(|back| {
                let day = today - Days::new(back);
                ChartPoint {
                    label: day.format("%b %-d").to_string(),
                    hours: to_hours(totals.get(&day).copied().unwrap_or(0)),
                }
            })
            .collect(),
        ChartRange::Weekly => {
            let this_monday = week_start(today);
            (0u64..12)
                .rev()
                .map(|back| {
                    let monday = this_monday - Days::new(back * 7);
                    let seconds: u64 = (0u64..7)
                        .map(|d| totals.get(&(monday + Days::new(d))).copied().unwrap_or(0))
                        .sum();
                    ChartPoint {
                        label: monday.format("%b %-d").to_string(),
                        hours: to_hours(seconds),
                    }
                })
                .collect()
        }
        ChartRange::Monthly => {
            let this_month = today.with_day(1).unwrap_or(today);
            (0u32..12)
                .rev()
                .map(|back| {
                    let month = this_month - Months::new(back);
                    let seconds: u64 = totals
                        .iter()
                        .filter(|(date, _)| {
                            date.year() == month.year() && date.month() == month.month()
                        })
                        .map(|(_, secs)| *secs)
                        .sum();
                    ChartPoint {
                        label: month.format("%b %y").to_string(),
                        hours: to_hours(seconds),
                    }
                })
                .collect()
        }
        ChartRange::Yearly => (0i32..5)
            .rev()
            .map(|back| {
                let year = today.year() - back;
                let seconds: u64 = totals
                    .iter()
                    .filter(|(date, _)| date.year() == year)
                    .map(|(_, secs)| *secs)
                    .sum();
                ChartPoint {
                    label: year.to_string(),
                    hours: to_hours(seconds),
                }
            })
            .collect(),
    }
}

fn to_hours(seconds: u64) -> f64 {
    (seconds as f64 / 3600.0 * 100.0).round() / 100.0
}

/// Goal progress, streak, and records.
pub fn goal_report(
    sessions: &[Session],
    daily_goal_hours: f64,
    weekly_goal_hours: f64,
    today: NaiveDate,
) -> GoalReport {
    let totals = daily_totals(sessions);
    let daily_goal_secs = (daily_goal_hours * 3600.0) as u64;
    let weekly_goal_secs = (weekly_goal_hours * 3600.0) as u64;

    let today_secs = totals.get(&today).copied().unwrap_or(0);
    let this_monday = week_start(today);
    let last_monday = this_monday - Days::new(7);
    let week_secs = |monday: NaiveDate| -> u64 {
        (0u64..7)
            .map(|d| totals.get(&(monday + Days::new(d))).copied().unwrap_or(0))
            .sum()
    };
    let this_week_seconds = week_secs(this_monday);
    let last_week_seconds = week_secs(last_monday);

    GoalReport {
        daily_percent: percent_of(today_secs, daily_goal_secs),
        weekly_percent: percent_of(this_week_seconds, weekly_goal_secs),
        streak_days: streak(&totals, daily_goal_secs, today),
        best_day: totals
            .iter()
            .max_by_key(|(date, secs)| (**secs, std::cmp::Reverse(**date)))
            .map(|(date, secs)| DayTotal {
                date: *date,
                seconds: *secs,
            }),
        best_week: best_week(&totals),
        this_week_seconds,
        last_week_seconds,
    }
}

fn percent_of(value: u64, goal: u64) -> f64 {
    if goal == 0 {
        0.0
    } else {
        (value as f64 / goal as f64 * 100.0).round()
    }
}

/// Consecutive days at or above the daily goal, walking back from today.
/// Today itself not being there yet does not break the streak; any earlier
/// shortfall does.
fn streak(totals: &HashMap<NaiveDate, u64>, daily_goal_secs: u64, today: NaiveDate) -> u32 {
    if daily_goal_secs == 0 {
        return 0;
    }
    let mut count = 0;
    let mut day = today;
    if totals.get(&day).copied().unwrap_or(0) >= daily_goal_secs {
        count += 1;
    }
    loop {
        day = match day.checked_sub_days(Days::new(1)) {
            Some(prev) => prev,
            None => break,
        };
        if totals.get(&day).copied().unwrap_or(0) >= daily_goal_secs {
            count += 1;
        } else {
            break;
        }
    }
    count
}

fn best_week(totals: &HashMap<NaiveDate, u64>) -> Option<WeekTotal> {
    let mut weeks: HashMap<NaiveDate, u64> = HashMap::new();
    for (date, secs) in totals {
        *weeks.entry(week_start(*date)).or_insert(0) += secs;
    }
    weeks
        .into_iter()
        .max_by_key(|(monday, secs)| (*secs, std::cmp::Reverse(*monday)))
        .map(|(week_start, seconds)| WeekTotal {
            week_start,
            seconds,
        })
}

/// Cells for the activity heatmap, Monday-aligned and ending today. Levels
/// grade each day against the daily goal.
pub fn heatmap(sessions: &[Session], daily_goal_hours: f64, today: NaiveDate) -> Vec<HeatmapCell> {
    let totals = daily_totals(sessions);
    let daily_goal_secs = (daily_goal_hours * 3600.0) as u64;
    let span_start = today - Days::new(HEATMAP_SPAN_DAYS - 1);
    let mut day = week_start(span_start);
    let mut cells = Vec::new();
    while day <= today {
        let seconds = totals.get(&day).copied().unwrap_or(0);
        cells.push(HeatmapCell {
            date: day,
            seconds,
            level: heat_level(seconds, daily_goal_secs),
        });
        day = day + Days::new(1);
    }
    cells
}

fn heat_level(seconds: u64, daily_goal_secs: u64) -> u8 {
    if seconds == 0 || daily_goal_secs == 0 {
        return 0;
    }
    let ratio = seconds as f64 / daily_goal_secs as f64;
    if ratio >= 1.0 {
        4
    } else if ratio >= 0.75 {
        3
    } else if ratio >= 0.5 {
        2
    } else {
        1
    }
}

/// "2h 5m" style, minutes only under an hour.
pub fn format_duration(seconds: u64) -> String {
    let minutes = seconds / 60;
    if minutes >= 60 {
        format!("{}h {}m", minutes / 60, minutes % 60)
    } else {
        format!("{minutes}m")
    }
}

/// CSV snapshot of the full ledger. Label and notes are quoted with doubled
/// inner quotes; times are local wall clock.
pub fn sessions_csv(sessions: &[Session]) -> String {
    let mut out = String::from("Date,Start,End,Duration (min),Label,Notes\n");
    for session in sessions {
        let start = session.start.with_timezone(&Local).format("%H:%M:%S");
        let end = session.end.with_timezone(&Local).format("%H:%M:%S");
        let minutes = (session.duration as f64 / 60.0).round() as u64;
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            session.date.format("%Y-%m-%d"),
            start,
            end,
            minutes,
            csv_quote(&session.label),
            csv_quote(&session.notes),
        ));
    }
    out
}

fn csv_quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Whether the Sunday summary notification should fire. At most once per
/// Sunday; `last_sent` is the guard.
pub fn weekly_report_due(today: NaiveDate, enabled: bool, last_sent: Option<NaiveDate>) -> bool {
    enabled && today.weekday() == Weekday::Sun && last_sent != Some(today)
}

/// Body text for the Sunday summary notification, covering the week that is
/// ending (Monday through today).
pub fn weekly_report_body(sessions: &[Session], today: NaiveDate) -> String {
    let summary = dashboard_summary(sessions, today);
    let time = format_duration(summary.week_seconds);
    match summary.top_label {
        Some(label) if summary.week_sessions > 0 => format!(
            "{time} focused across {} sessions this week. Top task: {label}.",
            summary.week_sessions
        ),
        _ => "No focus sessions logged this week.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::ledger::SessionLedger;

    // Wednesday.
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 17).unwrap()
    }

    fn session_on(date: NaiveDate, duration: u64, label: &str) -> Session {
        let end = Utc
            .with_ymd_and_hms(date.year(), date.month(), date.day(), 12, 0, 0)
            .unwrap();
        Session {
            date,
            start: end - chrono::Duration::seconds(duration as i64),
            end,
            duration,
            label: label.to_string(),
            notes: String::new(),
        }
    }

    fn days_back(back: u64) -> NaiveDate {
        today() - Days::new(back)
    }

    #[test]
    fn summary_splits_today_and_week() {
        let sessions = vec![
            session_on(today(), 1800, "writing"),
            session_on(today(), 600, "email"),
            session_on(days_back(1), 3600, "writing"),
            // Last week, outside the Monday boundary.
            session_on(days_back(7), 7200, "reading"),
        ];
        let summary = dashboard_summary(&sessions, today());
        assert_eq!(summary.today_seconds, 2400);
        assert_eq!(summary.today_sessions, 2);
        assert_eq!(summary.week_seconds, 6000);
        assert_eq!(summary.week_sessions, 3);
        assert_eq!(summary.total_sessions, 4);
        assert_eq!(summary.top_label.as_deref(), Some("writing"));
    }

    #[test]
    fn breakdown_percentages_sum_to_hundred() {
        let sessions = vec![
            session_on(today(), 2000, "a"),
            session_on(today(), 1000, "a"),
            session_on(today(), 1000, "b"),
        ];
        let slices = label_breakdown(&sessions);
        assert_eq!(slices[0].label, "a");
        assert_eq!(slices[0].sessions, 2);
        assert_eq!(slices[0].percent, 75.0);
        assert_eq!(slices[1].sessions, 1);
        assert_eq!(slices[1].percent, 25.0);
    }

    #[test]
    fn daily_chart_has_fourteen_buckets_with_gaps_filled() {
        let sessions = vec![session_on(days_back(2), 3600, "a")];
        let points = chart_data(&sessions, ChartRange::Daily, today());
        assert_eq!(points.len(), 14);
        assert_eq!(points[13].hours, 0.0);
        assert_eq!(points[11].hours, 1.0);
        assert!(points.iter().take(11).all(|p| p.hours == 0.0));
    }

    #[test]
    fn weekly_chart_buckets_on_mondays() {
        let sessions = vec![
            session_on(today(), 3600, "a"),
            // Sunday of last week lands in the previous bucket.
            session_on(days_back(3), 1800, "a"),
        ];
        let points = chart_data(&sessions, ChartRange::Weekly, today());
        assert_eq!(points.len(), 12);
        assert_eq!(points[11].hours, 1.0);
        assert_eq!(points[10].hours, 0.5);
    }

    #[test]
    fn streak_counts_back_and_today_shortfall_does_not_break() {
        let goal_secs = 3600;
        let mut sessions = vec![
            session_on(days_back(1), goal_secs, "a"),
            session_on(days_back(2), goal_secs, "a"),
            session_on(days_back(3), goal_secs, "a"),
            // Day 4 missed; streak stops there.
            session_on(days_back(5), goal_secs, "a"),
        ];
        let report = goal_report(&sessions, 1.0, 20.0, today());
        assert_eq!(report.streak_days, 3);

        // Hitting the goal today extends it.
        sessions.push(session_on(today(), goal_secs, "a"));
        let report = goal_report(&sessions, 1.0, 20.0, today());
        assert_eq!(report.streak_days, 4);
    }

    #[test]
    fn goal_percentages_and_records() {
        let sessions = vec![
            session_on(today(), 7200, "a"),
            session_on(days_back(1), 10800, "a"),
        ];
        let report = goal_report(&sessions, 4.0, 20.0, today());
        assert_eq!(report.daily_percent, 50.0);
        assert_eq!(report.weekly_percent, 25.0);
        let best = report.best_day.unwrap();
        assert_eq!(best.date, days_back(1));
        assert_eq!(best.seconds, 10800);
        assert_eq!(report.best_week.unwrap().week_start, week_start(today()));
        assert_eq!(report.this_week_seconds, 18000);
        assert_eq!(report.last_week_seconds, 0);
    }

    #[test]
    fn heatmap_starts_on_a_monday_and_grades_against_goal() {
        let sessions = vec![
            session_on(today(), 4 * 3600, "a"),
            session_on(days_back(1), 3 * 3600, "a"),
            session_on(days_back(2), 2 * 3600, "a"),
            session_on(days_back(3), 600, "a"),
        ];
        let cells = heatmap(&sessions, 4.0, today());
        assert_eq!(cells[0].date.weekday(), Weekday::Mon);
        assert!(cells.len() >= HEATMAP_SPAN_DAYS as usize);
        assert_eq!(cells.last().unwrap().date, today());

        let by_date = |d: NaiveDate| cells.iter().find(|c| c.date == d).unwrap().level;
        assert_eq!(by_date(today()), 4);
        assert_eq!(by_date(days_back(1)), 3);
        assert_eq!(by_date(days_back(2)), 2);
        assert_eq!(by_date(days_back(3)), 1);
        assert_eq!(by_date(days_back(4)), 0);
    }

    #[test]
    fn durations_format_compactly() {
        assert_eq!(format_duration(0), "0m");
        assert_eq!(format_duration(300), "5m");
        assert_eq!(format_duration(3900), "1h 5m");
        assert_eq!(format_duration(7200), "2h 0m");
    }

    #[test]
    fn csv_doubles_embedded_quotes() {
        let mut ledger = SessionLedger::default();
        let end = Utc.with_ymd_and_hms(2024, 7, 17, 14, 30, 0).unwrap();
        let idx = ledger.add(1500, "deep \"flow\" work", end);
        ledger.attach_notes(idx, "said \"done\"");

        let csv = sessions_csv(&ledger.sessions);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Date,Start,End,Duration (min),Label,Notes"
        );
        let row = lines.next().unwrap();
        assert!(row.contains("\"deep \"\"flow\"\" work\""));
        assert!(row.contains("\"said \"\"done\"\"\""));
        assert!(row.contains(",25,"));
    }

    #[test]
    fn weekly_report_fires_once_per_sunday() {
        let sunday = NaiveDate::from_ymd_opt(2024, 7, 21).unwrap();
        assert!(weekly_report_due(sunday, true, None));
        assert!(weekly_report_due(
            sunday,
            true,
            Some(sunday - Days::new(7))
        ));
        assert!(!weekly_report_due(sunday, true, Some(sunday)));
        assert!(!weekly_report_due(sunday, false, None));
        assert!(!weekly_report_due(today(), true, None));
    }
}
