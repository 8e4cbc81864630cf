//! Calendar derivations over the task list.
//!
//! Only the due date places a task on the calendar, and days are compared
//! as calendar dates in the viewer's time zone rather than as instants.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone};

use crate::models::Task;

/// Tasks due on `day` in `tz`, in list order
pub fn tasks_on<'a, Tz: TimeZone>(tasks: &'a [Task], day: NaiveDate, tz: &Tz) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|task| task.due_day_in(tz) == Some(day))
        .collect()
}

/// Tasks grouped by due day. Tasks without a usable due date are left out.
pub fn group_by_day<'a, Tz: TimeZone>(
    tasks: &'a [Task],
    tz: &Tz,
) -> BTreeMap<NaiveDate, Vec<&'a Task>> {
    let mut days: BTreeMap<NaiveDate, Vec<&'a Task>> = BTreeMap::new();
    for task in tasks {
        if let Some(day) = task.due_day_in(tz) {
            days.entry(day).or_default().push(task);
        }
    }
    days
}

/// How many upcoming tasks the calendar lists
pub const UPCOMING_LIMIT: usize = 5;

/// Tasks due at or after `now`, soonest first
pub fn upcoming<'a, Tz: TimeZone>(tasks: &'a [Task], now: &DateTime<Tz>) -> Vec<&'a Task> {
    let tz = now.timezone();
    let mut due: Vec<(DateTime<Tz>, &'a Task)> = tasks
        .iter()
        .filter_map(|task| task.due_in(&tz).map(|at| (at, task)))
        .filter(|(at, _)| at >= now)
        .collect();
    due.sort_by(|(a, _), (b, _)| a.cmp(b));
    due.into_iter().map(|(_, task)| task).collect()
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// One month of the calendar grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthView {
    first: NaiveDate,
}

impl MonthView {
    /// `None` for an invalid month
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|first| Self { first })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            first: date.with_day(1).unwrap_or(date),
        }
    }

    /// Parse `YYYY-MM`
    pub fn parse(s: &str) -> Option<Self> {
        let (year, month) = s.trim().split_once('-')?;
        Self::new(year.parse().ok()?, month.parse().ok()?)
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    /// "October 2026"
    pub fn title(&self) -> String {
        format!("{} {}", MONTH_NAMES[self.first.month0() as usize], self.year())
    }

    pub fn next(&self) -> Self {
        Self {
            first: self
                .first
                .checked_add_months(Months::new(1))
                .unwrap_or(self.first),
        }
    }

    pub fn prev(&self) -> Self {
        Self {
            first: self
                .first
                .checked_sub_months(Months::new(1))
                .unwrap_or(self.first),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year() && date.month() == self.month()
    }

    /// Every day of the month in order
    pub fn days(&self) -> Vec<NaiveDate> {
        self.first
            .iter_days()
            .take_while(|d| self.contains(*d))
            .collect()
    }

    /// Empty cells before the 1st in a grid whose weeks start on Sunday
    pub fn leading_blanks(&self) -> usize {
        self.first.weekday().num_days_from_sunday() as usize
    }

    /// Grid cells: `None` for padding, then each day of the month
    pub fn cells(&self) -> Vec<Option<NaiveDate>> {
        std::iter::repeat(None)
            .take(self.leading_blanks())
            .chain(self.days().into_iter().map(Some))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn task(id: i64, due: Option<&str>) -> Task {
        Task {
            id,
            user_id: "1".to_string(),
            title: format!("task {}", id),
            description: None,
            completed: false,
            due_date: due.map(str::to_string),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_tasks_on_ignores_time_of_day() {
        let tasks = vec![
            task(1, Some("2026-10-15T00:05:00Z")),
            task(2, Some("2026-10-15T23:55:00Z")),
            task(3, Some("2026-10-16T00:00:00Z")),
            task(4, None),
        ];
        let ids: Vec<i64> = tasks_on(&tasks, date(2026, 10, 15), &Utc)
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_day_depends_on_zone() {
        let tasks = vec![task(1, Some("2026-10-15T23:30:00Z"))];
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        assert_eq!(tasks_on(&tasks, date(2026, 10, 15), &Utc).len(), 1);
        assert_eq!(tasks_on(&tasks, date(2026, 10, 16), &tokyo).len(), 1);
        assert!(tasks_on(&tasks, date(2026, 10, 15), &tokyo).is_empty());
    }

    #[test]
    fn test_group_by_day_skips_undated() {
        let tasks = vec![
            task(1, Some("2026-10-20")),
            task(2, None),
            task(3, Some("2026-10-18T12:00:00Z")),
            task(4, Some("2026-10-20T08:00:00Z")),
            task(5, Some("garbage")),
        ];
        let groups = group_by_day(&tasks, &Utc);
        let days: Vec<NaiveDate> = groups.keys().copied().collect();
        assert_eq!(days, vec![date(2026, 10, 18), date(2026, 10, 20)]);
        let on_20: Vec<i64> = groups[&date(2026, 10, 20)].iter().map(|t| t.id).collect();
        assert_eq!(on_20, vec![1, 4]);
    }

    #[test]
    fn test_upcoming_sorted_soonest_first() {
        let tasks = vec![
            task(1, Some("2026-12-01T00:00:00Z")),
            task(2, Some("2026-01-01T00:00:00Z")),
            task(3, Some("2026-10-16T09:00:00Z")),
            task(4, None),
            task(5, Some("2026-10-15T12:00:00Z")),
        ];
        let now = Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap();
        let ids: Vec<i64> = upcoming(&tasks, &now).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![5, 3, 1]);
    }

    #[test]
    fn test_upcoming_limit_keeps_soonest() {
        let tasks: Vec<Task> = (1..=7)
            .rev()
            .map(|day| task(day, Some(&format!("2026-10-{:02}T09:00:00Z", 15 + day))))
            .collect();
        let now = Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap();
        let ids: Vec<i64> = upcoming(&tasks, &now)
            .into_iter()
            .take(UPCOMING_LIMIT)
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_month_grid() {
        // October 1st 2026 is a Thursday
        let month = MonthView::new(2026, 10).unwrap();
        assert_eq!(month.title(), "October 2026");
        assert_eq!(month.leading_blanks(), 4);
        assert_eq!(month.days().len(), 31);

        let cells = month.cells();
        assert_eq!(cells.len(), 35);
        assert!(cells[..4].iter().all(Option::is_none));
        assert_eq!(cells[4], Some(date(2026, 10, 1)));
        assert_eq!(cells[34], Some(date(2026, 10, 31)));
    }

    #[test]
    fn test_february_leap_year() {
        assert_eq!(MonthView::new(2028, 2).unwrap().days().len(), 29);
        assert_eq!(MonthView::new(2026, 2).unwrap().days().len(), 28);
    }

    #[test]
    fn test_month_navigation() {
        let dec = MonthView::new(2026, 12).unwrap();
        assert_eq!(dec.next(), MonthView::new(2027, 1).unwrap());
        assert_eq!(dec.next().prev(), dec);
        assert_eq!(
            MonthView::containing(date(2026, 3, 31)).prev(),
            MonthView::new(2026, 2).unwrap()
        );
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(MonthView::parse("2026-03"), MonthView::new(2026, 3));
        assert_eq!(MonthView::parse("2026-13"), None);
        assert_eq!(MonthView::parse("March"), None);
    }
}
