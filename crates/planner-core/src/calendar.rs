use chrono::{
  Datelike,
  NaiveDate
};

use crate::datetime::{
  add_days,
  days_in_month,
  first_day_of_month,
  last_day_of_month
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct DayCell {
  pub date:             NaiveDate,
  pub day_number:       u32,
  pub in_current_month: bool,
  pub is_today:         bool,
  pub is_selected:      bool,
  pub has_tasks:        bool
}

impl DayCell {
  fn padding(date: NaiveDate) -> Self {
    Self {
      date,
      day_number: date.day(),
      in_current_month: false,
      is_today: false,
      is_selected: false,
      has_tasks: false
    }
  }
}

/// Builds the Sunday-first month grid
/// for `year`/`month`, padded with
/// neighbouring-month days to whole
/// weeks. Only current-month cells carry
/// the today/selected/has-tasks flags.
pub fn build_month_grid<F>(
  year: i32,
  month: u32,
  selected: NaiveDate,
  today: NaiveDate,
  has_tasks: F
) -> Vec<DayCell>
where
  F: Fn(NaiveDate) -> bool
{
  let first =
    first_day_of_month(year, month);
  let leading = first
    .weekday()
    .num_days_from_sunday()
    as i64;
  let month_len =
    days_in_month(year, month);

  let mut cells = Vec::with_capacity(42);

  for offset in (1..=leading).rev() {
    cells.push(DayCell::padding(
      add_days(first, -offset)
    ));
  }

  for day in 0..month_len {
    let date =
      add_days(first, i64::from(day));
    cells.push(DayCell {
      date,
      day_number: date.day(),
      in_current_month: true,
      is_today: date == today,
      is_selected: date == selected,
      has_tasks: has_tasks(date)
    });
  }

  let trailing = (7 - cells.len() % 7) % 7;
  let last =
    last_day_of_month(year, month);
  for offset in 1..=trailing {
    cells.push(DayCell::padding(
      add_days(last, offset as i64)
    ));
  }

  cells
}

/// `"October 2026"`
pub fn month_title(
  focus: NaiveDate
) -> String {
  focus.format("%B %Y").to_string()
}

/// `"Today"` for the current day,
/// otherwise `"16 October"`.
pub fn selected_date_title(
  selected: NaiveDate,
  today: NaiveDate
) -> String {
  if selected == today {
    "Today".to_string()
  } else {
    selected.format("%-d %B").to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ymd(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn october_2026_starts_on_thursday() {
    let today = ymd(2026, 10, 16);
    let grid = build_month_grid(
      2026,
      10,
      today,
      today,
      |_| false
    );

    assert_eq!(grid.len(), 35);
    let leading: Vec<u32> = grid
      .iter()
      .take_while(|c| !c.in_current_month)
      .map(|c| c.day_number)
      .collect();
    assert_eq!(leading, vec![27, 28, 29, 30]);
    assert_eq!(grid[4].date, ymd(2026, 10, 1));
    assert!(
      grid
        .last()
        .is_some_and(|c| c.in_current_month)
    );
  }

  #[test]
  fn february_2026_needs_no_padding() {
    let today = ymd(2026, 2, 1);
    let grid = build_month_grid(
      2026,
      2,
      today,
      today,
      |_| false
    );
    assert_eq!(grid.len(), 28);
    assert!(
      grid.iter().all(|c| c.in_current_month)
    );
  }

  #[test]
  fn every_month_is_whole_weeks_with_ascending_days(
  ) {
    let selected = ymd(2000, 1, 1);
    for year in [1600, 1899, 1900, 2000, 2024, 2026, 2100] {
      for month in 1..=12 {
        let grid = build_month_grid(
          year,
          month,
          selected,
          selected,
          |_| false
        );
        assert_eq!(grid.len() % 7, 0);

        let current: Vec<u32> = grid
          .iter()
          .skip_while(|c| !c.in_current_month)
          .take_while(|c| c.in_current_month)
          .map(|c| c.day_number)
          .collect();
        let expected: Vec<u32> =
          (1..=days_in_month(year, month))
            .collect();
        assert_eq!(current, expected);
        assert_eq!(
          grid
            .iter()
            .filter(|c| c.in_current_month)
            .count(),
          expected.len()
        );
        assert_eq!(
          grid[0].date.weekday(),
          chrono::Weekday::Sun
        );
      }
    }
  }

  #[test]
  fn flags_only_mark_current_month_cells(
  ) {
    let today = ymd(2026, 10, 16);
    let selected = ymd(2026, 10, 20);
    let busy = [
      ymd(2026, 10, 2),
      ymd(2026, 9, 30)
    ];
    let grid = build_month_grid(
      2026,
      10,
      selected,
      today,
      |date| busy.contains(&date)
    );

    let flagged_today: Vec<_> = grid
      .iter()
      .filter(|c| c.is_today)
      .map(|c| c.date)
      .collect();
    assert_eq!(flagged_today, vec![today]);

    let flagged_selected: Vec<_> = grid
      .iter()
      .filter(|c| c.is_selected)
      .map(|c| c.date)
      .collect();
    assert_eq!(flagged_selected, vec![selected]);

    let with_tasks: Vec<_> = grid
      .iter()
      .filter(|c| c.has_tasks)
      .map(|c| c.date)
      .collect();
    assert_eq!(with_tasks, vec![ymd(2026, 10, 2)]);
  }

  #[test]
  fn titles_use_today_label() {
    let today = ymd(2026, 10, 16);
    assert_eq!(
      selected_date_title(today, today),
      "Today"
    );
    assert_eq!(
      selected_date_title(
        ymd(2026, 10, 5),
        today
      ),
      "5 October"
    );
    assert_eq!(
      month_title(ymd(2026, 10, 1)),
      "October 2026"
    );
  }
}
