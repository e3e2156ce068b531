use std::io::{self, IsTerminal, Write};

use planner_shared::{AdminUserRow, TaskRow};
use unicode_width::UnicodeWidthStr;

use crate::calendar::DayCell;
use crate::config::Config;
use crate::stats::{DayStats, ModeAggregate};
use crate::timer::TimerOutcome;
use crate::view::{PlannerView, RowDetail, TaskRowView, TimerView};

const WEEKDAYS: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            color: cfg.color_enabled() && io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, view))]
    pub fn print_view(&self, view: &PlannerView) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_calendar(&mut out, view)?;
        writeln!(out)?;
        self.write_day(&mut out, view)?;
        Ok(())
    }

    pub fn print_calendar(&self, view: &PlannerView) -> anyhow::Result<()> {
        self.write_calendar(&mut io::stdout().lock(), view)
    }

    pub fn print_day(&self, view: &PlannerView) -> anyhow::Result<()> {
        self.write_day(&mut io::stdout().lock(), view)
    }

    pub fn print_stats(&self, view: &PlannerView) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", view.date_title)?;
        self.write_stats(&mut out, &view.stats, view.aggregate.as_ref())
    }

    pub fn write_calendar<W: Write>(&self, out: &mut W, view: &PlannerView) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(&view.month_title, "1"))?;
        writeln!(out, "{}", WEEKDAYS.map(|day| format!("{day} ")).concat().trim_end())?;
        for week in view.calendar.chunks(7) {
            let line: Vec<String> = week.iter().map(|cell| self.day_cell(cell)).collect();
            writeln!(out, "{}", line.concat().trim_end())?;
        }
        Ok(())
    }

    /// Two-digit day plus a marker: `*` for days with tasks, `<` for the
    /// selected day.
    fn day_cell(&self, cell: &DayCell) -> String {
        let number = format!("{:>2}", cell.day_number);
        if !cell.in_current_month {
            return format!("{} ", self.paint(&number, "2"));
        }
        let marker = if cell.is_selected {
            '<'
        } else if cell.has_tasks {
            '*'
        } else {
            ' '
        };
        let number = if cell.is_today {
            self.paint(&number, "1;4")
        } else if cell.is_selected {
            self.paint(&number, "7")
        } else {
            number
        };
        format!("{number}{marker}")
    }

    pub fn write_day<W: Write>(&self, out: &mut W, view: &PlannerView) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(&view.date_title, "1"))?;
        if view.is_empty {
            writeln!(out, "No tasks for this day.")?;
        } else {
            self.write_rows(out, &view.rows)?;
        }
        writeln!(out)?;
        self.write_stats(out, &view.stats, view.aggregate.as_ref())?;
        if let Some(timer) = &view.timer {
            writeln!(out, "{}", self.timer_line(timer))?;
        }
        Ok(())
    }

    fn write_rows<W: Write>(&self, out: &mut W, rows: &[TaskRowView]) -> anyhow::Result<()> {
        let Some(first) = rows.first() else {
            return Ok(());
        };
        let mut headers = vec!["ID".to_string(), "Done".to_string(), "Task".to_string()];
        match first.detail {
            RowDetail::Generic { .. } => headers.push("Time".to_string()),
            RowDetail::Fitness { .. } => headers.push("Duration".to_string()),
            RowDetail::Study { .. } => {
                headers.push("Subject".to_string());
                headers.push("Duration".to_string());
            }
        }

        let body = rows
            .iter()
            .map(|row| {
                let mut cells = vec![
                    self.paint(&row.id.to_string(), "33"),
                    if row.completed { "[x]" } else { "[ ]" }.to_string(),
                    if row.completed {
                        self.paint(&row.text, "9")
                    } else {
                        row.text.clone()
                    },
                ];
                match &row.detail {
                    RowDetail::Generic { time } => cells.push(time.clone()),
                    RowDetail::Fitness { duration } => {
                        cells.push(duration.clone().unwrap_or_default())
                    }
                    RowDetail::Study {
                        subject,
                        duration,
                        can_start_timer,
                    } => {
                        cells.push(subject.clone().unwrap_or_default());
                        cells.push(match duration {
                            Some(display) => display.clone(),
                            None if *can_start_timer => self.paint("timer ready", "36"),
                            None => String::new(),
                        });
                    }
                }
                cells
            })
            .collect();

        write_table(out, headers, body)
    }

    fn write_stats<W: Write>(
        &self,
        out: &mut W,
        stats: &DayStats,
        aggregate: Option<&ModeAggregate>,
    ) -> anyhow::Result<()> {
        writeln!(
            out,
            "Total {}  Completed {}  Progress {}%",
            stats.total, stats.completed, stats.percentage
        )?;
        match aggregate {
            Some(ModeAggregate::Fitness { display, .. }) => {
                writeln!(out, "Training time {display}")?;
            }
            Some(ModeAggregate::Study {
                display, subjects, ..
            }) => {
                writeln!(out, "Study time {display}  Subjects {subjects}")?;
            }
            None => {}
        }
        Ok(())
    }

    pub fn timer_line(&self, timer: &TimerView) -> String {
        let label = match &timer.subject {
            Some(subject) => format!("{subject} - {}", timer.text),
            None => timer.text.clone(),
        };
        let state = if timer.paused {
            self.paint("paused", "33")
        } else {
            self.paint("running", "32")
        };
        format!(
            "{label}  {}  {state}  [p] {}  [s] Stop  [q] Quit",
            self.paint(&timer.elapsed, "1"),
            timer.pause_label
        )
    }

    /// Redraws the stopwatch in place.
    pub fn print_timer(&self, timer: &TimerView) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        write!(out, "\r\x1b[2K{}", self.timer_line(timer))?;
        out.flush()?;
        Ok(())
    }

    pub fn print_timer_outcome(&self, outcome: &TimerOutcome) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out)?;
        writeln!(
            out,
            "Recorded {} on task {} ({} elapsed)",
            outcome.display,
            outcome.task_id,
            crate::datetime::format_elapsed(outcome.elapsed_seconds)
        )?;
        Ok(())
    }

    pub fn print_users(&self, users: &[AdminUserRow]) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            "Name".to_string(),
            "Email".to_string(),
            "Created".to_string(),
        ];
        let rows = users
            .iter()
            .map(|user| {
                vec![
                    self.paint(&user.id.to_string(), "33"),
                    user.name.clone(),
                    user.email.clone(),
                    user.created_at.clone(),
                ]
            })
            .collect();
        write_table(&mut io::stdout().lock(), headers, rows)
    }

    pub fn print_task_rows(&self, rows: &[TaskRow]) -> anyhow::Result<()> {
        let headers = vec![
            "Planner".to_string(),
            "Done".to_string(),
            "Task".to_string(),
            "Date".to_string(),
            "Duration".to_string(),
            "Subject".to_string(),
        ];
        let body = rows
            .iter()
            .map(|row| {
                vec![
                    row.planner_type.clone().unwrap_or_default(),
                    if row.is_completed() { "[x]" } else { "[ ]" }.to_string(),
                    row.text.clone(),
                    format!("{} {}", row.date.get(..10).unwrap_or(row.date.as_str()), row.time),
                    row.time_display.clone().unwrap_or_default(),
                    row.subject.clone().unwrap_or_default(),
                ]
            })
            .collect();
        write_table(&mut io::stdout().lock(), headers, body)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    writer: &mut W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.width()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(strip_ansi(cell).width());
        }
    }

    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(header, &width)| format!("{header:width$}"))
        .collect();
    writeln!(writer, "{}", header_line.join(" ").trim_end())?;
    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    writeln!(writer, "{}", rule.join(" "))?;

    for row in rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let padding = width.saturating_sub(strip_ansi(cell).width());
                format!("{cell}{}", " ".repeat(padding))
            })
            .collect();
        writeln!(writer, "{}", line.join(" ").trim_end())?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;
    for ch in s.chars() {
        if escaped {
            escaped = ch != 'm';
            continue;
        }
        if ch == '\x1b' {
            escaped = true;
            continue;
        }
        out.push(ch);
    }
    out
}
