use std::collections::BTreeMap;
use std::io::Write;

use crossterm::{
    cursor, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use tokio::time::Instant;

use crate::run::RunEvent;

/// Single-line live progress on stderr, driven by run events.
pub(crate) struct ProgressTracker {
    enabled: bool,
    no_color: bool,
    style: ProgressStyle,
    generation: Option<u64>,
    started: Instant,
    endpoints: usize,
    probes_per_endpoint: usize,
    completed: BTreeMap<usize, usize>,
    finished_routes: usize,
}

impl ProgressTracker {
    pub(crate) fn new(enabled: bool, no_color: bool) -> Self {
        Self {
            enabled,
            no_color,
            style: ProgressStyle::new(30),
            generation: None,
            started: Instant::now(),
            endpoints: 0,
            probes_per_endpoint: 0,
            completed: BTreeMap::new(),
            finished_routes: 0,
        }
    }

    pub(crate) fn handle(&mut self, event: &RunEvent) {
        match event {
            RunEvent::Started {
                generation,
                endpoints,
                probes_per_endpoint,
            } => {
                self.generation = Some(*generation);
                self.started = Instant::now();
                self.endpoints = *endpoints;
                self.probes_per_endpoint = *probes_per_endpoint;
                self.completed.clear();
                self.finished_routes = 0;
            }
            RunEvent::Progress {
                generation,
                index,
                progress,
            } if self.generation == Some(*generation) => {
                let entry = self.completed.entry(*index).or_default();
                *entry = (*entry).max(progress.completed);
            }
            RunEvent::RouteFinished { generation, .. } if self.generation == Some(*generation) => {
                self.finished_routes = self.finished_routes.saturating_add(1);
            }
            RunEvent::Finished { generation, .. } if self.generation == Some(*generation) => {
                self.render();
                self.finish();
                return;
            }
            RunEvent::Progress { .. }
            | RunEvent::RouteFinished { .. }
            | RunEvent::Finished { .. }
            | RunEvent::RouteUpdated { .. }
            | RunEvent::Aborted { .. } => return,
        }
        self.render();
    }

    fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            completed: self.completed.values().copied().sum(),
            goal: self.endpoints.saturating_mul(self.probes_per_endpoint),
            routes_done: self.finished_routes,
            routes_total: self.endpoints,
            elapsed_ms: self.started.elapsed().as_millis(),
        }
    }

    fn render(&self) {
        if !self.enabled || self.generation.is_none() {
            return;
        }
        let line = build_progress_line(&self.style, &self.snapshot(), self.no_color);
        if let Err(err) = render_progress_line(&line, self.no_color) {
            tracing::debug!("Failed to render progress: {}", err);
        }
    }

    fn finish(&mut self) {
        if !self.enabled || self.generation.take().is_none() {
            return;
        }
        let mut out = std::io::stderr();
        if let Err(err) = out.write_all(b"\n").and_then(|()| out.flush()) {
            tracing::debug!("Failed to finish progress line: {}", err);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ProgressSnapshot {
    completed: usize,
    goal: usize,
    routes_done: usize,
    routes_total: usize,
    elapsed_ms: u128,
}

fn render_progress_line(line: &[ProgressSegment], no_color: bool) -> Result<(), std::io::Error> {
    let mut out = std::io::stderr();
    queue!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine))?;
    for segment in line {
        match segment.color {
            Some(color) if !no_color => {
                queue!(
                    out,
                    SetForegroundColor(color),
                    Print(&segment.text),
                    ResetColor
                )?;
            }
            Some(_) | None => queue!(out, Print(&segment.text))?,
        }
    }
    out.flush()?;
    Ok(())
}

fn build_progress_line(
    style: &ProgressStyle,
    snapshot: &ProgressSnapshot,
    no_color: bool,
) -> Vec<ProgressSegment> {
    let size = style.size.max(1);
    let goal = snapshot.goal.max(1);
    let current = snapshot.completed.min(goal);

    let current_u128 = u128::from(u64::try_from(current).unwrap_or(u64::MAX));
    let size_u128 = u128::from(u64::try_from(size).unwrap_or(u64::MAX));
    let goal_u128 = u128::from(u64::try_from(goal).unwrap_or(u64::MAX));

    let scaled = current_u128
        .saturating_mul(size_u128)
        .checked_div(goal_u128)
        .unwrap_or(0);
    let complete_size = usize::try_from(scaled).unwrap_or(size).min(size);
    let incomplete_size = size.saturating_sub(complete_size);

    let percent_x100 = current_u128
        .saturating_mul(10_000)
        .checked_div(goal_u128)
        .unwrap_or(0);
    let percent_whole = percent_x100.checked_div(100).unwrap_or(0);
    let percent_frac = percent_x100.checked_rem(100).unwrap_or(0);
    let percent_text = format!(" {}.{:02}%", percent_whole, percent_frac);

    let counts_text = format!(
        " | {}/{} probes | {}/{} endpoints",
        current, snapshot.goal, snapshot.routes_done, snapshot.routes_total
    );

    let elapsed_tenths = snapshot.elapsed_ms.checked_div(100).unwrap_or(0);
    let secs = elapsed_tenths.checked_div(10).unwrap_or(0);
    let tenths = elapsed_tenths.checked_rem(10).unwrap_or(0);
    let time_text = format!(" | {}.{}s", secs, tenths);

    let progress_bar = format!(
        "{}{}{}{}",
        style.begin,
        style.fill.repeat(complete_size),
        style.empty.repeat(incomplete_size),
        style.end
    );

    if no_color {
        vec![
            ProgressSegment::plain(progress_bar),
            ProgressSegment::plain(percent_text),
            ProgressSegment::plain(counts_text),
            ProgressSegment::plain(time_text),
        ]
    } else {
        vec![
            ProgressSegment::plain(progress_bar),
            ProgressSegment::colored(percent_text, Color::Cyan),
            ProgressSegment::plain(counts_text),
            ProgressSegment::colored(time_text, Color::Yellow),
        ]
    }
}

struct ProgressStyle {
    size: usize,
    begin: String,
    end: String,
    fill: String,
    empty: String,
}

impl ProgressStyle {
    fn new(size: usize) -> Self {
        Self {
            size,
            begin: "[".to_owned(),
            end: "]".to_owned(),
            fill: "#".to_owned(),
            empty: "-".to_owned(),
        }
    }
}

#[derive(Debug)]
struct ProgressSegment {
    text: String,
    color: Option<Color>,
}

impl ProgressSegment {
    const fn plain(text: String) -> Self {
        Self { text, color: None }
    }

    const fn colored(text: String, color: Color) -> Self {
        Self {
            text,
            color: Some(color),
        }
    }
}
