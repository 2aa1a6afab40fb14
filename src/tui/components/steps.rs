//! Step list and overall progress gauge

use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::install::JobState;
use crate::tui::styles::Theme;

const STEPS: [(JobState, &str); 3] = [
    (JobState::CheckingConverter, "Check converter"),
    (JobState::Converting, "Convert package"),
    (JobState::Installing, "Install package"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Active,
    Done,
    Failed,
}

pub struct StepList;

impl StepList {
    /// Status of each step. `reached` is the last non-terminal state the job
    /// entered; a failure is pinned on that step.
    pub fn statuses(state: JobState, reached: JobState) -> [StepStatus; 3] {
        let position = |s: JobState| match s {
            JobState::Idle => 0,
            JobState::CheckingConverter | JobState::InstallingConverter => 1,
            JobState::Converting => 2,
            JobState::Installing => 3,
            JobState::Done | JobState::Failed(_) => 4,
        };

        let current = position(reached);
        let mut out = [StepStatus::Pending; 3];
        for (i, status) in out.iter_mut().enumerate() {
            let step = i + 1;
            *status = match state {
                JobState::Done => StepStatus::Done,
                JobState::Failed(_) if step == current => StepStatus::Failed,
                _ if step < current => StepStatus::Done,
                _ if step == current => StepStatus::Active,
                _ => StepStatus::Pending,
            };
        }
        out
    }

    pub fn render(frame: &mut Frame, area: Rect, state: JobState, reached: JobState, theme: &Theme) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.border))
            .title(" Progress ")
            .title_style(Style::default().fg(theme.title).bold());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(inner);

        let statuses = Self::statuses(state, reached);
        let lines: Vec<Line> = STEPS
            .iter()
            .zip(statuses)
            .map(|((step_state, name), status)| {
                let name = if *step_state == JobState::CheckingConverter
                    && reached == JobState::InstallingConverter
                {
                    "Install converter"
                } else {
                    name
                };
                let (icon, style) = match status {
                    StepStatus::Pending => ("○", Style::default().fg(theme.dimmed)),
                    StepStatus::Active => ("●", Style::default().fg(theme.running).bold()),
                    StepStatus::Done => ("✓", Style::default().fg(theme.success)),
                    StepStatus::Failed => ("✗", Style::default().fg(theme.error).bold()),
                };
                Line::from(vec![
                    Span::styled(format!(" {} ", icon), style),
                    Span::styled(name.to_string(), style),
                ])
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), chunks[0]);

        let gauge_color = match state {
            JobState::Failed(_) => theme.error,
            JobState::Done => theme.success,
            _ => theme.accent,
        };
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(gauge_color))
            .ratio(state.progress().clamp(0.0, 1.0))
            .label(state.label());
        frame.render_widget(gauge, chunks[1]);
    }
}
