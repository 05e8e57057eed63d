use std::fmt::Write as _;

use client_core::{
    conversation::ConversationView, draft::ScenarioDraft, markup, AppEvent, HistoryView,
    MessageOrigin, NoticeLevel, ParticipantField, ViewName,
};

#[derive(Debug, Clone, Copy)]
pub struct Style {
    pub ansi: bool,
}

impl Style {
    fn paint(self, code: &str, text: &str) -> String {
        if self.ansi {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn message(self, content: &str) -> String {
        if self.ansi {
            markup::to_ansi(content)
        } else {
            markup::to_plain(content)
        }
    }
}

pub fn event(event: &AppEvent, style: Style) -> Option<String> {
    match event {
        AppEvent::ViewChanged(transition) => Some(style.paint(
            "1",
            &format!("== {} ==", view_title(transition.to)),
        )),
        AppEvent::ParticipantAdded(card) => Some(format!("Added participant {}", card.ordinal)),
        AppEvent::ParticipantsRenumbered(cards) => Some(format!(
            "Participants: {}",
            if cards.is_empty() {
                "none".to_string()
            } else {
                cards
                    .iter()
                    .map(|card| format!("#{}", card.ordinal))
                    .collect::<Vec<_>>()
                    .join(" ")
            }
        )),
        AppEvent::HistoryLoading => Some("Loading history...".to_string()),
        AppEvent::HistoryRendered(view) => Some(history(view, style)),
        AppEvent::HistoryLoadFailed => None,
        AppEvent::ConversationReady(view) => Some(conversation(view, style)),
        AppEvent::Notice(notice) => Some(match notice.level {
            NoticeLevel::Success => style.paint("32", &format!("[ok] {}", notice.message)),
            NoticeLevel::Info => style.paint("36", &format!("[info] {}", notice.message)),
            NoticeLevel::Error => style.paint("31", &format!("[error] {}", notice.message)),
        }),
        AppEvent::Loading(Some(message)) => Some(style.paint("2", message)),
        AppEvent::Loading(None) => None,
    }
}

fn view_title(view: ViewName) -> &'static str {
    match view {
        ViewName::ScenarioBuilder => "Scenario Builder",
        ViewName::ConversationViewer => "Conversation",
        ViewName::History => "Simulation History",
    }
}

pub fn history(view: &HistoryView, style: Style) -> String {
    let mut out = format!("Filter: {}\n", view.filter);
    if let Some(message) = view.empty_message {
        out.push_str(message);
        return out;
    }
    for row in &view.rows {
        let star = if row.starred { "*" } else { " " };
        let count = row
            .message_count
            .map(|count| count.to_string())
            .unwrap_or_else(|| "~".to_string());
        let _ = writeln!(
            out,
            "{star} {}  {:<32} {:>3} msgs  {} ({})",
            style.paint("33", &row.short_id),
            row.title,
            count,
            row.timestamp,
            row.relative_time,
        );
    }
    out.pop();
    out
}

pub fn conversation(view: &ConversationView, style: Style) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", style.paint("1", &view.title));
    let _ = writeln!(
        out,
        "Run {} | {} | {} messages",
        view.run_id, view.run_timestamp, view.message_count
    );
    let _ = writeln!(
        out,
        "Model {} | temperature {} | max tokens {}",
        view.settings.model, view.settings.temperature, view.settings.max_tokens
    );
    let _ = writeln!(out, "System prompt: {}", view.system_prompt);
    for participant in &view.participants {
        let _ = writeln!(
            out,
            "  - {} ({}): {} [{}]",
            participant.name,
            participant.role,
            participant.perspective,
            participant.meta_tags.join(", ")
        );
    }
    for entry in &view.transcript {
        let label = match entry.origin {
            MessageOrigin::Ai => style.paint("35", &entry.label),
            MessageOrigin::Participant => style.paint("34", &entry.label),
        };
        let _ = writeln!(out, "\n[{}] {label}", entry.time);
        let _ = writeln!(out, "{}", style.message(&entry.content));
    }
    out.pop();
    out
}

pub fn draft(draft: &ScenarioDraft) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Name: {}", draft.name);
    let _ = writeln!(out, "System prompt: {}", draft.system_prompt);
    let _ = writeln!(
        out,
        "Settings: model {} | temperature {} | max tokens {}",
        draft.settings.model, draft.settings.temperature, draft.settings.max_tokens
    );
    for (index, participant) in draft.participants().iter().enumerate() {
        let _ = writeln!(out, "Participant {}", index + 1);
        for field in ParticipantField::ALL {
            let _ = writeln!(out, "  {}: {}", field.label(), participant.field(field));
        }
        let tags = participant
            .meta_tags
            .iter()
            .filter(|tag| !tag.is_empty())
            .cloned()
            .collect::<Vec<_>>();
        let _ = writeln!(out, "  meta tags: {}", tags.join(", "));
    }
    let issues = draft.issues();
    if issues.is_empty() {
        out.push_str("Ready to submit.");
    } else {
        let _ = write!(
            out,
            "Missing: {}",
            issues
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    out
}
