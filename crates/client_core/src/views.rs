use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ViewName {
    #[default]
    ScenarioBuilder,
    ConversationViewer,
    History,
}

impl ViewName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ScenarioBuilder => "scenario",
            Self::ConversationViewer => "conversation",
            Self::History => "history",
        }
    }
}

impl fmt::Display for ViewName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scenario" | "scenario-builder" | "builder" => Ok(Self::ScenarioBuilder),
            "conversation" | "conversation-viewer" => Ok(Self::ConversationViewer),
            "history" => Ok(Self::History),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ViewName,
    pub to: ViewName,
}

#[derive(Debug, Clone, Default)]
pub struct ViewController {
    active: ViewName,
}

impl ViewController {
    pub fn active(&self) -> ViewName {
        self.active
    }

    /// Activates `view`. Re-entering the active view still counts as a
    /// transition so its entry side effects run again.
    pub fn activate(&mut self, view: ViewName) -> Transition {
        let from = std::mem::replace(&mut self.active, view);
        Transition { from, to: view }
    }

    pub fn show_view(&mut self, name: &str) -> Option<Transition> {
        name.parse().ok().map(|view| self.activate(view))
    }
}
