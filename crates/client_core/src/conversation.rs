use shared::{
    domain::{RunId, Speaker, Timestamp},
    protocol::{LogMessage, ModelSettings, RunRecord, ScenarioRecord},
};

use crate::{error::ClientError, markup, remote::SimulationApi};

pub const AI_LABEL: &str = "AI (Driftwood)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOrigin {
    Ai,
    Participant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantSummary {
    pub name: String,
    pub role: String,
    pub perspective: String,
    pub meta_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub origin: MessageOrigin,
    pub speaker: String,
    pub label: String,
    pub time: String,
    pub content: String,
    pub content_html: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationView {
    pub run_id: RunId,
    pub title: String,
    pub system_prompt: String,
    pub settings: ModelSettings,
    pub participants: Vec<ParticipantSummary>,
    pub run_timestamp: String,
    pub message_count: usize,
    pub transcript: Vec<TranscriptEntry>,
}

fn message_time(timestamp: &Timestamp) -> String {
    timestamp.as_datetime().format("%H:%M:%S").to_string()
}

fn entry(message: &LogMessage) -> TranscriptEntry {
    let (origin, label) = match &message.speaker {
        Speaker::Ai => (MessageOrigin::Ai, AI_LABEL.to_string()),
        Speaker::Participant(name) => (MessageOrigin::Participant, name.clone()),
    };
    TranscriptEntry {
        origin,
        speaker: message.speaker.to_string(),
        label,
        time: message_time(&message.timestamp),
        content: message.content.clone(),
        content_html: markup::to_html(&message.content),
    }
}

pub fn build_view(
    run: &RunRecord,
    scenarios: &[ScenarioRecord],
) -> Result<ConversationView, ClientError> {
    let scenario = scenarios
        .iter()
        .find(|scenario| scenario.id == run.scenario_id)
        .ok_or_else(|| ClientError::not_found("scenario", run.scenario_id))?;
    let log = run.log.as_deref().unwrap_or_default();

    Ok(ConversationView {
        run_id: run.id,
        title: scenario.name.clone(),
        system_prompt: scenario.system_prompt.clone(),
        settings: scenario.settings.clone(),
        participants: scenario
            .participants
            .iter()
            .map(|participant| ParticipantSummary {
                name: participant.name.clone(),
                role: participant.role.clone(),
                perspective: participant.perspective.clone(),
                meta_tags: participant.meta_tags.clone(),
            })
            .collect(),
        run_timestamp: run
            .timestamp
            .as_datetime()
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
        message_count: log.len(),
        transcript: log.iter().map(entry).collect(),
    })
}

#[derive(Clone)]
pub struct ConversationPresenter {
    api: SimulationApi,
}

impl ConversationPresenter {
    pub fn new(api: SimulationApi) -> Self {
        Self { api }
    }

    pub async fn resolve(&self, run: RunRecord) -> Result<ConversationView, ClientError> {
        let run = if run.log.is_some() {
            run
        } else {
            self.api.fetch_run(run.id).await?
        };
        let scenarios = self.api.list_scenarios().await?;
        build_view(&run, &scenarios)
    }
}

#[cfg(test)]
#[path = "tests/conversation_tests.rs"]
mod tests;
