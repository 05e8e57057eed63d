use std::{fs, path::Path};

use anyhow::{bail, Context};
use client_core::{draft::MAX_META_TAGS, ParticipantField, SimulationLab};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScenarioFile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub settings: SettingsOverride,
    #[serde(default)]
    pub participants: Vec<ParticipantEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsOverride {
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParticipantEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub perspective: String,
    #[serde(default)]
    pub initial_message: String,
    #[serde(default)]
    pub meta_tags: Vec<String>,
}

impl ScenarioFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario file '{}'", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid scenario file '{}'", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let file: Self = toml::from_str(raw)?;
        for (index, participant) in file.participants.iter().enumerate() {
            if participant.meta_tags.len() > MAX_META_TAGS {
                bail!(
                    "participant {} has {} meta tags (at most {MAX_META_TAGS})",
                    index + 1,
                    participant.meta_tags.len()
                );
            }
        }
        Ok(file)
    }

    /// Replaces the lab's draft with this scenario through the regular
    /// editing operations, so submission validates it like typed input.
    pub async fn apply(&self, lab: &SimulationLab) -> anyhow::Result<()> {
        lab.discard_draft().await;
        lab.set_scenario_name(&self.name).await;
        lab.set_system_prompt(&self.system_prompt).await;

        let mut settings = lab.draft_snapshot().await.settings;
        if let Some(model) = &self.settings.model {
            settings.model = model.clone();
        }
        if let Some(temperature) = self.settings.temperature {
            settings.temperature = temperature;
        }
        if let Some(max_tokens) = self.settings.max_tokens {
            settings.max_tokens = max_tokens;
        }
        lab.set_settings(settings).await;

        let mut cards = lab.participant_cards().await.into_iter();
        let initial = cards.next().map(|card| card.participant_id);
        if self.participants.is_empty() {
            if let Some(id) = initial {
                lab.remove_participant(id).await;
            }
            return Ok(());
        }

        for (index, entry) in self.participants.iter().enumerate() {
            let id = match (index, initial) {
                (0, Some(id)) => id,
                _ => lab.add_participant().await.participant_id,
            };
            lab.update_participant(id, ParticipantField::Name, &entry.name)
                .await;
            lab.update_participant(id, ParticipantField::Role, &entry.role)
                .await;
            lab.update_participant(id, ParticipantField::Perspective, &entry.perspective)
                .await;
            lab.update_participant(id, ParticipantField::InitialMessage, &entry.initial_message)
                .await;
            for (slot, tag) in entry.meta_tags.iter().enumerate() {
                lab.update_meta_tag(id, slot, tag).await?;
            }
        }
        Ok(())
    }
}
