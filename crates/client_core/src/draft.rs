use std::{fmt, str::FromStr};

use shared::protocol::{CreateScenarioRequest, ModelSettings, ParticipantSpec};

use crate::error::TagIndexOutOfRange;

pub const MAX_META_TAGS: usize = 3;

/// Draft-local participant identity. Allocated from a counter that only
/// moves forward, so a removed participant's id is never handed out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "participant-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticipantField {
    Name,
    Role,
    Perspective,
    InitialMessage,
}

impl ParticipantField {
    pub const ALL: [Self; 4] = [
        Self::Name,
        Self::Role,
        Self::Perspective,
        Self::InitialMessage,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Role => "role",
            Self::Perspective => "perspective",
            Self::InitialMessage => "initial message",
        }
    }
}

impl FromStr for ParticipantField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "name" => Ok(Self::Name),
            "role" => Ok(Self::Role),
            "perspective" => Ok(Self::Perspective),
            "initial_message" | "message" => Ok(Self::InitialMessage),
            other => Err(format!("unknown participant field '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub role: String,
    pub perspective: String,
    pub initial_message: String,
    pub meta_tags: Vec<String>,
}

impl Participant {
    fn empty(id: ParticipantId) -> Self {
        Self {
            id,
            name: String::new(),
            role: String::new(),
            perspective: String::new(),
            initial_message: String::new(),
            meta_tags: Vec::new(),
        }
    }

    pub fn field(&self, field: ParticipantField) -> &str {
        match field {
            ParticipantField::Name => &self.name,
            ParticipantField::Role => &self.role,
            ParticipantField::Perspective => &self.perspective,
            ParticipantField::InitialMessage => &self.initial_message,
        }
    }

    fn field_mut(&mut self, field: ParticipantField) -> &mut String {
        match field {
            ParticipantField::Name => &mut self.name,
            ParticipantField::Role => &mut self.role,
            ParticipantField::Perspective => &mut self.perspective,
            ParticipantField::InitialMessage => &mut self.initial_message,
        }
    }

    pub fn has_meta_tag(&self) -> bool {
        self.meta_tags.iter().any(|tag| !tag.trim().is_empty())
    }

    pub fn is_complete(&self) -> bool {
        ParticipantField::ALL
            .iter()
            .all(|field| !self.field(*field).is_empty())
            && self.has_meta_tag()
    }

    fn to_spec(&self) -> ParticipantSpec {
        ParticipantSpec {
            name: self.name.clone(),
            role: self.role.clone(),
            perspective: self.perspective.clone(),
            meta_tags: self
                .meta_tags
                .iter()
                .filter(|tag| !tag.trim().is_empty())
                .cloned()
                .collect(),
            initial_message: self.initial_message.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipantCard {
    pub ordinal: usize,
    pub participant_id: ParticipantId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioField {
    Name,
    SystemPrompt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftIssue {
    Missing(ScenarioField),
    NoParticipants,
    ParticipantField {
        ordinal: usize,
        field: ParticipantField,
    },
    ParticipantMetaTags {
        ordinal: usize,
    },
}

impl fmt::Display for DraftIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(ScenarioField::Name) => f.write_str("scenario name"),
            Self::Missing(ScenarioField::SystemPrompt) => f.write_str("system prompt"),
            Self::NoParticipants => f.write_str("at least one participant"),
            Self::ParticipantField { ordinal, field } => {
                write!(f, "participant {ordinal} {}", field.label())
            }
            Self::ParticipantMetaTags { ordinal } => {
                write!(f, "participant {ordinal} meta tag")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioDraft {
    pub name: String,
    pub system_prompt: String,
    pub settings: ModelSettings,
    participants: Vec<Participant>,
    next_participant: u64,
}

impl ScenarioDraft {
    pub fn new(settings: ModelSettings) -> Self {
        Self::starting_at(settings, 1)
    }

    /// Replacement draft whose participant ids continue after this one's,
    /// so an id held from the old draft never addresses the new one.
    pub fn restart(&self, settings: ModelSettings) -> Self {
        Self::starting_at(settings, self.next_participant)
    }

    fn starting_at(settings: ModelSettings, next_participant: u64) -> Self {
        let mut draft = Self {
            name: String::new(),
            system_prompt: String::new(),
            settings,
            participants: Vec::new(),
            next_participant,
        };
        draft.add_participant();
        draft
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn add_participant(&mut self) -> ParticipantCard {
        let id = ParticipantId(self.next_participant);
        self.next_participant += 1;
        self.participants.push(Participant::empty(id));
        ParticipantCard {
            ordinal: self.participants.len(),
            participant_id: id,
        }
    }

    pub fn remove_participant(&mut self, id: ParticipantId) -> bool {
        let before = self.participants.len();
        self.participants.retain(|p| p.id != id);
        self.participants.len() != before
    }

    pub fn update_field(&mut self, id: ParticipantId, field: ParticipantField, value: &str) -> bool {
        match self.participants.iter_mut().find(|p| p.id == id) {
            Some(participant) => {
                *participant.field_mut(field) = value.to_string();
                true
            }
            None => false,
        }
    }

    pub fn update_meta_tag(
        &mut self,
        id: ParticipantId,
        index: usize,
        value: &str,
    ) -> Result<bool, TagIndexOutOfRange> {
        if index >= MAX_META_TAGS {
            return Err(TagIndexOutOfRange(index));
        }
        let Some(participant) = self.participants.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };
        if participant.meta_tags.len() < MAX_META_TAGS {
            participant.meta_tags.resize(MAX_META_TAGS, String::new());
        }
        participant.meta_tags[index] = value.trim().to_string();
        Ok(true)
    }

    pub fn cards(&self) -> Vec<ParticipantCard> {
        self.participants
            .iter()
            .enumerate()
            .map(|(index, participant)| ParticipantCard {
                ordinal: index + 1,
                participant_id: participant.id,
            })
            .collect()
    }

    pub fn id_at(&self, ordinal: usize) -> Option<ParticipantId> {
        ordinal
            .checked_sub(1)
            .and_then(|index| self.participants.get(index))
            .map(|participant| participant.id)
    }

    pub fn issues(&self) -> Vec<DraftIssue> {
        let mut issues = Vec::new();
        if self.name.trim().is_empty() {
            issues.push(DraftIssue::Missing(ScenarioField::Name));
        }
        if self.system_prompt.trim().is_empty() {
            issues.push(DraftIssue::Missing(ScenarioField::SystemPrompt));
        }
        if self.participants.is_empty() {
            issues.push(DraftIssue::NoParticipants);
        }
        for (index, participant) in self.participants.iter().enumerate() {
            let ordinal = index + 1;
            for field in ParticipantField::ALL {
                if participant.field(field).is_empty() {
                    issues.push(DraftIssue::ParticipantField { ordinal, field });
                }
            }
            if !participant.has_meta_tag() {
                issues.push(DraftIssue::ParticipantMetaTags { ordinal });
            }
        }
        issues
    }

    pub fn validate(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.system_prompt.trim().is_empty()
            && !self.participants.is_empty()
            && self.participants.iter().all(Participant::is_complete)
    }

    pub fn serialize(&self) -> CreateScenarioRequest {
        CreateScenarioRequest {
            name: self.name.trim().to_string(),
            system_prompt: self.system_prompt.trim().to_string(),
            participants: self.participants.iter().map(Participant::to_spec).collect(),
            settings: self.settings.clone(),
        }
    }
}

impl Default for ScenarioDraft {
    fn default() -> Self {
        Self::new(ModelSettings::default())
    }
}

#[cfg(test)]
#[path = "tests/draft_tests.rs"]
mod tests;
