use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{ConversationId, MatchId, MessageId, ProfileId, PropertyId, UserType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ProfileId,
    pub user_type: UserType,
    pub display_name: String,
    /// Messages from the other side not yet read by this participant.
    pub unread: u32,
}

impl Participant {
    pub fn new(id: ProfileId, user_type: UserType, display_name: impl Into<String>) -> Self {
        Self {
            id,
            user_type,
            display_name: display_name.into(),
            unread: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender_id: ProfileId,
    pub sender_type: UserType,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MessageBody {
    #[validate(length(min = 1, max = 2000, message = "Messages must be 1 to 2000 characters"))]
    pub body: String,
}

/// Two-party thread, optionally about one property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub participants: [Participant; 2],
    pub property_id: Option<PropertyId>,
    pub match_id: Option<MatchId>,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub version: u64,
}

impl Conversation {
    pub fn new(
        first: Participant,
        second: Participant,
        property_id: Option<PropertyId>,
        match_id: Option<MatchId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ConversationId::new(),
            participants: [first, second],
            property_id,
            match_id,
            messages: Vec::new(),
            created_at: now,
            last_message_at: None,
            version: 0,
        }
    }

    pub fn involves(&self, profile_id: ProfileId) -> bool {
        self.participants.iter().any(|p| p.id == profile_id)
    }

    /// Same unordered pair and same property.
    pub fn connects(&self, a: ProfileId, b: ProfileId, property_id: Option<PropertyId>) -> bool {
        self.property_id == property_id && self.involves(a) && self.involves(b)
    }

    pub fn participant(&self, profile_id: ProfileId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == profile_id)
    }

    /// The participant who is not `viewer`.
    pub fn counterparty(&self, viewer: ProfileId) -> Option<&Participant> {
        if !self.involves(viewer) {
            return None;
        }
        self.participants.iter().find(|p| p.id != viewer)
    }

    pub fn unread_for(&self, viewer: ProfileId) -> u32 {
        self.participant(viewer).map_or(0, |p| p.unread)
    }

    /// Appends a message and bumps the recipient's unread counter.
    pub fn append(&mut self, sender_id: ProfileId, body: &str, now: DateTime<Utc>) -> AppResult<MessageId> {
        MessageBody {
            body: body.to_string(),
        }
        .validate()?;

        let sender_type = self
            .participant(sender_id)
            .map(|p| p.user_type)
            .ok_or_else(|| AppError::conflict("Sender is not part of this conversation"))?;

        let id = MessageId::new();
        self.messages.push(Message {
            id,
            sender_id,
            sender_type,
            body: body.to_string(),
            sent_at: now,
        });
        for participant in self.participants.iter_mut().filter(|p| p.id != sender_id) {
            participant.unread = participant.unread.saturating_add(1);
        }
        self.last_message_at = Some(now);
        Ok(id)
    }

    pub fn mark_read(&mut self, viewer: ProfileId) -> AppResult<()> {
        let participant = self
            .participants
            .iter_mut()
            .find(|p| p.id == viewer)
            .ok_or_else(|| AppError::conflict("Viewer is not part of this conversation"))?;
        participant.unread = 0;
        Ok(())
    }
}
