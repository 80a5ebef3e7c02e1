//! Per-counterparty thread lists over stored conversations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Conversation, ConversationId, Message, ProfileId, PropertyId, UserType};

/// `(counterparty, property)`; `None` is the general thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadKey {
    pub counterparty_id: ProfileId,
    pub property_id: Option<PropertyId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub counterparty_id: ProfileId,
    pub counterparty_type: UserType,
    pub counterparty_name: String,
    pub property_id: Option<PropertyId>,
    pub conversation_ids: Vec<ConversationId>,
    pub unread_count: u32,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_message: Option<Message>,
    pub messages: Vec<Message>,
}

impl Thread {
    pub fn key(&self) -> ThreadKey {
        ThreadKey {
            counterparty_id: self.counterparty_id,
            property_id: self.property_id,
        }
    }
}

/// Groups the viewer's conversations into threads, most recent first
/// (ties by counterparty name).
pub fn thread_list(viewer: ProfileId, conversations: &[Conversation]) -> Vec<Thread> {
    let mut threads: Vec<Thread> = Vec::new();
    let mut index: HashMap<ThreadKey, usize> = HashMap::new();

    for conversation in conversations {
        let Some(counterparty) = conversation.counterparty(viewer) else {
            continue;
        };
        let key = ThreadKey {
            counterparty_id: counterparty.id,
            property_id: conversation.property_id,
        };

        let slot = *index.entry(key).or_insert_with(|| {
            threads.push(Thread {
                counterparty_id: counterparty.id,
                counterparty_type: counterparty.user_type,
                counterparty_name: counterparty.display_name.clone(),
                property_id: conversation.property_id,
                conversation_ids: Vec::new(),
                unread_count: 0,
                last_message_at: None,
                last_message: None,
                messages: Vec::new(),
            });
            threads.len() - 1
        });

        let thread = &mut threads[slot];
        thread.conversation_ids.push(conversation.id);
        thread.unread_count = thread
            .unread_count
            .saturating_add(conversation.unread_for(viewer));
        thread.messages.extend(conversation.messages.iter().cloned());
        thread.last_message_at = thread.last_message_at.max(conversation.last_message_at);
    }

    for thread in &mut threads {
        thread.messages.sort_by_key(|m| m.sent_at);
        thread.last_message = thread.messages.last().cloned();
    }

    threads.sort_by(|a, b| {
        b.last_message_at
            .cmp(&a.last_message_at)
            .then_with(|| a.counterparty_name.cmp(&b.counterparty_name))
    });
    threads
}

pub fn unread_total(viewer: ProfileId, conversations: &[Conversation]) -> u32 {
    conversations
        .iter()
        .map(|c| c.unread_for(viewer))
        .fold(0u32, u32::saturating_add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Participant;
    use chrono::Duration;

    struct Fixture {
        agency: ProfileId,
        priya: ProfileId,
        omar: ProfileId,
        base: DateTime<Utc>,
    }

    fn fixture() -> Fixture {
        Fixture {
            agency: ProfileId::new(),
            priya: ProfileId::new(),
            omar: ProfileId::new(),
            base: Utc::now(),
        }
    }

    fn conversation(f: &Fixture, landlord: ProfileId, name: &str, property: Option<PropertyId>) -> Conversation {
        Conversation::new(
            Participant::new(f.agency, UserType::Agency, "Lets Ltd"),
            Participant::new(landlord, UserType::Landlord, name),
            property,
            None,
            f.base,
        )
    }

    #[test]
    fn groups_by_counterparty_and_property() {
        let f = fixture();
        let flat = PropertyId::new();

        let mut general = conversation(&f, f.priya, "Priya", None);
        general.append(f.priya, "Hi", f.base).unwrap();
        let mut about_flat = conversation(&f, f.priya, "Priya", Some(flat));
        about_flat.append(f.priya, "About the flat", f.base).unwrap();

        let threads = thread_list(f.agency, &[general, about_flat]);
        assert_eq!(threads.len(), 2);
        assert!(threads.iter().any(|t| t.property_id.is_none()));
        assert!(threads.iter().any(|t| t.property_id == Some(flat)));
    }

    #[test]
    fn duplicate_conversations_merge_into_one_thread() {
        let f = fixture();
        let mut a = conversation(&f, f.priya, "Priya", None);
        a.append(f.priya, "one", f.base).unwrap();
        let mut b = conversation(&f, f.priya, "Priya", None);
        b.append(f.priya, "two", f.base + Duration::minutes(1)).unwrap();
        b.append(f.priya, "three", f.base + Duration::minutes(2)).unwrap();

        let threads = thread_list(f.agency, &[a, b]);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].unread_count, 3);
        assert_eq!(threads[0].conversation_ids.len(), 2);
        assert_eq!(threads[0].last_message.as_ref().unwrap().body, "three");
    }

    #[test]
    fn sorted_by_recency_then_name() {
        let f = fixture();
        let zed = ProfileId::new();

        let mut old = conversation(&f, f.omar, "Omar", None);
        old.append(f.omar, "old", f.base).unwrap();
        let mut tie_z = conversation(&f, zed, "Zed", None);
        tie_z.append(zed, "new", f.base + Duration::hours(1)).unwrap();
        let mut tie_p = conversation(&f, f.priya, "Priya", None);
        tie_p.append(f.priya, "new", f.base + Duration::hours(1)).unwrap();

        let names: Vec<_> = thread_list(f.agency, &[old, tie_z, tie_p])
            .into_iter()
            .map(|t| t.counterparty_name)
            .collect();
        assert_eq!(names, vec!["Priya", "Zed", "Omar"]);
    }

    #[test]
    fn conversations_without_the_viewer_are_ignored() {
        let f = fixture();
        let c = conversation(&f, f.priya, "Priya", None);
        assert!(thread_list(f.omar, &[c.clone()]).is_empty());
        assert_eq!(unread_total(f.omar, &[c]), 0);
    }
}
