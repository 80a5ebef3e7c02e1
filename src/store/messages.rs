use tracing::{debug, info};

use crate::error::{AppResult, AuthError};
use crate::messaging::{self, Thread};
use crate::models::{Conversation, ConversationId, MessageId, Participant, ProfileId, PropertyId};
use crate::storage::PersistenceAdapter;
use crate::store::{Action, Store};
use crate::validation;

impl<A: PersistenceAdapter> Store<A> {
    /// The conversation between `a` and `b` about `property_id`, created on
    /// first use.
    pub async fn open_conversation(
        &self,
        a: ProfileId,
        b: ProfileId,
        property_id: Option<PropertyId>,
    ) -> AppResult<Conversation> {
        if a == b {
            return Err(validation::field_error(
                "participants",
                "distinct",
                "A conversation needs two different people",
            ));
        }
        let first = self.active_profile(a).await?;
        let second = self.active_profile(b).await?;

        let _lock = self.conversation_lock.lock().await;
        let repo = self.repo();
        let existing: Vec<Conversation> = repo
            .list_where(|c: &Conversation| c.connects(a, b, property_id))
            .await?;
        if let Some(conversation) = existing.into_iter().next() {
            return Ok(conversation);
        }

        let mut conversation = Conversation::new(
            Participant::new(a, first.user_type(), first.display_name()),
            Participant::new(b, second.user_type(), second.display_name()),
            property_id,
            None,
            self.now(),
        );
        repo.save(&mut conversation).await?;
        info!("Opened conversation {} between {} and {}", conversation.id, a, b);
        self.dispatch(Action::ConversationSaved(conversation.clone()));
        Ok(conversation)
    }

    pub async fn send_message(
        &self,
        conversation_id: ConversationId,
        sender_id: ProfileId,
        body: &str,
    ) -> AppResult<MessageId> {
        let now = self.now();
        let (conversation, id) = self
            .update_conversation(conversation_id, sender_id, |c| c.append(sender_id, body, now))
            .await?;
        debug!("Message {} sent in {}", id, conversation.id);
        Ok(id)
    }

    /// Resets the viewer's unread counter.
    pub async fn mark_read(&self, conversation_id: ConversationId, viewer_id: ProfileId) -> AppResult<()> {
        self.update_conversation(conversation_id, viewer_id, |c| c.mark_read(viewer_id))
            .await?;
        Ok(())
    }

    pub async fn threads(&self, viewer_id: ProfileId) -> AppResult<Vec<Thread>> {
        let conversations = self.conversations_of(viewer_id).await?;
        Ok(messaging::thread_list(viewer_id, &conversations))
    }

    pub async fn unread_total(&self, viewer_id: ProfileId) -> AppResult<u32> {
        let conversations = self.conversations_of(viewer_id).await?;
        Ok(messaging::unread_total(viewer_id, &conversations))
    }

    async fn conversations_of(&self, viewer_id: ProfileId) -> AppResult<Vec<Conversation>> {
        Ok(self
            .repo()
            .list_where(|c: &Conversation| c.involves(viewer_id))
            .await?)
    }

    /// Read-modify-write under the conversation lock; the adapter's version
    /// check catches writers outside this process.
    async fn update_conversation<T, F>(
        &self,
        conversation_id: ConversationId,
        actor_id: ProfileId,
        change: F,
    ) -> AppResult<(Conversation, T)>
    where
        F: FnOnce(&mut Conversation) -> AppResult<T>,
    {
        let _lock = self.conversation_lock.lock().await;
        let repo = self.repo();
        let mut conversation: Conversation = repo.require(conversation_id).await?;
        if !conversation.involves(actor_id) {
            return Err(AuthError::Forbidden.into());
        }
        let out = change(&mut conversation)?;
        repo.save(&mut conversation).await?;
        self.dispatch(Action::ConversationSaved(conversation.clone()));
        Ok((conversation, out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::store::fixtures;

    #[tokio::test]
    async fn unread_counts_rise_then_reset() {
        let store = fixtures::store();
        let renter = store
            .register(fixtures::renter_form("sam@example.com"), fixtures::PASSWORD)
            .await
            .unwrap()
            .id();
        let landlord = store
            .register(fixtures::landlord_form("priya@example.com"), fixtures::PASSWORD)
            .await
            .unwrap()
            .id();

        let conversation = store.open_conversation(renter, landlord, None).await.unwrap();
        let again = store.open_conversation(landlord, renter, None).await.unwrap();
        assert_eq!(conversation.id, again.id);

        for body in ["Hi", "Is it still available?", "Could I view on Saturday?"] {
            store.send_message(conversation.id, renter, body).await.unwrap();
        }
        assert_eq!(store.unread_total(landlord).await.unwrap(), 3);
        assert_eq!(store.unread_total(renter).await.unwrap(), 0);

        store.mark_read(conversation.id, landlord).await.unwrap();
        assert_eq!(store.unread_total(landlord).await.unwrap(), 0);

        let threads = store.threads(landlord).await.unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].counterparty_name, "Sam Carter");
        assert_eq!(threads[0].messages.len(), 3);
    }

    #[tokio::test]
    async fn outsiders_cannot_post_and_bodies_are_bounded() {
        let store = fixtures::store();
        let renter = store
            .register(fixtures::renter_form("sam@example.com"), fixtures::PASSWORD)
            .await
            .unwrap()
            .id();
        let landlord = store
            .register(fixtures::landlord_form("priya@example.com"), fixtures::PASSWORD)
            .await
            .unwrap()
            .id();
        let conversation = store.open_conversation(renter, landlord, None).await.unwrap();

        assert!(matches!(
            store.send_message(conversation.id, ProfileId::new(), "hello").await,
            Err(AppError::Auth(AuthError::Forbidden))
        ));
        assert!(matches!(
            store.send_message(conversation.id, renter, "").await,
            Err(AppError::Validation(_))
        ));
        let long = "x".repeat(2001);
        assert!(store.send_message(conversation.id, renter, &long).await.is_err());
        assert!(store.open_conversation(renter, renter, None).await.is_err());
    }
}
