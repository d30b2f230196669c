use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::account::FriendLink;
use crate::auth::ActorKind;
use crate::error::{AppError, Result};
use crate::middleware::Actor;
use crate::websocket::{types::WsMessage, ConnectionManager};

use super::chat_models::{Conversation, Message, MessageKind, SenderIdentity, SenderKind};
use super::chat_store::ChatStore;

/// The message-distribution core: resolves the effective sender, persists
/// through the store, resolves the recipient set and pushes to every live
/// handle. Both the REST send endpoint and the WebSocket `message` frame end
/// up here.
#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn ChatStore>,
    connections: ConnectionManager,
}

impl ChatService {
    pub fn new(store: Arc<dyn ChatStore>, connections: ConnectionManager) -> Self {
        Self { store, connections }
    }

    /// Send a message into a conversation and fan it out.
    ///
    /// Persistence happens before any push: a recipient that misses the push
    /// still sees the message via `history`. An unknown conversation or an
    /// unresolvable sender identity fails the whole send before anything is
    /// persisted or pushed. Push itself is best effort per handle.
    pub async fn send_message(
        &self,
        actor: &Actor,
        conversation_id: Uuid,
        content: &str,
        kind: MessageKind,
    ) -> Result<Message> {
        let conversation = self
            .store
            .conversation(conversation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))?;

        let sender = self.resolve_sender(actor, &conversation).await?;
        let message = self
            .store
            .append(conversation.id, &sender, content, kind)
            .await?;

        let recipients = self.recipients_of(&conversation).await;
        let frame = WsMessage::Message(message.clone());
        let mut delivered = 0;
        for user_id in &recipients {
            delivered += self.connections.send_to_user(user_id, frame.clone());
        }

        tracing::debug!(
            conversation_id = %conversation.id,
            sender_id = %sender.id,
            recipients = recipients.len(),
            delivered,
            "message fanned out"
        );

        Ok(message)
    }

    /// The effective sender identity, resolved once per send. A manager in a
    /// managed-account conversation speaks as the account; a client speaks
    /// as their client-user record; a manager outside any managed account
    /// speaks as themselves with the claims-supplied name.
    async fn resolve_sender(
        &self,
        actor: &Actor,
        conversation: &Conversation,
    ) -> Result<SenderIdentity> {
        match actor.kind {
            ActorKind::Manager => {
                if let Some(account_id) = conversation.managed_account_id {
                    let account = self
                        .store
                        .managed_account(account_id)
                        .await?
                        .ok_or_else(|| {
                            AppError::NotFound("Managed account not found".to_string())
                        })?;

                    Ok(SenderIdentity {
                        kind: SenderKind::ManagedAccount,
                        id: account.id,
                        display_name: account.nickname,
                        avatar: account.avatar,
                    })
                } else {
                    Ok(SenderIdentity::for_actor_kind(
                        actor.kind,
                        actor.id,
                        actor.username.clone(),
                    ))
                }
            }
            ActorKind::Client => {
                let user = self
                    .store
                    .client_user(actor.id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Client user not found".to_string()))?;

                Ok(SenderIdentity {
                    kind: SenderKind::Client,
                    id: user.id,
                    display_name: user.nickname,
                    avatar: user.avatar,
                })
            }
        }
    }

    /// Identities that must receive anything posted to this conversation:
    /// the client-user participants plus, when the conversation belongs to a
    /// managed account, the account's owning manager. The sender is not
    /// excluded; clients de-duplicate their own echo at the edge.
    ///
    /// The message is already persisted when this runs, so an owner that can
    /// no longer be resolved only degrades delivery (logged, skipped); it
    /// does not fail the send.
    async fn recipients_of(&self, conversation: &Conversation) -> HashSet<Uuid> {
        let mut recipients: HashSet<Uuid> = conversation.participants.iter().copied().collect();

        if let Some(account_id) = conversation.managed_account_id {
            match self.store.managed_account(account_id).await {
                Ok(Some(account)) => {
                    recipients.insert(account.owner_id);
                }
                Ok(None) => {
                    tracing::warn!(
                        %account_id,
                        conversation_id = %conversation.id,
                        "managed account gone while resolving recipients; owner skipped"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        %account_id,
                        conversation_id = %conversation.id,
                        error = ?e,
                        "owner lookup failed while resolving recipients; owner skipped"
                    );
                }
            }
        }

        recipients
    }

    /// Get or create the private conversation backing a friend link.
    pub async fn conversation_from_friend(&self, friend: &FriendLink) -> Result<Conversation> {
        if let Some(existing) = self
            .store
            .find_private_conversation(friend.managed_account_id, friend.client_user_id)
            .await?
        {
            return Ok(existing);
        }

        let client_user = self
            .store
            .client_user(friend.client_user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Client user not found".to_string()))?;

        let name = friend
            .remark
            .clone()
            .unwrap_or_else(|| client_user.nickname.clone());

        self.store
            .create_conversation(
                &name,
                client_user.avatar.as_deref(),
                friend.client_user_id,
                friend.managed_account_id,
            )
            .await
    }

    pub async fn list_conversations(
        &self,
        actor: &Actor,
        managed_account_id: Option<Uuid>,
    ) -> Result<Vec<Conversation>> {
        match actor.kind {
            ActorKind::Client => self.store.conversations_for_client(actor.id).await,
            ActorKind::Manager => self.store.conversations_for_account(managed_account_id).await,
        }
    }

    pub async fn history(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        self.store.history(conversation_id).await
    }

    pub async fn mark_read(&self, conversation_id: Uuid) -> Result<()> {
        self.store.mark_read(conversation_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::ManagedAccount;
    use crate::user::ClientUser;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use tokio::sync::Mutex;

    struct Inner {
        conversations: HashMap<Uuid, Conversation>,
        messages: HashMap<Uuid, Vec<Message>>,
    }

    /// In-memory store. A single mutex around conversations and messages
    /// stands in for the per-conversation critical section of the SQL
    /// implementation.
    struct MemoryChatStore {
        inner: Mutex<Inner>,
        accounts: HashMap<Uuid, ManagedAccount>,
        client_users: HashMap<Uuid, ClientUser>,
    }

    impl MemoryChatStore {
        fn new(
            accounts: Vec<ManagedAccount>,
            client_users: Vec<ClientUser>,
            conversations: Vec<Conversation>,
        ) -> Self {
            Self {
                inner: Mutex::new(Inner {
                    conversations: conversations.into_iter().map(|c| (c.id, c)).collect(),
                    messages: HashMap::new(),
                }),
                accounts: accounts.into_iter().map(|a| (a.id, a)).collect(),
                client_users: client_users.into_iter().map(|u| (u.id, u)).collect(),
            }
        }
    }

    #[async_trait]
    impl ChatStore for MemoryChatStore {
        async fn conversation(&self, conversation_id: Uuid) -> Result<Option<Conversation>> {
            let inner = self.inner.lock().await;
            Ok(inner.conversations.get(&conversation_id).cloned())
        }

        async fn conversations_for_account(
            &self,
            managed_account_id: Option<Uuid>,
        ) -> Result<Vec<Conversation>> {
            let inner = self.inner.lock().await;
            Ok(inner
                .conversations
                .values()
                .filter(|c| c.managed_account_id == managed_account_id)
                .cloned()
                .collect())
        }

        async fn conversations_for_client(
            &self,
            client_user_id: Uuid,
        ) -> Result<Vec<Conversation>> {
            let inner = self.inner.lock().await;
            Ok(inner
                .conversations
                .values()
                .filter(|c| c.participants.contains(&client_user_id))
                .cloned()
                .collect())
        }

        async fn find_private_conversation(
            &self,
            managed_account_id: Uuid,
            client_user_id: Uuid,
        ) -> Result<Option<Conversation>> {
            let inner = self.inner.lock().await;
            Ok(inner
                .conversations
                .values()
                .find(|c| {
                    c.managed_account_id == Some(managed_account_id)
                        && c.participants.contains(&client_user_id)
                })
                .cloned())
        }

        async fn create_conversation(
            &self,
            name: &str,
            avatar: Option<&str>,
            participant: Uuid,
            managed_account_id: Uuid,
        ) -> Result<Conversation> {
            let conversation = Conversation {
                id: Uuid::new_v4(),
                kind: super::super::chat_models::ConversationKind::Private,
                name: name.to_string(),
                avatar: avatar.map(str::to_string),
                participants: vec![participant],
                managed_account_id: Some(managed_account_id),
                last_message: None,
                last_message_time: None,
                unread_count: 0,
                created_at: Utc::now(),
            };
            let mut inner = self.inner.lock().await;
            inner.conversations.insert(conversation.id, conversation.clone());
            Ok(conversation)
        }

        async fn append(
            &self,
            conversation_id: Uuid,
            sender: &SenderIdentity,
            content: &str,
            kind: MessageKind,
        ) -> Result<Message> {
            let mut guard = self.inner.lock().await;
            let Inner {
                conversations,
                messages,
            } = &mut *guard;

            let conversation = conversations
                .get_mut(&conversation_id)
                .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))?;

            let now = Utc::now();
            let timestamp = match conversation.last_message_time {
                Some(prev) if prev > now => prev,
                _ => now,
            };

            let message = Message {
                id: Uuid::new_v4(),
                conversation_id,
                sender_id: sender.id,
                sender_name: sender.display_name.clone(),
                sender_avatar: sender.avatar.clone(),
                content: content.to_string(),
                kind,
                read: false,
                timestamp,
            };

            conversation.last_message = Some(message.content.clone());
            conversation.last_message_time = Some(timestamp);
            conversation.unread_count += 1;
            messages.entry(conversation_id).or_default().push(message.clone());

            Ok(message)
        }

        async fn mark_read(&self, conversation_id: Uuid) -> Result<()> {
            let mut guard = self.inner.lock().await;
            let Inner {
                conversations,
                messages,
            } = &mut *guard;

            if let Some(conversation) = conversations.get_mut(&conversation_id) {
                conversation.unread_count = 0;
            }
            if let Some(list) = messages.get_mut(&conversation_id) {
                for message in list.iter_mut() {
                    message.read = true;
                }
            }
            Ok(())
        }

        async fn history(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
            let inner = self.inner.lock().await;
            Ok(inner
                .messages
                .get(&conversation_id)
                .cloned()
                .unwrap_or_default())
        }

        async fn managed_account(&self, account_id: Uuid) -> Result<Option<ManagedAccount>> {
            Ok(self.accounts.get(&account_id).cloned())
        }

        async fn client_user(&self, client_user_id: Uuid) -> Result<Option<ClientUser>> {
            Ok(self.client_users.get(&client_user_id).cloned())
        }
    }

    fn client_user(nickname: &str) -> ClientUser {
        ClientUser {
            id: Uuid::new_v4(),
            username: nickname.to_lowercase(),
            password_hash: "x".to_string(),
            nickname: nickname.to_string(),
            avatar: None,
            email: None,
            phone: None,
            created_at: Utc::now(),
        }
    }

    fn managed_account(owner_id: Uuid, nickname: &str) -> ManagedAccount {
        ManagedAccount {
            id: Uuid::new_v4(),
            owner_id,
            username: nickname.to_lowercase(),
            nickname: nickname.to_string(),
            avatar: Some("a.png".to_string()),
            status: "offline".to_string(),
            last_active_time: None,
            created_at: Utc::now(),
        }
    }

    fn private_conversation(
        participants: Vec<Uuid>,
        managed_account_id: Option<Uuid>,
    ) -> Conversation {
        Conversation {
            id: Uuid::new_v4(),
            kind: super::super::chat_models::ConversationKind::Private,
            name: "chat".to_string(),
            avatar: None,
            participants,
            managed_account_id,
            last_message: None,
            last_message_time: None,
            unread_count: 0,
            created_at: Utc::now(),
        }
    }

    fn manager_actor(id: Uuid) -> Actor {
        Actor {
            id,
            kind: ActorKind::Manager,
            username: "boss".to_string(),
        }
    }

    fn client_actor(user: &ClientUser) -> Actor {
        Actor {
            id: user.id,
            kind: ActorKind::Client,
            username: user.username.clone(),
        }
    }

    fn service_with(store: MemoryChatStore) -> (ChatService, ConnectionManager) {
        let connections = ConnectionManager::new();
        (
            ChatService::new(Arc::new(store), connections.clone()),
            connections,
        )
    }

    fn attach(connections: &ConnectionManager, user_id: Uuid) -> UnboundedReceiver<WsMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        assert!(connections.add_connection(user_id, Uuid::new_v4(), tx));
        rx
    }

    fn received(rx: &mut UnboundedReceiver<WsMessage>) -> Vec<Message> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            if let WsMessage::Message(message) = frame {
                out.push(message);
            }
        }
        out
    }

    #[tokio::test]
    async fn test_managed_account_send_end_to_end() {
        let owner_id = Uuid::new_v4();
        let account = managed_account(owner_id, "Support");
        let client = client_user("Uma");
        let conversation = private_conversation(vec![client.id], Some(account.id));
        let conversation_id = conversation.id;
        let account_id = account.id;

        let store = MemoryChatStore::new(vec![account], vec![client.clone()], vec![conversation]);
        let (service, connections) = service_with(store);

        let mut client_rx_a = attach(&connections, client.id);
        let mut client_rx_b = attach(&connections, client.id);
        let mut owner_rx = attach(&connections, owner_id);

        let message = service
            .send_message(
                &manager_actor(owner_id),
                conversation_id,
                "hello",
                MessageKind::Text,
            )
            .await
            .unwrap();

        // Sender identity is the managed account, not the manager.
        assert_eq!(message.sender_id, account_id);
        assert_eq!(message.sender_name, "Support");
        assert!(!message.read);

        // Both of the client's devices get the push, and so does the owner
        // (sender echo is not suppressed server-side).
        for rx in [&mut client_rx_a, &mut client_rx_b, &mut owner_rx] {
            let got = received(rx);
            assert_eq!(got.len(), 1);
            assert_eq!(got[0].content, "hello");
            assert_eq!(got[0].sender_id, account_id);
        }

        let conversation = service.store.conversation(conversation_id).await.unwrap().unwrap();
        assert_eq!(conversation.unread_count, 1);
        assert_eq!(conversation.last_message.as_deref(), Some("hello"));
        assert_eq!(conversation.last_message_time, Some(message.timestamp));

        service.mark_read(conversation_id).await.unwrap();
        let conversation = service.store.conversation(conversation_id).await.unwrap().unwrap();
        assert_eq!(conversation.unread_count, 0);
        assert!(service
            .history(conversation_id)
            .await
            .unwrap()
            .iter()
            .all(|m| m.read));

        // Idempotent: a second mark_read with no new messages changes nothing.
        service.mark_read(conversation_id).await.unwrap();
        let conversation = service.store.conversation(conversation_id).await.unwrap().unwrap();
        assert_eq!(conversation.unread_count, 0);
    }

    #[tokio::test]
    async fn test_disconnecting_one_device_does_not_affect_the_other() {
        let owner_id = Uuid::new_v4();
        let account = managed_account(owner_id, "Support");
        let client = client_user("Uma");
        let conversation = private_conversation(vec![client.id], Some(account.id));
        let conversation_id = conversation.id;

        let store = MemoryChatStore::new(vec![account], vec![client.clone()], vec![conversation]);
        let (service, connections) = service_with(store);

        let device_a = Uuid::new_v4();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        connections.add_connection(client.id, device_a, tx_a);
        let mut rx_b = attach(&connections, client.id);

        connections.remove_connection(&client.id, &device_a);

        service
            .send_message(
                &manager_actor(owner_id),
                conversation_id,
                "still there?",
                MessageKind::Text,
            )
            .await
            .unwrap();

        assert_eq!(received(&mut rx_a).len(), 0);
        assert_eq!(received(&mut rx_b).len(), 1);
    }

    #[tokio::test]
    async fn test_offline_recipient_catches_up_via_history() {
        let owner_id = Uuid::new_v4();
        let account = managed_account(owner_id, "Support");
        let client = client_user("Uma");
        let conversation = private_conversation(vec![client.id], Some(account.id));
        let conversation_id = conversation.id;

        let store = MemoryChatStore::new(vec![account], vec![client], vec![conversation]);
        let (service, _connections) = service_with(store);

        for content in ["one", "two", "three"] {
            service
                .send_message(
                    &manager_actor(owner_id),
                    conversation_id,
                    content,
                    MessageKind::Text,
                )
                .await
                .unwrap();
        }

        let history = service.history(conversation_id).await.unwrap();
        assert_eq!(
            history.iter().map(|m| m.content.as_str()).collect::<Vec<_>>(),
            ["one", "two", "three"]
        );
        assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

        let conversation = service.store.conversation(conversation_id).await.unwrap().unwrap();
        assert_eq!(conversation.unread_count, 3);
    }

    #[tokio::test]
    async fn test_unknown_conversation_is_an_explicit_failure() {
        let store = MemoryChatStore::new(vec![], vec![], vec![]);
        let (service, _connections) = service_with(store);

        let err = service
            .send_message(
                &manager_actor(Uuid::new_v4()),
                Uuid::new_v4(),
                "hello?",
                MessageKind::Text,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_vanished_managed_account_fails_the_send() {
        let client = client_user("Uma");
        // Conversation references an account the store does not know.
        let conversation = private_conversation(vec![client.id], Some(Uuid::new_v4()));
        let conversation_id = conversation.id;

        let store = MemoryChatStore::new(vec![], vec![client], vec![conversation]);
        let (service, _connections) = service_with(store);

        let err = service
            .send_message(
                &manager_actor(Uuid::new_v4()),
                conversation_id,
                "hello",
                MessageKind::Text,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert!(service.history(conversation_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_client_sender_uses_client_identity_and_reaches_owner() {
        let owner_id = Uuid::new_v4();
        let account = managed_account(owner_id, "Support");
        let client = client_user("Uma");
        let conversation = private_conversation(vec![client.id], Some(account.id));
        let conversation_id = conversation.id;

        let store = MemoryChatStore::new(vec![account], vec![client.clone()], vec![conversation]);
        let (service, connections) = service_with(store);

        let mut owner_rx = attach(&connections, owner_id);

        let message = service
            .send_message(
                &client_actor(&client),
                conversation_id,
                "hi support",
                MessageKind::Text,
            )
            .await
            .unwrap();

        assert_eq!(message.sender_id, client.id);
        assert_eq!(message.sender_name, client.nickname);

        let got = received(&mut owner_rx);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].content, "hi support");
    }

    #[tokio::test]
    async fn test_unresolvable_owner_degrades_to_participant_delivery() {
        let client = client_user("Uma");
        let conversation = private_conversation(vec![client.id], Some(Uuid::new_v4()));
        let conversation_id = conversation.id;

        let store = MemoryChatStore::new(vec![], vec![client.clone()], vec![conversation]);
        let (service, connections) = service_with(store);

        let mut client_rx = attach(&connections, client.id);

        // Client sender resolves fine; only the owner lookup dangles. The
        // message must persist and still reach the participants.
        service
            .send_message(
                &client_actor(&client),
                conversation_id,
                "anyone?",
                MessageKind::Text,
            )
            .await
            .unwrap();

        assert_eq!(received(&mut client_rx).len(), 1);
        assert_eq!(service.history(conversation_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_appends_lose_no_increments() {
        let owner_id = Uuid::new_v4();
        let account = managed_account(owner_id, "Support");
        let client = client_user("Uma");
        let conversation = private_conversation(vec![client.id], Some(account.id));
        let conversation_id = conversation.id;

        let store = MemoryChatStore::new(vec![account], vec![client], vec![conversation]);
        let (service, _connections) = service_with(store);

        let mut handles = Vec::new();
        for i in 0..20 {
            let service = service.clone();
            let actor = manager_actor(owner_id);
            handles.push(tokio::spawn(async move {
                service
                    .send_message(
                        &actor,
                        conversation_id,
                        &format!("msg-{}", i),
                        MessageKind::Text,
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let conversation = service.store.conversation(conversation_id).await.unwrap().unwrap();
        assert_eq!(conversation.unread_count, 20);

        let history = service.history(conversation_id).await.unwrap();
        assert_eq!(history.len(), 20);
        assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(
            conversation.last_message,
            Some(history.last().unwrap().content.clone())
        );
    }

    #[tokio::test]
    async fn test_conversation_from_friend_is_created_once() {
        let owner_id = Uuid::new_v4();
        let account = managed_account(owner_id, "Support");
        let client = client_user("Uma");
        let account_id = account.id;

        let store = MemoryChatStore::new(vec![account], vec![client.clone()], vec![]);
        let (service, _connections) = service_with(store);

        let friend = FriendLink {
            id: Uuid::new_v4(),
            managed_account_id: account_id,
            client_user_id: client.id,
            remark: Some("VIP".to_string()),
            status: "offline".to_string(),
            created_at: Utc::now(),
        };

        let created = service.conversation_from_friend(&friend).await.unwrap();
        assert_eq!(created.name, "VIP");
        assert_eq!(created.participants, vec![client.id]);
        assert_eq!(created.managed_account_id, Some(account_id));

        let again = service.conversation_from_friend(&friend).await.unwrap();
        assert_eq!(again.id, created.id);
    }
}
