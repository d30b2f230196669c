use crate::error::{AppError, Result};
use crate::user::{ClientUserRepository, UserResponse};
use uuid::Uuid;

use super::account_dto::FriendResponse;
use super::account_models::ManagedAccount;
use super::account_repository::{FriendRepository, ManagedAccountRepository};

#[derive(Clone)]
pub struct AccountService {
    account_repo: ManagedAccountRepository,
    friend_repo: FriendRepository,
    client_user_repo: ClientUserRepository,
}

impl AccountService {
    pub fn new(
        account_repo: ManagedAccountRepository,
        friend_repo: FriendRepository,
        client_user_repo: ClientUserRepository,
    ) -> Self {
        Self {
            account_repo,
            friend_repo,
            client_user_repo,
        }
    }

    pub async fn list_managed_accounts(&self, owner_id: Uuid) -> Result<Vec<ManagedAccount>> {
        self.account_repo.find_by_owner(owner_id).await
    }

    pub async fn create_managed_account(
        &self,
        owner_id: Uuid,
        username: &str,
        nickname: &str,
        avatar: Option<&str>,
    ) -> Result<ManagedAccount> {
        self.account_repo
            .create(owner_id, username, nickname, avatar)
            .await
    }

    /// Resolve a managed account and check it belongs to `owner_id`.
    pub async fn owned_account(&self, owner_id: Uuid, account_id: Uuid) -> Result<ManagedAccount> {
        let account = self
            .account_repo
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Managed account not found".to_string()))?;

        if account.owner_id != owner_id {
            return Err(AppError::Forbidden(
                "Managed account belongs to another manager".to_string(),
            ));
        }

        Ok(account)
    }

    pub async fn list_friends(
        &self,
        owner_id: Uuid,
        account_id: Uuid,
    ) -> Result<Vec<FriendResponse>> {
        self.owned_account(owner_id, account_id).await?;
        self.friend_repo.list_for_account(account_id).await
    }

    pub async fn create_friend(
        &self,
        owner_id: Uuid,
        account_id: Uuid,
        client_user_id: Uuid,
        remark: Option<&str>,
    ) -> Result<FriendResponse> {
        self.owned_account(owner_id, account_id).await?;

        let client_user = self
            .client_user_repo
            .find_by_id(client_user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Client user not found".to_string()))?;

        if self
            .friend_repo
            .find_pair(account_id, client_user_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "This client user is already a friend of the account".to_string(),
            ));
        }

        let friend = self
            .friend_repo
            .create(account_id, client_user_id, remark)
            .await?;

        // Fresh link: no conversation yet, so the summary is empty.
        Ok(FriendResponse {
            id: friend.id,
            managed_account_id: friend.managed_account_id,
            client_user_id: friend.client_user_id,
            username: client_user.username,
            nickname: client_user.nickname,
            avatar: client_user.avatar,
            remark: friend.remark,
            status: friend.status,
            last_message: None,
            last_message_time: None,
            unread_count: 0,
        })
    }

    /// Client-user directory for the friend picker.
    pub async fn list_client_users(&self) -> Result<Vec<UserResponse>> {
        let users = self.client_user_repo.list_all().await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }
}
