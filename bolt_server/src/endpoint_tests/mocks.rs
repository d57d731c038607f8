use async_trait::async_trait;
use bolt_engine::{
    db_types::{NewUser, User, UserQueryFilter},
    traits::{UserManagement, UserManagementError},
};
use mockall::mock;

use crate::{
    errors::SlackApiError,
    integrations::slack::{SlackMember, SlackWorkspace},
};

mock! {
    pub UserManager {}
    #[async_trait]
    impl UserManagement for UserManager {
        async fn add_user(&self, user: NewUser) -> Result<User, UserManagementError>;
        async fn get_user(&self, id: &str) -> Result<User, UserManagementError>;
        async fn list_users(&self, filter: UserQueryFilter) -> Result<Vec<User>, UserManagementError>;
    }
}

mock! {
    pub Workspace {}
    #[async_trait]
    impl SlackWorkspace for Workspace {
        async fn find_member_by_handle(&self, handle: &str) -> Result<Option<SlackMember>, SlackApiError>;
        async fn message_text(&self, channel: &str, ts: &str) -> Result<String, SlackApiError>;
    }
}
