pub mod auth_service;
pub mod contact_service;
pub mod directory_service;
pub mod error;
pub mod item_service;
pub mod tag_service;
pub mod user_service;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::Datastore;
use crate::notifier::Notifier;

pub use auth_service::{AuthService, LoginRequest, Session, Signup, SignupRequest};
pub use contact_service::ContactService;
pub use directory_service::DirectoryService;
pub use error::ServiceError;
pub use item_service::ItemService;
pub use tag_service::TagService;
pub use user_service::UserService;

/// Every service, wired to the same datastore.
#[derive(Clone)]
pub struct Services {
    pub auth: AuthService,
    pub users: UserService,
    pub items: ItemService,
    pub directory: DirectoryService,
    pub tags: TagService,
    pub contacts: ContactService,
}

impl Services {
    pub fn new(store: Arc<dyn Datastore>, notifier: Arc<dyn Notifier>, config: &AppConfig) -> Self {
        Self {
            auth: AuthService::new(store.clone(), notifier, config),
            users: UserService::new(store.clone()),
            items: ItemService::new(store.clone()),
            directory: DirectoryService::new(store.clone()),
            tags: TagService::new(store.clone()),
            contacts: ContactService::new(store),
        }
    }
}
