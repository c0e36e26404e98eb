use std::sync::Arc;

use autumn_core::entity::Entity;
use autumn_core::{ComponentDefinition, CoreError, ScanIndex};

use crate::aop::InvocationLog;
use crate::crypto::{self, SALT_LENGTH};
use crate::db::DbTemplate;
use crate::eventbus::{EventBus, HelloEvent};
use crate::user::User;

pub const TEST_EMAIL: &str = "test@test.com";

/// Registration and sign-in over the users table
pub struct UserService {
    db: Arc<DbTemplate>,
    invocations: Option<Arc<InvocationLog>>,
    events: Option<Arc<EventBus>>,
}

impl UserService {
    pub fn new(db: Arc<DbTemplate>) -> Self {
        Self {
            db,
            invocations: None,
            events: None,
        }
    }

    pub fn definition() -> Result<ComponentDefinition, CoreError> {
        ComponentDefinition::builder::<UserService>()
            .depends_on("dbTemplate")
            .depends_on_optional("invocationLog")
            .depends_on_optional("eventBus")
            .constructor(|ctx| {
                Ok(UserService {
                    db: ctx.get::<DbTemplate>("dbTemplate")?,
                    invocations: ctx.get_optional::<InvocationLog>("invocationLog")?,
                    events: ctx.get_optional::<EventBus>("eventBus")?,
                })
            })
            .on_init(|service| service.init())
            .build()
    }

    /// Create the users table and seed the test account
    fn init(&self) -> Result<(), CoreError> {
        self.db.ensure_table(&User::definition())?;
        match self.register(TEST_EMAIL, "test", "test") {
            Ok(user) => tracing::info!("Seeded {}", user),
            Err(error) => tracing::debug!("Test account not seeded: {}", error),
        }
        Ok(())
    }

    fn advised<T, F>(&self, target: &str, call: F) -> Result<T, CoreError>
    where
        F: FnOnce() -> Result<T, CoreError>,
    {
        match &self.invocations {
            Some(log) => log.around(target, call),
            None => call(),
        }
    }

    fn publish(&self, event: HelloEvent) {
        if let Some(bus) = &self.events {
            bus.post(event);
        }
    }

    pub fn user_by_email(&self, email: &str) -> Result<Option<User>, CoreError> {
        self.db.find_by::<User>("email", email)
    }

    pub fn register(&self, email: &str, name: &str, password: &str) -> Result<User, CoreError> {
        self.advised("UserService::register", || {
            let pwd_salt = crypto::random_string(SALT_LENGTH);
            let pwd_hash = crypto::hmac_sha256(password, &pwd_salt)?;
            let mut user = User::new(email, name, pwd_salt, pwd_hash);

            let id = self.db.insert(&mut user)?;
            self.publish(HelloEvent::UserRegistered {
                id,
                email: user.email.clone(),
            });
            Ok(user)
        })
    }

    /// The user, if `password` matches the stored hash
    pub fn login(&self, email: &str, password: &str) -> Result<Option<User>, CoreError> {
        self.advised("UserService::login", || {
            let Some(user) = self.user_by_email(email)? else {
                self.publish(HelloEvent::LoginFailed { email: email.to_string() });
                return Ok(None);
            };

            if crypto::hmac_sha256(password, &user.pwd_salt)? == user.pwd_hash {
                self.publish(HelloEvent::LoginSucceeded { email: email.to_string() });
                Ok(Some(user))
            } else {
                self.publish(HelloEvent::LoginFailed { email: email.to_string() });
                Ok(None)
            }
        })
    }

    /// New salt and hash for `user`
    pub fn change_password(&self, user: &mut User, new_password: &str) -> Result<(), CoreError> {
        self.advised("UserService::change_password", || {
            user.pwd_salt = crypto::random_string(SALT_LENGTH);
            user.pwd_hash = crypto::hmac_sha256(new_password, &user.pwd_salt)?;
            self.db.update(&*user)
        })
    }
}

pub fn register(index: &mut ScanIndex) -> Result<(), CoreError> {
    index.register_component(module_path!(), UserService::definition()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> UserService {
        let service = UserService::new(Arc::new(DbTemplate::new("test")));
        service.init().unwrap();
        service
    }

    #[test]
    fn test_init_seeds_test_account() {
        let service = service();

        assert!(service.login(TEST_EMAIL, "test").unwrap().is_some());
        assert!(service.login(TEST_EMAIL, "wrong").unwrap().is_none());
    }

    #[test]
    fn test_register_and_login() {
        let service = service();

        let user = service.register("alice@example.com", "alice", "s3cret").unwrap();
        assert!(user.id.is_some());
        assert_ne!(user.pwd_hash, "s3cret");

        let found = service.login("alice@example.com", "s3cret").unwrap().unwrap();
        assert_eq!(found, user);
        assert!(service.login("nobody@example.com", "s3cret").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let service = service();

        let err = service.register(TEST_EMAIL, "again", "pw").unwrap_err();
        assert!(err.to_string().contains("UNIQUE"));
    }

    #[test]
    fn test_change_password() {
        let service = service();
        let mut user = service.register("bob@example.com", "bob", "old").unwrap();

        service.change_password(&mut user, "new").unwrap();

        assert!(service.login("bob@example.com", "old").unwrap().is_none());
        assert!(service.login("bob@example.com", "new").unwrap().is_some());
    }
}
