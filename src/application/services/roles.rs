use std::collections::HashMap;
use std::sync::Arc;

use crate::application::errors::StorageError;
use crate::domain::traits::{Brain, BrainExt, Json};

/// Brain key holding `lower(user name) -> "role1,role2"`
pub const ROLE_STORE_KEY: &str = "UserRoleStore";

type RoleStore = HashMap<String, String>;

/// Brain-backed user roles.
///
/// Each mutation is a read-modify-write of one brain key and is not atomic
/// against concurrent mutations from other scripts.
#[derive(Clone)]
pub struct UserRoles {
    brain: Option<Arc<dyn Brain>>,
}

impl UserRoles {
    pub fn new(brain: Option<Arc<dyn Brain>>) -> Self {
        Self { brain }
    }

    async fn load(&self) -> Result<RoleStore, StorageError> {
        let Some(brain) = &self.brain else {
            return Ok(RoleStore::new());
        };
        Ok(brain
            .get::<Json<RoleStore>>(ROLE_STORE_KEY)
            .await?
            .map(Json::into_inner)
            .unwrap_or_default())
    }

    async fn save(&self, store: RoleStore) -> Result<(), StorageError> {
        match &self.brain {
            Some(brain) => brain.set(ROLE_STORE_KEY, &Json(store)).await,
            None => {
                tracing::warn!("No brain configured; role changes are not persisted");
                Ok(())
            }
        }
    }

    pub async fn roles_for(&self, user_name: &str) -> Result<Vec<String>, StorageError> {
        let store = self.load().await?;
        Ok(split_roles(store.get(&user_name.to_lowercase())))
    }

    pub async fn add(&self, user_name: &str, roles: &[&str]) -> Result<(), StorageError> {
        let key = user_name.to_lowercase();
        let mut store = self.load().await?;
        let mut current = split_roles(store.get(&key));

        for role in roles {
            let role = role.replace(',', "");
            if !role.is_empty() && !current.contains(&role) {
                current.push(role);
            }
        }

        store.insert(key, current.join(","));
        self.save(store).await
    }

    pub async fn remove(&self, user_name: &str, role: &str) -> Result<(), StorageError> {
        let key = user_name.to_lowercase();
        let mut store = self.load().await?;
        let current = split_roles(store.get(&key));

        if !current.iter().any(|r| r.eq_ignore_ascii_case(role)) {
            return Ok(());
        }

        let remaining: Vec<String> = current
            .into_iter()
            .filter(|r| !r.eq_ignore_ascii_case(role))
            .collect();

        if remaining.is_empty() {
            store.remove(&key);
        } else {
            store.insert(key, remaining.join(","));
        }
        self.save(store).await
    }

    pub async fn is_in_role(&self, user_name: &str, role: &str) -> Result<bool, StorageError> {
        Ok(self
            .roles_for(user_name)
            .await?
            .iter()
            .any(|r| r.eq_ignore_ascii_case(role)))
    }
}

fn split_roles(entry: Option<&String>) -> Vec<String> {
    entry
        .map(|s| {
            s.split(',')
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
