use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use tracing::debug;

use crate::models::{LookupIds, LookupValue};
use crate::{
    DocumentLibrary, Item, ItemId, ListStore, PeopleService, Query, StoreError, UserId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryUser {
    pub id: UserId,
    pub title: String,
    pub email: String,
}

#[derive(Default)]
struct State {
    lists: HashMap<String, BTreeMap<ItemId, Item>>,
    last_item_id: ItemId,
    last_user_id: UserId,
    users: Vec<DirectoryUser>,
    files: HashMap<String, Bytes>,
    fail_uploads: bool,
    fail_writes: bool,
}

impl State {
    fn lookup_titles(&self, value: &Value) -> Value {
        let ids: Vec<UserId> = match serde_json::from_value::<LookupIds>(value.clone()) {
            Ok(lookup) => lookup.results,
            Err(_) => serde_json::from_value(value.clone()).unwrap_or_default(),
        };
        let titles: Vec<LookupValue> = ids
            .into_iter()
            .filter_map(|id| self.users.iter().find(|user| user.id == id))
            .map(|user| LookupValue {
                id: Some(user.id),
                title: user.title.clone(),
            })
            .collect();
        serde_json::to_value(titles).unwrap_or(Value::Array(Vec::new()))
    }

    fn project(&self, item: &Item, query: &Query) -> Item {
        let mut item = item.clone();
        for lookup in &query.expand {
            let ids = item
                .get(&format!("{lookup}Id"))
                .cloned()
                .unwrap_or(Value::Null);
            item.insert(lookup.clone(), self.lookup_titles(&ids));
        }
        if query.select.is_empty() {
            return item;
        }
        let selected: Vec<&str> = query
            .select
            .iter()
            .map(|field| field.split('/').next().unwrap_or(field))
            .collect();
        item.into_iter()
            .filter(|(key, _)| selected.contains(&key.as_str()))
            .collect()
    }
}

/// Keeps lists, files and a user directory in memory. Used for tests and offline mode.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Adds someone `ensure_user` can resolve by title or email.
    pub fn register_user(&self, title: &str, email: &str) -> Result<UserId, StoreError> {
        let mut state = self.state()?;
        state.last_user_id += 1;
        let id = state.last_user_id;
        state.users.push(DirectoryUser {
            id,
            title: title.to_owned(),
            email: email.to_owned(),
        });
        Ok(id)
    }

    /// Makes every following upload fail until reset.
    pub fn set_fail_uploads(&self, fail: bool) -> Result<(), StoreError> {
        self.state()?.fail_uploads = fail;
        Ok(())
    }

    /// Makes every following add, update and delete fail until reset.
    pub fn set_fail_writes(&self, fail: bool) -> Result<(), StoreError> {
        self.state()?.fail_writes = fail;
        Ok(())
    }

    pub fn items(&self, list: &str) -> Result<Vec<Item>, StoreError> {
        Ok(self
            .state()?
            .lists
            .get(list)
            .map(|items| items.values().cloned().collect())
            .unwrap_or_default())
    }

    pub fn file(&self, url: &str) -> Result<Option<Bytes>, StoreError> {
        Ok(self.state()?.files.get(url).cloned())
    }
}

#[async_trait]
impl ListStore for MemoryStore {
    async fn filter(&self, list: &str, query: &Query) -> Result<Vec<Item>, StoreError> {
        let state = self.state()?;
        let Some(items) = state.lists.get(list) else {
            return Ok(Vec::new());
        };
        Ok(items
            .values()
            .filter(|item| query.filter.as_ref().map_or(true, |filter| filter.matches(item)))
            .map(|item| state.project(item, query))
            .collect())
    }

    async fn add(&self, list: &str, mut fields: Item) -> Result<Item, StoreError> {
        let mut state = self.state()?;
        if state.fail_writes {
            return Err(StoreError::Unavailable("writes are switched off".to_owned()));
        }
        state.last_item_id += 1;
        let id = state.last_item_id;
        fields.insert("Id".to_owned(), Value::from(id));
        state
            .lists
            .entry(list.to_owned())
            .or_default()
            .insert(id, fields.clone());
        debug!("added item {id} to {list}");
        Ok(fields)
    }

    async fn update(&self, list: &str, id: ItemId, fields: Item) -> Result<(), StoreError> {
        let mut state = self.state()?;
        if state.fail_writes {
            return Err(StoreError::Unavailable("writes are switched off".to_owned()));
        }
        let item = state
            .lists
            .get_mut(list)
            .and_then(|items| items.get_mut(&id))
            .ok_or(StoreError::NotFound(id))?;
        for (key, value) in fields {
            if key != "Id" {
                item.insert(key, value);
            }
        }
        Ok(())
    }

    async fn delete(&self, list: &str, id: ItemId) -> Result<(), StoreError> {
        let mut state = self.state()?;
        if state.fail_writes {
            return Err(StoreError::Unavailable("writes are switched off".to_owned()));
        }
        state
            .lists
            .get_mut(list)
            .and_then(|items| items.remove(&id))
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }
}

#[async_trait]
impl DocumentLibrary for MemoryStore {
    async fn upload(
        &self,
        folder: &str,
        name: &str,
        content: Bytes,
        overwrite: bool,
    ) -> Result<String, StoreError> {
        let mut state = self.state()?;
        if state.fail_uploads {
            return Err(StoreError::Unavailable("uploads are switched off".to_owned()));
        }
        let url = format!("{}/{name}", folder.trim_end_matches('/'));
        if !overwrite && state.files.contains_key(&url) {
            return Err(StoreError::Status {
                status: 409,
                body: format!("{url} already exists"),
            });
        }
        state.files.insert(url.clone(), content);
        Ok(url)
    }
}

#[async_trait]
impl PeopleService for MemoryStore {
    async fn ensure_user(&self, login: &str) -> Result<UserId, StoreError> {
        let state = self.state()?;
        let login = login.trim();
        state
            .users
            .iter()
            .find(|user| {
                user.title.eq_ignore_ascii_case(login) || user.email.eq_ignore_ascii_case(login)
            })
            .map(|user| user.id)
            .ok_or_else(|| StoreError::UserNotFound(login.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use serde_json::json;

    use super::MemoryStore;
    use crate::{DocumentLibrary, Filter, ListStore, PeopleService, Query, StoreError};

    fn item(value: serde_json::Value) -> crate::Item {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn assigns_ids_and_filters() -> Result<(), StoreError> {
        let store = MemoryStore::new();
        let first = store
            .add("Bookings", item(json!({ "Email": "a@b.c", "Phone": "1" })))
            .await?;
        store
            .add("Bookings", item(json!({ "Email": "x@y.z", "Phone": "2" })))
            .await?;
        assert_eq!(first["Id"], json!(1));

        let query = Query::new().filter(Filter::eq("Email", "2").or(Filter::eq("Phone", "2")));
        let found = store.filter("Bookings", &query).await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["Email"], json!("x@y.z"));
        Ok(())
    }

    #[tokio::test]
    async fn expands_lookup_titles() -> Result<(), StoreError> {
        let store = MemoryStore::new();
        let alice = store.register_user("Alice Smith", "alice@example.org")?;
        let bob = store.register_user("Bob Jones", "bob@example.org")?;
        store
            .add(
                "Bookings",
                item(json!({
                    "Title": "Alice Smith",
                    "PassengersTravellingWithId": { "results": [bob, alice] },
                })),
            )
            .await?;

        let query = Query::new()
            .select(["Title", "PassengersTravellingWith/Title"])
            .expand("PassengersTravellingWith");
        let found = store.filter("Bookings", &query).await?;
        assert_eq!(
            found[0]["PassengersTravellingWith"],
            json!([{ "Id": bob, "Title": "Bob Jones" }, { "Id": alice, "Title": "Alice Smith" }])
        );
        assert!(!found[0].contains_key("PassengersTravellingWithId"));
        assert!(!found[0].contains_key("Id"));
        Ok(())
    }

    #[tokio::test]
    async fn resolves_users_by_title_or_email() -> Result<(), StoreError> {
        let store = MemoryStore::new();
        let id = store.register_user("Alice Smith", "alice@example.org")?;
        assert_eq!(store.ensure_user("alice smith").await?, id);
        assert_eq!(store.ensure_user("ALICE@example.org").await?, id);
        assert!(matches!(
            store.ensure_user("Nobody").await,
            Err(StoreError::UserNotFound(name)) if name == "Nobody"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn update_and_delete_missing_items() -> Result<(), StoreError> {
        let store = MemoryStore::new();
        assert!(matches!(
            store.update("Bookings", 4, item(json!({}))).await,
            Err(StoreError::NotFound(4))
        ));
        assert!(matches!(
            store.delete("Bookings", 4).await,
            Err(StoreError::NotFound(4))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn uploads_respect_overwrite() -> Result<(), StoreError> {
        let store = MemoryStore::new();
        let url = store
            .upload("/sites/Travel/Shared Documents/", "id.pdf", Bytes::from_static(b"1"), true)
            .await?;
        assert_eq!(url, "/sites/Travel/Shared Documents/id.pdf");
        assert!(store
            .upload("/sites/Travel/Shared Documents", "id.pdf", Bytes::from_static(b"2"), false)
            .await
            .is_err());
        store
            .upload("/sites/Travel/Shared Documents", "id.pdf", Bytes::from_static(b"3"), true)
            .await?;
        assert_eq!(store.file(&url)?, Some(Bytes::from_static(b"3")));

        store.set_fail_uploads(true)?;
        assert!(matches!(
            store
                .upload("/sites/Travel/Shared Documents", "x.pdf", Bytes::new(), true)
                .await,
            Err(StoreError::Unavailable(_))
        ));
        Ok(())
    }
}
