// src/store.rs

use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::bson::Document;
use mongodb::{options::ClientOptions, Client, Database};

use crate::errors::ActionError;

// Collection names shared across handlers and workflows. The three listing
// collections and their image collections are addressed through
// `ListingType` instead.
pub const USERS: &str = "users";
pub const NOTIFICATIONS: &str = "notifications";
pub const FAVORITES: &str = "user_favorites";
pub const REVIEWS: &str = "reviews";
pub const BOOKINGS: &str = "bookings";
pub const MESSAGES: &str = "messages";

/// Collection-scoped access to the document database.
///
/// Handlers and workflows only ever see this trait; the concrete client is
/// constructed once at startup and injected through `AppState`, so tests can
/// substitute an in-memory store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, ActionError>;

    async fn find_many(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Vec<Document>, ActionError>;

    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), ActionError>;

    /// Returns the number of matched documents.
    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<u64, ActionError>;

    /// Returns the number of modified documents.
    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<u64, ActionError>;

    /// Returns the number of deleted documents.
    async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64, ActionError>;

    /// Returns the number of deleted documents.
    async fn delete_many(&self, collection: &str, filter: Document) -> Result<u64, ActionError>;
}

pub struct MongoStore {
    pub db: Database,
}

impl MongoStore {
    pub async fn init(uri: &str, db_name: &str) -> Self {
        let client_options = ClientOptions::parse(uri)
            .await
            .expect("Failed to parse MongoDB connection string");
        let client = Client::with_options(client_options).expect("Failed to initialize client");
        MongoStore {
            db: client.database(db_name),
        }
    }

    fn collection(&self, name: &str) -> mongodb::Collection<Document> {
        self.db.collection::<Document>(name)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, ActionError> {
        Ok(self.collection(collection).find_one(filter).await?)
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Vec<Document>, ActionError> {
        let mut cursor = self.collection(collection).find(filter).await?;
        let mut documents = Vec::new();
        while let Some(doc_res) = cursor.next().await {
            documents.push(doc_res?);
        }
        Ok(documents)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), ActionError> {
        self.collection(collection).insert_one(document).await?;
        Ok(())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<u64, ActionError> {
        let result = self.collection(collection).update_one(filter, update).await?;
        Ok(result.matched_count)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<u64, ActionError> {
        let result = self
            .collection(collection)
            .update_many(filter, update)
            .await?;
        Ok(result.modified_count)
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64, ActionError> {
        let result = self.collection(collection).delete_one(filter).await?;
        Ok(result.deleted_count)
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> Result<u64, ActionError> {
        let result = self.collection(collection).delete_many(filter).await?;
        Ok(result.deleted_count)
    }
}

#[cfg(test)]
pub mod memory {
    //! In-memory `DocumentStore` used by unit tests. Supports the filter
    //! subset the application issues: top-level and dotted-path equality,
    //! `$or`, and null-or-missing matching.

    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use mongodb::bson::{Bson, Document};

    use crate::errors::ActionError;
    use crate::store::DocumentStore;

    #[derive(Default)]
    pub struct MemoryStore {
        collections: Mutex<HashMap<String, Vec<Document>>>,
        failing: Mutex<HashSet<String>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn seed(&self, collection: &str, documents: Vec<Document>) {
            self.collections
                .lock()
                .unwrap()
                .entry(collection.to_string())
                .or_default()
                .extend(documents);
        }

        /// Make every subsequent operation against `collection` fail with an
        /// internal error, to exercise partial-failure paths.
        pub fn fail_collection(&self, collection: &str) {
            self.failing.lock().unwrap().insert(collection.to_string());
        }

        pub fn dump(&self, collection: &str) -> Vec<Document> {
            self.collections
                .lock()
                .unwrap()
                .get(collection)
                .cloned()
                .unwrap_or_default()
        }

        pub fn count(&self, collection: &str) -> usize {
            self.dump(collection).len()
        }

        fn check(&self, collection: &str) -> Result<(), ActionError> {
            if self.failing.lock().unwrap().contains(collection) {
                return Err(ActionError::Internal);
            }
            Ok(())
        }
    }

    fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
        let mut current = document;
        let mut parts = path.split('.').peekable();
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                return current.get(part);
            }
            match current.get(part) {
                Some(Bson::Document(nested)) => current = nested,
                _ => return None,
            }
        }
        None
    }

    fn matches(document: &Document, filter: &Document) -> bool {
        for (key, expected) in filter {
            if key == "$or" {
                let branches = match expected {
                    Bson::Array(branches) => branches,
                    _ => return false,
                };
                let any = branches.iter().any(|branch| match branch {
                    Bson::Document(branch) => matches(document, branch),
                    _ => false,
                });
                if !any {
                    return false;
                }
                continue;
            }
            match (lookup(document, key), expected) {
                // An absent field matches an explicit null, like the real store.
                (None, Bson::Null) => {}
                (Some(actual), expected) if actual == expected => {}
                _ => return false,
            }
        }
        true
    }

    fn apply_update(document: &mut Document, update: &Document) {
        if let Ok(set) = update.get_document("$set") {
            for (key, value) in set {
                document.insert(key.clone(), value.clone());
            }
        }
    }

    #[async_trait]
    impl DocumentStore for MemoryStore {
        async fn find_one(
            &self,
            collection: &str,
            filter: Document,
        ) -> Result<Option<Document>, ActionError> {
            self.check(collection)?;
            Ok(self
                .dump(collection)
                .into_iter()
                .find(|doc| matches(doc, &filter)))
        }

        async fn find_many(
            &self,
            collection: &str,
            filter: Document,
        ) -> Result<Vec<Document>, ActionError> {
            self.check(collection)?;
            Ok(self
                .dump(collection)
                .into_iter()
                .filter(|doc| matches(doc, &filter))
                .collect())
        }

        async fn insert_one(
            &self,
            collection: &str,
            document: Document,
        ) -> Result<(), ActionError> {
            self.check(collection)?;
            self.collections
                .lock()
                .unwrap()
                .entry(collection.to_string())
                .or_default()
                .push(document);
            Ok(())
        }

        async fn update_one(
            &self,
            collection: &str,
            filter: Document,
            update: Document,
        ) -> Result<u64, ActionError> {
            self.check(collection)?;
            let mut collections = self.collections.lock().unwrap();
            let documents = collections.entry(collection.to_string()).or_default();
            for document in documents.iter_mut() {
                if matches(document, &filter) {
                    apply_update(document, &update);
                    return Ok(1);
                }
            }
            Ok(0)
        }

        async fn update_many(
            &self,
            collection: &str,
            filter: Document,
            update: Document,
        ) -> Result<u64, ActionError> {
            self.check(collection)?;
            let mut collections = self.collections.lock().unwrap();
            let documents = collections.entry(collection.to_string()).or_default();
            let mut modified = 0;
            for document in documents.iter_mut() {
                if matches(document, &filter) {
                    apply_update(document, &update);
                    modified += 1;
                }
            }
            Ok(modified)
        }

        async fn delete_one(
            &self,
            collection: &str,
            filter: Document,
        ) -> Result<u64, ActionError> {
            self.check(collection)?;
            let mut collections = self.collections.lock().unwrap();
            let documents = collections.entry(collection.to_string()).or_default();
            if let Some(position) = documents.iter().position(|doc| matches(doc, &filter)) {
                documents.remove(position);
                return Ok(1);
            }
            Ok(0)
        }

        async fn delete_many(
            &self,
            collection: &str,
            filter: Document,
        ) -> Result<u64, ActionError> {
            self.check(collection)?;
            let mut collections = self.collections.lock().unwrap();
            let documents = collections.entry(collection.to_string()).or_default();
            let before = documents.len();
            documents.retain(|doc| !matches(doc, &filter));
            Ok((before - documents.len()) as u64)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use mongodb::bson::doc;

        #[tokio::test]
        async fn dotted_path_equality() {
            let store = MemoryStore::new();
            store.seed(
                "notifications",
                vec![
                    doc! { "_id": "n1", "extra_data": { "listing_id": "P1" } },
                    doc! { "_id": "n2", "extra_data": { "listing_id": "P2" } },
                    doc! { "_id": "n3" },
                ],
            );

            let found = store
                .find_many("notifications", doc! { "extra_data.listing_id": "P1" })
                .await
                .unwrap();
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].get_str("_id").unwrap(), "n1");
        }

        #[tokio::test]
        async fn null_filter_matches_null_and_missing() {
            let store = MemoryStore::new();
            store.seed(
                "notifications",
                vec![
                    doc! { "_id": "a", "user_id": mongodb::bson::Bson::Null },
                    doc! { "_id": "b" },
                    doc! { "_id": "c", "user_id": "alice" },
                ],
            );

            let broadcasts = store
                .find_many("notifications", doc! { "user_id": mongodb::bson::Bson::Null })
                .await
                .unwrap();
            assert_eq!(broadcasts.len(), 2);
        }

        #[tokio::test]
        async fn or_filter() {
            let store = MemoryStore::new();
            store.seed(
                "messages",
                vec![
                    doc! { "_id": "m1", "sender_id": "alice", "receiver_id": "bob" },
                    doc! { "_id": "m2", "sender_id": "bob", "receiver_id": "alice" },
                    doc! { "_id": "m3", "sender_id": "carol", "receiver_id": "dave" },
                ],
            );

            let between = store
                .find_many(
                    "messages",
                    doc! { "$or": [
                        { "sender_id": "alice", "receiver_id": "bob" },
                        { "sender_id": "bob", "receiver_id": "alice" },
                    ] },
                )
                .await
                .unwrap();
            assert_eq!(between.len(), 2);
        }

        #[tokio::test]
        async fn failing_collection_surfaces_internal_error() {
            let store = MemoryStore::new();
            store.seed("reviews", vec![doc! { "_id": "r1" }]);
            store.fail_collection("reviews");

            let err = store.delete_many("reviews", doc! {}).await.unwrap_err();
            assert!(matches!(err, ActionError::Internal));
            assert_eq!(store.count("reviews"), 1);
        }
    }
}
