//! MongoDB-backed Profile Store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    error::{ErrorKind, WriteFailure},
    options::{FindOptions, IndexOptions, UpdateOptions},
    Client, Collection, Database, IndexModel,
};

use super::{ProfileStore, StoreError};
use crate::config::MongoConfig;
use crate::models::{
    ApprovedProfile, AuditAction, AuditEntry, MaintenanceMarker, MarkerState, PendingProfile,
};

const PENDING_COLLECTION: &str = "auth_pending";
const APPROVED_COLLECTION: &str = "auth_approved";
const AUDIT_COLLECTION: &str = "auth_audit";
const SINGLETON_COLLECTION: &str = "auth_singletons";

const FORCE_LOGOUT_DOC: &str = "force_logout";
const LOCKDOWN_DOC: &str = "lockdown";
const MAINTENANCE_DOC: &str = "maintenance";
const OWNER_BOOTSTRAP_DOC: &str = "owner_bootstrap";

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub async fn connect(config: &MongoConfig) -> Result<Self, StoreError> {
        tracing::info!(database = %config.database, "Connecting to MongoDB");
        let client = Client::with_uri_str(&config.uri).await?;
        let db = client.database(&config.database);

        let store = Self { db };
        store.initialize_indexes().await?;
        tracing::info!("MongoDB store initialized");
        Ok(store)
    }

    fn pending(&self) -> Collection<PendingProfile> {
        self.db.collection(PENDING_COLLECTION)
    }

    fn approved(&self) -> Collection<ApprovedProfile> {
        self.db.collection(APPROVED_COLLECTION)
    }

    fn audit(&self) -> Collection<AuditEntry> {
        self.db.collection(AUDIT_COLLECTION)
    }

    fn singletons(&self) -> Collection<Document> {
        self.db.collection(SINGLETON_COLLECTION)
    }

    async fn initialize_indexes(&self) -> Result<(), StoreError> {
        self.audit()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "timestamp": -1, "action": 1 })
                    .build(),
                None,
            )
            .await?;
        self.approved()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(IndexOptions::builder().unique(false).build())
                    .build(),
                None,
            )
            .await?;
        Ok(())
    }

    async fn read_singleton(&self, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.singletons().find_one(doc! { "_id": id }, None).await?)
    }

    async fn write_singleton(&self, id: &str, fields: Document) -> Result<(), StoreError> {
        self.singletons()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": fields },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await?;
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref we)) if we.code == 11000
    )
}

#[async_trait]
impl ProfileStore for MongoStore {
    async fn find_pending(&self, subject_id: &str) -> Result<Option<PendingProfile>, StoreError> {
        Ok(self
            .pending()
            .find_one(doc! { "_id": subject_id }, None)
            .await?)
    }

    async fn list_pending(&self) -> Result<Vec<PendingProfile>, StoreError> {
        let options = FindOptions::builder()
            .sort(doc! { "created_utc": 1 })
            .build();
        let cursor = self.pending().find(None, options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_pending(&self, profile: &PendingProfile) -> Result<(), StoreError> {
        self.pending().insert_one(profile, None).await?;
        Ok(())
    }

    async fn delete_pending(&self, subject_id: &str) -> Result<bool, StoreError> {
        let result = self
            .pending()
            .delete_one(doc! { "_id": subject_id }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn find_approved(&self, subject_id: &str) -> Result<Option<ApprovedProfile>, StoreError> {
        Ok(self
            .approved()
            .find_one(doc! { "_id": subject_id }, None)
            .await?)
    }

    async fn list_approved(&self) -> Result<Vec<ApprovedProfile>, StoreError> {
        let options = FindOptions::builder().sort(doc! { "email": 1 }).build();
        let cursor = self.approved().find(None, options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn upsert_approved(&self, profile: &ApprovedProfile) -> Result<(), StoreError> {
        let fields = mongodb::bson::to_document(profile)
            .map_err(|e| StoreError(anyhow::Error::new(e)))?;
        self.approved()
            .clone_with_type::<Document>()
            .update_one(
                doc! { "_id": &profile.subject_id },
                doc! { "$set": fields },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await?;
        Ok(())
    }

    async fn delete_approved(&self, subject_id: &str) -> Result<bool, StoreError> {
        let result = self
            .approved()
            .delete_one(doc! { "_id": subject_id }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn count_owners(&self) -> Result<u64, StoreError> {
        Ok(self
            .approved()
            .count_documents(doc! { "role": "owner", "disabled": false }, None)
            .await?)
    }

    async fn try_claim_owner_bootstrap(&self) -> Result<bool, StoreError> {
        let claim = doc! {
            "_id": OWNER_BOOTSTRAP_DOC,
            "claimed_utc": Bson::DateTime(Utc::now().into()),
        };
        match self.singletons().insert_one(claim, None).await {
            Ok(_) => Ok(true),
            Err(e) if is_duplicate_key(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn release_owner_bootstrap(&self) -> Result<(), StoreError> {
        self.singletons()
            .delete_one(doc! { "_id": OWNER_BOOTSTRAP_DOC }, None)
            .await?;
        Ok(())
    }

    async fn touch_last_login(
        &self,
        subject_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        // Only pending records carry a last-login timestamp.
        self.pending()
            .update_one(
                doc! { "_id": subject_id },
                doc! { "$set": { "last_login_utc": Bson::DateTime(at.into()) } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn read_markers(&self) -> Result<MarkerState, StoreError> {
        let mut state = MarkerState::default();

        if let Some(docu) = self.read_singleton(FORCE_LOGOUT_DOC).await? {
            if let Ok(since) = docu.get_datetime("since") {
                state.force_logout_since = since.to_chrono();
            }
        }
        if let Some(docu) = self.read_singleton(LOCKDOWN_DOC).await? {
            state.lockdown_enabled = docu.get_bool("enabled").unwrap_or(false);
        }
        if let Some(docu) = self.read_singleton(MAINTENANCE_DOC).await? {
            state.maintenance = MaintenanceMarker {
                enabled: docu.get_bool("enabled").unwrap_or(false),
                message: docu.get_str("message").ok().map(str::to_string),
            };
        }

        Ok(state)
    }

    async fn set_force_logout_since(&self, since: DateTime<Utc>) -> Result<(), StoreError> {
        self.write_singleton(
            FORCE_LOGOUT_DOC,
            doc! { "since": Bson::DateTime(since.into()) },
        )
        .await
    }

    async fn set_lockdown(&self, enabled: bool) -> Result<(), StoreError> {
        self.write_singleton(LOCKDOWN_DOC, doc! { "enabled": enabled })
            .await
    }

    async fn set_maintenance(&self, marker: &MaintenanceMarker) -> Result<(), StoreError> {
        let mut fields = doc! { "enabled": marker.enabled };
        match &marker.message {
            Some(message) => fields.insert("message", message),
            None => fields.insert("message", Bson::Null),
        };
        self.write_singleton(MAINTENANCE_DOC, fields).await
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        self.audit().insert_one(entry, None).await?;
        Ok(())
    }

    async fn list_audit(
        &self,
        actions: &[AuditAction],
        limit: i64,
    ) -> Result<Vec<AuditEntry>, StoreError> {
        let action_strs: Vec<&str> = actions.iter().map(AuditAction::as_str).collect();
        let filter = if action_strs.is_empty() {
            None
        } else {
            Some(doc! { "action": { "$in": action_strs } })
        };
        let options = FindOptions::builder()
            .sort(doc! { "timestamp": -1 })
            .limit(limit)
            .build();
        let cursor = self.audit().find(filter, options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }
}
