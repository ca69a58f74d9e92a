//! In-memory backend for dev/tests.
//!
//! Mutex/RwLock-guarded maps; no persistence. Semantics mirror the Postgres
//! backend so tests against this store carry over.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use railtrace_analytics::{
    AggregationOutcome, LotHealthRow, LotItemRecord, LotQualityRow, RiskLevel,
};
use railtrace_auth::WebsiteUser;
use railtrace_core::{EngravingId, ItemUid, NotificationId, UserId, VendorId};
use railtrace_engraving::EngravingJob;
use railtrace_items::{Item, ItemEvent};
use railtrace_notifications::{Notification, NotificationDraft};
use railtrace_vendors::Vendor;

use super::{
    DataStore, EngravingStore, ItemStore, LotAnalyticsStore, NotificationStore, StoreError,
    UserStore, VendorStore,
};

/// In-memory implementation of every store trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<BTreeMap<String, Item>>,
    events: RwLock<Vec<ItemEvent>>,
    seen_external_ids: RwLock<HashSet<(String, String)>>,
    vendors: RwLock<HashMap<VendorId, Vendor>>,
    lot_health: RwLock<BTreeMap<String, LotHealthRow>>,
    lot_quality: RwLock<BTreeMap<String, LotQualityRow>>,
    notifications: RwLock<Vec<Notification>>,
    users: RwLock<HashMap<UserId, WebsiteUser>>,
    engravings: RwLock<Vec<EngravingJob>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn insert_item(&self, item: &Item) -> Result<(), StoreError> {
        let mut items = self.items.write().unwrap();
        if items.contains_key(item.uid.as_str()) {
            return Err(StoreError::Conflict(format!(
                "item uid already exists: {}",
                item.uid
            )));
        }
        items.insert(item.uid.as_str().to_string(), item.clone());
        Ok(())
    }

    async fn get_item(&self, uid: &ItemUid) -> Result<Option<Item>, StoreError> {
        Ok(self.items.read().unwrap().get(uid.as_str()).cloned())
    }

    async fn list_items(&self, lot_no: Option<&str>) -> Result<Vec<Item>, StoreError> {
        let items = self.items.read().unwrap();
        Ok(items
            .values()
            .filter(|it| lot_no.is_none_or(|l| it.lot_no == l))
            .cloned()
            .collect())
    }

    async fn update_item(&self, item: &Item) -> Result<(), StoreError> {
        let mut items = self.items.write().unwrap();
        match items.get_mut(item.uid.as_str()) {
            Some(slot) => {
                *slot = item.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn append_event(&self, event: &ItemEvent) -> Result<bool, StoreError> {
        if let Some(ext) = &event.external_id {
            let key = (event.item_uid.as_str().to_string(), ext.clone());
            let mut seen = self.seen_external_ids.write().unwrap();
            if !seen.insert(key) {
                return Ok(false);
            }
        }
        self.events.write().unwrap().push(event.clone());
        Ok(true)
    }

    async fn list_events(&self, uid: &ItemUid) -> Result<Vec<ItemEvent>, StoreError> {
        Ok(self
            .events
            .read()
            .unwrap()
            .iter()
            .filter(|e| &e.item_uid == uid)
            .cloned()
            .collect())
    }

    async fn lot_records(&self) -> Result<Vec<LotItemRecord>, StoreError> {
        Ok(self
            .items
            .read()
            .unwrap()
            .values()
            .map(|it| LotItemRecord {
                lot_no: it.lot_no.clone(),
                status: it.status,
            })
            .collect())
    }
}

#[async_trait]
impl VendorStore for MemoryStore {
    async fn insert_vendor(&self, vendor: &Vendor) -> Result<(), StoreError> {
        let mut vendors = self.vendors.write().unwrap();
        if vendors.values().any(|v| v.name == vendor.name) {
            return Err(StoreError::Conflict(format!(
                "vendor name already exists: {}",
                vendor.name
            )));
        }
        vendors.insert(vendor.id, vendor.clone());
        Ok(())
    }

    async fn get_vendor(&self, id: &VendorId) -> Result<Option<Vendor>, StoreError> {
        Ok(self.vendors.read().unwrap().get(id).cloned())
    }

    async fn list_vendors(&self) -> Result<Vec<Vendor>, StoreError> {
        let mut out: Vec<Vendor> = self.vendors.read().unwrap().values().cloned().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn update_vendor(&self, vendor: &Vendor) -> Result<(), StoreError> {
        let mut vendors = self.vendors.write().unwrap();
        match vendors.get_mut(&vendor.id) {
            Some(slot) => {
                *slot = vendor.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }
}

#[async_trait]
impl LotAnalyticsStore for MemoryStore {
    async fn current_risk_levels(&self) -> Result<BTreeMap<String, RiskLevel>, StoreError> {
        Ok(self
            .lot_health
            .read()
            .unwrap()
            .iter()
            .map(|(lot, row)| (lot.clone(), row.risk_level))
            .collect())
    }

    async fn apply_lot_outcome(
        &self,
        outcome: &AggregationOutcome,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        // Wholesale swap: rows for vanished lots are pruned implicitly.
        let mut health = self.lot_health.write().unwrap();
        let mut quality = self.lot_quality.write().unwrap();
        *health = outcome
            .health_rows
            .iter()
            .map(|r| (r.lot_no.clone(), r.clone()))
            .collect();
        *quality = outcome
            .quality_rows
            .iter()
            .map(|r| (r.lot_no.clone(), r.clone()))
            .collect();

        let mut notifications = self.notifications.write().unwrap();
        for draft in &outcome.drafts {
            notifications.push(draft.clone().into_notification(now));
        }
        Ok(())
    }

    async fn list_lot_health(&self) -> Result<Vec<LotHealthRow>, StoreError> {
        Ok(self.lot_health.read().unwrap().values().cloned().collect())
    }

    async fn get_lot_health(&self, lot_no: &str) -> Result<Option<LotHealthRow>, StoreError> {
        Ok(self.lot_health.read().unwrap().get(lot_no).cloned())
    }

    async fn list_lot_quality(&self) -> Result<Vec<LotQualityRow>, StoreError> {
        Ok(self.lot_quality.read().unwrap().values().cloned().collect())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(
        &self,
        draft: NotificationDraft,
        now: DateTime<Utc>,
    ) -> Result<Notification, StoreError> {
        let n = draft.into_notification(now);
        self.notifications.write().unwrap().push(n.clone());
        Ok(n)
    }

    async fn list_notifications(&self, unread_only: bool) -> Result<Vec<Notification>, StoreError> {
        let notifications = self.notifications.read().unwrap();
        Ok(notifications
            .iter()
            .rev() // newest first
            .filter(|n| !unread_only || n.is_unread())
            .cloned()
            .collect())
    }

    async fn unread_count(&self) -> Result<u64, StoreError> {
        Ok(self
            .notifications
            .read()
            .unwrap()
            .iter()
            .filter(|n| n.is_unread())
            .count() as u64)
    }

    async fn mark_read(&self, ids: &[NotificationId]) -> Result<u64, StoreError> {
        let mut notifications = self.notifications.write().unwrap();
        let mut changed = 0;
        for n in notifications.iter_mut() {
            if ids.contains(&n.id) && n.mark_read() {
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn dismiss(&self, ids: &[NotificationId]) -> Result<u64, StoreError> {
        let mut notifications = self.notifications.write().unwrap();
        let mut changed = 0;
        for n in notifications.iter_mut() {
            if ids.contains(&n.id) && n.dismiss() {
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &WebsiteUser) -> Result<(), StoreError> {
        let mut users = self.users.write().unwrap();
        if users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(format!(
                "username already exists: {}",
                user.username
            )));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<WebsiteUser>, StoreError> {
        Ok(self
            .users
            .read()
            .unwrap()
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn update_user(&self, user: &WebsiteUser) -> Result<(), StoreError> {
        let mut users = self.users.write().unwrap();
        match users.get_mut(&user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }
}

#[async_trait]
impl EngravingStore for MemoryStore {
    async fn enqueue_engraving(&self, job: &EngravingJob) -> Result<(), StoreError> {
        self.engravings.write().unwrap().push(job.clone());
        Ok(())
    }

    async fn get_engraving(&self, id: &EngravingId) -> Result<Option<EngravingJob>, StoreError> {
        Ok(self
            .engravings
            .read()
            .unwrap()
            .iter()
            .find(|j| &j.id == id)
            .cloned())
    }

    async fn list_engravings(&self) -> Result<Vec<EngravingJob>, StoreError> {
        Ok(self.engravings.read().unwrap().clone())
    }

    async fn update_engraving(&self, job: &EngravingJob) -> Result<(), StoreError> {
        let mut engravings = self.engravings.write().unwrap();
        match engravings.iter_mut().find(|j| j.id == job.id) {
            Some(slot) => {
                *slot = job.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn claim_next_engraving(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Option<EngravingJob>, StoreError> {
        let mut engravings = self.engravings.write().unwrap();
        for job in engravings.iter_mut() {
            if job.is_claimable(now) {
                job.mark_running(now);
                return Ok(Some(job.clone()));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn reset_all(&self) -> Result<(), StoreError> {
        self.items.write().unwrap().clear();
        self.events.write().unwrap().clear();
        self.seen_external_ids.write().unwrap().clear();
        self.vendors.write().unwrap().clear();
        self.lot_health.write().unwrap().clear();
        self.lot_quality.write().unwrap().clear();
        self.notifications.write().unwrap().clear();
        self.users.write().unwrap().clear();
        self.engravings.write().unwrap().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use railtrace_items::{ComponentType, ItemStatus};
    use railtrace_notifications::Severity;

    fn item(uid: &str, lot: &str, failed: bool) -> Item {
        let mut it = Item::manufactured(
            ItemUid::new(uid).unwrap(),
            lot,
            ComponentType::ElasticRailClip,
            VendorId::new(),
            Utc::now(),
            24,
        )
        .unwrap();
        if failed {
            it.transition(ItemStatus::Failed, Utc::now()).unwrap();
        }
        it
    }

    #[tokio::test]
    async fn duplicate_uid_conflicts() {
        let store = MemoryStore::new();
        store.insert_item(&item("ERC-1", "L1", false)).await.unwrap();
        let err = store.insert_item(&item("ERC-1", "L1", false)).await;
        assert!(matches!(err, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn event_external_id_dedup() {
        let store = MemoryStore::new();
        let uid = ItemUid::new("ERC-1").unwrap();
        store.insert_item(&item("ERC-1", "L1", false)).await.unwrap();

        let ev = ItemEvent::new(uid.clone(), "inspection.visual", serde_json::json!({}), Utc::now())
            .with_external_id("handheld-42");
        assert!(store.append_event(&ev).await.unwrap());

        let again =
            ItemEvent::new(uid.clone(), "inspection.visual", serde_json::json!({}), Utc::now())
                .with_external_id("handheld-42");
        assert!(!store.append_event(&again).await.unwrap());
        assert_eq!(store.list_events(&uid).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn apply_lot_outcome_prunes_stale_lots() {
        let store = MemoryStore::new();
        store.insert_item(&item("A-1", "L1", true)).await.unwrap();
        store.insert_item(&item("B-1", "L2", false)).await.unwrap();

        let records = store.lot_records().await.unwrap();
        let out = railtrace_analytics::AggregationJob::new(records).run(Utc::now());
        store.apply_lot_outcome(&out, Utc::now()).await.unwrap();
        assert_eq!(store.list_lot_health().await.unwrap().len(), 2);

        // Second run over only L1 prunes L2.
        let out = railtrace_analytics::AggregationJob::new(vec![LotItemRecord {
            lot_no: "L1".to_string(),
            status: ItemStatus::Failed,
        }])
        .run(Utc::now());
        store.apply_lot_outcome(&out, Utc::now()).await.unwrap();
        let lots = store.list_lot_health().await.unwrap();
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].lot_no, "L1");
    }

    #[tokio::test]
    async fn mark_read_and_dismiss_are_idempotent() {
        let store = MemoryStore::new();
        let n = store
            .insert_notification(
                NotificationDraft::new("test", "t", "m", Severity::Info),
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(store.unread_count().await.unwrap(), 1);
        assert_eq!(store.mark_read(&[n.id]).await.unwrap(), 1);
        assert_eq!(store.mark_read(&[n.id]).await.unwrap(), 0);
        assert_eq!(store.dismiss(&[n.id]).await.unwrap(), 1);
        assert_eq!(store.dismiss(&[n.id]).await.unwrap(), 0);
        assert_eq!(store.unread_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn claim_next_prefers_oldest_and_marks_running() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let first = EngravingJob::new(ItemUid::new("ERC-1").unwrap(), now);
        let second = EngravingJob::new(ItemUid::new("ERC-2").unwrap(), now);
        store.enqueue_engraving(&first).await.unwrap();
        store.enqueue_engraving(&second).await.unwrap();

        let claimed = store.claim_next_engraving(now).await.unwrap().unwrap();
        assert_eq!(claimed.id, first.id);
        assert_eq!(claimed.attempt, 1);
    }
}
