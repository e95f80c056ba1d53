//! Listing Store and User Registry.
//!
//! Both tables sit behind one coarse lock: every mutation, including its
//! write-through to the `KvStore`, runs while holding it. Persistence failures
//! are logged and never roll back the in-memory state.

use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    domain::{ListingId, UserId},
    errors::Error,
    listing::{FieldEdit, Listing, ListingRecord, NewListing, RecordId},
    search::{self, Occupancy, SearchQuery},
    storage::KvStore,
    Result,
};

pub const LISTINGS_STORE: &str = "listings";
pub const USERS_STORE: &str = "users";

// ============== User Registry ==============

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub user_id: UserId,
    pub listing_ids: Vec<ListingId>,
    pub banned: bool,
    /// Reserved; no flow writes it yet.
    pub favorites: Vec<ListingId>,
}

impl User {
    fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            listing_ids: Vec::new(),
            banned: false,
            favorites: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct UserRecord {
    #[serde(default)]
    listings: Vec<RecordId>,
    #[serde(default)]
    favorites: Vec<RecordId>,
    #[serde(default)]
    banned: bool,
}

impl UserRecord {
    fn from_user(u: &User) -> Self {
        Self {
            listings: u
                .listing_ids
                .iter()
                .map(|id| RecordId::Text(id.to_string()))
                .collect(),
            favorites: u
                .favorites
                .iter()
                .map(|id| RecordId::Text(id.to_string()))
                .collect(),
            banned: u.banned,
        }
    }

    fn into_user(self, user_id: UserId) -> User {
        let ids = |v: Vec<RecordId>| v.iter().filter_map(RecordId::parse).collect::<Vec<_>>();
        User {
            user_id,
            listing_ids: dedup(ids(self.listings)),
            banned: self.banned,
            favorites: dedup(ids(self.favorites)),
        }
    }
}

fn dedup(ids: Vec<ListingId>) -> Vec<ListingId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

#[derive(Debug, Default)]
pub struct UserRegistry {
    users: BTreeMap<UserId, User>,
}

impl UserRegistry {
    pub fn get(&self, user_id: UserId) -> Option<&User> {
        self.users.get(&user_id)
    }

    /// Returns the user record, creating it on first contact. The flag is `true` if created.
    pub fn ensure(&mut self, user_id: UserId) -> (&mut User, bool) {
        let created = !self.users.contains_key(&user_id);
        let user = self
            .users
            .entry(user_id)
            .or_insert_with(|| User::new(user_id));
        (user, created)
    }

    pub fn is_banned(&self, user_id: UserId) -> bool {
        self.users.get(&user_id).is_some_and(|u| u.banned)
    }

    pub fn link(&mut self, owner: UserId, id: ListingId) {
        let (user, _) = self.ensure(owner);
        if !user.listing_ids.contains(&id) {
            user.listing_ids.push(id);
        }
    }

    pub fn unlink(&mut self, owner: UserId, id: ListingId) {
        if let Some(user) = self.users.get_mut(&owner) {
            user.listing_ids.retain(|x| *x != id);
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

// ============== Listing Store ==============

#[derive(Debug)]
pub struct ListingTable {
    listings: BTreeMap<ListingId, Listing>,
    next_id: u64,
}

impl Default for ListingTable {
    fn default() -> Self {
        Self {
            listings: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl ListingTable {
    pub fn get(&self, id: ListingId) -> Option<&Listing> {
        self.listings.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Listing> {
        self.listings.values()
    }

    /// Ids never repeat, even after deletions. `None` once the id space is used up.
    pub fn allocate_id(&mut self) -> Option<ListingId> {
        let id = ListingId(self.next_id);
        self.next_id = self.next_id.checked_add(1)?;
        Some(id)
    }

    /// Records at the top of the id space are refused so `next_id` always fits.
    pub fn insert(&mut self, listing: Listing) -> bool {
        let Some(next) = listing.id.0.checked_add(1) else {
            return false;
        };
        self.next_id = self.next_id.max(next);
        self.listings.insert(listing.id, listing);
        true
    }

    pub fn remove(&mut self, id: ListingId) -> Option<Listing> {
        self.listings.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct Tables {
    pub listings: ListingTable,
    pub users: UserRegistry,
}

impl Tables {
    /// Make every listing's owner exist and own it, and drop user links to listings
    /// that are gone or belong to someone else. Returns `true` if anything changed.
    fn repair_links(&mut self) -> bool {
        let mut changed = false;

        for listing in self.listings.listings.values() {
            let (user, created) = self.users.ensure(listing.owner);
            changed |= created;
            if !user.listing_ids.contains(&listing.id) {
                user.listing_ids.push(listing.id);
                changed = true;
            }
        }

        for user in self.users.users.values_mut() {
            let before = user.listing_ids.len();
            let listings = &self.listings.listings;
            user.listing_ids
                .retain(|id| listings.get(id).is_some_and(|l| l.owner == user.user_id));
            changed |= user.listing_ids.len() != before;
        }

        changed
    }
}

/// Process-wide listing + user state with write-through persistence.
pub struct Store {
    tables: Mutex<Tables>,
    kv: Arc<dyn KvStore>,
}

impl Store {
    pub fn empty(kv: Arc<dyn KvStore>) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            kv,
        }
    }

    /// Load both stores. Absent stores start empty; unreadable stores or records are
    /// logged and skipped.
    pub async fn load(kv: Arc<dyn KvStore>) -> Self {
        let mut tables = Tables::default();

        for (key, value) in load_map(kv.as_ref(), USERS_STORE).await {
            let Ok(user_id) = key.trim().parse::<i64>().map(UserId) else {
                tracing::warn!(key = %key, "skipping user with non-numeric id");
                continue;
            };
            match serde_json::from_value::<UserRecord>(value) {
                Ok(record) => {
                    tables.users.users.insert(user_id, record.into_user(user_id));
                }
                Err(e) => tracing::warn!(user = %user_id, error = %e, "skipping invalid user record"),
            }
        }

        for (key, value) in load_map(kv.as_ref(), LISTINGS_STORE).await {
            let listing = serde_json::from_value::<ListingRecord>(value)
                .map_err(|e| e.to_string())
                .and_then(|r| Listing::try_from(r).map_err(|e| e.to_string()));
            match listing {
                Ok(listing) => {
                    if !tables.listings.insert(listing) {
                        tracing::warn!(key = %key, "skipping listing with out-of-range id");
                    }
                }
                Err(e) => tracing::warn!(key = %key, error = %e, "skipping invalid listing"),
            }
        }

        let repaired = tables.repair_links();
        tracing::info!(
            listings = tables.listings.len(),
            users = tables.users.len(),
            "stores loaded"
        );

        let store = Self {
            tables: Mutex::new(tables),
            kv,
        };
        if repaired {
            let tables = store.tables.lock().await;
            store.persist_users(&tables).await;
        }
        store
    }

    /// Register the user on first contact. Returns the current record.
    pub async fn register(&self, user_id: UserId) -> User {
        let mut tables = self.tables.lock().await;
        let (user, created) = tables.users.ensure(user_id);
        let user = user.clone();
        if created {
            tracing::info!(user = %user_id, "registered new user");
            self.persist_users(&tables).await;
        }
        user
    }

    pub async fn user(&self, user_id: UserId) -> Option<User> {
        self.tables.lock().await.users.get(user_id).cloned()
    }

    pub async fn is_banned(&self, user_id: UserId) -> bool {
        self.tables.lock().await.users.is_banned(user_id)
    }

    pub async fn set_banned(&self, user_id: UserId, banned: bool) -> User {
        let mut tables = self.tables.lock().await;
        let (user, _) = tables.users.ensure(user_id);
        user.banned = banned;
        let user = user.clone();
        tracing::info!(user = %user_id, banned, "ban flag updated");
        self.persist_users(&tables).await;
        user
    }

    pub async fn get(&self, id: ListingId) -> Option<Listing> {
        self.tables.lock().await.listings.get(id).cloned()
    }

    /// Listings for the given ids, in order, skipping ids that no longer exist.
    pub async fn get_many(&self, ids: &[ListingId]) -> Vec<Listing> {
        let tables = self.tables.lock().await;
        ids.iter()
            .filter_map(|id| tables.listings.get(*id).cloned())
            .collect()
    }

    pub async fn create(
        &self,
        owner: UserId,
        new: NewListing,
        now: DateTime<Utc>,
    ) -> Result<Listing> {
        let mut tables = self.tables.lock().await;
        if tables.users.is_banned(owner) {
            return Err(Error::Banned(owner));
        }

        let id = tables.listings.allocate_id().ok_or(Error::IdsExhausted)?;
        let listing = Listing::create(id, owner, new, now)?;
        tables.listings.insert(listing.clone());
        tables.users.link(owner, id);

        tracing::info!(user = %owner, listing = %id, title = %listing.title, "listing created");
        self.persist_listings(&tables).await;
        self.persist_users(&tables).await;
        Ok(listing)
    }

    /// Apply a single-field edit. Only the owner may edit.
    pub async fn update(
        &self,
        actor: UserId,
        id: ListingId,
        edit: FieldEdit,
        now: DateTime<Utc>,
    ) -> Result<Listing> {
        let mut tables = self.tables.lock().await;
        if tables.users.is_banned(actor) {
            return Err(Error::Banned(actor));
        }
        let listing = tables.listings.listings.get_mut(&id).ok_or(Error::NotFound(id))?;
        if listing.owner != actor {
            return Err(Error::Forbidden {
                user: actor,
                listing: id,
            });
        }

        listing.apply(edit, now)?;
        let listing = listing.clone();

        tracing::info!(user = %actor, listing = %id, "listing edited");
        self.persist_listings(&tables).await;
        Ok(listing)
    }

    /// Remove a listing and unlink it from its owner in one step.
    ///
    /// `override_owner` lets an administrator delete listings they do not own.
    pub async fn delete(
        &self,
        actor: UserId,
        id: ListingId,
        override_owner: bool,
    ) -> Result<Listing> {
        let mut tables = self.tables.lock().await;
        let owner = tables
            .listings
            .get(id)
            .map(|l| l.owner)
            .ok_or(Error::NotFound(id))?;
        if owner != actor && !override_owner {
            return Err(Error::Forbidden {
                user: actor,
                listing: id,
            });
        }

        let listing = tables.listings.remove(id).ok_or(Error::NotFound(id))?;
        tables.users.unlink(owner, id);

        tracing::info!(user = %actor, owner = %owner, listing = %id, "listing deleted");
        self.persist_listings(&tables).await;
        self.persist_users(&tables).await;
        Ok(listing)
    }

    /// Stored listings, expired ones included.
    pub async fn len(&self) -> usize {
        self.tables.lock().await.listings.len()
    }

    pub async fn search(&self, query: &SearchQuery, now: DateTime<Utc>) -> Vec<ListingId> {
        let tables = self.tables.lock().await;
        search::search(tables.listings.iter(), query, now)
    }

    pub async fn occupancy(&self, now: DateTime<Utc>) -> Occupancy {
        let tables = self.tables.lock().await;
        search::occupancy(tables.listings.iter(), now)
    }

    /// The user's active listings in the order they were created.
    pub async fn active_listings_of(&self, user_id: UserId, now: DateTime<Utc>) -> Vec<Listing> {
        let tables = self.tables.lock().await;
        let Some(user) = tables.users.get(user_id) else {
            return Vec::new();
        };
        user.listing_ids
            .iter()
            .filter_map(|id| tables.listings.get(*id))
            .filter(|l| l.is_active(now))
            .cloned()
            .collect()
    }

    async fn persist_listings(&self, tables: &Tables) {
        let map: BTreeMap<String, ListingRecord> = tables
            .listings
            .iter()
            .map(|l| (l.id.to_string(), ListingRecord::from(l)))
            .collect();
        self.persist(LISTINGS_STORE, &map).await;
    }

    async fn persist_users(&self, tables: &Tables) {
        let map: BTreeMap<String, UserRecord> = tables
            .users
            .users
            .iter()
            .map(|(id, u)| (id.to_string(), UserRecord::from_user(u)))
            .collect();
        self.persist(USERS_STORE, &map).await;
    }

    async fn persist<T: Serialize>(&self, name: &str, value: &T) {
        let res = match serde_json::to_string_pretty(value) {
            Ok(txt) => self.kv.save(name, &txt).await,
            Err(e) => Err(e.into()),
        };
        match res {
            Ok(()) => tracing::debug!(store = name, "store saved"),
            Err(e) => tracing::error!(store = name, error = %e, "failed to save store"),
        }
    }
}

async fn load_map(kv: &dyn KvStore, name: &str) -> serde_json::Map<String, serde_json::Value> {
    let txt = match kv.load(name).await {
        Ok(Some(txt)) => txt,
        Ok(None) => {
            tracing::info!(store = name, "store not found, starting empty");
            return serde_json::Map::new();
        }
        Err(e) => {
            tracing::error!(store = name, error = %e, "failed to read store, starting empty");
            return serde_json::Map::new();
        }
    };
    match serde_json::from_str(&txt) {
        Ok(map) => map,
        Err(e) => {
            tracing::error!(store = name, error = %e, "store is not a JSON object, starting empty");
            serde_json::Map::new()
        }
    }
}
