//! Filtering, ordering and paging over active listings.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::{
    catalog::{Category, City},
    domain::ListingId,
    listing::Listing,
};

pub const PAGE_SIZE: usize = 5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    Any,
    FreeOnly,
    Category(Category),
}

impl CategoryFilter {
    pub fn matches(self, listing: &Listing) -> bool {
        match self {
            CategoryFilter::Any => true,
            CategoryFilter::FreeOnly => listing.is_free(),
            CategoryFilter::Category(c) => listing.category == c,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub keyword: String,
    pub category: CategoryFilter,
    pub city: Option<City>,
}

impl SearchQuery {
    /// All filters are conjunctive and only active listings match.
    pub fn matches(&self, listing: &Listing, now: DateTime<Utc>) -> bool {
        listing.is_active(now)
            && listing.matches_keyword(&self.keyword)
            && self.category.matches(listing)
            && self.city.map_or(true, |c| listing.city() == Some(c))
    }
}

/// Matching ids, free listings first. Relative order is otherwise the input order.
pub fn search<'a>(
    listings: impl IntoIterator<Item = &'a Listing>,
    query: &SearchQuery,
    now: DateTime<Utc>,
) -> Vec<ListingId> {
    let mut hits: Vec<&Listing> = listings
        .into_iter()
        .filter(|l| query.matches(l, now))
        .collect();
    hits.sort_by_key(|l| !l.is_free());
    hits.into_iter().map(|l| l.id).collect()
}

/// Active-listing counts for the search menus. Recomputed on every call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Occupancy {
    pub by_category: BTreeMap<Category, usize>,
    pub free: usize,
    pub by_city: BTreeMap<City, usize>,
}

impl Occupancy {
    pub fn category(&self, category: Category) -> usize {
        self.by_category.get(&category).copied().unwrap_or(0)
    }

    pub fn city(&self, city: City) -> usize {
        self.by_city.get(&city).copied().unwrap_or(0)
    }
}

pub fn occupancy<'a>(
    listings: impl IntoIterator<Item = &'a Listing>,
    now: DateTime<Utc>,
) -> Occupancy {
    let mut occ = Occupancy::default();
    for listing in listings.into_iter().filter(|l| l.is_active(now)) {
        *occ.by_category.entry(listing.category).or_default() += 1;
        if listing.is_free() {
            occ.free += 1;
        }
        if let Some(city) = listing.city() {
            *occ.by_city.entry(city).or_default() += 1;
        }
    }
    occ
}

// ============== Browsing ==============

/// Outcome of a navigation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Moved,
    /// Already at the first page/item; nothing changed.
    AtStart,
    /// Already at the last page/item; nothing changed.
    AtEnd,
}

/// Position within a frozen result list.
///
/// Pages and single items are tracked separately; opening an item moves the page
/// to the one containing it so "back to results" lands where the user was.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultCursor {
    ids: Vec<ListingId>,
    page: usize,
    item: Option<usize>,
}

impl ResultCursor {
    pub fn new(ids: Vec<ListingId>) -> Self {
        Self {
            ids,
            page: 0,
            item: None,
        }
    }

    pub fn total(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        self.ids.len().div_ceil(PAGE_SIZE).max(1)
    }

    /// Index of the first entry on the current page within the full list.
    pub fn page_start(&self) -> usize {
        self.page * PAGE_SIZE
    }

    pub fn ids(&self) -> &[ListingId] {
        &self.ids
    }

    /// Drop every id `keep` refuses, keeping positions of the rest consistent.
    pub fn retain(&mut self, keep: impl Fn(ListingId) -> bool) {
        let gone: Vec<ListingId> = self.ids.iter().copied().filter(|id| !keep(*id)).collect();
        for id in gone {
            self.remove(id);
        }
    }

    pub fn page_ids(&self) -> &[ListingId] {
        let start = self.page_start().min(self.ids.len());
        let end = (start + PAGE_SIZE).min(self.ids.len());
        &self.ids[start..end]
    }

    pub fn next_page(&mut self) -> Step {
        if self.page + 1 >= self.page_count() {
            return Step::AtEnd;
        }
        self.page += 1;
        Step::Moved
    }

    pub fn prev_page(&mut self) -> Step {
        if self.page == 0 {
            return Step::AtStart;
        }
        self.page -= 1;
        Step::Moved
    }

    /// Open the entry at `index` in the full list.
    pub fn open(&mut self, index: usize) -> Option<ListingId> {
        let id = *self.ids.get(index)?;
        self.item = Some(index);
        self.page = index / PAGE_SIZE;
        Some(id)
    }

    pub fn current(&self) -> Option<(usize, ListingId)> {
        let index = self.item?;
        self.ids.get(index).map(|id| (index, *id))
    }

    pub fn next_item(&mut self) -> Step {
        match self.item {
            Some(i) if i + 1 < self.ids.len() => {
                self.open(i + 1);
                Step::Moved
            }
            _ => Step::AtEnd,
        }
    }

    pub fn prev_item(&mut self) -> Step {
        match self.item {
            Some(i) if i > 0 => {
                self.open(i - 1);
                Step::Moved
            }
            _ => Step::AtStart,
        }
    }

    /// Drop an id (e.g. deleted while browsing), keeping the cursor in range.
    pub fn remove(&mut self, id: ListingId) {
        let Some(pos) = self.ids.iter().position(|x| *x == id) else {
            return;
        };
        self.ids.remove(pos);
        self.item = match self.item {
            Some(i) if i == pos => None,
            Some(i) if i > pos => Some(i - 1),
            other => other,
        };
        self.page = self.page.min(self.page_count() - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::GeoPoint,
        listing::{tests::sample, tests::t0, FieldEdit, Price, Vigency},
    };
    use chrono::Duration;

    fn with_city(mut l: Listing, city: City) -> Listing {
        l.apply(FieldEdit::City(city), t0()).unwrap();
        l
    }

    fn ids(v: &[u64]) -> Vec<ListingId> {
        v.iter().copied().map(ListingId).collect()
    }

    #[test]
    fn filters_are_conjunctive() {
        let red = with_city(sample(1, 1, "Silla roja"), City::Quito);
        let blue = with_city(sample(2, 1, "Silla azul"), City::Cuenca);
        let all = [red, blue];

        let query = SearchQuery {
            keyword: "silla".into(),
            category: CategoryFilter::Category(Category::Furniture),
            city: Some(City::Quito),
        };
        assert_eq!(search(&all, &query, t0()), ids(&[1]));

        let query = SearchQuery {
            keyword: "ROJA".into(),
            city: Some(City::Cuenca),
            ..SearchQuery::default()
        };
        assert!(search(&all, &query, t0()).is_empty());

        let query = SearchQuery {
            category: CategoryFilter::Category(Category::Books),
            ..SearchQuery::default()
        };
        assert!(search(&all, &query, t0()).is_empty());
    }

    #[test]
    fn free_listings_sort_first_and_keep_relative_order() {
        let mut listings: Vec<Listing> = (1..=4).map(|i| sample(i, 1, "Cosa")).collect();
        listings[1].apply(FieldEdit::Price(Price::Free), t0()).unwrap();
        listings[3].apply(FieldEdit::Price(Price::Free), t0()).unwrap();

        let hits = search(&listings, &SearchQuery::default(), t0());
        assert_eq!(hits, ids(&[2, 4, 1, 3]));

        let free = SearchQuery {
            category: CategoryFilter::FreeOnly,
            ..SearchQuery::default()
        };
        assert_eq!(search(&listings, &free, t0()), ids(&[2, 4]));
    }

    #[test]
    fn expired_listings_are_excluded_from_search_and_counts() {
        let l = sample(1, 1, "Silla");
        let expires = l.expires_at.unwrap();
        let all = [l];

        assert_eq!(search(&all, &SearchQuery::default(), t0()).len(), 1);
        assert!(search(&all, &SearchQuery::default(), expires).is_empty());
        assert!(search(&all, &SearchQuery::default(), expires + Duration::days(1)).is_empty());
        assert_eq!(occupancy(&all, expires), Occupancy::default());
    }

    #[test]
    fn occupancy_counts_active_listings() {
        let mut free = sample(1, 1, "A");
        free.apply(FieldEdit::Price(Price::Free), t0()).unwrap();
        let mut geo_only = sample(2, 1, "B");
        geo_only
            .apply(
                FieldEdit::GeolocationOnly(GeoPoint::new(0.0, 0.0).unwrap()),
                t0(),
            )
            .unwrap();
        let mut forever = with_city(sample(3, 1, "C"), City::Loja);
        forever
            .apply(FieldEdit::Vigency(Vigency::NoExpiry), t0())
            .unwrap();

        let occ = occupancy(&[free, geo_only, forever], t0());
        assert_eq!(occ.category(Category::Furniture), 3);
        assert_eq!(occ.category(Category::Books), 0);
        assert_eq!(occ.free, 1);
        assert_eq!(occ.city(City::Quito), 1);
        assert_eq!(occ.city(City::Loja), 1);

        let later = occupancy(&[sample(9, 1, "X")], t0() + Duration::days(4));
        assert_eq!(later.category(Category::Furniture), 0);
    }

    #[test]
    fn page_navigation_clamps() {
        let mut cursor = ResultCursor::new(ids(&(1..=12).collect::<Vec<_>>()));
        assert_eq!(cursor.page_count(), 3);
        assert_eq!(cursor.prev_page(), Step::AtStart);
        assert_eq!(cursor.page(), 0);

        assert_eq!(cursor.next_page(), Step::Moved);
        assert_eq!(cursor.next_page(), Step::Moved);
        assert_eq!(cursor.page_ids(), ids(&[11, 12]).as_slice());
        assert_eq!(cursor.next_page(), Step::AtEnd);
        assert_eq!(cursor.page(), 2);
    }

    #[test]
    fn item_stepping_clamps_and_follows_pages() {
        let mut cursor = ResultCursor::new(ids(&[10, 20, 30, 40, 50, 60]));
        assert_eq!(cursor.prev_item(), Step::AtStart);

        assert_eq!(cursor.open(4), Some(ListingId(50)));
        assert_eq!(cursor.next_item(), Step::Moved);
        assert_eq!(cursor.current(), Some((5, ListingId(60))));
        assert_eq!(cursor.page(), 1);
        assert_eq!(cursor.next_item(), Step::AtEnd);
        assert_eq!(cursor.current(), Some((5, ListingId(60))));

        cursor.open(0);
        assert_eq!(cursor.prev_item(), Step::AtStart);
        assert_eq!(cursor.page(), 0);
        assert_eq!(cursor.open(6), None);
    }

    #[test]
    fn empty_result_list_has_one_empty_page() {
        let mut cursor = ResultCursor::new(vec![]);
        assert!(cursor.is_empty());
        assert_eq!(cursor.page_count(), 1);
        assert!(cursor.page_ids().is_empty());
        assert_eq!(cursor.next_page(), Step::AtEnd);
    }

    #[test]
    fn removing_an_id_keeps_cursor_in_range() {
        let mut cursor = ResultCursor::new(ids(&[1, 2, 3, 4, 5, 6]));
        cursor.open(5);
        cursor.remove(ListingId(6));
        assert_eq!(cursor.current(), None);
        assert_eq!(cursor.page(), 0);
        assert_eq!(cursor.total(), 5);
    }

    #[test]
    fn retain_drops_refused_ids_and_clamps_page() {
        let mut cursor = ResultCursor::new(ids(&[1, 2, 3, 4, 5, 6, 7]));
        cursor.next_page();
        cursor.retain(|id| id.0 <= 4);
        assert_eq!(cursor.total(), 4);
        assert_eq!(cursor.page(), 0);
        assert_eq!(cursor.page_ids(), ids(&[1, 2, 3, 4]).as_slice());
    }
}
