use std::{collections::HashMap, sync::Arc};

use crate::item::{CatalogItem, InclusionStatus, ItemType};

/// Ordered list backing one view.  Cloning is cheap; writers replace the
/// whole slice, so a clone taken before a mutation keeps the old contents.
pub type Projection = Arc<Vec<CatalogItem>>;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Screen {
    Search,
    Summary,
}

impl Screen {
    pub fn all() -> &'static [Self] {
        &[Self::Search, Self::Summary]
    }

    /// View holding the children shown when an item of `parent` type is
    /// expanded on this screen.
    pub fn child_view(&self, parent: ItemType) -> Option<View> {
        let child = parent.child()?;
        Some(match self {
            Screen::Search => View::Search(child),
            Screen::Summary => View::Browse(child),
        })
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum View {
    /// Search results, and the search screen's expanded children.
    Search(ItemType),
    /// Explicitly included items of one type.
    Summary(ItemType),
    /// The summary screen's expanded children.
    Browse(ItemType),
    /// Playlists available for selection.
    Selection,
}

impl View {
    pub fn item_type(&self) -> ItemType {
        match self {
            View::Search(t) | View::Summary(t) | View::Browse(t) => *t,
            View::Selection => ItemType::Playlist,
        }
    }
}

#[derive(Default)]
pub struct ProjectionStore {
    views: HashMap<View, Projection>,
}

impl ProjectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, view: View) -> Projection {
        self.views.get(&view).cloned().unwrap_or_default()
    }

    pub fn items(&self, view: View) -> &[CatalogItem] {
        self.views.get(&view).map_or(&[], |list| list.as_slice())
    }

    pub fn find(&self, view: View, id: &str) -> Option<&CatalogItem> {
        self.items(view).iter().find(|item| &*item.id == id)
    }

    pub fn replace(&mut self, view: View, items: Vec<CatalogItem>) -> Projection {
        let list = Arc::new(items);
        self.views.insert(view, list.clone());
        list
    }

    pub fn clear(&mut self, view: View) {
        self.views.remove(&view);
    }

    pub fn clear_all(&mut self) {
        self.views.clear();
    }

    /// Update the status of `id` in `view`, returning the updated list, or
    /// `None` if the view does not hold the item.  `hint` is the index the
    /// item was rendered at; when it no longer points at `id` the list is
    /// scanned instead.
    pub fn patch(
        &mut self,
        view: View,
        id: &str,
        hint: Option<usize>,
        status: InclusionStatus,
    ) -> Option<Projection> {
        let list = self.views.get_mut(&view)?;
        let index = match hint {
            Some(index) if list.get(index).is_some_and(|item| &*item.id == id) => index,
            _ => {
                if hint.is_some() {
                    log::debug!("stale index hint for {} in {:?}", id, view);
                }
                list.iter().position(|item| &*item.id == id)?
            }
        };
        Arc::make_mut(list)[index].status = status;
        Some(list.clone())
    }

    /// Apply `f` to every item of `view`, returning what `f` reported.
    pub fn update_each<F>(&mut self, view: View, mut f: F) -> Vec<Arc<str>>
    where
        F: FnMut(&mut CatalogItem) -> bool,
    {
        let Some(list) = self.views.get_mut(&view) else {
            return Vec::new();
        };
        let mut next = list.as_ref().clone();
        let changed: Vec<Arc<str>> = next
            .iter_mut()
            .filter_map(|item| f(item).then(|| item.id.clone()))
            .collect();
        if !changed.is_empty() {
            *list = Arc::new(next);
        }
        changed
    }

    /// Append `item` unless the view already holds its id.
    pub fn append(&mut self, view: View, item: CatalogItem) -> bool {
        let list = self.views.entry(view).or_default();
        if list.iter().any(|existing| existing.id == item.id) {
            return false;
        }
        Arc::make_mut(list).push(item);
        true
    }

    pub fn remove(&mut self, view: View, id: &str) -> bool {
        let Some(list) = self.views.get_mut(&view) else {
            return false;
        };
        let Some(index) = list.iter().position(|item| &*item.id == id) else {
            return false;
        };
        Arc::make_mut(list).remove(index);
        true
    }

    /// Views currently holding a copy of `(id, item_type)`.
    pub fn views_holding(&self, id: &str, item_type: ItemType) -> Vec<View> {
        let mut views: Vec<View> = self
            .views
            .iter()
            .filter(|(view, list)| {
                view.item_type() == item_type && list.iter().any(|item| item.is(id, item_type))
            })
            .map(|(view, _)| *view)
            .collect();
        // Deterministic order keeps the first-found copy stable.
        views.sort_by_key(|view| view_rank(view));
        views
    }

    /// First copy of `(id, item_type)` in any view.
    pub fn lookup(&self, id: &str, item_type: ItemType) -> Option<&CatalogItem> {
        self.views_holding(id, item_type)
            .into_iter()
            .find_map(|view| self.find(view, id))
    }
}

fn view_rank(view: &View) -> u8 {
    match view {
        View::Search(_) => 0,
        View::Browse(_) => 1,
        View::Selection => 2,
        View::Summary(_) => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn albums() -> Vec<CatalogItem> {
        vec![
            CatalogItem::new("a1", ItemType::Album, "Greatest Hits"),
            CatalogItem::new("a2", ItemType::Album, "Live at Wembley"),
            CatalogItem::new("a3", ItemType::Album, "B-Sides"),
        ]
    }

    #[test]
    fn patch_paths_are_equivalent() {
        for (index, item) in albums().iter().enumerate() {
            let mut hinted = ProjectionStore::new();
            hinted.replace(View::Search(ItemType::Album), albums());
            let mut scanned = ProjectionStore::new();
            scanned.replace(View::Search(ItemType::Album), albums());
            let mut unhinted = ProjectionStore::new();
            unhinted.replace(View::Search(ItemType::Album), albums());

            let stale = (index + 1) % 3;
            let a = hinted.patch(
                View::Search(ItemType::Album),
                &item.id,
                Some(index),
                InclusionStatus::Included,
            );
            let b = scanned.patch(
                View::Search(ItemType::Album),
                &item.id,
                Some(stale),
                InclusionStatus::Included,
            );
            let c = unhinted.patch(
                View::Search(ItemType::Album),
                &item.id,
                None,
                InclusionStatus::Included,
            );

            assert_eq!(a, b);
            assert_eq!(b, c);
            assert_eq!(a.unwrap()[index].status, InclusionStatus::Included);
        }
    }

    #[test]
    fn patch_with_out_of_range_hint_scans() {
        let mut store = ProjectionStore::new();
        store.replace(View::Search(ItemType::Album), albums());
        let list = store
            .patch(View::Search(ItemType::Album), "a3", Some(42), InclusionStatus::Excluded)
            .unwrap();
        assert_eq!(list[2].status, InclusionStatus::Excluded);
    }

    #[test]
    fn patch_missing_item_leaves_view_untouched() {
        let mut store = ProjectionStore::new();
        let before = store.replace(View::Search(ItemType::Album), albums());
        assert!(store
            .patch(View::Search(ItemType::Album), "zz", Some(0), InclusionStatus::Included)
            .is_none());
        assert_eq!(store.get(View::Search(ItemType::Album)), before);
        assert!(store
            .patch(View::Browse(ItemType::Album), "a1", None, InclusionStatus::Included)
            .is_none());
    }

    #[test]
    fn readers_keep_the_slice_they_took() {
        let mut store = ProjectionStore::new();
        store.replace(View::Search(ItemType::Album), albums());
        let snapshot = store.get(View::Search(ItemType::Album));
        store.patch(View::Search(ItemType::Album), "a1", Some(0), InclusionStatus::Included);
        assert_eq!(snapshot[0].status, InclusionStatus::Unset);
        assert_eq!(
            store.items(View::Search(ItemType::Album))[0].status,
            InclusionStatus::Included
        );
    }

    #[test]
    fn append_is_idempotent_and_remove_by_id() {
        let mut store = ProjectionStore::new();
        let item = CatalogItem::new("t1", ItemType::Track, "Intro");
        assert!(store.append(View::Summary(ItemType::Track), item.clone()));
        assert!(!store.append(View::Summary(ItemType::Track), item));
        assert_eq!(store.items(View::Summary(ItemType::Track)).len(), 1);
        assert!(store.remove(View::Summary(ItemType::Track), "t1"));
        assert!(!store.remove(View::Summary(ItemType::Track), "t1"));
        assert!(store.items(View::Summary(ItemType::Track)).is_empty());
    }

    #[test]
    fn views_holding_filters_by_type() {
        let mut store = ProjectionStore::new();
        store.replace(View::Search(ItemType::Album), albums());
        store.replace(
            View::Summary(ItemType::Album),
            vec![albums()[1].clone().with_status(InclusionStatus::Included)],
        );
        store.replace(
            View::Search(ItemType::Track),
            vec![CatalogItem::new("a2", ItemType::Track, "Same id, other type")],
        );
        assert_eq!(
            store.views_holding("a2", ItemType::Album),
            vec![View::Search(ItemType::Album), View::Summary(ItemType::Album)]
        );
        assert_eq!(
            store.lookup("a2", ItemType::Album).map(|item| item.status),
            Some(InclusionStatus::Unset)
        );
    }
}
