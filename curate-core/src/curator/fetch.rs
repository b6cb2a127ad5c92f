use std::sync::Arc;

use itertools::Itertools;

use super::{Activity, Curator, Outcome, Pending, PendingKind};
use crate::{
    error::Error,
    item::{CatalogItem, InclusionStatus, Item, ItemType},
    ledger::{ChildrenRequest, Ledger, LedgerRequest, LedgerResponse, SearchRequest},
    projection::{Screen, View},
};

#[derive(Debug)]
pub(super) enum Fetch {
    Playlists,
    Search(ItemType),
    Expand {
        screen: Screen,
        parent: Arc<str>,
        children: View,
    },
    Summary,
    CreatePlaylist,
    RenamePlaylist(Arc<str>),
    DeletePlaylist(Arc<str>),
    Publish,
}

impl Fetch {
    fn activity(&self) -> Activity {
        match self {
            Fetch::Playlists => Activity::Playlists,
            Fetch::Search(_) => Activity::Search,
            Fetch::Expand {
                screen, children, ..
            } => Activity::Expand(*screen, children.item_type()),
            Fetch::Summary => Activity::Summary,
            Fetch::CreatePlaylist
            | Fetch::RenamePlaylist(_)
            | Fetch::DeletePlaylist(_)
            | Fetch::Publish => Activity::PlaylistEdit,
        }
    }
}

/// Loads.  Only the response to the latest request of each activity lands.
impl<L: Ledger> Curator<L> {
    pub fn load_playlists(&mut self) -> Result<Outcome, Error> {
        let pending = self.begin_load_playlists();
        self.run(pending)
    }

    pub fn begin_load_playlists(&mut self) -> Pending {
        self.begin_fetch(Fetch::Playlists, LedgerRequest::Playlists)
    }

    pub fn search(&mut self, query: &str) -> Result<Outcome, Error> {
        let pending = self.begin_search(query)?;
        self.run(pending)
    }

    /// Search the catalog for items of the current search type.
    pub fn begin_search(&mut self, query: &str) -> Result<Pending, Error> {
        let playlist_id = self.working_playlist()?;
        let item_type = self.search_type;
        // Lists of other types on this screen belong to the previous results.
        self.expanded.remove(&Screen::Search);
        for t in ItemType::all().iter().filter(|t| **t != item_type) {
            self.store.clear(View::Search(*t));
            self.fetches.remove(&Activity::Expand(Screen::Search, *t));
        }
        let request = LedgerRequest::Search(SearchRequest {
            playlist_id,
            query: query.into(),
            item_type,
        });
        Ok(self.begin_fetch(Fetch::Search(item_type), request))
    }

    pub fn expand(
        &mut self,
        screen: Screen,
        id: impl Into<Arc<str>>,
        item_type: ItemType,
    ) -> Result<Outcome, Error> {
        let pending = self.begin_expand(screen, id, item_type)?;
        self.run(pending)
    }

    /// Open an artist or album on `screen` and load its children.  The
    /// parent is recorded right away, so a decision on it made while the
    /// children load still reaches them once they arrive with the ledger's
    /// statuses.
    pub fn begin_expand(
        &mut self,
        screen: Screen,
        id: impl Into<Arc<str>>,
        item_type: ItemType,
    ) -> Result<Pending, Error> {
        let id = id.into();
        let playlist_id = self.working_playlist()?;
        let children = screen
            .child_view(item_type)
            .ok_or(Error::Unsupported("expanding this item type"))?;

        let expansion = self.expansion_mut(screen);
        if item_type == ItemType::Artist {
            expansion.artist = Some(id.clone());
            expansion.album = None;
            if let Some(tracks) = screen.child_view(ItemType::Album) {
                self.store.clear(tracks);
                self.fetches
                    .remove(&Activity::Expand(screen, tracks.item_type()));
            }
        } else {
            expansion.album = Some(id.clone());
        }
        self.store.clear(children);

        let req = ChildrenRequest {
            parent_id: id.clone(),
            playlist_id,
            item_type,
        };
        let request = if item_type == ItemType::Artist {
            LedgerRequest::ArtistAlbums(req)
        } else {
            LedgerRequest::AlbumTracks(req)
        };
        Ok(self.begin_fetch(
            Fetch::Expand {
                screen,
                parent: id,
                children,
            },
            request,
        ))
    }

    pub fn refresh_summary(&mut self) -> Result<Outcome, Error> {
        let pending = self.begin_refresh_summary()?;
        self.run(pending)
    }

    /// Reload every explicitly included item of the working playlist.
    pub fn begin_refresh_summary(&mut self) -> Result<Pending, Error> {
        let playlist_id = self.working_playlist()?;
        self.close_screen(Screen::Summary);
        Ok(self.begin_fetch(Fetch::Summary, LedgerRequest::Inclusions { playlist_id }))
    }

    fn begin_fetch(&mut self, fetch: Fetch, request: LedgerRequest) -> Pending {
        let seq = self.requests.advance();
        self.fetches.entry(fetch.activity()).or_default().defer(seq);
        Pending {
            request,
            kind: PendingKind::Fetch(fetch, seq),
        }
    }

    pub(super) fn complete_fetch(
        &mut self,
        fetch: Fetch,
        seq: u64,
        result: Result<LedgerResponse, Error>,
    ) -> Result<Outcome, Error> {
        let activity = fetch.activity();
        let current = self
            .fetches
            .get(&activity)
            .is_some_and(|promise| promise.is_deferred(&seq));
        if !current {
            log::debug!("dropping stale {:?} response #{}", activity, seq);
            return Ok(Outcome::Superseded);
        }

        let outcome = result.and_then(|response| self.apply_fetch(fetch, response));
        if let Err(err) = &outcome {
            log::warn!("{:?} failed: {}", activity, err);
        }
        self.fetches
            .entry(activity)
            .or_default()
            .update((seq, outcome.as_ref().map(|_| ()).map_err(Clone::clone)));
        outcome
    }

    fn apply_fetch(&mut self, fetch: Fetch, response: LedgerResponse) -> Result<Outcome, Error> {
        match fetch {
            Fetch::Playlists => {
                let playlists: Vec<CatalogItem> = response
                    .into_playlists()?
                    .into_iter()
                    .map(CatalogItem::from)
                    .collect();
                Ok(self.fill(View::Selection, playlists))
            }
            Fetch::Search(item_type) => {
                let items = response.into_items()?;
                Ok(self.fill(View::Search(item_type), convert(items)))
            }
            Fetch::Expand {
                parent, children, ..
            } => {
                let items = response.into_items()?;
                log::debug!("{} children of {}", items.len(), parent);
                Ok(self.fill(children, convert(items)))
            }
            Fetch::Summary => {
                let included = response
                    .into_items()?
                    .into_iter()
                    .map(CatalogItem::from)
                    .filter(|item| item.status == InclusionStatus::Included)
                    .collect_vec();
                let count = included.len();
                let mut by_type = included.into_iter().into_group_map_by(|item| item.item_type);
                for item_type in ItemType::all() {
                    let items = by_type.remove(item_type).unwrap_or_default();
                    self.store.replace(View::Summary(*item_type), items);
                }
                Ok(Outcome::Refreshed { count })
            }
            Fetch::CreatePlaylist
            | Fetch::RenamePlaylist(_)
            | Fetch::DeletePlaylist(_)
            | Fetch::Publish => Err(Error::UnexpectedResponse),
        }
    }

    fn fill(&mut self, view: View, items: Vec<CatalogItem>) -> Outcome {
        let count = items.len();
        self.store.replace(view, items);
        Outcome::Loaded { view, count }
    }
}

/// Playlist management.  Every confirmed edit is applied, whatever the order
/// the answers arrive in.
impl<L: Ledger> Curator<L> {
    pub fn create_playlist(&mut self, name: &str) -> Result<Outcome, Error> {
        let pending = self.begin_create_playlist(name);
        self.run(pending)
    }

    pub fn begin_create_playlist(&mut self, name: &str) -> Pending {
        let request = LedgerRequest::CreatePlaylist { name: name.into() };
        self.begin_edit(Fetch::CreatePlaylist, request)
    }

    pub fn rename_playlist(&mut self, id: &str, name: &str) -> Result<Outcome, Error> {
        let pending = self.begin_rename_playlist(id, name);
        self.run(pending)
    }

    pub fn begin_rename_playlist(&mut self, id: &str, name: &str) -> Pending {
        let id: Arc<str> = id.into();
        let request = LedgerRequest::RenamePlaylist {
            id: id.clone(),
            name: name.into(),
        };
        self.begin_edit(Fetch::RenamePlaylist(id), request)
    }

    pub fn delete_playlist(&mut self, id: &str) -> Result<Outcome, Error> {
        let pending = self.begin_delete_playlist(id);
        self.run(pending)
    }

    pub fn begin_delete_playlist(&mut self, id: &str) -> Pending {
        let id: Arc<str> = id.into();
        let request = LedgerRequest::DeletePlaylist { id: id.clone() };
        self.begin_edit(Fetch::DeletePlaylist(id), request)
    }

    pub fn publish(&mut self, spotify_id: &str) -> Result<Outcome, Error> {
        let pending = self.begin_publish(spotify_id);
        self.run(pending)
    }

    /// Push the playlist's resolved track list to Spotify.
    pub fn begin_publish(&mut self, spotify_id: &str) -> Pending {
        let request = LedgerRequest::Publish {
            spotify_id: spotify_id.into(),
        };
        self.begin_edit(Fetch::Publish, request)
    }

    pub fn publish_all(&mut self) -> Result<Outcome, Error> {
        let pending = self.begin_publish_all();
        self.run(pending)
    }

    pub fn begin_publish_all(&mut self) -> Pending {
        self.begin_edit(Fetch::Publish, LedgerRequest::PublishAll)
    }

    fn begin_edit(&mut self, fetch: Fetch, request: LedgerRequest) -> Pending {
        self.edits.start();
        Pending {
            request,
            kind: PendingKind::Edit(fetch),
        }
    }

    pub(super) fn complete_edit(
        &mut self,
        fetch: Fetch,
        result: Result<LedgerResponse, Error>,
    ) -> Result<Outcome, Error> {
        let outcome = result.and_then(|response| self.apply_edit(fetch, response));
        match &outcome {
            Ok(_) => self.edits.finish(Ok(())),
            Err(err) => {
                log::warn!("playlist edit failed: {}", err);
                self.edits.finish(Err(err));
            }
        }
        outcome
    }

    fn apply_edit(&mut self, fetch: Fetch, response: LedgerResponse) -> Result<Outcome, Error> {
        match fetch {
            Fetch::CreatePlaylist => {
                let playlist = response.into_playlist()?;
                log::info!("created playlist {} ({})", playlist.name, playlist.spotify_id);
                self.store
                    .append(View::Selection, CatalogItem::from(playlist.clone()));
                Ok(Outcome::Playlist(playlist))
            }
            Fetch::RenamePlaylist(id) => {
                let playlist = response.into_playlist()?;
                for view in self.store.views_holding(&id, ItemType::Playlist) {
                    self.store.update_each(view, |item| {
                        if item.id == id && item.name != playlist.name {
                            item.name = playlist.name.clone();
                            true
                        } else {
                            false
                        }
                    });
                }
                Ok(Outcome::Playlist(playlist))
            }
            Fetch::DeletePlaylist(id) => {
                response.into_ack()?;
                for view in self.store.views_holding(&id, ItemType::Playlist) {
                    self.store.remove(view, &id);
                }
                if self.playlist.as_deref() == Some(&*id) {
                    log::info!("working playlist {} was deleted", id);
                    self.playlist = None;
                    self.reset_session();
                }
                Ok(Outcome::Acknowledged)
            }
            Fetch::Publish => {
                response.into_ack()?;
                Ok(Outcome::Acknowledged)
            }
            Fetch::Playlists | Fetch::Search(_) | Fetch::Expand { .. } | Fetch::Summary => {
                Err(Error::UnexpectedResponse)
            }
        }
    }
}

fn convert(items: Vec<Item>) -> Vec<CatalogItem> {
    items.into_iter().map(CatalogItem::from).collect()
}
