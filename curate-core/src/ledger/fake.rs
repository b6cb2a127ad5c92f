//! In-memory ledger with scripted failures.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use serde_json::{json, Value};

use super::{Ack, Ledger, LedgerRequest, LedgerResponse};
use crate::{
    error::Error,
    item::{InclusionStatus, Item, ItemType, Playlist},
};

#[derive(Default)]
struct State {
    playlists: Vec<Playlist>,
    catalog: Vec<Item>,
    children: HashMap<Arc<str>, Vec<Arc<str>>>,
    decisions: HashMap<(Arc<str>, Arc<str>), InclusionStatus>,
    failure: Option<Error>,
    silent: bool,
    requests: Vec<LedgerRequest>,
    created: u64,
}

impl State {
    fn item(&self, id: &str) -> Option<&Item> {
        self.catalog.iter().find(|item| &*item.spotify_id == id)
    }

    fn with_status(&self, playlist_id: &Arc<str>, item: &Item) -> Item {
        let key = (playlist_id.clone(), item.spotify_id.clone());
        Item {
            included: self.decisions.get(&key).copied().unwrap_or_default(),
            ..item.clone()
        }
    }

    fn ack(&self, value: Value) -> LedgerResponse {
        if self.silent {
            LedgerResponse::Ack(Ack(Value::Null))
        } else {
            LedgerResponse::Ack(Ack(value))
        }
    }
}

#[derive(Default)]
pub struct FakeLedger {
    state: Mutex<State>,
}

pub fn item(id: &str, item_type: ItemType, name: &str) -> Item {
    Item {
        spotify_id: id.into(),
        item_type,
        name: name.into(),
        sort_data: None,
        icon: Vec::new(),
        included: InclusionStatus::Unset,
        inclusion_by_proxy: None,
    }
}

impl FakeLedger {
    /// Two artists with albums and tracks, and three playlists.
    ///
    /// ```text
    /// ar1 Queen      al1 Live at Wembley
    ///                al2 A Night at the Opera   t1 Bohemian Rhapsody
    ///                                           t2 Love of My Life - Live
    ///                                           t3 You're My Best Friend
    ///                al3 Greatest Hits          t4 Under Pressure - Single
    /// ar2 Nirvana    al4 MTV Unplugged (Acoustic)
    ///                al5 Nevermind
    /// ```
    pub fn with_catalog() -> Self {
        let ledger = Self::default();
        for (id, name) in [("p1", "Road Trip"), ("p2", "Focus"), ("p3", "Late Night")] {
            ledger.add_playlist(id, name);
        }
        ledger.add(item("ar1", ItemType::Artist, "Queen"), None);
        ledger.add(item("ar2", ItemType::Artist, "Nirvana"), None);
        for (id, name, parent) in [
            ("al1", "Live at Wembley", "ar1"),
            ("al2", "A Night at the Opera", "ar1"),
            ("al3", "Greatest Hits", "ar1"),
            ("al4", "MTV Unplugged (Acoustic)", "ar2"),
            ("al5", "Nevermind", "ar2"),
        ] {
            ledger.add(item(id, ItemType::Album, name), Some(parent));
        }
        for (id, name, parent) in [
            ("t1", "Bohemian Rhapsody", "al2"),
            ("t2", "Love of My Life - Live", "al2"),
            ("t3", "You're My Best Friend", "al2"),
            ("t4", "Under Pressure - Single", "al3"),
        ] {
            ledger.add(item(id, ItemType::Track, name), Some(parent));
        }
        ledger
    }

    pub fn add(&self, item: Item, parent: Option<&str>) {
        let mut state = self.state.lock();
        if let Some(parent) = parent {
            state
                .children
                .entry(parent.into())
                .or_default()
                .push(item.spotify_id.clone());
        }
        state.catalog.push(item);
    }

    pub fn add_playlist(&self, id: &str, name: &str) {
        let mut state = self.state.lock();
        state.catalog.push(item(id, ItemType::Playlist, name));
        state.playlists.push(Playlist {
            id: None,
            spotify_id: id.into(),
            name: name.into(),
        });
    }

    /// Fail every following request with `failure`, or stop failing.
    pub fn fail_with(&self, failure: Option<Error>) {
        self.state.lock().failure = failure;
    }

    /// Answer mutations with an empty body.
    pub fn set_silent(&self, silent: bool) {
        self.state.lock().silent = silent;
    }

    pub fn set_decision(&self, playlist_id: &str, id: &str, status: InclusionStatus) {
        self.state
            .lock()
            .decisions
            .insert((playlist_id.into(), id.into()), status);
    }

    pub fn decision(&self, playlist_id: &str, id: &str) -> InclusionStatus {
        let key: (Arc<str>, Arc<str>) = (playlist_id.into(), id.into());
        self.state
            .lock()
            .decisions
            .get(&key)
            .copied()
            .unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<LedgerRequest> {
        self.state.lock().requests.clone()
    }
}

impl Ledger for FakeLedger {
    fn execute(&self, request: &LedgerRequest) -> Result<LedgerResponse, Error> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());
        if let Some(failure) = &state.failure {
            return Err(failure.clone());
        }

        Ok(match request {
            LedgerRequest::Playlists => LedgerResponse::Playlists(state.playlists.clone()),
            LedgerRequest::CreatePlaylist { name } => {
                state.created += 1;
                let playlist = Playlist {
                    id: Some(state.created),
                    spotify_id: format!("new{}", state.created).into(),
                    name: name.clone(),
                };
                state.playlists.push(playlist.clone());
                LedgerResponse::Playlist(playlist)
            }
            LedgerRequest::RenamePlaylist { id, name } => {
                let playlist = state
                    .playlists
                    .iter_mut()
                    .find(|playlist| playlist.spotify_id == *id)
                    .ok_or_else(|| Error::Transport("HTTP 404 Not Found".to_string()))?;
                playlist.name = name.clone();
                LedgerResponse::Playlist(playlist.clone())
            }
            LedgerRequest::DeletePlaylist { id } => {
                state.playlists.retain(|playlist| playlist.spotify_id != *id);
                LedgerResponse::Ack(Ack(Value::Null))
            }
            LedgerRequest::Publish { .. } | LedgerRequest::PublishAll => {
                LedgerResponse::Ack(Ack(Value::Null))
            }
            LedgerRequest::Inclusions { playlist_id } => {
                let items = state
                    .catalog
                    .iter()
                    .map(|item| state.with_status(playlist_id, item))
                    .filter(|item| item.included != InclusionStatus::Unset)
                    .collect();
                LedgerResponse::Items(items)
            }
            LedgerRequest::Search(req) => {
                let query = req.query.to_lowercase();
                let items = state
                    .catalog
                    .iter()
                    .filter(|item| item.item_type == req.item_type)
                    .filter(|item| item.name.to_lowercase().contains(&query))
                    .map(|item| state.with_status(&req.playlist_id, item))
                    .collect();
                LedgerResponse::Items(items)
            }
            LedgerRequest::ArtistAlbums(req) | LedgerRequest::AlbumTracks(req) => {
                let ids = state.children.get(&req.parent_id).cloned().unwrap_or_default();
                let items = ids
                    .iter()
                    .filter_map(|id| state.item(id))
                    .map(|item| state.with_status(&req.playlist_id, item))
                    .collect();
                LedgerResponse::Items(items)
            }
            LedgerRequest::SetItem(req) => {
                let status = InclusionStatus::explicit(req.include);
                state
                    .decisions
                    .insert((req.playlist_id.clone(), req.spot_id.clone()), status);
                state.ack(json!({ "included": u8::from(status) }))
            }
            LedgerRequest::UndoItem(req) => {
                state
                    .decisions
                    .remove(&(req.playlist_id.clone(), req.spot_id.clone()));
                state.ack(json!({ "undone": req.spot_id }))
            }
            LedgerRequest::IncludePlaylist(req) => {
                state.decisions.insert(
                    (req.parent_spot_id.clone(), req.child_spot_id.clone()),
                    InclusionStatus::Included,
                );
                state.ack(json!(true))
            }
            LedgerRequest::UndoPlaylist(req) => {
                state
                    .decisions
                    .remove(&(req.parent_spot_id.clone(), req.child_spot_id.clone()));
                state.ack(json!(true))
            }
        })
    }
}
