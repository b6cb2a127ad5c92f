//! The reconciliation engine.
//!
//! A [`Curator`] owns the ledger handle, the projections backing every view,
//! and the bookkeeping that decides whether a ledger response may still be
//! applied.  Every operation comes in two halves: `begin_*` records intent
//! and hands back a [`Pending`] carrying the ledger request, and
//! [`Curator::complete`] applies the ledger's answer.  Nothing observable
//! changes before the ledger confirms, so a failed request leaves every
//! projection exactly as it was.

mod fetch;
mod mutation;

use std::{collections::HashMap, sync::Arc};

pub use self::mutation::{MutationReport, SummaryChange, Toggle};

use crate::{
    error::Error,
    heuristic::HeuristicRules,
    item::{CatalogItem, InclusionStatus, ItemType, Playlist},
    ledger::{Ledger, LedgerRequest, LedgerResponse},
    projection::{Projection, ProjectionStore, Screen, View},
    promise::Promise,
    sequence::{Sequence, Tickets},
};

use self::{fetch::Fetch, mutation::Ticket};

/// Something a view can be busy with.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Activity {
    Playlists,
    PlaylistEdit,
    Search,
    Summary,
    /// Loading the children of type `.1` on a screen.
    Expand(Screen, ItemType),
    Mutation,
}

/// Parents currently open on one screen.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Expansion {
    pub artist: Option<Arc<str>>,
    pub album: Option<Arc<str>>,
}

impl Expansion {
    pub fn parent(&self, item_type: ItemType) -> Option<&str> {
        match item_type {
            ItemType::Artist => self.artist.as_deref(),
            ItemType::Album => self.album.as_deref(),
            ItemType::Playlist | ItemType::Track => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Mutated(MutationReport),
    Loaded { view: View, count: usize },
    Refreshed { count: usize },
    Playlist(Playlist),
    Acknowledged,
    /// A newer request took over, or the session moved on; nothing applied.
    Superseded,
}

/// A ledger request the engine is waiting on.
#[derive(Debug)]
pub struct Pending {
    request: LedgerRequest,
    kind: PendingKind,
}

#[derive(Debug)]
enum PendingKind {
    Mutation(Ticket),
    Fetch(Fetch, u64),
    Edit(Fetch),
}

impl Pending {
    pub fn request(&self) -> &LedgerRequest {
        &self.request
    }
}

/// Requests that are all applied, counted while in flight.
#[derive(Debug, Default)]
struct Counter {
    in_flight: usize,
    error: Option<Error>,
}

impl Counter {
    fn start(&mut self) {
        self.in_flight += 1;
    }

    fn finish(&mut self, result: Result<(), &Error>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.error = result.err().cloned();
    }
}

pub struct Curator<L> {
    ledger: L,
    rules: HeuristicRules,
    store: ProjectionStore,
    playlist: Option<Arc<str>>,
    search_type: ItemType,
    summary_type: ItemType,
    expanded: HashMap<Screen, Expansion>,
    tickets: Tickets<(Arc<str>, ItemType)>,
    requests: Sequence,
    fetches: HashMap<Activity, Promise<(), u64>>,
    mutations: Counter,
    edits: Counter,
    /// Bumped whenever the working playlist changes.
    session: u64,
}

impl<L: Ledger> Curator<L> {
    pub fn new(ledger: L, rules: HeuristicRules) -> Self {
        Self {
            ledger,
            rules,
            store: ProjectionStore::new(),
            playlist: None,
            search_type: ItemType::Artist,
            summary_type: ItemType::Artist,
            expanded: HashMap::new(),
            tickets: Tickets::default(),
            requests: Sequence::default(),
            fetches: HashMap::new(),
            mutations: Counter::default(),
            edits: Counter::default(),
            session: 0,
        }
    }

    pub fn playlist(&self) -> Option<&str> {
        self.playlist.as_deref()
    }

    pub fn search_type(&self) -> ItemType {
        self.search_type
    }

    pub fn summary_type(&self) -> ItemType {
        self.summary_type
    }

    pub fn items(&self, view: View) -> &[CatalogItem] {
        self.store.items(view)
    }

    pub fn projection(&self, view: View) -> Projection {
        self.store.get(view)
    }

    pub fn expansion(&self, screen: Screen) -> Expansion {
        self.expanded.get(&screen).cloned().unwrap_or_default()
    }

    pub fn is_loading(&self, activity: Activity) -> bool {
        match activity {
            Activity::Mutation => self.mutations.in_flight > 0,
            Activity::PlaylistEdit => self.edits.in_flight > 0,
            _ => self
                .fetches
                .get(&activity)
                .is_some_and(|promise| promise.is_pending()),
        }
    }

    pub fn error(&self, activity: Activity) -> Option<&Error> {
        match activity {
            Activity::Mutation => self.mutations.error.as_ref(),
            Activity::PlaylistEdit => self.edits.error.as_ref(),
            _ => self.fetches.get(&activity).and_then(|promise| promise.error()),
        }
    }

    /// Switch the working playlist.  Every view derived from the previous
    /// playlist is dropped and responses still in flight for it are ignored.
    pub fn select_playlist(&mut self, id: impl Into<Arc<str>>) {
        let id = id.into();
        log::info!("working playlist: {}", id);
        self.playlist = Some(id);
        self.reset_session();
    }

    pub fn set_search_type(&mut self, item_type: ItemType) {
        self.search_type = item_type;
        for t in ItemType::all() {
            self.store.clear(View::Search(*t));
        }
        self.close_screen(Screen::Search);
        self.fetches.remove(&Activity::Search);
    }

    pub fn set_summary_type(&mut self, item_type: ItemType) {
        self.summary_type = item_type;
        self.close_screen(Screen::Summary);
    }

    /// Send `pending` through the engine's own ledger and apply the answer.
    pub fn run(&mut self, pending: Pending) -> Result<Outcome, Error> {
        let result = self.ledger.execute(pending.request());
        self.complete(pending, result)
    }

    /// Apply the ledger's answer to an earlier `begin_*` call.  Failures set
    /// the activity's error flag and are returned; nothing else changes.
    pub fn complete(
        &mut self,
        pending: Pending,
        result: Result<LedgerResponse, Error>,
    ) -> Result<Outcome, Error> {
        match pending.kind {
            PendingKind::Mutation(ticket) => self.complete_mutation(ticket, result),
            PendingKind::Fetch(fetch, seq) => self.complete_fetch(fetch, seq, result),
            PendingKind::Edit(fetch) => self.complete_edit(fetch, result),
        }
    }

    fn working_playlist(&self) -> Result<Arc<str>, Error> {
        self.playlist.clone().ok_or(Error::NoPlaylistSelected)
    }

    fn expansion_mut(&mut self, screen: Screen) -> &mut Expansion {
        self.expanded.entry(screen).or_default()
    }

    /// Forget a screen's open parents and the children shown for them.
    fn close_screen(&mut self, screen: Screen) {
        self.expanded.remove(&screen);
        for parent in [ItemType::Artist, ItemType::Album] {
            if let Some(view) = screen.child_view(parent) {
                self.store.clear(view);
                self.fetches.remove(&Activity::Expand(screen, view.item_type()));
            }
        }
    }

    fn reset_session(&mut self) {
        let selection = self.store.get(View::Selection);
        self.store.clear_all();
        if !selection.is_empty() {
            // Nesting status is relative to the previous playlist.
            let playlists = selection
                .iter()
                .cloned()
                .map(|item| item.with_status(InclusionStatus::Unset))
                .collect();
            self.store.replace(View::Selection, playlists);
        }
        self.expanded.clear();
        self.fetches.retain(|activity, _| *activity == Activity::Playlists);
        self.tickets.revoke_all();
        self.session += 1;
        self.mutations = Counter::default();
    }
}
