use std::sync::Arc;

use super::{Curator, Outcome, Pending, PendingKind};
use crate::{
    error::Error,
    item::{InclusionStatus, ItemType},
    ledger::{ItemRequest, Ledger, LedgerRequest, LedgerResponse, NestRequest},
    projection::{Screen, View},
    propagate,
};

/// A decision about one item: include, exclude, or take back an earlier
/// include/exclude.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Toggle {
    pub id: Arc<str>,
    pub item_type: ItemType,
    pub include: bool,
    pub undo: bool,
    /// Where the item was shown when the user acted on it.
    pub hint: Option<(View, usize)>,
}

impl Toggle {
    pub fn new(id: impl Into<Arc<str>>, item_type: ItemType, include: bool) -> Self {
        Self {
            id: id.into(),
            item_type,
            include,
            undo: false,
            hint: None,
        }
    }

    pub fn include(id: impl Into<Arc<str>>, item_type: ItemType) -> Self {
        Self::new(id, item_type, true)
    }

    pub fn exclude(id: impl Into<Arc<str>>, item_type: ItemType) -> Self {
        Self::new(id, item_type, false)
    }

    pub fn undo(mut self) -> Self {
        self.undo = true;
        self
    }

    pub fn at(mut self, view: View, index: usize) -> Self {
        self.hint = Some((view, index));
        self
    }

    /// Status the item ends up with once the ledger confirms.
    pub fn target(&self) -> InclusionStatus {
        if self.undo {
            InclusionStatus::Unset
        } else {
            InclusionStatus::explicit(self.include)
        }
    }

    fn hint_for(&self, view: View) -> Option<usize> {
        self.hint
            .filter(|(hinted, _)| *hinted == view)
            .map(|(_, index)| index)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SummaryChange {
    Added,
    Removed,
}

/// What a confirmed toggle changed.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MutationReport {
    pub status: InclusionStatus,
    pub patched: Vec<View>,
    pub summary: Option<SummaryChange>,
    /// Children that took the parent's decision as a proxy.
    pub proxied: Vec<Arc<str>>,
    /// Children whose proxy status was cleared.
    pub reset: Vec<Arc<str>>,
    /// Variants excluded by name.  These stay local and are not recorded in
    /// the ledger.
    pub excluded_by_name: Vec<Arc<str>>,
    pub released_by_name: Vec<Arc<str>>,
}

#[derive(Debug)]
pub(super) struct Ticket {
    number: u64,
    session: u64,
    toggle: Toggle,
}

impl<L: Ledger> Curator<L> {
    pub fn toggle(&mut self, toggle: Toggle) -> Result<Outcome, Error> {
        let pending = self.begin_toggle(toggle)?;
        self.run(pending)
    }

    /// Validate `toggle` and build its ledger request.  A rejected toggle
    /// leaves no trace: no ticket, no in-flight count, no error flag.
    pub fn begin_toggle(&mut self, toggle: Toggle) -> Result<Pending, Error> {
        let playlist_id = self.working_playlist()?;
        if self.store.lookup(&toggle.id, toggle.item_type).is_none() {
            return Err(Error::UnknownItem {
                id: toggle.id,
                item_type: toggle.item_type,
            });
        }

        let request = if toggle.item_type == ItemType::Playlist {
            if !toggle.include && !toggle.undo {
                return Err(Error::Unsupported("excluding a playlist"));
            }
            if toggle.id == playlist_id {
                return Err(Error::Unsupported("nesting a playlist in itself"));
            }
            let nest = NestRequest {
                parent_spot_id: playlist_id,
                child_spot_id: toggle.id.clone(),
            };
            if toggle.undo {
                LedgerRequest::UndoPlaylist(nest)
            } else {
                LedgerRequest::IncludePlaylist(nest)
            }
        } else {
            let item = ItemRequest {
                include: toggle.include,
                playlist_id,
                spot_id: toggle.id.clone(),
                item_type: toggle.item_type,
            };
            if toggle.undo {
                LedgerRequest::UndoItem(item)
            } else {
                LedgerRequest::SetItem(item)
            }
        };

        let number = self
            .tickets
            .issue((toggle.id.clone(), toggle.item_type));
        self.mutations.start();
        log::debug!(
            "toggle #{}: {} {} -> {:?}",
            number,
            toggle.item_type,
            toggle.id,
            toggle.target()
        );
        Ok(Pending {
            request,
            kind: PendingKind::Mutation(Ticket {
                number,
                session: self.session,
                toggle,
            }),
        })
    }

    pub(super) fn complete_mutation(
        &mut self,
        ticket: Ticket,
        result: Result<LedgerResponse, Error>,
    ) -> Result<Outcome, Error> {
        let Ticket {
            number,
            session,
            toggle,
        } = ticket;
        let key = (toggle.id.clone(), toggle.item_type);
        if !self.tickets.is_latest(&key, number) {
            log::debug!("toggle #{} for {} superseded", number, toggle.id);
            // Tickets from an earlier session left the counter when it was reset.
            if session == self.session {
                self.mutations.in_flight = self.mutations.in_flight.saturating_sub(1);
            }
            return Ok(Outcome::Superseded);
        }
        match result.and_then(LedgerResponse::into_confirmed) {
            Ok(_) => {
                self.mutations.finish(Ok(()));
                Ok(Outcome::Mutated(self.apply_toggle(&toggle)))
            }
            Err(err) => {
                log::warn!("toggle of {} {} failed: {}", toggle.item_type, toggle.id, err);
                self.mutations.finish(Err(&err));
                Err(err)
            }
        }
    }

    /// Write a confirmed decision into every view, then carry it down to the
    /// children of any screen where the item is the open parent.
    fn apply_toggle(&mut self, toggle: &Toggle) -> MutationReport {
        let status = toggle.target();
        let mut report = MutationReport {
            status,
            ..MutationReport::default()
        };

        let summary = View::Summary(toggle.item_type);
        for view in self.store.views_holding(&toggle.id, toggle.item_type) {
            if view == summary {
                continue;
            }
            if self
                .store
                .patch(view, &toggle.id, toggle.hint_for(view), status)
                .is_some()
            {
                report.patched.push(view);
            }
        }

        if status == InclusionStatus::Included {
            let known = self.store.lookup(&toggle.id, toggle.item_type).cloned();
            if let Some(item) = known {
                if self.store.append(summary, item.with_status(status)) {
                    report.summary = Some(SummaryChange::Added);
                }
            }
        } else if self.store.remove(summary, &toggle.id) {
            report.summary = Some(SummaryChange::Removed);
        }

        for screen in Screen::all() {
            let expanded = self.expansion(*screen);
            if expanded.parent(toggle.item_type) != Some(&*toggle.id) {
                continue;
            }
            let Some(children) = screen.child_view(toggle.item_type) else {
                continue;
            };
            self.propagate_into(children, toggle, &mut report);
        }

        log::info!(
            "{} {} is now {:?}, {} children updated",
            toggle.item_type,
            toggle.id,
            status,
            report.proxied.len() + report.reset.len()
        );
        report
    }

    fn propagate_into(&mut self, children: View, toggle: &Toggle, report: &mut MutationReport) {
        let rules = &self.rules;
        if toggle.undo {
            report
                .reset
                .extend(self.store.update_each(children, propagate::reset));
            report
                .released_by_name
                .extend(self.store.update_each(children, |item| rules.release(item)));
        } else {
            let include = toggle.include;
            report.proxied.extend(
                self.store
                    .update_each(children, |item| propagate::propagate(item, include)),
            );
            if include {
                report
                    .excluded_by_name
                    .extend(self.store.update_each(children, |item| rules.exclude(item)));
            }
        }
    }
}
