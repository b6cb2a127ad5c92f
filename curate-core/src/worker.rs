//! Background execution of ledger requests.
//!
//! The engine itself never blocks on the ledger when driven through a
//! [`LedgerWorker`]: `begin_*` calls hand their [`Pending`] to the worker
//! thread, and the caller feeds the finished requests back into
//! [`Curator::complete`] whenever it gets around to it.  Completions may
//! arrive in any order; the engine sorts out which ones still apply.

use std::{
    fmt::Display,
    thread::{self, JoinHandle},
};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TryRecvError};

use crate::{
    curator::{Curator, Outcome, Pending},
    error::Error,
    ledger::{Ledger, LedgerResponse},
};

pub enum Act {
    Continue,
    Shutdown,
}

pub trait Actor: Sized {
    type Message: Send + 'static;
    type Error: Display;

    fn handle(&mut self, msg: Self::Message) -> Result<Act, Self::Error>;

    fn process(mut self, recv: Receiver<Self::Message>) {
        for msg in recv {
            match self.handle(msg) {
                Ok(Act::Continue) => {}
                Ok(Act::Shutdown) => break,
                Err(err) => {
                    log::error!("error: {}", err);
                    break;
                }
            }
        }
    }

    fn spawn<F>(cap: Capacity, name: &str, factory: F) -> Result<ActorHandle<Self::Message>, Error>
    where
        F: FnOnce() -> Self + Send + 'static,
    {
        let (send, recv) = cap.to_channel();
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || factory().process(recv))?;
        Ok(ActorHandle {
            sender: send,
            thread,
        })
    }
}

pub struct ActorHandle<M> {
    thread: JoinHandle<()>,
    sender: Sender<M>,
}

impl<M> ActorHandle<M> {
    pub fn send(&self, msg: M) -> Result<(), Error> {
        self.sender.send(msg).map_err(|_| Error::WorkerGone)
    }

    pub fn join(self) {
        let _ = self.thread.join();
    }
}

pub enum Capacity {
    Bounded(usize),
    Unbounded,
}

impl Capacity {
    pub fn to_channel<T>(&self) -> (Sender<T>, Receiver<T>) {
        match self {
            Capacity::Bounded(cap) => bounded(*cap),
            Capacity::Unbounded => unbounded(),
        }
    }
}

pub enum LedgerJob {
    Execute(Pending),
    Shutdown,
}

/// A finished request, ready for [`Curator::complete`].
pub type Completion = (Pending, Result<LedgerResponse, Error>);

pub struct LedgerWorker<L> {
    ledger: L,
    completions: Sender<Completion>,
}

impl<L: Ledger> Actor for LedgerWorker<L> {
    type Message = LedgerJob;
    type Error = Error;

    fn handle(&mut self, msg: LedgerJob) -> Result<Act, Error> {
        match msg {
            LedgerJob::Execute(pending) => {
                let result = self.ledger.execute(pending.request());
                if let Err(err) = &result {
                    log::debug!("ledger request failed: {}", err);
                }
                self.completions
                    .send((pending, result))
                    .map_err(|_| Error::WorkerGone)?;
                Ok(Act::Continue)
            }
            LedgerJob::Shutdown => Ok(Act::Shutdown),
        }
    }
}

/// Owning side of a running [`LedgerWorker`].
pub struct WorkerHandle {
    actor: ActorHandle<LedgerJob>,
    completions: Receiver<Completion>,
}

impl WorkerHandle {
    pub fn spawn<L>(ledger: L) -> Result<Self, Error>
    where
        L: Ledger + Send + 'static,
    {
        let (send, recv) = Capacity::Unbounded.to_channel();
        let actor = LedgerWorker::spawn(Capacity::Bounded(128), "ledger", move || LedgerWorker {
            ledger,
            completions: send,
        })?;
        Ok(Self {
            actor,
            completions: recv,
        })
    }

    pub fn submit(&self, pending: Pending) -> Result<(), Error> {
        self.actor.send(LedgerJob::Execute(pending))
    }

    /// Block until the next request finishes and apply it.
    pub fn complete_next<L: Ledger>(
        &self,
        curator: &mut Curator<L>,
    ) -> Result<Outcome, Error> {
        let (pending, result) = self.completions.recv().map_err(|_| Error::WorkerGone)?;
        curator.complete(pending, result)
    }

    /// Apply every request that has finished so far, without blocking.
    pub fn drain<L: Ledger>(&self, curator: &mut Curator<L>) -> Vec<Result<Outcome, Error>> {
        let mut outcomes = Vec::new();
        loop {
            match self.completions.try_recv() {
                Ok((pending, result)) => outcomes.push(curator.complete(pending, result)),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        outcomes
    }

    pub fn shutdown(self) {
        if self.actor.send(LedgerJob::Shutdown).is_ok() {
            self.actor.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        curator::{Activity, Toggle},
        heuristic::HeuristicRules,
        item::{InclusionStatus, ItemType},
        ledger::fake::FakeLedger,
        projection::View,
    };

    #[test]
    fn completions_come_back_through_the_worker() {
        let ledger = Arc::new(FakeLedger::with_catalog());
        let worker = WorkerHandle::spawn(ledger.clone()).unwrap();
        let mut curator = Curator::new(ledger.clone(), HeuristicRules::none());
        curator.select_playlist("p1");
        curator.set_search_type(ItemType::Album);

        worker.submit(curator.begin_search("wembley").unwrap()).unwrap();
        assert!(curator.is_loading(Activity::Search));
        let outcome = worker.complete_next(&mut curator).unwrap();
        assert!(matches!(outcome, Outcome::Loaded { count, .. } if count > 0));
        assert!(!curator.is_loading(Activity::Search));

        let first = curator.begin_toggle(Toggle::include("al1", ItemType::Album)).unwrap();
        let second = curator
            .begin_toggle(Toggle::exclude("al1", ItemType::Album))
            .unwrap();
        worker.submit(first).unwrap();
        worker.submit(second).unwrap();
        let outcomes = [
            worker.complete_next(&mut curator).unwrap(),
            worker.complete_next(&mut curator).unwrap(),
        ];
        assert_eq!(outcomes[0], Outcome::Superseded);
        assert!(matches!(outcomes[1], Outcome::Mutated(_)));
        assert_eq!(
            curator.items(View::Search(ItemType::Album))[0].status,
            InclusionStatus::Excluded
        );
        assert!(worker.drain(&mut curator).is_empty());
        worker.shutdown();
    }
}
