use crate::error::Error;

/// State of one asynchronous activity.  `Deferred` carries the request key
/// so that only the response to the latest request lands.
#[derive(Clone, Debug, PartialEq)]
pub enum Promise<T, D = (), E = Error> {
    Empty,
    Deferred(D),
    Resolved(T),
    Rejected(E),
}

impl<T, D, E> Promise<T, D, E> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    pub fn is_deferred(&self, def: &D) -> bool
    where
        D: PartialEq,
    {
        matches!(self, Self::Deferred(d) if d == def)
    }

    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Rejected(err) => Some(err),
            _ => None,
        }
    }

    pub fn defer(&mut self, def: D) {
        *self = Self::Deferred(def);
    }

    /// Settle the promise if it is still waiting on `def`.  Returns whether
    /// the response was taken.
    pub fn update(&mut self, (def, res): (D, Result<T, E>)) -> bool
    where
        D: PartialEq,
    {
        if !self.is_deferred(&def) {
            return false;
        }
        *self = match res {
            Ok(ok) => Self::Resolved(ok),
            Err(err) => Self::Rejected(err),
        };
        true
    }
}

impl<T, D, E> Default for Promise<T, D, E> {
    fn default() -> Self {
        Self::Empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_ignores_other_requests() {
        let mut promise: Promise<u32, u64> = Promise::default();
        assert!(!promise.is_pending());
        promise.defer(1);
        promise.defer(2);
        assert!(!promise.update((1, Ok(10))));
        assert!(promise.is_pending());
        assert!(promise.update((2, Err(Error::EmptyResponse))));
        assert_eq!(promise.error(), Some(&Error::EmptyResponse));
        assert!(!promise.update((2, Ok(20))));
        assert_eq!(promise, Promise::Rejected(Error::EmptyResponse));

        promise.defer(3);
        assert!(promise.update((3, Ok(30))));
        assert_eq!(promise, Promise::Resolved(30));
        assert_eq!(promise.error(), None);
    }
}
