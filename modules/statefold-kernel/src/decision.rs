//! The result of `decide`.
//!
//! `std::result::Result` already is the two-variant sum this layer needs
//! (`match` for elimination, `map`, `map_err`, `and_then` for chaining).
//! [`DecisionExt`] adds the two operations `Result` is missing: a single
//! eliminator and a way to extend an accepted batch.

/// Ordered events on acceptance, a domain error on rejection.
pub type Decision<Ev, Er> = Result<Vec<Ev>, Er>;

pub trait DecisionExt<Ev, Er> {
    /// Eliminate both cases into one value.
    fn fold<T>(self, on_accept: impl FnOnce(Vec<Ev>) -> T, on_reject: impl FnOnce(Er) -> T) -> T;

    /// Append the events of a follow-up decision, short-circuiting on the first rejection.
    fn then_decide(self, next: impl FnOnce(&[Ev]) -> Decision<Ev, Er>) -> Decision<Ev, Er>;

    /// Accepted with no events.
    fn is_noop(&self) -> bool;
}

impl<Ev, Er> DecisionExt<Ev, Er> for Decision<Ev, Er> {
    fn fold<T>(self, on_accept: impl FnOnce(Vec<Ev>) -> T, on_reject: impl FnOnce(Er) -> T) -> T {
        match self {
            Ok(events) => on_accept(events),
            Err(error) => on_reject(error),
        }
    }

    fn then_decide(self, next: impl FnOnce(&[Ev]) -> Decision<Ev, Er>) -> Decision<Ev, Er> {
        self.and_then(|mut events| {
            let more = next(&events)?;
            events.extend(more);
            Ok(events)
        })
    }

    fn is_noop(&self) -> bool {
        matches!(self, Ok(events) if events.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_picks_the_matching_branch() {
        let accepted: Decision<u8, &str> = Ok(vec![1, 2]);
        let rejected: Decision<u8, &str> = Err("nope");

        assert_eq!(accepted.fold(|e| e.len(), |_| 0), 2);
        assert_eq!(rejected.fold(|e| e.len(), |e| e.len() + 100), 104);
    }

    #[test]
    fn then_decide_concatenates_and_short_circuits() {
        let first: Decision<u8, &str> = Ok(vec![1]);
        assert_eq!(first.then_decide(|prev| Ok(vec![prev[0] + 1])), Ok(vec![1, 2]));

        let first: Decision<u8, &str> = Ok(vec![1]);
        assert_eq!(first.then_decide(|_| Err("late")), Err("late"));

        let first: Decision<u8, &str> = Err("early");
        let mut called = false;
        let out = first.then_decide(|_| {
            called = true;
            Ok(vec![9])
        });
        assert_eq!(out, Err("early"));
        assert!(!called);
    }

    #[test]
    fn empty_acceptance_is_a_noop_not_an_error() {
        let noop: Decision<u8, &str> = Ok(vec![]);
        assert!(noop.is_noop());
        assert!(noop.is_ok());

        let rejected: Decision<u8, &str> = Err("x");
        assert!(!rejected.is_noop());
    }
}
