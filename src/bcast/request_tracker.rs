//! Content requests for broadcast messages we know of but do not have yet.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::common::{Id, MessageId};
use crate::config::DEFAULT_CONTENT_REQUEST_TIMEOUT;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A tracked message whose request timed out; it is no longer tracked.
pub struct ExpiredRequest {
    pub rtid: Id,
    pub id: MessageId,
}

#[derive(Debug)]
struct ActiveRequest {
    peer: Id,
    start: Instant,
}

#[derive(Debug)]
struct State {
    rtid: Id,
    providers: HashSet<Id>,
    request: Option<ActiveRequest>,
}

#[derive(Debug)]
/// Tracks, per message, the peers that announced having it and the single request in
/// flight to one of them.
///
/// A failed request drops its provider so the next [RequestTracker::provider] is a
/// different peer. Requests that stay in flight longer than the timeout are reported by
/// [RequestTracker::check_timeouts], which also stops tracking their message.
pub struct RequestTracker {
    states: HashMap<MessageId, State>,
    request_timeout: Duration,
}

impl RequestTracker {
    pub fn new(request_timeout: Duration) -> Self {
        RequestTracker {
            states: HashMap::new(),
            request_timeout,
        }
    }

    pub fn start_tracking(&mut self, rtid: Id, id: MessageId) -> Result<()> {
        if self.states.contains_key(&id) {
            return Err(Error::AlreadyTracking(id));
        }

        self.states.insert(
            id,
            State {
                rtid,
                providers: HashSet::new(),
                request: None,
            },
        );

        Ok(())
    }

    pub fn stop_tracking(&mut self, id: &MessageId) -> Result<()> {
        self.states
            .remove(id)
            .map(|_| ())
            .ok_or(Error::NotTracking(*id))
    }

    pub fn is_tracking(&self, id: &MessageId) -> bool {
        self.states.contains_key(id)
    }

    pub fn is_requesting(&self, id: &MessageId) -> bool {
        self.states
            .get(id)
            .map(|state| state.request.is_some())
            .unwrap_or(false)
    }

    pub fn add_provider(&mut self, id: &MessageId, provider: Id) -> Result<()> {
        self.state_mut(id)?.providers.insert(provider);
        Ok(())
    }

    /// Any known provider of `id`, `None` if there is none left.
    pub fn provider(&self, id: &MessageId) -> Result<Option<Id>> {
        self.states
            .get(id)
            .map(|state| state.providers.iter().next().copied())
            .ok_or(Error::NotTracking(*id))
    }

    pub fn begin_request(&mut self, id: &MessageId, peer: Id) -> Result<()> {
        let state = self.state_mut(id)?;

        if state.request.is_some() {
            return Err(Error::RequestInFlight(*id));
        }

        state.request = Some(ActiveRequest {
            peer,
            start: Instant::now(),
        });

        Ok(())
    }

    /// The request in flight failed, forget its provider.
    pub fn failed_request(&mut self, id: &MessageId) -> Result<()> {
        let state = self.state_mut(id)?;

        let request = state.request.take().ok_or(Error::NoActiveRequest(*id))?;
        state.providers.remove(&request.peer);

        debug!(message = %id, peer = ?request.peer, "Content request failed");

        Ok(())
    }

    /// The message was received, stop tracking it.
    pub fn end_request(&mut self, id: &MessageId) {
        self.states.remove(id);
    }

    /// Stop tracking every message whose request has been in flight longer than the timeout.
    pub fn check_timeouts(&mut self) -> Vec<ExpiredRequest> {
        let timeout = self.request_timeout;
        let mut expired = Vec::new();

        self.states.retain(|id, state| {
            let timed_out = state
                .request
                .as_ref()
                .map(|request| request.start.elapsed() > timeout)
                .unwrap_or(false);

            if timed_out {
                expired.push(ExpiredRequest {
                    rtid: state.rtid,
                    id: *id,
                });
            }

            !timed_out
        });

        if !expired.is_empty() {
            debug!(expired = expired.len(), "Content requests timed out");
        }

        expired
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn state_mut(&mut self, id: &MessageId) -> Result<&mut State> {
        self.states.get_mut(id).ok_or(Error::NotTracking(*id))
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CONTENT_REQUEST_TIMEOUT)
    }
}

#[cfg(test)]
mod test {
    use std::thread::sleep;

    use super::*;

    #[test]
    fn tracking_lifecycle() {
        let mut tracker = RequestTracker::default();
        let (rtid, id) = (Id::random(), MessageId::random());

        assert!(matches!(
            tracker.add_provider(&id, Id::random()),
            Err(Error::NotTracking(_))
        ));

        tracker.start_tracking(rtid, id).unwrap();
        assert!(matches!(
            tracker.start_tracking(rtid, id),
            Err(Error::AlreadyTracking(_))
        ));
        assert!(tracker.is_tracking(&id));
        assert_eq!(tracker.provider(&id).unwrap(), None);

        let provider = Id::random();
        tracker.add_provider(&id, provider).unwrap();
        assert_eq!(tracker.provider(&id).unwrap(), Some(provider));

        tracker.begin_request(&id, provider).unwrap();
        assert!(tracker.is_requesting(&id));
        assert!(matches!(
            tracker.begin_request(&id, provider),
            Err(Error::RequestInFlight(_))
        ));

        tracker.end_request(&id);
        assert!(!tracker.is_tracking(&id));
        assert!(matches!(
            tracker.stop_tracking(&id),
            Err(Error::NotTracking(_))
        ));
    }

    #[test]
    fn failed_request_moves_to_next_provider() {
        let mut tracker = RequestTracker::default();
        let id = MessageId::random();
        let (first, second) = (Id::random(), Id::random());

        tracker.start_tracking(Id::random(), id).unwrap();
        tracker.add_provider(&id, first).unwrap();
        tracker.add_provider(&id, second).unwrap();

        assert!(matches!(
            tracker.failed_request(&id),
            Err(Error::NoActiveRequest(_))
        ));

        let attempted = tracker.provider(&id).unwrap().unwrap();
        tracker.begin_request(&id, attempted).unwrap();
        tracker.failed_request(&id).unwrap();

        assert!(!tracker.is_requesting(&id));
        let next = tracker.provider(&id).unwrap().unwrap();
        assert_ne!(next, attempted);

        tracker.begin_request(&id, next).unwrap();
        tracker.failed_request(&id).unwrap();

        assert_eq!(tracker.provider(&id).unwrap(), None);
        assert!(tracker.is_tracking(&id));
    }

    #[test]
    fn timeouts() {
        let mut tracker = RequestTracker::new(Duration::from_millis(20));
        let rtid = Id::random();
        let (requesting, idle) = (MessageId::random(), MessageId::random());

        tracker.start_tracking(rtid, requesting).unwrap();
        tracker.start_tracking(rtid, idle).unwrap();
        tracker.begin_request(&requesting, Id::random()).unwrap();

        assert!(tracker.check_timeouts().is_empty());

        sleep(Duration::from_millis(40));

        assert_eq!(
            tracker.check_timeouts(),
            vec![ExpiredRequest {
                rtid,
                id: requesting
            }]
        );
        assert!(!tracker.is_tracking(&requesting));
        assert!(tracker.is_tracking(&idle));
        assert!(tracker.check_timeouts().is_empty());
    }
}
