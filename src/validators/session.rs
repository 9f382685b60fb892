//! Schema sessions
//!
//! A session binds one schema source to the validation calls made against
//! it. Calls issued while the schema is still loading are queued and replayed
//! in submission order once the load settles; later calls run immediately.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use super::schemas::RelaxNgSchema;
use super::validation::ValidationResult;

use crate::error::{Error, Result};
use crate::loaders::Loader;
use crate::locations::Location;
use crate::tree::TreeWalker;

/// Outcome delivered to a validation continuation
pub type SessionOutcome = std::result::Result<ValidationResult, Arc<Error>>;

type PendingCall<'a> = Box<dyn FnOnce(std::result::Result<&RelaxNgSchema, &Arc<Error>>) + 'a>;

enum SessionState {
    Loading,
    Ready(Arc<RelaxNgSchema>),
    Failed(Arc<Error>),
}

/// Validation session over one schema source
///
/// # Example
///
/// ```ignore
/// let mut session = SchemaSession::new();
/// session.validate(doc.walker(), |outcome| println!("{:?}", outcome));
/// session.load(&Loader::new(), &Location::parse("schema.rng")?);
/// ```
pub struct SchemaSession<'a> {
    state: SessionState,
    pending: VecDeque<PendingCall<'a>>,
}

impl<'a> SchemaSession<'a> {
    /// Create a session whose schema is still loading
    pub fn new() -> Self {
        Self {
            state: SessionState::Loading,
            pending: VecDeque::new(),
        }
    }

    /// Create a session around an already compiled schema
    pub fn with_schema(schema: Arc<RelaxNgSchema>) -> Self {
        Self {
            state: SessionState::Ready(schema),
            pending: VecDeque::new(),
        }
    }

    /// Whether the load has settled, successfully or not
    pub fn is_loaded(&self) -> bool {
        !matches!(self.state, SessionState::Loading)
    }

    /// Number of queued validation calls
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// The compiled schema, once loaded successfully
    pub fn schema(&self) -> Option<&Arc<RelaxNgSchema>> {
        match &self.state {
            SessionState::Ready(schema) => Some(schema),
            _ => None,
        }
    }

    /// The load error, if the load failed
    pub fn load_error(&self) -> Option<&Arc<Error>> {
        match &self.state {
            SessionState::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Fetch, parse and compile the schema, then settle the session
    pub fn load(&mut self, loader: &Loader, location: &Location) {
        log::debug!("session loading schema from {}", location);
        let result = RelaxNgSchema::from_location(loader, location);
        self.settle(result);
    }

    /// Settle the load with a compiled schema or an error
    ///
    /// Queued calls run now, in submission order. A session settles once;
    /// later calls are ignored.
    pub fn settle(&mut self, result: Result<RelaxNgSchema>) {
        if self.is_loaded() {
            log::warn!("schema session already settled, ignoring second result");
            return;
        }
        self.state = match result {
            Ok(schema) => SessionState::Ready(Arc::new(schema)),
            Err(error) => {
                log::warn!("schema failed to load: {}", error);
                SessionState::Failed(Arc::new(error))
            }
        };

        let pending = std::mem::take(&mut self.pending);
        log::debug!("replaying {} queued validation calls", pending.len());
        let settled = match &self.state {
            SessionState::Ready(schema) => Ok(schema.as_ref()),
            SessionState::Failed(error) => Err(error),
            SessionState::Loading => unreachable!("state was just settled"),
        };
        for call in pending {
            call(settled);
        }
    }

    /// Validate a tree, now or once the schema has loaded
    ///
    /// `on_done` receives the verdict, or the load error when the schema
    /// could not be loaded.
    pub fn validate<W, F>(&mut self, mut walker: W, on_done: F)
    where
        W: TreeWalker + 'a,
        F: FnOnce(SessionOutcome) + 'a,
    {
        let call = move |settled: std::result::Result<&RelaxNgSchema, &Arc<Error>>| {
            let outcome = match settled {
                Ok(schema) => Ok(schema.validate(&mut walker)),
                Err(error) => Err(Arc::clone(error)),
            };
            on_done(outcome);
        };

        match &self.state {
            SessionState::Loading => {
                log::trace!("schema not loaded yet, queueing validation call");
                self.pending.push_back(Box::new(call));
            }
            SessionState::Ready(schema) => call(Ok(schema.as_ref())),
            SessionState::Failed(error) => call(Err(error)),
        }
    }
}

impl Default for SchemaSession<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SchemaSession<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            SessionState::Loading => "loading",
            SessionState::Ready(_) => "ready",
            SessionState::Failed(_) => "failed",
        };
        f.debug_struct("SchemaSession")
            .field("state", &state)
            .field("pending", &self.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::Document;
    use crate::error::GrammarError;
    use std::cell::RefCell;

    const SCHEMA: &str = r#"<element name="doc" xmlns="http://relaxng.org/ns/structure/1.0">
        <oneOrMore><element name="item"><text/></element></oneOrMore>
    </element>"#;

    #[test]
    fn test_queued_calls_replay_in_order() {
        let good = Document::from_string("<doc><item/></doc>").unwrap();
        let bad = Document::from_string("<doc/>").unwrap();
        let log = RefCell::new(Vec::new());

        let mut session = SchemaSession::new();
        session.validate(good.walker(), |r| log.borrow_mut().push((1, r.unwrap().is_valid())));
        session.validate(bad.walker(), |r| log.borrow_mut().push((2, r.unwrap().is_valid())));
        session.validate(good.walker(), |r| log.borrow_mut().push((3, r.unwrap().is_valid())));

        assert!(!session.is_loaded());
        assert_eq!(session.pending_count(), 3);
        assert!(log.borrow().is_empty());

        session.settle(RelaxNgSchema::from_string(SCHEMA));
        assert_eq!(session.pending_count(), 0);
        assert_eq!(*log.borrow(), vec![(1, true), (2, false), (3, true)]);

        // after settling, calls run synchronously
        session.validate(good.walker(), |r| log.borrow_mut().push((4, r.unwrap().is_valid())));
        assert_eq!(log.borrow().len(), 4);
    }

    #[test]
    fn test_failed_load_reaches_every_call() {
        let doc = Document::from_string("<doc/>").unwrap();
        let errors = RefCell::new(Vec::new());

        let mut session = SchemaSession::new();
        session.validate(doc.walker(), |r| errors.borrow_mut().push(r.unwrap_err().to_string()));
        session.settle(Err(GrammarError::MissingStart.into()));
        session.validate(doc.walker(), |r| errors.borrow_mut().push(r.unwrap_err().to_string()));

        assert!(session.load_error().is_some());
        let errors = errors.borrow();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.contains("No Relax NG start element")));
    }

    #[test]
    fn test_second_settle_is_ignored() {
        let mut session = SchemaSession::new();
        session.settle(RelaxNgSchema::from_string(SCHEMA));
        session.settle(Err(GrammarError::MissingStart.into()));
        assert!(session.schema().is_some());
        assert!(session.load_error().is_none());
    }

    #[test]
    fn test_load_from_location() {
        let doc = Document::from_string("<doc><item>x</item></doc>").unwrap();
        let verdict = RefCell::new(None);

        let mut session = SchemaSession::new();
        session.validate(doc.walker(), |r| *verdict.borrow_mut() = Some(r.unwrap().is_valid()));
        session.load(&Loader::new(), &Location::String(SCHEMA.to_string()));

        assert!(session.is_loaded());
        assert_eq!(*verdict.borrow(), Some(true));
    }
}
