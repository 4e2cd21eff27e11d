//! Static GeoIP Resolver
//!
//! Deterministic in-memory GeoResolver for tests and local runs.

use crate::domain::errors::GeoError;
use crate::domain::ports::GeoResolver;
use crate::domain::value_objects::CountryCode;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Observable resolver activity, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverEvent {
    ResolveStarted(String),
    ResolveFinished(String),
    Closed,
}

#[derive(Debug, Clone)]
enum Behavior {
    /// Every valid address resolves to this country.
    Fixed(CountryCode),
    /// Per-address table; unknown addresses are `NotFound`.
    Table(HashMap<IpAddr, CountryCode>),
    /// Every lookup fails before the address is parsed.
    Failing(String),
}

/// Resolver backed by a fixed answer, a lookup table, or a fixed failure.
pub struct StaticGeoResolver {
    behavior: Behavior,
    delay: Option<Duration>,
    closed: AtomicBool,
    close_calls: AtomicUsize,
    events: Mutex<Vec<ResolverEvent>>,
}

impl StaticGeoResolver {
    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            delay: None,
            closed: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Resolve every valid address to `country`.
    pub fn fixed(country: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Fixed(CountryCode::new(country)))
    }

    /// Resolve from a table of `(address, country)` pairs.
    ///
    /// Entries whose address does not parse are ignored.
    pub fn table<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let table = entries
            .into_iter()
            .filter_map(|(ip, country)| Some((ip.parse().ok()?, CountryCode::new(country))))
            .collect();
        Self::with_behavior(Behavior::Table(table))
    }

    /// Fail every lookup with `LookupFailed(reason)`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Failing(reason.into()))
    }

    /// Block each lookup for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times `close` has been called.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Snapshot of the recorded activity.
    pub fn events(&self) -> Vec<ResolverEvent> {
        self.events.lock().clone()
    }

    fn record(&self, event: ResolverEvent) {
        self.events.lock().push(event);
    }

    fn lookup(&self, ip: &str) -> Result<CountryCode, GeoError> {
        if let Behavior::Failing(reason) = &self.behavior {
            return Err(GeoError::LookupFailed(reason.clone()));
        }

        let addr: IpAddr = ip
            .parse()
            .map_err(|_| GeoError::InvalidAddress(ip.to_string()))?;

        match &self.behavior {
            Behavior::Fixed(country) => Ok(country.clone()),
            Behavior::Table(table) => table.get(&addr).cloned().ok_or(GeoError::NotFound(addr)),
            Behavior::Failing(reason) => Err(GeoError::LookupFailed(reason.clone())),
        }
    }
}

impl GeoResolver for StaticGeoResolver {
    fn resolve_country(&self, ip: &str) -> Result<CountryCode, GeoError> {
        if self.is_closed() {
            return Err(GeoError::Closed);
        }

        self.record(ResolverEvent::ResolveStarted(ip.to_string()));
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let result = self.lookup(ip);
        self.record(ResolverEvent::ResolveFinished(ip.to_string()));

        result
    }

    fn close(&self) -> Result<(), GeoError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(GeoError::Closed);
        }
        self.record(ResolverEvent::Closed);
        Ok(())
    }
}
