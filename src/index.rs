//local shortcuts
use crate::{Filter, FilterId, RoutingKey, SessionId};

//third-party shortcuts

//standard shortcuts
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

//-------------------------------------------------------------------------------------------------------------------

type Pair = (SessionId, FilterId);

//-------------------------------------------------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Dimension
{
    /// exact-value buckets
    exact: HashMap<String, HashSet<Pair>>,
    /// sessions wildcarding this dimension (but not every dimension - see `match_all`)
    any: HashSet<Pair>,
}

impl Dimension
{
    fn insert(&mut self, value: Option<&str>, pair: Pair)
    {
        match value
        {
            Some(v) => { self.exact.entry(v.to_string()).or_default().insert(pair); }
            None    => { self.any.insert(pair); }
        }
    }

    fn remove(&mut self, value: Option<&str>, pair: &Pair)
    {
        match value
        {
            Some(v) =>
            {
                if let Some(bucket) = self.exact.get_mut(v)
                {
                    bucket.remove(pair);
                    if bucket.is_empty() { self.exact.remove(v); }
                }
            }
            None => { self.any.remove(pair); }
        }
    }

    /// Pairs matching `value` in this dimension: the exact bucket union the wildcard bucket.
    fn matching(&self, value: &str) -> HashSet<Pair>
    {
        let mut out = self.any.clone();
        if let Some(bucket) = self.exact.get(value)
        {
            out.extend(bucket.iter().copied());
        }
        out
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// One of a filter's three dimensions, reduced to "wildcard or this one value". A filter that
/// declares more than one value in a dimension is indexed once per value.
fn dimension_values(tokens: &HashSet<String>) -> Vec<Option<&str>>
{
    if tokens.is_empty() { vec![None] } else { tokens.iter().map(|t| Some(t.as_str())).collect() }
}

//-------------------------------------------------------------------------------------------------------------------

#[derive(Debug, Default)]
struct IndexInner
{
    exchanges: Dimension,
    symbols: Dimension,
    data_types: Dimension,
    /// sessions whose filter wildcards every dimension: consulted directly, never intersected.
    match_all: HashSet<Pair>,
    /// every session's live filters, needed to reverse an add on remove/removeAll.
    filters_by_session: HashMap<SessionId, HashMap<FilterId, Filter>>,
}

//-------------------------------------------------------------------------------------------------------------------

/// Concurrent index from routing-key dimensions to the sessions interested in them (component C).
///
/// Writers (`add`/`remove`/`remove_all`) are serialized by an `RwLock`; readers (`lookup`)
/// take a read lock and see a consistent snapshot, never a partially-applied mutation.
#[derive(Debug, Default)]
pub struct SubscriptionIndex
{
    inner: RwLock<IndexInner>,
    next_filter_id: AtomicU64,
}

impl SubscriptionIndex
{
    pub fn new() -> Self { Self::default() }

    /// Insert `filter` for `session_id`, returning its freshly assigned, process-unique id.
    ///
    /// Per spec.md §4.C this is infallible once admission has accepted the subscribe: structural
    /// faults here are treated as invariant violations and panic rather than propagate.
    pub fn add(&self, session_id: SessionId, filter: Filter) -> FilterId
    {
        let filter_id = FilterId(self.next_filter_id.fetch_add(1, Ordering::Relaxed));
        let pair = (session_id, filter_id);

        let mut inner = self.inner.write().expect("subscription index lock poisoned");

        if filter.is_match_all()
        {
            inner.match_all.insert(pair);
        }
        else
        {
            for exchange in dimension_values(&filter.exchanges) { inner.exchanges.insert(exchange, pair); }
            for symbol in dimension_values(&filter.symbols) { inner.symbols.insert(symbol, pair); }
            for data_type in dimension_values(&filter.data_types) { inner.data_types.insert(data_type, pair); }
        }

        inner.filters_by_session.entry(session_id).or_default().insert(filter_id, filter);
        filter_id
    }

    /// Remove one filter. A no-op if the (session, filter) pair is not present (e.g. a racing
    /// unsubscribe after `remove_all`).
    pub fn remove(&self, session_id: SessionId, filter_id: FilterId)
    {
        let mut inner = self.inner.write().expect("subscription index lock poisoned");
        let Some(filters) = inner.filters_by_session.get_mut(&session_id) else { return; };
        let Some(filter) = filters.remove(&filter_id) else { return; };
        if filters.is_empty() { inner.filters_by_session.remove(&session_id); }

        let pair = (session_id, filter_id);
        if filter.is_match_all()
        {
            inner.match_all.remove(&pair);
        }
        else
        {
            for exchange in dimension_values(&filter.exchanges) { inner.exchanges.remove(exchange, &pair); }
            for symbol in dimension_values(&filter.symbols) { inner.symbols.remove(symbol, &pair); }
            for data_type in dimension_values(&filter.data_types) { inner.data_types.remove(data_type, &pair); }
        }
    }

    /// Remove every filter owned by `session_id`. Called on session close; per spec.md §3 this
    /// must complete before the session's socket resources are released.
    pub fn remove_all(&self, session_id: SessionId)
    {
        let mut inner = self.inner.write().expect("subscription index lock poisoned");
        let Some(filters) = inner.filters_by_session.remove(&session_id) else { return; };

        for (filter_id, filter) in filters
        {
            let pair = (session_id, filter_id);
            if filter.is_match_all()
            {
                inner.match_all.remove(&pair);
            }
            else
            {
                for exchange in dimension_values(&filter.exchanges) { inner.exchanges.remove(exchange, &pair); }
                for symbol in dimension_values(&filter.symbols) { inner.symbols.remove(symbol, &pair); }
                for data_type in dimension_values(&filter.data_types) { inner.data_types.remove(data_type, &pair); }
            }
        }
    }

    /// Resolve the distinct sessions whose filters match `key`. A session with several matching
    /// filters still appears once (component E relies on this for at-most-once delivery).
    pub fn lookup(&self, key: &RoutingKey) -> Vec<SessionId>
    {
        let inner = self.inner.read().expect("subscription index lock poisoned");

        let exchanges = inner.exchanges.matching(&key.exchange);
        let symbols = inner.symbols.matching(&key.symbol);
        let data_types = inner.data_types.matching(&key.data_type);

        let mut sessions: HashSet<SessionId> = inner.match_all.iter().map(|(s, _)| *s).collect();
        for pair in exchanges.intersection(&symbols).copied().collect::<HashSet<_>>().intersection(&data_types)
        {
            sessions.insert(pair.0);
        }

        sessions.into_iter().collect()
    }

    /// True iff `session_id` currently holds any filter (i.e. is reachable from the index).
    pub fn has_filters(&self, session_id: SessionId) -> bool
    {
        let inner = self.inner.read().expect("subscription index lock poisoned");
        inner.filters_by_session.get(&session_id).is_some_and(|f| !f.is_empty())
    }

    /// Number of filters a session currently holds, for admission's `FILTER_LIMIT` check.
    pub fn filter_count(&self, session_id: SessionId) -> usize
    {
        let inner = self.inner.read().expect("subscription index lock poisoned");
        inner.filters_by_session.get(&session_id).map_or(0, |f| f.len())
    }
}

//-------------------------------------------------------------------------------------------------------------------


//-------------------------------------------------------------------------------------------------------------------
