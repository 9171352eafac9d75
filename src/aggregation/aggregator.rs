use super::delegator_set::DelegatorSet;
use super::predicate::{InclusionPredicate, is_active_delegation};
use crate::error::ScanError;
use crate::event_source::{BlockRange, EventFilter, EventRecord, EventSource, LogProvider};
use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Which argument slots of a record carry the delegator identity and the
/// value that decides inclusion
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ExtractionRule {
    pub identity_slot: usize,
    pub trigger_slot: usize,
}

impl ExtractionRule {
    pub fn new(identity_slot: usize, trigger_slot: usize) -> Self {
        Self { identity_slot, trigger_slot }
    }

    /// Resolve slots by argument name
    pub fn by_name(source: &EventSource, identity: &str, trigger: &str) -> Result<Self, ScanError> {
        let position = |name: &str| {
            source.schema.position_of(name).ok_or_else(|| {
                ScanError::schema_mismatch(&source.label, format!("{} has no argument '{}'", source.schema.name, name))
            })
        };
        Ok(Self { identity_slot: position(identity)?, trigger_slot: position(trigger)? })
    }

    pub fn validate(&self, source: &EventSource) -> Result<(), ScanError> {
        let args = &source.schema.args;
        if self.identity_slot >= args.len() {
            return Err(ScanError::schema_mismatch(
                &source.label,
                format!("identity slot {} out of range for {} arguments", self.identity_slot, args.len()),
            ));
        }
        let trigger = args.get(self.trigger_slot).ok_or_else(|| {
            ScanError::schema_mismatch(
                &source.label,
                format!("trigger slot {} out of range for {} arguments", self.trigger_slot, args.len()),
            )
        })?;
        if !trigger.kind.is_numeric() {
            return Err(ScanError::schema_mismatch(
                &source.label,
                format!("trigger argument '{}' is {}, expected a numeric type", trigger.name, trigger.kind),
            ));
        }
        Ok(())
    }
}

/// One tracked log stream with everything needed to query and fold it
#[derive(Clone, Debug)]
pub struct SourceQuery {
    pub source: EventSource,
    pub filter: EventFilter,
    pub range: BlockRange,
    pub rule: ExtractionRule,
}

impl SourceQuery {
    pub fn new(source: EventSource, filter: EventFilter, range: BlockRange, rule: ExtractionRule) -> Self {
        Self { source, filter, range, rule }
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        self.filter.validate(&self.source)?;
        self.rule.validate(&self.source)
    }
}

/// Counters from folding one source into the set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FoldStats {
    pub included: usize,
    pub excluded: usize,
}

/// Collects distinct delegators across several event sources.
///
/// Stateless between calls: every [`aggregate`](Self::aggregate) queries all
/// sources concurrently, and fails as a whole if any one of them fails.
#[derive(Clone)]
pub struct DelegatorAggregator {
    provider: Arc<dyn LogProvider>,
    predicate: InclusionPredicate,
}

impl DelegatorAggregator {
    pub fn new(provider: Arc<dyn LogProvider>) -> Self {
        Self { provider, predicate: is_active_delegation }
    }

    pub fn with_predicate(mut self, predicate: InclusionPredicate) -> Self {
        self.predicate = predicate;
        self
    }

    /// Query every source and union the included identities
    pub async fn aggregate(&self, queries: &[SourceQuery]) -> Result<DelegatorSet, ScanError> {
        for query in queries {
            query.validate()?;
        }

        let start_time = Instant::now();
        info!("Aggregating delegators from {} sources", queries.len());

        let fetches = queries.iter().map(|query| async move {
            let fetch_start = Instant::now();
            let records = self
                .provider
                .query_logs(&query.source, &query.filter, query.range)
                .await
                .map_err(ScanError::into_incomplete)?;
            debug!("{}: {} records in {:?}", query.source.label, records.len(), fetch_start.elapsed());
            Ok::<_, ScanError>((query, records))
        });

        // Dropping the remaining futures on the first error keeps the result all-or-nothing
        let fetched = try_join_all(fetches).await.inspect_err(|e| {
            error!("Aggregation failed after {:?}: {}", start_time.elapsed(), e);
        })?;

        let mut delegators = DelegatorSet::new();
        for (query, records) in fetched {
            let stats = Self::fold_records(&mut delegators, query.rule, self.predicate, &records);
            debug!("{}: {} included, {} excluded", query.source.label, stats.included, stats.excluded);
        }

        info!("Found {} distinct delegators in {:?}", delegators.len(), start_time.elapsed());
        Ok(delegators)
    }

    /// `aggregate` materialized as a sequence
    pub async fn recent_delegators(&self, queries: &[SourceQuery]) -> Result<Vec<String>, ScanError> {
        Ok(self.aggregate(queries).await?.vec())
    }

    /// Apply the inclusion predicate to each record and insert the identity of
    /// every included one. Records too short for the rule are excluded and
    /// logged, a conforming provider never returns them.
    pub fn fold_records(
        delegators: &mut DelegatorSet,
        rule: ExtractionRule,
        predicate: InclusionPredicate,
        records: &[EventRecord],
    ) -> FoldStats {
        let mut stats = FoldStats::default();
        for record in records {
            let included = match (record.arg(rule.trigger_slot), record.arg(rule.identity_slot)) {
                (Some(trigger), Some(identity)) => {
                    let included = predicate(trigger);
                    if included {
                        delegators.insert(identity.to_string());
                    }
                    included
                }
                _ => {
                    warn!(
                        "{}: record at {:?} has {} arguments, rule needs slots {} and {}",
                        record.source_label,
                        record.position(),
                        record.args.len(),
                        rule.identity_slot,
                        rule.trigger_slot
                    );
                    false
                }
            };
            if included {
                stats.included += 1;
            } else {
                stats.excluded += 1;
            }
        }
        stats
    }
}
