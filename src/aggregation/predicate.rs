use crate::event_source::ArgValue;

/// Decides from the triggering argument whether an event counts
pub type InclusionPredicate = fn(&ArgValue) -> bool;

/// A vote change only signals an active delegation when voting power moved
/// *to* the delegatee, i.e. the amount is strictly positive. Zero or negative
/// amounts are removals or no-ops.
pub fn is_active_delegation(value: &ArgValue) -> bool {
    value.is_positive()
}
