use ahash::HashSet;

/// Deduplicated delegator identities. Only membership is meaningful,
/// enumeration order is unspecified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelegatorSet {
    set: HashSet<String>,
}

impl DelegatorSet {
    pub fn new() -> DelegatorSet {
        DelegatorSet { set: HashSet::default() }
    }

    /// Insert an identity, returns false if it was already present
    pub fn insert(&mut self, identity: impl Into<String>) -> bool {
        self.set.insert(identity.into())
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.set.contains(identity)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.set.iter()
    }

    /// Materialize the set for the caller
    pub fn vec(self) -> Vec<String> {
        self.set.into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for DelegatorSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = DelegatorSet::new();
        for identity in iter {
            set.insert(identity);
        }
        set
    }
}

impl<S: Into<String>> Extend<S> for DelegatorSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for identity in iter {
            self.insert(identity);
        }
    }
}
