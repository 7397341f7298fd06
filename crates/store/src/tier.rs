use std::fmt;

/// Storage tiers, from the most to the least granular.
///
/// Storing at a tier also stores at every tier after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// One document per delivered event, in monthly indices.
    LiveEvent,
    /// Point-in-time item state, in indices rolled at the sync periodicity.
    CurrentState,
    /// Latest state of every item.
    Snapshot,
}

impl Tier {
    pub const ALL: [Self; 3] = [Self::LiveEvent, Self::CurrentState, Self::Snapshot];

    /// The tiers written when storing at `self`, in write order.
    #[must_use]
    pub fn cascade(self) -> &'static [Tier] {
        match self {
            Self::LiveEvent => &Self::ALL,
            Self::CurrentState => &Self::ALL[1..],
            Self::Snapshot => &Self::ALL[2..],
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LiveEvent => "live event",
            Self::CurrentState => "current state",
            Self::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
