use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Visibility label gating which commands a user sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseTrack {
    Ga,
    Beta,
    Alpha,
}

impl ReleaseTrack {
    /// All tracks in stability order, most stable first.
    pub const ALL: [ReleaseTrack; 3] = [ReleaseTrack::Ga, ReleaseTrack::Beta, ReleaseTrack::Alpha];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseTrack::Ga => "ga",
            ReleaseTrack::Beta => "beta",
            ReleaseTrack::Alpha => "alpha",
        }
    }

    /// Leading command-line token selecting this track. GA has none.
    pub fn prefix(&self) -> Option<&'static str> {
        match self {
            ReleaseTrack::Ga => None,
            ReleaseTrack::Beta => Some("beta"),
            ReleaseTrack::Alpha => Some("alpha"),
        }
    }

    fn bit(self) -> u8 {
        match self {
            ReleaseTrack::Ga => 1,
            ReleaseTrack::Beta => 2,
            ReleaseTrack::Alpha => 4,
        }
    }
}

impl fmt::Display for ReleaseTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseTrack {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ga" => Ok(ReleaseTrack::Ga),
            "beta" => Ok(ReleaseTrack::Beta),
            "alpha" => Ok(ReleaseTrack::Alpha),
            _ => Err(format!(
                "unknown release track '{}', expected one of: ga, beta, alpha",
                s
            )),
        }
    }
}

/// A small set of release tracks, stored as a bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TrackSet(u8);

impl TrackSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn of(track: ReleaseTrack) -> Self {
        Self(track.bit())
    }

    pub fn all() -> Self {
        ReleaseTrack::ALL.into_iter().collect()
    }

    pub fn insert(&mut self, track: ReleaseTrack) {
        self.0 |= track.bit();
    }

    pub fn contains(&self, track: ReleaseTrack) -> bool {
        self.0 & track.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn is_subset(&self, other: &TrackSet) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn union(&self, other: &TrackSet) -> TrackSet {
        TrackSet(self.0 | other.0)
    }

    pub fn intersection(&self, other: &TrackSet) -> TrackSet {
        TrackSet(self.0 & other.0)
    }

    /// Iterate tracks in stability order.
    pub fn iter(&self) -> impl Iterator<Item = ReleaseTrack> + '_ {
        ReleaseTrack::ALL.into_iter().filter(|t| self.contains(*t))
    }
}

impl FromIterator<ReleaseTrack> for TrackSet {
    fn from_iter<I: IntoIterator<Item = ReleaseTrack>>(iter: I) -> Self {
        let mut set = TrackSet::empty();
        for track in iter {
            set.insert(track);
        }
        set
    }
}

impl fmt::Display for TrackSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|t| t.as_str()).collect();
        f.write_str(&names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_from_str() {
        assert_eq!("ga".parse::<ReleaseTrack>().unwrap(), ReleaseTrack::Ga);
        assert_eq!("ALPHA".parse::<ReleaseTrack>().unwrap(), ReleaseTrack::Alpha);
        assert!("canary".parse::<ReleaseTrack>().is_err());
    }

    #[test]
    fn test_track_prefix() {
        assert_eq!(ReleaseTrack::Ga.prefix(), None);
        assert_eq!(ReleaseTrack::Beta.prefix(), Some("beta"));
        assert_eq!(ReleaseTrack::Alpha.prefix(), Some("alpha"));
    }

    #[test]
    fn test_set_insert_contains() {
        let mut set = TrackSet::empty();
        assert!(set.is_empty());
        set.insert(ReleaseTrack::Beta);
        assert!(set.contains(ReleaseTrack::Beta));
        assert!(!set.contains(ReleaseTrack::Ga));
    }

    #[test]
    fn test_set_subset() {
        let ga = TrackSet::of(ReleaseTrack::Ga);
        let both = ga.union(&TrackSet::of(ReleaseTrack::Alpha));
        assert!(ga.is_subset(&both));
        assert!(!both.is_subset(&ga));
        assert!(TrackSet::empty().is_subset(&ga));
    }

    #[test]
    fn test_set_iter_order() {
        let set: TrackSet = [ReleaseTrack::Alpha, ReleaseTrack::Ga].into_iter().collect();
        let tracks: Vec<ReleaseTrack> = set.iter().collect();
        assert_eq!(tracks, vec![ReleaseTrack::Ga, ReleaseTrack::Alpha]);
        assert_eq!(set.to_string(), "ga, alpha");
    }

    #[test]
    fn test_set_intersection() {
        let a: TrackSet = [ReleaseTrack::Ga, ReleaseTrack::Beta].into_iter().collect();
        let b: TrackSet = [ReleaseTrack::Beta, ReleaseTrack::Alpha].into_iter().collect();
        assert_eq!(a.intersection(&b), TrackSet::of(ReleaseTrack::Beta));
    }
}
