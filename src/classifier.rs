use serde::Serialize;
use std::fmt;

use crate::coordinate::Coordinate;
use crate::error::{Error, Result};

pub const BUCKETS: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Normal,
    Replay,
    Conflict,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Normal => "normal",
            RequestKind::Replay => "replay",
            RequestKind::Conflict => "conflict",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replay/conflict percentages. Only constructible with a sum of at most 100.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TrafficMix {
    replay_pct: u32,
    conflict_pct: u32,
}

impl TrafficMix {
    pub fn new(replay_pct: u32, conflict_pct: u32) -> Result<Self> {
        if replay_pct > BUCKETS {
            return Err(Error::InvalidPercentage {
                name: "REPLAY_PCT",
                value: replay_pct.to_string(),
            });
        }
        if conflict_pct > BUCKETS {
            return Err(Error::InvalidPercentage {
                name: "CONFLICT_PCT",
                value: conflict_pct.to_string(),
            });
        }
        if replay_pct + conflict_pct > BUCKETS {
            return Err(Error::PercentageSum {
                replay: replay_pct,
                conflict: conflict_pct,
            });
        }
        Ok(Self {
            replay_pct,
            conflict_pct,
        })
    }

    pub fn replay_pct(&self) -> u32 {
        self.replay_pct
    }

    pub fn conflict_pct(&self) -> u32 {
        self.conflict_pct
    }

    pub fn kind_for_bucket(&self, bucket: u32) -> RequestKind {
        if bucket < self.replay_pct {
            RequestKind::Replay
        } else if bucket < self.replay_pct + self.conflict_pct {
            RequestKind::Conflict
        } else {
            RequestKind::Normal
        }
    }
}

impl Default for TrafficMix {
    fn default() -> Self {
        Self {
            replay_pct: 2,
            conflict_pct: 1,
        }
    }
}

pub fn classify(coord: Coordinate, mix: &TrafficMix) -> RequestKind {
    mix.kind_for_bucket(coord.bucket(BUCKETS))
}
