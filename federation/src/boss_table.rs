//! Leader rotation ("boss table").
//!
//! Every member computes, from the same ordered member list and the same
//! session, which member drives a transfer at a given time. No messages are
//! exchanged. Two members with skewed clocks can both believe they are the
//! boss; the store's template and quorum checks keep that harmless, so this
//! only saves redundant work.

use std::time::Duration;

use twinpeg_types::{MultisigParams, PublicKey, Timestamp};

/// The anchor of one rotation: the height the driven item was first
/// observed at and the local time of that observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeadershipSession {
    pub anchor_height: u64,
    pub start: Timestamp,
}

impl LeadershipSession {
    pub fn new(anchor_height: u64, start: Timestamp) -> Self {
        Self {
            anchor_height,
            start,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BossTable {
    members: Vec<PublicKey>,
    slot_secs: u64,
}

impl BossTable {
    /// `slot` is clamped to at least one second.
    pub fn new(params: &MultisigParams, slot: Duration) -> Self {
        Self {
            members: params.members().to_vec(),
            slot_secs: slot.as_secs().max(1),
        }
    }

    pub fn members(&self) -> &[PublicKey] {
        &self.members
    }

    /// Index of the slot `now` falls in, counted from the session start.
    pub fn slot_at(&self, session: &LeadershipSession, now: Timestamp) -> u64 {
        session.start.elapsed_since(now) / self.slot_secs
    }

    /// The member owning the slot `now` falls in.
    pub fn boss_card(&self, session: &LeadershipSession, now: Timestamp) -> &PublicKey {
        let slot = self.slot_at(session, now);
        let index = (slot % self.members.len() as u64) as usize;
        &self.members[index]
    }

    pub fn am_i_the_boss(
        &self,
        me: &PublicKey,
        session: &LeadershipSession,
        now: Timestamp,
    ) -> bool {
        self.boss_card(session, now) == me
    }
}
