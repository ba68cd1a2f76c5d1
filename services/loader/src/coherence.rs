//! Arithmetic repair of participation tallies.
//!
//! The store enforces `votants + abstentions = inscrits` and
//! `exprimes + blancs_nuls = votants` as check constraints. Source files
//! occasionally break them; the reported quantities (inscrits, votants,
//! exprimes) are treated as authoritative and the derived ones
//! (abstentions, blancs_nuls) are recomputed. Rows that cannot be repaired
//! without guessing are rejected with an explicit reason instead of letting
//! the store raise.

use crate::domain::ParticipationCounts;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    pub counts: ParticipationCounts,
    /// Number of corrections applied (0, 1 or 2), reported in stage stats.
    pub corrections: u32,
}

/// Reason a row cannot be made coherent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Incoherence {
    /// `inscrits == 0` while votants or abstentions are non-zero.
    ZeroRegistered,
    /// `votants == 0` while exprimes or blancs_nuls are non-zero.
    ZeroVoters,
    /// More voters than registered; no derived quantity can absorb it.
    VotersExceedRegistered,
    /// More valid votes than voters.
    ValidExceedVoters,
}

impl Incoherence {
    pub fn reason(&self) -> &'static str {
        match self {
            Incoherence::ZeroRegistered => "zero registered with non-zero tallies",
            Incoherence::ZeroVoters => "zero voters with non-zero ballots",
            Incoherence::VotersExceedRegistered => "voters exceed registered",
            Incoherence::ValidExceedVoters => "valid votes exceed voters",
        }
    }
}

pub fn reconcile(mut c: ParticipationCounts) -> Result<Reconciled, Incoherence> {
    let mut corrections = 0;

    if c.votants + c.abstentions != c.inscrits {
        if c.inscrits == 0 {
            return Err(Incoherence::ZeroRegistered);
        }
        if c.votants > c.inscrits {
            return Err(Incoherence::VotersExceedRegistered);
        }
        c.abstentions = c.inscrits - c.votants;
        corrections += 1;
    }

    if c.exprimes + c.blancs_nuls != c.votants {
        if c.votants == 0 {
            return Err(Incoherence::ZeroVoters);
        }
        if c.exprimes > c.votants {
            return Err(Incoherence::ValidExceedVoters);
        }
        c.blancs_nuls = c.votants - c.exprimes;
        corrections += 1;
    }

    Ok(Reconciled {
        counts: c,
        corrections,
    })
}
