//! Consensus award bookkeeping
//!
//! Block-level income delivered by the validator registry accumulates in
//! `available_award` until harvested. A harvest splits it between the project
//! and the treasury; the treasury share is buffered until it is worth a transfer.

use odra::prelude::*;
use odra::casper_types::U512;

use crate::errors::Error;
use crate::events::{ConsensusAwardHarvested, ConsensusAwardReceived};

pub const DEFAULT_TREASURY_RATIO: u8 = 10;
pub const MIN_TREASURY_RATIO: u8 = 10;
pub const MAX_TREASURY_RATIO: u8 = 100;

/// Where the project share of a harvest goes
#[odra::odra_type]
#[derive(Default)]
pub enum OperatingMode {
    /// Paid to the award receiver
    #[default]
    Normal = 0,
    /// Added to the liquidity sink
    Liquidity = 1,
}

#[odra::odra_type]
pub struct ConsensusAwardState {
    pub available_award: U512,
    pub transferred_award: U512,
    pub pending_treasury: U512,
    pub treasury_ratio: u8,
    pub operating_mode: OperatingMode,
}

/// Result of splitting the available award
#[derive(Debug)]
pub struct Harvest {
    pub harvested: U512,
    pub project_share: U512,
    pub treasury_share: U512,
    /// Treasury buffer released by this harvest, zero if it stays buffered
    pub flushed: U512,
}

#[odra::module]
pub struct ConsensusAwardManager {
    available_award: Var<U512>,
    transferred_award: Var<U512>,
    pending_treasury: Var<U512>,
    /// Treasury share in percent
    treasury_ratio: Var<u8>,
    operating_mode: Var<OperatingMode>,
}

#[odra::module]
impl ConsensusAwardManager {
    pub fn init(&mut self) {
        self.available_award.set(U512::zero());
        self.transferred_award.set(U512::zero());
        self.pending_treasury.set(U512::zero());
        self.treasury_ratio.set(DEFAULT_TREASURY_RATIO);
        self.operating_mode.set(OperatingMode::Normal);
    }

    pub fn available_award(&self) -> U512 {
        self.available_award.get_or_default()
    }

    pub fn transferred_award(&self) -> U512 {
        self.transferred_award.get_or_default()
    }

    pub fn pending_treasury(&self) -> U512 {
        self.pending_treasury.get_or_default()
    }

    pub fn treasury_ratio(&self) -> u8 {
        self.treasury_ratio.get_or_default()
    }

    pub fn operating_mode(&self) -> OperatingMode {
        self.operating_mode.get_or_default()
    }

    pub fn state(&self) -> ConsensusAwardState {
        ConsensusAwardState {
            available_award: self.available_award(),
            transferred_award: self.transferred_award(),
            pending_treasury: self.pending_treasury(),
            treasury_ratio: self.treasury_ratio(),
            operating_mode: self.operating_mode(),
        }
    }

    /// Project share of `amount` at the current ratio
    pub fn project_share(&self, amount: U512) -> U512 {
        let hundred = U512::from(100u8);
        amount * (hundred - U512::from(self.treasury_ratio())) / hundred
    }

    pub fn record_award(&mut self, amount: U512) -> U512 {
        let available = self.available_award() + amount;
        self.available_award.set(available);
        self.env().emit_event(ConsensusAwardReceived {
            amount,
            available_award: available,
        });
        available
    }

    /// Returns the previous ratio
    pub fn set_treasury_ratio(&mut self, ratio: u8) -> u8 {
        if !(MIN_TREASURY_RATIO..MAX_TREASURY_RATIO).contains(&ratio) {
            self.env().revert(Error::InvalidTreasuryRatio);
        }
        let old_ratio = self.treasury_ratio();
        self.treasury_ratio.set(ratio);
        old_ratio
    }

    pub fn set_operating_mode(&mut self, mode: OperatingMode) {
        self.operating_mode.set(mode);
    }
}

impl ConsensusAwardManager {
    /// Split the available award; the caller moves the funds
    pub fn harvest(&mut self, min_flush: U512) -> Harvest {
        let harvested = self.available_award();
        if harvested.is_zero() {
            self.env().revert(Error::NoConsensusAward);
        }
        self.available_award.set(U512::zero());
        let transferred = self.transferred_award() + harvested;
        self.transferred_award.set(transferred);

        let project_share = self.project_share(harvested);
        let treasury_share = harvested - project_share;
        let mut pending = self.pending_treasury() + treasury_share;
        let mut flushed = U512::zero();
        if pending >= min_flush {
            flushed = pending;
            pending = U512::zero();
        }
        self.pending_treasury.set(pending);

        self.env().emit_event(ConsensusAwardHarvested {
            harvested,
            project_share,
            treasury_share,
            pending_treasury: pending,
        });

        Harvest {
            harvested,
            project_share,
            treasury_share,
            flushed,
        }
    }
}
