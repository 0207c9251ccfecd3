//! Precision tier selection.
//!
//! Determines how many mantissa bits are needed to keep adjacent pixels
//! distinguishable at a viewport's zoom, and maps that to a tier.

use serde::{Deserialize, Serialize};

use crate::bigfloat::MIN_ARBITRARY_BITS;
use crate::error::{InvalidParameters, NumericDegenerate};
use crate::extfloat::EXTENDED_MANTISSA_BITS;
use crate::scalar::{PrecisionTier, NATIVE_MANTISSA_BITS};
use crate::Viewport;

/// Tuning knobs for tier selection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecisionPolicy {
    /// Headroom kept above the bits strictly needed to separate pixels.
    pub safety_margin_bits: u32,
    /// Extra headroom a lower tier must offer before a downgrade.
    pub downgrade_hysteresis_bits: u32,
    /// Widest arbitrary-precision representation allowed.
    pub max_arbitrary_bits: usize,
}

impl Default for PrecisionPolicy {
    fn default() -> Self {
        Self {
            safety_margin_bits: 8,
            downgrade_hysteresis_bits: 4,
            max_arbitrary_bits: 4096,
        }
    }
}

impl PrecisionPolicy {
    pub fn validate(&self) -> Result<(), InvalidParameters> {
        if self.safety_margin_bits > 64 {
            return Err(InvalidParameters::Setting {
                field: "safety_margin_bits",
                expected: "at most 64",
            });
        }
        if self.downgrade_hysteresis_bits > 64 {
            return Err(InvalidParameters::Setting {
                field: "downgrade_hysteresis_bits",
                expected: "at most 64",
            });
        }
        if self.max_arbitrary_bits < MIN_ARBITRARY_BITS {
            return Err(InvalidParameters::Setting {
                field: "max_arbitrary_bits",
                expected: "at least 128",
            });
        }
        Ok(())
    }
}

/// Bits needed to tell the two closest pixels apart, before any margin.
///
/// `ceil(log2(M / spacing))` where M is the largest visible coordinate magnitude.
pub fn resolution_bits(viewport: &Viewport) -> usize {
    let spacing = viewport.spacing().min(viewport.spacing_y());
    let magnitude = viewport.max_magnitude().max(spacing);
    (magnitude / spacing).log2().ceil().max(0.0) as usize
}

/// Record of a tier transition caused by one navigation command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierChange {
    pub from: PrecisionTier,
    pub to: PrecisionTier,
}

impl TierChange {
    pub fn is_upgrade(&self) -> bool {
        self.to > self.from
    }
}

/// Viewport after a navigation command, with the tier transition it caused.
#[derive(Clone, Debug, PartialEq)]
pub struct Navigated {
    pub viewport: Viewport,
    pub change: Option<TierChange>,
}

/// Picks and applies the numeric tier for each committed navigation command.
#[derive(Clone, Debug, Default)]
pub struct PrecisionManager {
    policy: PrecisionPolicy,
}

impl PrecisionManager {
    pub fn new(policy: PrecisionPolicy) -> Result<Self, InvalidParameters> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &PrecisionPolicy {
        &self.policy
    }

    /// Bits required at this viewport including the safety margin.
    pub fn required_bits(&self, viewport: &Viewport) -> usize {
        resolution_bits(viewport) + self.policy.safety_margin_bits as usize
    }

    /// Monotone threshold table from required bits to tier.
    pub fn tier_for_bits(&self, required: usize) -> PrecisionTier {
        if required <= NATIVE_MANTISSA_BITS {
            PrecisionTier::Native
        } else if required <= EXTENDED_MANTISSA_BITS {
            PrecisionTier::Extended
        } else {
            let bits = required
                .next_power_of_two()
                .max(MIN_ARBITRARY_BITS)
                .min(self.policy.max_arbitrary_bits);
            PrecisionTier::arbitrary(bits)
        }
    }

    /// Tier to use for `viewport` given the tier currently active.
    ///
    /// Upgrades go straight to the sufficient tier. Downgrades move one step
    /// and only when the lower tier clears the hysteresis band.
    pub fn select(&self, current: PrecisionTier, viewport: &Viewport) -> PrecisionTier {
        let required = self.required_bits(viewport);
        let sufficient = self.tier_for_bits(required);
        if sufficient > current {
            return sufficient;
        }
        if sufficient < current {
            let lower = self.step_down(current);
            let needed = required + self.policy.downgrade_hysteresis_bits as usize;
            if needed <= lower.mantissa_bits() {
                return lower.max(sufficient);
            }
        }
        current
    }

    /// Next tier up, or `None` when already at the widest allowed.
    pub fn step_up(&self, tier: PrecisionTier) -> Option<PrecisionTier> {
        match tier {
            PrecisionTier::Native => Some(PrecisionTier::Extended),
            PrecisionTier::Extended => Some(PrecisionTier::arbitrary(MIN_ARBITRARY_BITS)),
            PrecisionTier::Arbitrary { bits } if bits * 2 <= self.policy.max_arbitrary_bits => {
                Some(PrecisionTier::arbitrary(bits * 2))
            }
            PrecisionTier::Arbitrary { .. } => None,
        }
    }

    pub fn step_down(&self, tier: PrecisionTier) -> PrecisionTier {
        match tier {
            PrecisionTier::Native | PrecisionTier::Extended => PrecisionTier::Native,
            PrecisionTier::Arbitrary { bits } if bits / 2 >= MIN_ARBITRARY_BITS => {
                PrecisionTier::arbitrary(bits / 2)
            }
            PrecisionTier::Arbitrary { .. } => PrecisionTier::Extended,
        }
    }

    /// Apply one navigation command with tier management around it.
    ///
    /// The command is first dry-run at the current tier to learn the new
    /// zoom. An upgrade is applied to the center before the command runs, a
    /// downgrade after it (rounding the center). The result is then probed;
    /// indistinguishable neighbours force further upgrades.
    pub fn navigate<F>(
        &self,
        viewport: &Viewport,
        command: F,
    ) -> Result<Navigated, InvalidParameters>
    where
        F: Fn(&Viewport) -> Result<Viewport, InvalidParameters>,
    {
        let from = viewport.tier();
        let prospective = command(viewport)?;
        let mut tier = self.select(from, &prospective);

        loop {
            let staged = if tier > from {
                command(&viewport.with_tier(tier)?)?
            } else {
                prospective.clone()
            };
            // Commands that build a fresh viewport come back at their own tier
            let staged = if staged.tier() != tier {
                staged.with_tier(tier)?
            } else {
                staged
            };

            match staged.resolution_probe() {
                Ok(()) => {
                    let change = (tier != from).then_some(TierChange { from, to: tier });
                    if let Some(change) = change {
                        self.log_change(change);
                    }
                    return Ok(Navigated {
                        viewport: staged,
                        change,
                    });
                }
                Err(NumericDegenerate::Unresolvable { .. } | NumericDegenerate::Underflow) => {
                    let next = self
                        .step_up(tier)
                        .ok_or(InvalidParameters::ZoomOutOfRange(prospective.scale()))?;
                    log::debug!("pixels collapse at {tier}, forcing {next}");
                    tier = next;
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    fn log_change(&self, change: TierChange) {
        let skipped = change.to.class().abs_diff(change.from.class()) > 1;
        if skipped {
            log::warn!("precision jumped from {} to {}", change.from, change.to);
        } else {
            log::info!("precision changed from {} to {}", change.from, change.to);
        }
    }
}
