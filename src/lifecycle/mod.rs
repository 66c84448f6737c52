//! Bug lifecycle estimation.
//!
//! Resolves each ticket's Opening Version (OV), Fixed Version (FV) and,
//! where reported, Injected Version (IV) against the release catalog, then
//! backfills missing IVs with the proportion method: the project-wide median
//! of `p = (FV - IV) / (FV - OV)` observed on tickets whose full triple is
//! known.

use rayon::prelude::*;

use crate::core::{ReleaseCatalog, Ticket, VersionSlot};

/// Tickets with fewer ground-truth samples than this use the fallback
/// proportion instead of the observed median.
pub const COLD_START_THRESHOLD: usize = 5;

/// Proportion assumed when too few ground-truth samples exist. One means
/// "injected at the opening version".
pub const FALLBACK_PROPORTION: f64 = 1.0;

/// Tunable knobs of the estimator.
#[derive(Debug, Clone, Copy)]
pub struct EstimatorParams {
    pub cold_start_threshold: usize,
    pub fallback_proportion: f64,
}

impl Default for EstimatorParams {
    fn default() -> Self {
        Self {
            cold_start_threshold: COLD_START_THRESHOLD,
            fallback_proportion: FALLBACK_PROPORTION,
        }
    }
}

/// What one estimation run observed, for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct EstimationReport {
    pub tickets: usize,
    pub with_valid_triple: usize,
    pub estimated: usize,
    pub unresolvable: usize,
    pub proportion_samples: usize,
    pub proportion: f64,
    pub used_fallback: bool,
}

/// Two-phase lifecycle estimator over one release catalog.
pub struct LifecycleEstimator<'a> {
    catalog: &'a ReleaseCatalog,
    params: EstimatorParams,
}

impl<'a> LifecycleEstimator<'a> {
    pub fn new(catalog: &'a ReleaseCatalog) -> Self {
        Self {
            catalog,
            params: EstimatorParams::default(),
        }
    }

    pub fn with_params(catalog: &'a ReleaseCatalog, params: EstimatorParams) -> Self {
        Self { catalog, params }
    }

    /// Run both phases over all tickets in place.
    ///
    /// Phase one resolves OV, FV and reported IV per ticket, independently
    /// and in parallel. Phase two derives the median proportion from the
    /// valid triples and backfills every estimable ticket's IV.
    pub fn estimate(&self, tickets: &mut [Ticket]) -> EstimationReport {
        tickets
            .par_iter_mut()
            .for_each(|ticket| self.resolve_versions(ticket));

        let samples = self.proportion_samples(tickets);
        let (proportion, used_fallback) =
            if samples.len() < self.params.cold_start_threshold {
                (self.params.fallback_proportion, true)
            } else {
                (median(&samples), false)
            };

        let mut report = EstimationReport {
            tickets: tickets.len(),
            proportion_samples: samples.len(),
            proportion,
            used_fallback,
            ..EstimationReport::default()
        };

        for ticket in tickets.iter_mut() {
            if ticket.is_estimable() {
                self.backfill_injected(ticket, proportion);
                report.estimated += 1;
            }
            if ticket.has_valid_triple() {
                report.with_valid_triple += 1;
            } else {
                report.unresolvable += 1;
            }
        }

        tracing::info!(
            "lifecycle: {} tickets, {} valid triples ({} estimated), \
             proportion {:.3} from {} samples{}",
            report.tickets,
            report.with_valid_triple,
            report.estimated,
            report.proportion,
            report.proportion_samples,
            if report.used_fallback { " (fallback)" } else { "" },
        );
        report
    }

    /// Phase one: resolve OV, FV and the reported IV for one ticket.
    fn resolve_versions(&self, ticket: &mut Ticket) {
        ticket.opening = match ticket.created.and_then(|t| self.catalog.latest_at_or_before(t))
        {
            Some(release) => VersionSlot::Resolved(release.clone()),
            None => VersionSlot::Unmatched,
        };
        ticket.fixed = match ticket.resolved.and_then(|t| self.catalog.earliest_after(t)) {
            Some(release) => VersionSlot::Resolved(release.clone()),
            None => VersionSlot::Unmatched,
        };

        // Reported IV: the earliest catalog release among the claimed
        // affected versions. Claims that match nothing are ignored.
        let reported = ticket
            .affected_versions
            .iter()
            .filter_map(|name| self.catalog.by_name(name))
            .min_by_key(|release| release.index);
        ticket.injected = match reported {
            Some(release) => VersionSlot::Resolved(release.clone()),
            None => VersionSlot::Unmatched,
        };
    }

    /// Ground-truth proportion samples from tickets with a valid triple.
    fn proportion_samples(&self, tickets: &[Ticket]) -> Vec<f64> {
        let mut samples: Vec<f64> = tickets
            .iter()
            .filter(|t| t.has_valid_triple())
            .filter_map(|t| {
                let iv = t.injected.index()? as f64;
                let ov = t.opening.index()? as f64;
                let fv = t.fixed.index()? as f64;
                let p = (fv - iv) / (fv - ov);
                (p.is_finite() && p >= 0.0).then_some(p)
            })
            .collect();
        samples.sort_by(|a, b| a.total_cmp(b));
        samples
    }

    /// Phase two backfill: `IV = FV - (FV - OV) * p`, rounded and clamped
    /// into `[0, OV]`.
    fn backfill_injected(&self, ticket: &mut Ticket, proportion: f64) {
        let (Some(ov), Some(fv)) = (ticket.opening.index(), ticket.fixed.index()) else {
            return;
        };
        let raw = fv as f64 - (fv as f64 - ov as f64) * proportion;
        let estimated = raw.round().clamp(0.0, ov as f64) as usize;
        let estimated = estimated.min(self.catalog.len().saturating_sub(1));
        if let Some(release) = self.catalog.get(estimated) {
            ticket.injected = VersionSlot::Resolved(release.clone());
        }
    }
}

/// Median of a sorted, non-empty sample list.
fn median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}
