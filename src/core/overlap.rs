use crate::types::{Footprint, PipelineError, PipelineResult, SelectedPair};
use geo::{Area, BooleanOps, MultiPolygon};

/// Overlap score of one candidate combination
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapScore {
    pub radar_index: usize,
    pub optical_index: usize,
    /// Intersection area over optical footprint area, in percent
    pub percent: f64,
}

/// Percentage of `optical` covered by `radar`.
///
/// Areas are planar, taken directly on degree coordinates. The denominator is
/// always the second operand: `overlap_percent(a, b) == 100` when `b` lies
/// inside `a`, but not the other way round. Returns 0 for disjoint or
/// merely touching geometries and for a zero-area `optical`.
pub fn overlap_percent(radar: &MultiPolygon<f64>, optical: &MultiPolygon<f64>) -> f64 {
    let optical_area = optical.unsigned_area();
    if optical_area <= 0.0 {
        return 0.0;
    }

    let intersection_area = radar.intersection(optical).unsigned_area();
    if intersection_area <= 0.0 {
        return 0.0;
    }

    (intersection_area / optical_area * 100.0).clamp(0.0, 100.0)
}

/// Picks the radar/optical pair with the largest optical coverage
pub struct OverlapSelector;

impl OverlapSelector {
    /// Score every (radar, optical) combination with a positive intersection.
    ///
    /// Iteration is radar-major, optical-minor; the returned vector keeps that order.
    pub fn score_all(radar: &[Footprint], optical: &[Footprint]) -> Vec<OverlapScore> {
        let mut scores = Vec::new();

        for (radar_index, r) in radar.iter().enumerate() {
            for (optical_index, o) in optical.iter().enumerate() {
                let percent = overlap_percent(&r.geometry, &o.geometry);
                if percent > 0.0 {
                    log::debug!("{} x {}: {:.2}% overlap", r.name, o.name, percent);
                    scores.push(OverlapScore { radar_index, optical_index, percent });
                }
            }
        }

        scores
    }

    /// Select the pair with maximum overlap; first encountered wins on ties
    pub fn select_best_pair(
        radar: &[Footprint],
        optical: &[Footprint],
    ) -> PipelineResult<SelectedPair> {
        log::info!(
            "Scoring {} radar x {} optical candidate pairs",
            radar.len(),
            optical.len()
        );

        let mut best: Option<OverlapScore> = None;
        for score in Self::score_all(radar, optical) {
            match best {
                Some(current) if score.percent <= current.percent => {}
                _ => best = Some(score),
            }
        }

        let best = best.ok_or(PipelineError::NoOverlapFound)?;
        let pair = SelectedPair {
            radar: radar[best.radar_index].clone(),
            optical: optical[best.optical_index].clone(),
            overlap_percent: best.percent,
        };

        log::info!("Best overlap found: {:.2}%", pair.overlap_percent);
        log::info!("Selected radar product: {}", pair.radar.name);
        log::info!("Selected optical product: {}", pair.optical.name);
        Ok(pair)
    }
}
