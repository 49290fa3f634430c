//! Group converged probes into spots, decide which spot owns each datum, then merge,
//! prune and test the spots for acceptance as chromatographic peaks.
use std::collections::{HashMap, VecDeque};
use std::fmt::{self, Display};
use std::mem;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::gridmass::GridMassError;
use crate::params::{DebugLevel, DerivedTolerances, GridMassParams};
use crate::progress::{should_check, Phase, ProgressMonitor};
use crate::search::find_first_by;

use super::probe::{ConvergedProbe, ProbeSeed, Relaxer};
use super::roi::{Datum, RoiIndex, SpotId, UNASSIGNED};

/// The ratio of the smaller to the larger of two intensities
pub fn intensity_ratio(a: f32, b: f32) -> f64 {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    if hi <= 0.0 {
        0.0
    } else {
        lo as f64 / hi as f64
    }
}

/// The local maximum a spot's probes converged to
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Apex {
    pub mz: f64,
    pub scan_index: usize,
    pub intensity: f32,
}

/// The m/z × scan bounding box of a spot
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpotBounds {
    pub min_mz: f64,
    pub max_mz: f64,
    pub min_scan: usize,
    pub max_scan: usize,
}

impl SpotBounds {
    pub fn at(mz: f64, scan_index: usize) -> Self {
        Self {
            min_mz: mz,
            max_mz: mz,
            min_scan: scan_index,
            max_scan: scan_index,
        }
    }

    pub fn include(&mut self, mz: f64, scan_index: usize) {
        self.min_mz = self.min_mz.min(mz);
        self.max_mz = self.max_mz.max(mz);
        self.min_scan = self.min_scan.min(scan_index);
        self.max_scan = self.max_scan.max(scan_index);
    }

    pub fn union(&mut self, other: &SpotBounds) {
        self.include(other.min_mz, other.min_scan);
        self.include(other.max_mz, other.max_scan);
    }

    /// The number of scans covered, inclusive of both ends
    pub fn scan_span(&self) -> usize {
        self.max_scan - self.min_scan + 1
    }

    pub fn scans_overlap(&self, other: &SpotBounds) -> bool {
        !(other.max_scan < self.min_scan || other.min_scan > self.max_scan)
    }

    /// The smallest distance between any end of this scan range and any end of `other`'s
    pub fn scan_gap(&self, other: &SpotBounds) -> usize {
        endpoint_gap(self.min_scan, self.max_scan, other)
    }
}

fn endpoint_gap(min_scan: usize, max_scan: usize, other: &SpotBounds) -> usize {
    let left = min_scan
        .abs_diff(other.min_scan)
        .min(min_scan.abs_diff(other.max_scan));
    let right = max_scan
        .abs_diff(other.min_scan)
        .min(max_scan.abs_diff(other.max_scan));
    left.min(right)
}

/// Why a spot did not become a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Rejection {
    /// The spot covers fewer scans than a peak must
    TimeRange,
    /// Too few scans hold data, or they are too fragmented
    Continuity,
    /// The chromatogram integrated to (nearly) nothing
    Area,
    /// No raw point of the chromatogram reaches the height floor
    Height,
}

impl Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Rejection::TimeRange => "time range criteria",
            Rejection::Continuity => "continuous criteria",
            Rejection::Area => "area ~ 0",
            Rejection::Height => "height",
        };
        f.write_str(reason)
    }
}

/// The life cycle of a [`Spot`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SpotState {
    #[default]
    Created,
    OwnershipResolved,
    /// Absorbed by another spot
    MergedInto(SpotId),
    /// Removed as part of a long background trace
    Tombstoned,
    /// Survived merging and pruning
    Candidate,
    Rejected(Rejection),
    Accepted,
    FeatureEmitted,
}

/// A cluster of probes that share one converged apex, along with the datums it owns
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Spot {
    pub id: SpotId,
    pub apex: Apex,
    pub bounds: SpotBounds,
    /// The grid positions of the probes that converged here, including those of
    /// merged spots
    pub probes: Vec<ProbeSeed>,
    pub state: SpotState,
}

impl Spot {
    pub fn new(id: SpotId, apex: Apex) -> Self {
        Self {
            id,
            apex,
            bounds: SpotBounds::at(apex.mz, apex.scan_index),
            probes: Vec::new(),
            state: SpotState::Created,
        }
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Whether this spot may still become a feature, or take part in merging and pruning
    pub fn is_live(&self) -> bool {
        !self.is_empty()
            && !matches!(
                self.state,
                SpotState::MergedInto(_) | SpotState::Tombstoned | SpotState::Rejected(_)
            )
    }

    /// Drop all members, excluding this spot from every later stage
    pub fn tombstone(&mut self) {
        self.probes.clear();
        self.state = SpotState::Tombstoned;
    }

    fn absorb(&mut self, other: &mut Spot) {
        self.bounds.union(&other.bounds);
        self.probes.extend(mem::take(&mut other.probes));
        other.state = SpotState::MergedInto(self.id);
    }
}

impl Display for Spot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Spot(id={}, apex={:.4} m/z @ scan {} ({}), mz=[{:.4} ~ {:.4}], scans=[{} ~ {}], probes={}, {:?})",
            self.id,
            self.apex.mz,
            self.apex.scan_index,
            self.apex.intensity,
            self.bounds.min_mz,
            self.bounds.max_mz,
            self.bounds.min_scan,
            self.bounds.max_scan,
            self.len(),
            self.state
        )
    }
}

/// A union-find forest over spot indices, with path compression. Unlike union by size,
/// [`ClusterForest::union_into`] always keeps the chosen root so a spot absorbing others
/// retains its identity.
#[derive(Debug, Clone)]
pub struct ClusterForest {
    parent: Vec<usize>,
}

impl ClusterForest {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    pub fn find(&mut self, mut x: usize) -> usize {
        let mut root = x;
        while root != self.parent[root] {
            root = self.parent[root];
        }
        while x != self.parent[x] {
            let next = self.parent[x];
            self.parent[x] = root;
            x = next;
        }
        root
    }

    pub fn is_root(&mut self, x: usize) -> bool {
        self.find(x) == x
    }

    /// Attach the cluster of `child` beneath the root of `root`
    pub fn union_into(&mut self, root: usize, child: usize) -> bool {
        let r = self.find(root);
        let c = self.find(child);
        if r == c {
            return false;
        }
        self.parent[c] = r;
        true
    }
}

/// How a spot measures up against the acceptance criteria
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpotEvaluation {
    /// For every scan in the spot's range with an owned datum at least the height floor,
    /// the arena offset of the most intense such datum, in scan order
    pub max_datums: Vec<usize>,
    /// How many scans hold a qualifying datum
    pub data_scans: usize,
    /// The longest run of consecutive scans holding a qualifying datum
    pub contiguous_scans: usize,
}

impl SpotEvaluation {
    pub fn contiguous_ratio(&self) -> f64 {
        if self.data_scans == 0 {
            0.0
        } else {
            self.contiguous_scans as f64 / self.data_scans as f64
        }
    }
}

/// Builds, merges, prunes and tests [`Spot`]s over a [`RoiIndex`]
#[derive(Debug, Clone)]
pub struct SpotBuilder<'a> {
    pub tolerances: DerivedTolerances,
    pub mz_tolerance: f64,
    pub intensity_similarity: f64,
    pub max_time_span: f64,
    pub minimum_height: f32,
    pub debug_level: DebugLevel,
    time_axis: &'a [f64],
}

impl<'a> SpotBuilder<'a> {
    pub fn new(params: &GridMassParams, tolerances: DerivedTolerances, time_axis: &'a [f64]) -> Self {
        Self {
            tolerances,
            mz_tolerance: params.mz_tolerance,
            intensity_similarity: params.intensity_similarity,
            max_time_span: params.max_time_span,
            minimum_height: params.minimum_height,
            debug_level: params.debug_level,
            time_axis,
        }
    }

    fn time_at(&self, scan_index: usize) -> f64 {
        self.time_axis.get(scan_index).copied().unwrap_or(f64::NAN)
    }

    /// Group probes that converged to the same coordinate into spots, ordered by apex
    /// m/z then apex scan. Spot ids count up from one in that order.
    pub fn form_spots<M: ProgressMonitor + ?Sized>(
        &self,
        mut probes: Vec<ConvergedProbe>,
        monitor: &M,
    ) -> Result<Vec<Spot>, GridMassError> {
        probes.sort_by(|a, b| {
            a.mz.total_cmp(&b.mz)
                .then_with(|| a.scan_index.cmp(&b.scan_index))
        });

        let n = probes.len();
        let mut spots: Vec<Spot> = Vec::new();
        let mut last: Option<ConvergedProbe> = None;
        for (i, probe) in probes.into_iter().enumerate() {
            let starts_new = last.as_ref().map_or(true, |p| !p.same_apex(&probe));
            if starts_new {
                if i % 10 == 0 && monitor.is_canceled() {
                    return Err(GridMassError::Canceled);
                }
                let apex = Apex {
                    mz: probe.mz,
                    scan_index: probe.scan_index,
                    intensity: probe.intensity,
                };
                spots.push(Spot::new(spots.len() + 1, apex));
            }
            if let Some(spot) = spots.last_mut() {
                spot.probes.push(probe.seed);
            }
            last = Some(probe);
            monitor.update(Phase::SpotFormation, i, n);
        }
        log::info!("Spots: {}", spots.len());
        Ok(spots)
    }

    /// Let every spot claim the datums around it, growing its bounding box as it goes,
    /// until the box stops growing. Returns the number of datums examined.
    ///
    /// Unclaimed datums are taken outright. A datum already claimed by another spot is
    /// relaxed from its own coordinates and handed to whichever spot owns the apex it
    /// converges to.
    ///
    /// Examining a datum a second time for the same spot never changes its owner, so
    /// each pass only visits the part of the search box that the last pass did not
    /// cover. A trace of `L` scans therefore costs `O(L)` visits rather than one full
    /// box per pass.
    pub fn resolve_ownership<M: ProgressMonitor + ?Sized>(
        &self,
        roi: &mut RoiIndex,
        spots: &mut [Spot],
        monitor: &M,
    ) -> Result<usize, GridMassError> {
        let apex_owner: HashMap<(u64, usize), SpotId> = spots
            .iter()
            .map(|s| ((s.apex.mz.to_bits(), s.apex.scan_index), s.id))
            .collect();
        let mut convergence_cache: HashMap<usize, Option<SpotId>> = HashMap::new();
        let scan_radius = self.tolerances.scan_radius;
        let mass_radius = self.tolerances.mass_radius;
        let mut visits = 0usize;

        let n = spots.len();
        for i in 0..n {
            if should_check(i) && monitor.is_canceled() {
                return Err(GridMassError::Canceled);
            }
            if spots[i].is_empty() {
                continue;
            }
            let id = spots[i].id;
            let mut covered: Option<SearchBox> = None;
            loop {
                let before = spots[i].bounds;
                let search = SearchBox::around(&before, scan_radius, mass_radius);
                let candidates = search.uncovered(roi, covered.as_ref());
                visits += candidates.len();
                for idx in candidates {
                    let owner = roi.spot_id(idx);
                    if owner == id {
                        continue;
                    }
                    let datum: Datum = *roi.datum(idx);
                    let new_owner = if owner == UNASSIGNED {
                        Some(id)
                    } else {
                        *convergence_cache.entry(idx).or_insert_with(|| {
                            Relaxer::new(&*roi, scan_radius, mass_radius)
                                .relax(ProbeSeed::new(datum.mz, datum.scan_index))
                                .and_then(|p| {
                                    apex_owner.get(&(p.mz.to_bits(), p.scan_index)).copied()
                                })
                        })
                    };
                    match new_owner {
                        Some(new_owner) if new_owner != owner => {
                            roi.set_spot_id(idx, new_owner);
                            spots[new_owner - 1].bounds.include(datum.mz, datum.scan_index);
                        }
                        _ => {}
                    }
                }
                covered = Some(search);
                if spots[i].bounds == before {
                    break;
                }
            }
            spots[i].state = SpotState::OwnershipResolved;
            monitor.update(Phase::Ownership, i, n);
        }
        log::debug!("Resolved ownership of {} spots, examining {visits} datums", n);
        Ok(visits)
    }

    fn should_merge(&self, s1: &Spot, s2: &Spot) -> bool {
        let close = s1.bounds.scan_gap(&s2.bounds) <= self.tolerances.critical_scans
            || s1.bounds.scans_overlap(&s2.bounds);
        close && intensity_ratio(s1.apex.intensity, s2.apex.intensity) > self.intensity_similarity
    }

    /// The range of spot indices whose apex m/z is within the m/z tolerance of
    /// `apex_mz[i]`, given `apex_mz` is sorted
    fn mass_neighborhood(&self, apex_mz: &[f64], i: usize) -> std::ops::Range<usize> {
        let center = apex_mz[i];
        let start = find_first_by(apex_mz, center - self.mz_tolerance, |x| *x);
        let end = start
            + apex_mz[start..]
                .iter()
                .take_while(|mz| **mz - center <= self.mz_tolerance)
                .count();
        start..end
    }

    /// Join spots with nearby apex m/z, neighboring or overlapping scan ranges and
    /// similar apex intensities. Returns the number of joins.
    ///
    /// Spots are visited in ascending apex m/z order. Whenever a spot absorbs another its
    /// bounding box grows, so it is put back at the front of the worklist to look for
    /// partners that have come within reach. Absorbed spots keep their slot but lose
    /// their members, and every datum they owned is relabeled to the surviving spot.
    pub fn merge_spots<M: ProgressMonitor + ?Sized>(
        &self,
        roi: &mut RoiIndex,
        spots: &mut [Spot],
        monitor: &M,
    ) -> Result<usize, GridMassError> {
        let n = spots.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|a, b| spots[*a].apex.mz.total_cmp(&spots[*b].apex.mz));
        let apex_mz: Vec<f64> = order.iter().map(|i| spots[*i].apex.mz).collect();

        let mut forest = ClusterForest::new(n);
        let mut worklist: VecDeque<usize> = (0..n).collect();
        let mut joins = 0;
        let mut visits = 0usize;
        while let Some(k) = worklist.pop_front() {
            if should_check(visits) && monitor.is_canceled() {
                return Err(GridMassError::Canceled);
            }
            visits += 1;

            let i = order[k];
            if !forest.is_root(i) || !spots[i].is_live() {
                continue;
            }
            let mut merged_any = false;
            for kj in self.mass_neighborhood(&apex_mz, k) {
                let j = order[kj];
                if i == j || !forest.is_root(j) || !spots[j].is_live() {
                    continue;
                }
                if self.should_merge(&spots[i], &spots[j]) {
                    if self.debug_level >= DebugLevel::All {
                        log::debug!(
                            "Joining s1 id {}={:.4} mz [{:.4} ~ {:.4}] time={:.3} int={} with s2 id {}={:.4} mz [{:.4} ~ {:.4}] time={:.3} int={}",
                            spots[i].id,
                            spots[i].apex.mz,
                            spots[i].bounds.min_mz,
                            spots[i].bounds.max_mz,
                            self.time_at(spots[i].apex.scan_index),
                            spots[i].apex.intensity,
                            spots[j].id,
                            spots[j].apex.mz,
                            spots[j].bounds.min_mz,
                            spots[j].bounds.max_mz,
                            self.time_at(spots[j].apex.scan_index),
                            spots[j].apex.intensity,
                        );
                    }
                    forest.union_into(i, j);
                    let (s1, s2) = pair_mut(spots, i, j);
                    s1.absorb(s2);
                    merged_any = true;
                    joins += 1;
                }
            }
            if merged_any {
                worklist.push_front(k);
            }
            monitor.update(Phase::Merging, n.saturating_sub(worklist.len()), n);
        }

        roi.relabel(|id| forest.find(id - 1) + 1);
        log::info!("Joins: {joins}");
        Ok(joins)
    }

    /// Remove spots that, together with their intensity-similar neighbors at the same
    /// m/z, cover more time than `max_time_span`. Such traces are background, not peaks.
    /// Returns the number of spots removed.
    pub fn prune_artifacts<M: ProgressMonitor + ?Sized>(
        &self,
        spots: &mut [Spot],
        monitor: &M,
    ) -> Result<usize, GridMassError> {
        let n = spots.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|a, b| spots[*a].apex.mz.total_cmp(&spots[*b].apex.mz));
        let apex_mz: Vec<f64> = order.iter().map(|i| spots[*i].apex.mz).collect();

        let mut removed = 0;
        for k in 0..n {
            if should_check(k) && monitor.is_canceled() {
                return Err(GridMassError::Canceled);
            }
            let i = order[k];
            if !spots[i].is_live() {
                continue;
            }
            let mut lo = spots[i].bounds.min_scan;
            let mut hi = spots[i].bounds.max_scan;
            let mut group = vec![i];
            for kj in self.mass_neighborhood(&apex_mz, k) {
                let j = order[kj];
                if i == j || !spots[j].is_live() {
                    continue;
                }
                let s2 = &spots[j];
                if intensity_ratio(spots[i].apex.intensity, s2.apex.intensity)
                    <= self.intensity_similarity
                {
                    continue;
                }
                let near = endpoint_gap(lo, hi, &s2.bounds) <= self.tolerances.max_tolerance_scans;
                let overlaps = !(s2.bounds.max_scan < lo || s2.bounds.min_scan > hi);
                if near || overlaps {
                    lo = lo.min(s2.bounds.min_scan);
                    hi = hi.max(s2.bounds.max_scan);
                    group.push(j);
                }
            }

            let covered = covered_scans(group.iter().map(|j| &spots[*j].bounds));
            let span = covered as f64 * self.tolerances.scan_spacing;
            if span > self.max_time_span {
                if self.debug_level >= DebugLevel::All {
                    log::debug!(
                        "Removing {} masses around {:.4} m/z ({}), time {:.3}, intensity {}, total scans={} ({:.3} min)",
                        group.len(),
                        spots[i].apex.mz,
                        spots[i].id,
                        self.time_at(spots[i].apex.scan_index),
                        spots[i].apex.intensity,
                        covered,
                        span
                    );
                }
                for j in group {
                    spots[j].tombstone();
                    removed += 1;
                }
            }
            monitor.update(Phase::ArtifactPruning, k, n);
        }
        for spot in spots.iter_mut().filter(|s| s.is_live()) {
            spot.state = SpotState::Candidate;
        }
        log::info!("Removed {removed} long and comparable masses");
        Ok(removed)
    }

    /// Find, for each scan of `spot`, the most intense datum it owns that reaches the
    /// height floor, and summarize how continuous those scans are
    pub fn evaluate(&self, roi: &RoiIndex, spot: &Spot) -> SpotEvaluation {
        let mut evaluation = SpotEvaluation::default();
        let mut run = 0;
        for scan_index in spot.bounds.min_scan..=spot.bounds.max_scan {
            if scan_index >= roi.num_scans() {
                break;
            }
            let mut best: Option<(usize, f32)> = None;
            for idx in roi.window(scan_index..=scan_index, spot.bounds.min_mz, spot.bounds.max_mz) {
                if roi.spot_id(idx) != spot.id {
                    continue;
                }
                let intensity = roi.datum(idx).intensity;
                if intensity >= self.minimum_height && best.map_or(true, |(_, b)| intensity > b) {
                    best = Some((idx, intensity));
                }
            }
            match best {
                Some((idx, _)) => {
                    evaluation.max_datums.push(idx);
                    evaluation.data_scans += 1;
                    run += 1;
                    evaluation.contiguous_scans = evaluation.contiguous_scans.max(run);
                }
                None => {
                    run = 0;
                }
            }
        }
        evaluation
    }

    /// Decide whether `spot` is a plausible chromatographic peak. Returns the evaluation
    /// alongside the rejection reason, if any.
    pub fn accept(&self, roi: &RoiIndex, spot: &Spot) -> (SpotEvaluation, Option<Rejection>) {
        let tolerance_scans = self.tolerances.tolerance_scans;
        if spot.bounds.scan_span() < tolerance_scans {
            return (SpotEvaluation::default(), Some(Rejection::TimeRange));
        }
        let evaluation = self.evaluate(roi, spot);
        let continuous = evaluation.contiguous_scans >= tolerance_scans
            || evaluation.contiguous_ratio() > 0.5;
        if evaluation.data_scans < tolerance_scans || !continuous {
            (evaluation, Some(Rejection::Continuity))
        } else {
            (evaluation, None)
        }
    }
}

/// The scan × m/z region a spot searches for datums to claim
#[derive(Debug, Clone, Copy, PartialEq)]
struct SearchBox {
    min_scan: usize,
    max_scan: usize,
    min_mz: f64,
    max_mz: f64,
}

impl SearchBox {
    fn around(bounds: &SpotBounds, scan_radius: usize, mass_radius: f64) -> Self {
        Self {
            min_scan: bounds.min_scan.saturating_sub(scan_radius),
            max_scan: bounds.max_scan + scan_radius,
            min_mz: bounds.min_mz - mass_radius,
            max_mz: bounds.max_mz + mass_radius,
        }
    }

    fn covers_scan(&self, scan_index: usize) -> bool {
        self.min_scan <= scan_index && scan_index <= self.max_scan
    }

    /// The arena offsets of the datums inside this box but outside `covered`, in
    /// scan-then-m/z order. `covered` must lie within this box.
    fn uncovered(&self, roi: &RoiIndex, covered: Option<&SearchBox>) -> Vec<usize> {
        let Some(covered) = covered else {
            return roi
                .window(self.min_scan..=self.max_scan, self.min_mz, self.max_mz)
                .collect();
        };
        let mass_grew = self.min_mz < covered.min_mz || self.max_mz > covered.max_mz;
        let last_scan = self.max_scan.min(roi.num_scans().saturating_sub(1));
        let mut found = Vec::new();
        for scan_index in self.min_scan..=last_scan {
            if !covered.covers_scan(scan_index) {
                found.extend(roi.window(scan_index..=scan_index, self.min_mz, self.max_mz));
            } else if mass_grew {
                found.extend(
                    roi.window(scan_index..=scan_index, self.min_mz, self.max_mz)
                        .filter(|idx| {
                            let mz = roi.datum(*idx).mz;
                            mz < covered.min_mz || mz > covered.max_mz
                        }),
                );
            }
        }
        found
    }
}

/// The number of distinct scans covered by the union of `bounds`
fn covered_scans<'b>(bounds: impl Iterator<Item = &'b SpotBounds>) -> usize {
    let mut ranges: Vec<(usize, usize)> = bounds.map(|b| (b.min_scan, b.max_scan)).collect();
    ranges.sort_unstable();
    let mut total = 0;
    let mut current: Option<(usize, usize)> = None;
    for (lo, hi) in ranges {
        current = match current {
            Some((clo, chi)) if lo <= chi + 1 => Some((clo, chi.max(hi))),
            Some((clo, chi)) => {
                total += chi - clo + 1;
                Some((lo, hi))
            }
            None => Some((lo, hi)),
        };
    }
    if let Some((clo, chi)) = current {
        total += chi - clo + 1;
    }
    total
}

fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(i, j);
    if i < j {
        let (a, b) = items.split_at_mut(j);
        (&mut a[i], &mut b[0])
    } else {
        let (a, b) = items.split_at_mut(i);
        (&mut b[0], &mut a[j])
    }
}
