//! Selectors collect intersections per candidate and rank the results.
//!
//! A candidate is bracketed by [`Selector::push_selectable`] and
//! [`Selector::pop_selectable`]; every [`Selector::add_intersection`] in
//! between competes for that candidate's best hit.

use reticle_config::PickConfig;
use tracing::trace;

use crate::intersection::{IntersectionBands, SelectionIntersection};

/// Receives hit test results for bracketed candidates
pub trait Selector<K> {
    fn push_selectable(&mut self, key: K);
    fn pop_selectable(&mut self);
    fn add_intersection(&mut self, intersection: SelectionIntersection);
}

/// Running best hit for the currently open bracket
#[derive(Debug, Clone)]
struct Bracket<K> {
    key: K,
    best: SelectionIntersection,
}

/// All valid candidates, ordered from closest to farthest
#[derive(Debug, Clone)]
pub struct SelectionPool<K> {
    entries: Vec<(SelectionIntersection, K)>,
    bands: IntersectionBands,
    current: Option<Bracket<K>>,
}

impl<K> Default for SelectionPool<K> {
    fn default() -> Self {
        Self::new(IntersectionBands::default())
    }
}

impl<K> SelectionPool<K> {
    pub fn new(bands: IntersectionBands) -> Self {
        Self {
            entries: Vec::new(),
            bands,
            current: None,
        }
    }

    /// Insert a ranked entry directly. Invalid intersections are ignored.
    pub fn add_selectable(&mut self, intersection: SelectionIntersection, key: K) {
        if !intersection.is_valid() {
            return;
        }
        self.entries.push((intersection, key));
        self.settle();
    }

    /// Reorder closest first so the result does not depend on insertion order.
    ///
    /// Entries are grouped greedily: each group takes every remaining entry
    /// within the distance band of the nearest one, then orders itself by
    /// depth band and tie-break. Exactly equal hits keep insertion order.
    fn settle(&mut self) {
        let bands = self.bands;
        let distance = |(hit, _): &(SelectionIntersection, K)| hit.distance();
        let depth = |(hit, _): &(SelectionIntersection, K)| hit.depth();
        sort_in_bands(&mut self.entries, distance, bands.distance, |group| {
            sort_in_bands(group, depth, bands.depth, |tied| {
                tied.sort_by(|(a, _), (b, _)| a.distance2().total_cmp(&b.distance2()));
            });
        });
    }

    /// Nothing was hit
    pub fn failed(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The closest entry
    pub fn best(&self) -> Option<&(SelectionIntersection, K)> {
        self.entries.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(SelectionIntersection, K)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(_, key)| key)
    }
}

/// Sort by `key`, then hand each run within `band` of its first entry to `within`
fn sort_in_bands<T>(
    entries: &mut [T],
    key: impl Fn(&T) -> f32 + Copy,
    band: f32,
    mut within: impl FnMut(&mut [T]),
) {
    entries.sort_by(|a, b| key(a).total_cmp(&key(b)));
    let mut start = 0;
    while start < entries.len() {
        let limit = key(&entries[start]) + band;
        let end = start + entries[start..].partition_point(|entry| key(entry) <= limit);
        within(&mut entries[start..end]);
        start = end;
    }
}

impl<K> IntoIterator for SelectionPool<K> {
    type Item = (SelectionIntersection, K);
    type IntoIter = std::vec::IntoIter<(SelectionIntersection, K)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K> Selector<K> for SelectionPool<K> {
    fn push_selectable(&mut self, key: K) {
        debug_assert!(self.current.is_none(), "push_selectable without matching pop");
        self.current = Some(Bracket {
            key,
            best: SelectionIntersection::INVALID,
        });
    }

    fn pop_selectable(&mut self) {
        if let Some(bracket) = self.current.take() {
            self.add_selectable(bracket.best, bracket.key);
        }
    }

    fn add_intersection(&mut self, intersection: SelectionIntersection) {
        let bands = self.bands;
        if let Some(bracket) = self.current.as_mut() {
            bracket.best.assign_if_closer(intersection, &bands);
        }
    }
}

/// Tracks only the single best intersection, regardless of candidate
#[derive(Debug, Clone, Default)]
pub struct BestPointSelector {
    best: SelectionIntersection,
    bands: IntersectionBands,
}

impl BestPointSelector {
    pub fn new(bands: IntersectionBands) -> Self {
        Self {
            best: SelectionIntersection::INVALID,
            bands,
        }
    }

    pub fn is_selected(&self) -> bool {
        self.best.is_valid()
    }

    pub fn best(&self) -> &SelectionIntersection {
        &self.best
    }
}

impl<K> Selector<K> for BestPointSelector {
    fn push_selectable(&mut self, _key: K) {}

    fn pop_selectable(&mut self) {}

    fn add_intersection(&mut self, intersection: SelectionIntersection) {
        self.best.assign_if_closer(intersection, &self.bands);
    }
}

/// Collects every candidate tied with the best one within an epsilon
#[derive(Debug, Clone)]
pub struct BestSelector<K> {
    current: Option<Bracket<K>>,
    best_intersection: SelectionIntersection,
    best: Vec<K>,
    bands: IntersectionBands,
    distance_epsilon: f32,
    depth_epsilon: f32,
}

impl<K> BestSelector<K> {
    pub fn new(config: &PickConfig) -> Self {
        Self::with_epsilon(
            IntersectionBands::from(config),
            config.matching_distance_epsilon,
            config.matching_depth_epsilon,
        )
    }

    pub fn with_epsilon(bands: IntersectionBands, distance_epsilon: f32, depth_epsilon: f32) -> Self {
        Self {
            current: None,
            best_intersection: SelectionIntersection::INVALID,
            best: Vec::new(),
            bands,
            distance_epsilon,
            depth_epsilon,
        }
    }

    /// Candidates tied for best, in test order
    pub fn best(&self) -> &[K] {
        &self.best
    }

    pub fn best_intersection(&self) -> &SelectionIntersection {
        &self.best_intersection
    }

    pub fn into_best(self) -> Vec<K> {
        self.best
    }
}

impl<K> Selector<K> for BestSelector<K> {
    fn push_selectable(&mut self, key: K) {
        debug_assert!(self.current.is_none(), "push_selectable without matching pop");
        self.current = Some(Bracket {
            key,
            best: SelectionIntersection::INVALID,
        });
    }

    fn pop_selectable(&mut self) {
        let Some(bracket) = self.current.take() else {
            return;
        };
        if !bracket.best.is_valid() {
            return;
        }
        if bracket.best.equal_epsilon(
            &self.best_intersection,
            self.distance_epsilon,
            self.depth_epsilon,
        ) {
            self.best.push(bracket.key);
            if bracket.best.is_closer(&self.best_intersection, &self.bands) {
                self.best_intersection = bracket.best;
            }
        } else if bracket.best.is_closer(&self.best_intersection, &self.bands) {
            trace!("BestSelector: new best {:?}", bracket.best);
            self.best.clear();
            self.best.push(bracket.key);
            self.best_intersection = bracket.best;
        }
    }

    fn add_intersection(&mut self, intersection: SelectionIntersection) {
        let bands = self.bands;
        if let Some(bracket) = self.current.as_mut() {
            bracket.best.assign_if_closer(intersection, &bands);
        }
    }
}

/// [`BestSelector`] with a depth epsilon wide enough to select through
/// everything stacked under the pointer
#[derive(Debug, Clone)]
pub struct DeepBestSelector<K>(BestSelector<K>);

impl<K> DeepBestSelector<K> {
    pub fn new(config: &PickConfig) -> Self {
        Self(BestSelector::with_epsilon(
            IntersectionBands::from(config),
            config.matching_distance_epsilon,
            config.deep_matching_depth_epsilon,
        ))
    }

    pub fn best(&self) -> &[K] {
        self.0.best()
    }

    pub fn into_best(self) -> Vec<K> {
        self.0.into_best()
    }
}

impl<K> Selector<K> for DeepBestSelector<K> {
    fn push_selectable(&mut self, key: K) {
        self.0.push_selectable(key);
    }

    fn pop_selectable(&mut self) {
        self.0.pop_selectable();
    }

    fn add_intersection(&mut self, intersection: SelectionIntersection) {
        self.0.add_intersection(intersection);
    }
}

/// Answers only "was anything hit". Feed it already-selected candidates to
/// ask whether the pointer is over the current selection.
#[derive(Debug, Clone, Default)]
pub struct BooleanSelector {
    selected: bool,
    open: bool,
    current: SelectionIntersection,
}

impl BooleanSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }
}

impl<K> Selector<K> for BooleanSelector {
    fn push_selectable(&mut self, _key: K) {
        self.open = true;
        self.current = SelectionIntersection::INVALID;
    }

    fn pop_selectable(&mut self) {
        if self.open && self.current.is_valid() {
            self.selected = true;
        }
        self.open = false;
        self.current = SelectionIntersection::INVALID;
    }

    fn add_intersection(&mut self, intersection: SelectionIntersection) {
        if self.open && intersection.is_valid() {
            self.current = intersection;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(depth: f32, distance: f32) -> SelectionIntersection {
        SelectionIntersection::new(depth, distance)
    }

    fn feed<S: Selector<u32> + ?Sized>(selector: &mut S, key: u32, hits: &[SelectionIntersection]) {
        selector.push_selectable(key);
        for &h in hits {
            selector.add_intersection(h);
        }
        selector.pop_selectable();
    }

    #[test]
    fn test_empty_pool_failed() {
        let mut pool = SelectionPool::<u32>::default();
        feed(&mut pool, 1, &[]);
        feed(&mut pool, 2, &[SelectionIntersection::INVALID]);
        assert!(pool.failed());
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn test_pool_keeps_best_per_candidate_and_orders() {
        let mut pool = SelectionPool::default();
        feed(&mut pool, 1, &[hit(0.2, 0.5), hit(0.1, 0.3)]);
        feed(&mut pool, 2, &[hit(0.9, 0.01)]);
        feed(&mut pool, 3, &[hit(0.0, 0.8)]);
        let keys: Vec<u32> = pool.keys().copied().collect();
        assert_eq!(keys, vec![2, 1, 3]);
        assert_eq!(pool.best().unwrap().0.distance(), 0.01);
    }

    #[test]
    fn test_pool_prefers_nearer_polygon_within_band() {
        let mut pool = SelectionPool::default();
        feed(&mut pool, 10, &[hit(0.5, 0.0001)]); // point
        feed(&mut pool, 20, &[hit(0.4, 0.0002)]); // polygon
        assert_eq!(pool.best().unwrap().1, 20);
    }

    #[test]
    fn test_pool_allows_duplicate_keys() {
        let mut pool = SelectionPool::default();
        pool.add_selectable(hit(0.1, 0.1), 'a');
        pool.add_selectable(hit(0.1, 0.1), 'b');
        pool.add_selectable(SelectionIntersection::INVALID, 'c');
        assert_eq!(pool.len(), 2);
        assert!(pool.iter().all(|(i, _)| i.is_valid()));
    }

    #[test]
    fn test_pool_order_ignores_insertion_order_for_chained_ties() {
        let bands = IntersectionBands {
            distance: 0.001,
            depth: 1e-6,
        };
        // a ties b and b ties c on distance, but a and c are a band apart
        let hits = [
            ('a', hit(0.3, 0.0)),
            ('b', hit(0.2, 0.0008)),
            ('c', hit(0.1, 0.0016)),
        ];
        for order in [[0, 1, 2], [2, 1, 0], [1, 2, 0], [2, 0, 1], [0, 2, 1], [1, 0, 2]] {
            let mut pool = SelectionPool::new(bands);
            for i in order {
                pool.add_selectable(hits[i].1, hits[i].0);
            }
            let keys: String = pool.keys().collect();
            assert_eq!(keys, "bac", "insertion order {order:?}");
        }
    }

    #[test]
    fn test_best_point_selector() {
        let mut selector = BestPointSelector::default();
        assert!(!selector.is_selected());
        feed(&mut selector, 0, &[hit(0.5, 0.5), hit(0.5, 0.1)]);
        assert!(selector.is_selected());
        assert_eq!(selector.best().distance(), 0.1);
    }

    #[test]
    fn test_best_selector_collects_ties() {
        let config = PickConfig::default();
        let mut selector = BestSelector::new(&config);
        feed(&mut selector, 1, &[hit(0.5, 0.3)]);
        feed(&mut selector, 2, &[hit(0.5, 0.1)]); // tied within 0.25
        feed(&mut selector, 3, &[hit(0.2, 0.9)]); // worse, not tied
        feed(&mut selector, 4, &[]);
        assert_eq!(selector.best(), &[1, 2]);

        feed(&mut selector, 5, &[hit(0.5, 0.0)]);
        assert_eq!(selector.best(), &[1, 2, 5]);

        let mut selector = BestSelector::new(&config);
        feed(&mut selector, 1, &[hit(0.5, 0.6)]);
        feed(&mut selector, 2, &[hit(0.5, 0.0)]); // strictly better, clears
        assert_eq!(selector.best(), &[2]);
    }

    #[test]
    fn test_deep_selector_ignores_depth() {
        let config = PickConfig::default();
        let mut shallow = BestSelector::<u32>::new(&config);
        let mut deep = DeepBestSelector::new(&config);
        for selector in [&mut shallow as &mut dyn Selector<u32>, &mut deep] {
            feed(selector, 1, &[hit(-0.9, 0.0)]);
            feed(selector, 2, &[hit(0.9, 0.0)]);
        }
        assert_eq!(shallow.best(), &[1]);
        assert_eq!(deep.best(), &[1, 2]);
    }

    #[test]
    fn test_boolean_selector() {
        let mut selector = BooleanSelector::new();
        feed(&mut selector, 1u32, &[SelectionIntersection::INVALID]);
        assert!(!selector.is_selected());
        feed(&mut selector, 2u32, &[hit(0.0, 0.0)]);
        assert!(selector.is_selected());
    }
}
