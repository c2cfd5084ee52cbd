use super::{Filter, FilterInfo};

/// Ordered pipeline of filters, applied front to back.
///
/// The chain has its own enabled flag on top of each member's. While the
/// chain is disabled no member is invoked at all, so member state stays
/// frozen and resumes from where it stopped once the chain is re-enabled.
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
    enabled: bool,
}

impl FilterChain {
    pub fn new(filters: Vec<Box<dyn Filter>>) -> Self {
        Self {
            filters,
            enabled: true,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn add_filter(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
    }

    /// Removes the filter at `index`, or returns `None` if there is none.
    pub fn remove_filter(&mut self, index: usize) -> Option<Box<dyn Filter>> {
        if index < self.filters.len() {
            Some(self.filters.remove(index))
        } else {
            None
        }
    }

    pub fn filters(&self) -> &[Box<dyn Filter>] {
        &self.filters
    }

    pub fn filter_mut(&mut self, index: usize) -> Option<&mut (dyn Filter + 'static)> {
        self.filters.get_mut(index).map(|filter| &mut **filter)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::empty()
    }
}

impl Filter for FilterChain {
    fn apply(&mut self, angle: u16, value: f64) -> f64 {
        self.filters
            .iter_mut()
            .fold(value, |acc, filter| filter.process(angle, acc))
    }

    fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.reset();
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn info(&self) -> FilterInfo {
        FilterInfo {
            name: "Filter Chain",
            description: "Pipeline of multiple filters applied in sequence",
            enabled: self.enabled,
            children: self.filters.iter().map(|filter| filter.info()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{MedianFilter, MovingAverageFilter};

    fn median_then_average() -> FilterChain {
        FilterChain::new(vec![
            Box::new(MedianFilter::new(3)),
            Box::new(MovingAverageFilter::new(3)),
        ])
    }

    #[test]
    fn empty_chain_passes_values_through() {
        let mut chain = FilterChain::empty();
        assert_eq!(chain.process(10, 33.0), 33.0);
        assert!(chain.is_empty());
    }

    #[test]
    fn members_run_in_order() {
        let mut chain = median_then_average();
        let outputs: Vec<f64> = [10.0, 10.0, 100.0]
            .iter()
            .map(|&v| chain.process(0, v))
            .collect();
        // median: 10, 10, 10 -> average: 10, 10, 10
        assert_eq!(outputs, vec![10.0, 10.0, 10.0]);

        let mut reversed = FilterChain::new(vec![
            Box::new(MovingAverageFilter::new(3)),
            Box::new(MedianFilter::new(3)),
        ]);
        let last = [10.0, 10.0, 100.0]
            .iter()
            .map(|&v| reversed.process(0, v))
            .last()
            .unwrap();
        // average: 10, 10, 40 -> median of [10, 10, 40]
        assert_eq!(last, 10.0);
        assert_eq!(reversed.process(0, 100.0), 40.0);
    }

    #[test]
    fn disabled_chain_freezes_member_state() {
        let mut chain = median_then_average();
        let mut reference = median_then_average();
        chain.process(90, 100.0);
        reference.process(90, 100.0);

        chain.set_enabled(false);
        for value in [5.0, 900.0, 42.0] {
            assert_eq!(chain.process(90, value), value);
        }
        chain.set_enabled(true);

        assert_eq!(chain.process(90, 120.0), reference.process(90, 120.0));
    }

    #[test]
    fn member_flag_is_honoured_inside_chain() {
        let mut chain = median_then_average();
        chain.filter_mut(1).unwrap().set_enabled(false);
        chain.process(0, 10.0);
        assert_eq!(chain.process(0, 20.0), 15.0);
        assert_eq!(chain.process(0, 60.0), 20.0);
    }

    #[test]
    fn remove_filter_out_of_range_returns_none() {
        let mut chain = median_then_average();
        assert!(chain.remove_filter(5).is_none());
        assert_eq!(chain.len(), 2);

        let removed = chain.remove_filter(0).unwrap();
        assert_eq!(removed.info().name, "Median Filter");
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn chains_nest() {
        let mut outer = FilterChain::empty();
        outer.add_filter(Box::new(median_then_average()));
        outer.add_filter(Box::new(MovingAverageFilter::new(2)));

        let info = outer.info();
        assert_eq!(info.children.len(), 2);
        assert_eq!(info.children[0].children.len(), 2);
        assert_eq!(outer.process(3, 50.0), 50.0);
    }

    #[test]
    fn reset_clears_members_but_not_flag() {
        let mut chain = median_then_average();
        chain.process(7, 10.0);
        chain.process(7, 20.0);
        chain.set_enabled(false);
        chain.reset();
        assert!(!chain.is_enabled());

        chain.set_enabled(true);
        assert_eq!(chain.process(7, 80.0), 80.0);
    }
}
