pub struct StatsHelper;

impl StatsHelper {
    pub fn mean<'a, I>(samples: I) -> f64
    where
        I: IntoIterator<Item = &'a f64>,
    {
        let (sum, count) = samples
            .into_iter()
            .fold((0.0, 0usize), |(sum, count), &v| (sum + v, count + 1));
        if count == 0 {
            return 0.0;
        }
        sum / count as f64
    }

    /// Median of the given values; an even count averages the two middle values.
    pub fn median<'a, I>(samples: I) -> f64
    where
        I: IntoIterator<Item = &'a f64>,
    {
        let mut sorted: Vec<f64> = samples.into_iter().copied().collect();
        if sorted.is_empty() {
            return 0.0;
        }
        sorted.sort_by(f64::total_cmp);

        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        }
    }
}
