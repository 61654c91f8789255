use std::collections::VecDeque;

/// Fixed-capacity window that drops its oldest sample once full.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    values: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: T) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }
}

impl RollingWindow<f64> {
    /// Mean of the retained samples, 0.0 when empty.
    pub fn average(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_oldest_when_full() {
        let mut window = RollingWindow::new(3);
        for v in 1..=5 {
            window.push(v);
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.iter().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
    }

    #[test]
    fn average_of_empty_window_is_zero() {
        let window: RollingWindow<f64> = RollingWindow::new(10);
        assert_eq!(window.average(), 0.0);
    }

    #[test]
    fn average_uses_only_retained_samples() {
        let mut window = RollingWindow::new(2);
        window.push(10.0);
        window.push(20.0);
        window.push(40.0);
        assert_eq!(window.average(), 30.0);
    }
}
