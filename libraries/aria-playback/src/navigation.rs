//! Next/previous index selection
//!
//! Sequential mode walks the playlist in insertion order. Shuffle mode walks
//! a Fisher-Yates permutation of the playlist indices. Wrapping at the ends is
//! decided by the caller (it follows the repeat mode).

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Shuffle permutation plus its inverse
#[derive(Debug, Clone)]
struct ShuffleOrder {
    /// Playback order: `order[k]` is the playlist index played k-th
    order: Vec<usize>,
    /// `slot[i]` is the position of playlist index `i` within `order`
    slot: Vec<usize>,
}

impl ShuffleOrder {
    fn from_order(order: Vec<usize>) -> Self {
        let mut slot = vec![0; order.len()];
        for (position, &index) in order.iter().enumerate() {
            slot[index] = position;
        }
        Self { order, slot }
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Navigation policy
#[derive(Debug)]
pub struct Navigator {
    shuffle: Option<ShuffleOrder>,
    rng: StdRng,
}

impl Navigator {
    /// Create a sequential navigator
    ///
    /// A `seed` makes shuffle orders reproducible.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { shuffle: None, rng }
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffle.is_some()
    }

    /// Current shuffle permutation, if shuffle is on
    pub fn shuffle_order(&self) -> Option<&[usize]> {
        self.shuffle.as_ref().map(|s| s.order.as_slice())
    }

    /// Turn shuffle on with a fresh permutation anchored at `current`
    pub fn enable_shuffle(&mut self, len: usize, current: Option<usize>) {
        self.shuffle = Some(self.generate(len, current));
    }

    /// Turn shuffle off; the caller's current index is left alone
    pub fn disable_shuffle(&mut self) {
        self.shuffle = None;
    }

    /// Playlist composition changed: regenerate the permutation if shuffling
    pub fn playlist_changed(&mut self, len: usize, current: Option<usize>) {
        if self.shuffle.is_some() {
            self.shuffle = Some(self.generate(len, current));
        }
    }

    /// Index after `current`, or `None` if the end is reached without `wrap`
    ///
    /// Wrapping forward in shuffle mode starts a new shuffled pass.
    pub fn next_index(&mut self, current: usize, len: usize, wrap: bool) -> Option<usize> {
        if len == 0 || current >= len {
            return None;
        }

        let Some(shuffle) = self.shuffle.as_ref().filter(|s| s.len() == len) else {
            return sequential_next(current, len, wrap);
        };

        let position = shuffle.slot[current];
        if position + 1 < len {
            return Some(shuffle.order[position + 1]);
        }
        if !wrap {
            return None;
        }

        // New pass; avoid replaying the track that just finished
        let mut order = self.generate(len, None).order;
        if len > 1 && order[0] == current {
            order.swap(0, 1);
        }
        let first = order[0];
        self.shuffle = Some(ShuffleOrder::from_order(order));
        Some(first)
    }

    /// Index before `current`, or `None` if the start is reached without `wrap`
    pub fn previous_index(&self, current: usize, len: usize, wrap: bool) -> Option<usize> {
        if len == 0 || current >= len {
            return None;
        }

        let Some(shuffle) = self.shuffle.as_ref().filter(|s| s.len() == len) else {
            return sequential_previous(current, len, wrap);
        };

        let position = shuffle.slot[current];
        if position > 0 {
            Some(shuffle.order[position - 1])
        } else if wrap {
            Some(shuffle.order[len - 1])
        } else {
            None
        }
    }

    pub fn has_next(&self, current: usize, len: usize, wrap: bool) -> bool {
        if len == 0 || current >= len {
            return false;
        }
        if wrap {
            return true;
        }
        match self.shuffle.as_ref().filter(|s| s.len() == len) {
            Some(shuffle) => shuffle.slot[current] + 1 < len,
            None => current + 1 < len,
        }
    }

    pub fn has_previous(&self, current: usize, len: usize, wrap: bool) -> bool {
        self.previous_index(current, len, wrap).is_some()
    }

    /// Fisher-Yates permutation of `0..len` with `anchor` moved to the front
    fn generate(&mut self, len: usize, anchor: Option<usize>) -> ShuffleOrder {
        let mut order: Vec<usize> = (0..len).collect();
        order.shuffle(&mut self.rng);

        if let Some(anchor) = anchor.filter(|&a| a < len) {
            if let Some(position) = order.iter().position(|&i| i == anchor) {
                order.swap(0, position);
            }
        }

        ShuffleOrder::from_order(order)
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(None)
    }
}

fn sequential_next(current: usize, len: usize, wrap: bool) -> Option<usize> {
    if current + 1 < len {
        Some(current + 1)
    } else if wrap {
        Some((current + 1) % len)
    } else {
        None
    }
}

fn sequential_previous(current: usize, len: usize, wrap: bool) -> Option<usize> {
    if current > 0 {
        Some(current - 1)
    } else if wrap {
        Some((current + len - 1) % len)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn is_permutation(order: &[usize], len: usize) -> bool {
        let seen: HashSet<usize> = order.iter().copied().collect();
        order.len() == len && seen.len() == len && order.iter().all(|&i| i < len)
    }

    #[test]
    fn sequential_navigation_wraps_only_when_asked() {
        let mut nav = Navigator::new(Some(1));

        assert_eq!(nav.next_index(0, 3, false), Some(1));
        assert_eq!(nav.next_index(2, 3, false), None);
        assert_eq!(nav.next_index(2, 3, true), Some(0));

        assert_eq!(nav.previous_index(1, 3, false), Some(0));
        assert_eq!(nav.previous_index(0, 3, false), None);
        assert_eq!(nav.previous_index(0, 3, true), Some(2));
    }

    #[test]
    fn empty_playlist_has_nowhere_to_go() {
        let mut nav = Navigator::new(Some(1));
        assert_eq!(nav.next_index(0, 0, true), None);
        assert_eq!(nav.previous_index(0, 0, true), None);
        assert!(!nav.has_next(0, 0, true));
    }

    #[test]
    fn shuffle_order_is_anchored_permutation() {
        let mut nav = Navigator::new(Some(7));
        nav.enable_shuffle(10, Some(4));

        let order = nav.shuffle_order().unwrap();
        assert!(is_permutation(order, 10));
        assert_eq!(order[0], 4);
    }

    #[test]
    fn shuffle_walk_visits_every_track_once() {
        let mut nav = Navigator::new(Some(3));
        nav.enable_shuffle(8, Some(0));

        let mut visited = vec![0];
        let mut current = 0;
        while let Some(next) = nav.next_index(current, 8, false) {
            visited.push(next);
            current = next;
        }

        assert!(is_permutation(&visited, 8));
        assert!(!nav.has_next(current, 8, false));
    }

    #[test]
    fn shuffle_previous_walks_backwards() {
        let mut nav = Navigator::new(Some(11));
        nav.enable_shuffle(5, Some(2));
        let order = nav.shuffle_order().unwrap().to_vec();

        assert_eq!(nav.previous_index(order[3], 5, false), Some(order[2]));
        assert_eq!(nav.previous_index(order[0], 5, false), None);
        assert_eq!(nav.previous_index(order[0], 5, true), Some(order[4]));
    }

    #[test]
    fn shuffle_wrap_starts_new_pass_without_repeating() {
        let mut nav = Navigator::new(Some(5));
        nav.enable_shuffle(4, Some(1));
        let last = nav.shuffle_order().unwrap()[3];

        let first = nav.next_index(last, 4, true).unwrap();
        assert_ne!(first, last);
        assert!(is_permutation(nav.shuffle_order().unwrap(), 4));
        assert_eq!(nav.shuffle_order().unwrap()[0], first);
    }

    #[test]
    fn disabling_shuffle_reverts_to_insertion_order() {
        let mut nav = Navigator::new(Some(9));
        nav.enable_shuffle(5, Some(2));
        nav.disable_shuffle();

        assert!(nav.shuffle_order().is_none());
        assert_eq!(nav.next_index(2, 5, false), Some(3));
        assert_eq!(nav.next_index(3, 5, false), Some(4));
    }

    #[test]
    fn playlist_change_regenerates_only_when_shuffled() {
        let mut nav = Navigator::new(Some(2));
        nav.playlist_changed(6, Some(0));
        assert!(nav.shuffle_order().is_none());

        nav.enable_shuffle(3, Some(0));
        nav.playlist_changed(6, Some(5));
        let order = nav.shuffle_order().unwrap();
        assert!(is_permutation(order, 6));
        assert_eq!(order[0], 5);
    }

    #[test]
    fn single_track_wraps_onto_itself() {
        let mut nav = Navigator::new(Some(1));
        assert_eq!(nav.next_index(0, 1, true), Some(0));
        assert_eq!(nav.next_index(0, 1, false), None);

        nav.enable_shuffle(1, Some(0));
        assert_eq!(nav.next_index(0, 1, true), Some(0));
    }
}
