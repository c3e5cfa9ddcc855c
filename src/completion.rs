//! Completion propagation up the region tree
//!
//! Regions report that their own growth finished by posting their id to a
//! channel. [`CompletionPropagator::pump`] drains the channel and, for each
//! message, re-evaluates "own growth done AND every child done" for that
//! region. A region that becomes done posts its parent in turn, so a single
//! drain walks completions all the way up. When the root becomes done the
//! propagator sends one `()` to every subscriber.

use crossbeam_channel::{Receiver, Sender};

use crate::region::{GrowthStatus, RegionId, RegionTree};

/// Message-passing aggregator of region completion
#[derive(Debug)]
pub struct CompletionPropagator {
    post_tx: Sender<RegionId>,
    post_rx: Receiver<RegionId>,
    /// One channel per subscriber; the receiver half is kept for `reset`
    subscribers: Vec<(Sender<()>, Receiver<()>)>,
    fired: bool,
}

impl CompletionPropagator {
    pub fn new() -> Self {
        let (post_tx, post_rx) = crossbeam_channel::unbounded();
        Self {
            post_tx,
            post_rx,
            subscribers: Vec::new(),
            fired: false,
        }
    }

    /// Report that `region` finished its own growth (or that a child of it
    /// became done)
    pub fn post(&self, region: RegionId) {
        // both ends live in `self`, so the channel is never disconnected
        let _ = self.post_tx.send(region);
    }

    /// A receiver for the whole-tree completion signal
    ///
    /// Every subscriber gets its own channel and receives exactly one `()`
    /// per completed run.
    pub fn subscribe(&mut self) -> Receiver<()> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push((tx, rx.clone()));
        rx
    }

    /// Whether the root completed in the current run
    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Drain pending posts and propagate completion upward
    ///
    /// Returns `true` if the root became done during this call.
    pub fn pump(&mut self, regions: &mut RegionTree) -> bool {
        let mut root_done = false;
        while let Ok(id) = self.post_rx.try_recv() {
            let Some(region) = regions.get(id) else {
                continue;
            };
            if region.is_done() || region.status() != GrowthStatus::Completed {
                continue;
            }
            let children_done = region
                .child_ids()
                .all(|child| regions.get(child).is_some_and(|c| c.is_done()));
            if !children_done {
                continue;
            }

            let parent = region.parent;
            regions.set_done(id);
            log::debug!("region {} and all its descendants are complete", id);

            match parent {
                Some(parent) => self.post(parent),
                None if !self.fired => {
                    self.fired = true;
                    root_done = true;
                    for (tx, _) in &self.subscribers {
                        // our own receiver half keeps every channel connected
                        let _ = tx.send(());
                    }
                }
                None => {}
            }
        }
        root_done
    }

    /// Forget pending posts and unread signals, ready for a new run
    pub fn reset(&mut self) {
        while self.post_rx.try_recv().is_ok() {}
        for (_, rx) in &self.subscribers {
            while rx.try_recv().is_ok() {}
        }
        self.fired = false;
    }
}

impl Default for CompletionPropagator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegionConfig;

    fn tree() -> RegionTree {
        // R0 -> [R1 -> [R2], empty, R3]
        RegionTree::from_config(
            &RegionConfig::new("root", 1)
                .with_child(RegionConfig::new("a", 1).with_child(RegionConfig::new("a1", 1)))
                .with_empty_slot()
                .with_child(RegionConfig::new("b", 1)),
        )
    }

    fn complete(prop: &mut CompletionPropagator, regions: &mut RegionTree, id: usize) -> bool {
        regions.set_status(RegionId(id), GrowthStatus::Completed);
        prop.post(RegionId(id));
        prop.pump(regions)
    }

    #[test]
    fn test_root_waits_for_every_descendant() {
        let mut regions = tree();
        let mut prop = CompletionPropagator::new();
        let signal = prop.subscribe();

        assert!(!complete(&mut prop, &mut regions, 0));
        assert!(!complete(&mut prop, &mut regions, 1));
        assert!(!regions[RegionId(1)].is_done());
        assert!(!complete(&mut prop, &mut regions, 3));
        assert!(signal.try_recv().is_err());

        // the deepest leaf finishing last releases the whole chain
        assert!(complete(&mut prop, &mut regions, 2));
        assert!(regions.iter().all(|r| r.is_done()));
        assert_eq!(signal.try_recv(), Ok(()));
        assert!(signal.try_recv().is_err());
    }

    #[test]
    fn test_signal_fires_once() {
        let mut regions = RegionTree::from_config(&RegionConfig::new("solo", 1));
        let mut prop = CompletionPropagator::new();
        let signal = prop.subscribe();

        assert!(complete(&mut prop, &mut regions, 0));
        prop.post(RegionId(0));
        assert!(!prop.pump(&mut regions));
        assert_eq!(signal.len(), 1);
        assert!(prop.has_fired());
    }

    #[test]
    fn test_every_subscriber_sees_the_signal() {
        let mut regions = RegionTree::from_config(&RegionConfig::new("solo", 1));
        let mut prop = CompletionPropagator::new();
        let first = prop.subscribe();
        let second = prop.subscribe();

        assert!(complete(&mut prop, &mut regions, 0));
        assert_eq!(first.try_recv(), Ok(()));
        assert_eq!(second.try_recv(), Ok(()));
        assert!(first.try_recv().is_err());
        assert!(second.try_recv().is_err());
    }

    #[test]
    fn test_unfinished_region_is_ignored() {
        let mut regions = RegionTree::from_config(&RegionConfig::new("solo", 1));
        let mut prop = CompletionPropagator::new();
        prop.post(RegionId(0));
        assert!(!prop.pump(&mut regions));
        assert!(!regions[RegionId(0)].is_done());
    }

    #[test]
    fn test_reset_discards_stale_signal() {
        let mut regions = RegionTree::from_config(&RegionConfig::new("solo", 1));
        let mut prop = CompletionPropagator::new();
        let signal = prop.subscribe();
        complete(&mut prop, &mut regions, 0);

        prop.reset();
        assert!(!prop.has_fired());
        assert!(signal.try_recv().is_err());
    }
}
