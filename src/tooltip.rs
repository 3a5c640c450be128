use crate::timer::{TimerId, TimerQueue};
use ratatui::layout::Rect;
use std::{
    collections::HashMap,
    hash::Hash,
    time::{Duration, Instant},
};

pub const TOOLTIP_DELAY: Duration = Duration::from_millis(500);
pub const TOOLTIP_OFFSET: (u16, u16) = (16, 16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: u16,
    pub y: u16,
}

impl Point {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    fn within(self, area: Rect) -> bool {
        self.x >= area.x
            && self.y >= area.y
            && self.x < area.x.saturating_add(area.width)
            && self.y < area.y.saturating_add(area.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverPhase {
    Idle,
    Pending(TimerId),
    /// The delay has elapsed. Nothing is drawn while the text is empty.
    Shown { anchor: Point },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation<'a> {
    pub anchor: Point,
    pub text: &'a str,
}

/// Shows a floating annotation once the pointer has rested over a region for
/// [`TOOLTIP_DELAY`], and hides it as soon as the pointer leaves.
#[derive(Debug, Clone)]
pub struct HoverNotifier {
    text: String,
    phase: HoverPhase,
    pointer: Point,
    delay: Duration,
    offset: (u16, u16),
    renders: u64,
}

impl HoverNotifier {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            phase: HoverPhase::Idle,
            pointer: Point::default(),
            delay: TOOLTIP_DELAY,
            offset: TOOLTIP_OFFSET,
            renders: 0,
        }
    }

    pub fn with_offset(mut self, dx: u16, dy: u16) -> Self {
        self.offset = (dx, dy);
        self
    }

    #[cfg(test)]
    pub fn phase(&self) -> HoverPhase {
        self.phase
    }

    /// Number of times the annotation has been drawn or redrawn.
    #[cfg(test)]
    pub fn render_count(&self) -> u64 {
        self.renders
    }

    #[cfg(test)]
    pub fn pending_timer(&self) -> Option<TimerId> {
        match self.phase {
            HoverPhase::Pending(id) => Some(id),
            _ => None,
        }
    }

    pub fn annotation(&self) -> Option<Annotation<'_>> {
        match self.phase {
            HoverPhase::Shown { anchor } if !self.text.is_empty() => Some(Annotation {
                anchor,
                text: &self.text,
            }),
            _ => None,
        }
    }

    pub fn pointer_enter(&mut self, pointer: Point, now: Instant, timers: &mut TimerQueue) {
        self.pointer = pointer;
        match self.phase {
            HoverPhase::Pending(id) => {
                timers.cancel(id);
            }
            HoverPhase::Shown { .. } => return,
            HoverPhase::Idle => {}
        }
        self.phase = HoverPhase::Pending(timers.schedule(now + self.delay));
    }

    pub fn pointer_moved(&mut self, pointer: Point) {
        self.pointer = pointer;
    }

    pub fn pointer_exit(&mut self, timers: &mut TimerQueue) {
        if let HoverPhase::Pending(id) = self.phase {
            timers.cancel(id);
        }
        self.phase = HoverPhase::Idle;
    }

    /// Handles an expired timer. Returns false when the timer belongs to
    /// another notifier or was superseded.
    pub fn timer_fired(&mut self, id: TimerId) -> bool {
        if self.phase != HoverPhase::Pending(id) {
            return false;
        }
        let anchor = Point::new(
            self.pointer.x.saturating_add(self.offset.0),
            self.pointer.y.saturating_add(self.offset.1),
        );
        self.phase = HoverPhase::Shown { anchor };
        if !self.text.is_empty() {
            self.renders += 1;
        }
        true
    }

    pub fn set_text(&mut self, text: &str) {
        if self.text == text {
            return;
        }
        self.text = text.to_string();
        if matches!(self.phase, HoverPhase::Shown { .. }) && !self.text.is_empty() {
            self.renders += 1;
        }
    }
}

/// Routes pointer motion over a screen's hit regions to per-region notifiers.
#[derive(Debug)]
pub struct HoverTracker<R> {
    notifiers: HashMap<R, HoverNotifier>,
    regions: Vec<(R, Rect)>,
    hovered: Option<R>,
    timers: TimerQueue,
}

impl<R: Copy + Eq + Hash> Default for HoverTracker<R> {
    fn default() -> Self {
        Self {
            notifiers: HashMap::new(),
            regions: Vec::new(),
            hovered: None,
            timers: TimerQueue::new(),
        }
    }
}

impl<R: Copy + Eq + Hash> HoverTracker<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, region: R, notifier: HoverNotifier) {
        self.notifiers.insert(region, notifier);
    }

    #[cfg(test)]
    pub fn notifier(&self, region: R) -> Option<&HoverNotifier> {
        self.notifiers.get(&region)
    }

    pub fn set_text(&mut self, region: R, text: &str) {
        if let Some(notifier) = self.notifiers.get_mut(&region) {
            notifier.set_text(text);
        }
    }

    #[cfg(test)]
    pub fn hovered(&self) -> Option<R> {
        self.hovered
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    /// Replaces the hit regions after a redraw. A hovered region that vanished
    /// counts as a pointer exit.
    pub fn set_regions(&mut self, regions: Vec<(R, Rect)>) {
        self.regions = regions;
        if let Some(current) = self.hovered {
            if !self.regions.iter().any(|(region, _)| *region == current) {
                self.leave_current();
            }
        }
    }

    pub fn pointer_moved(&mut self, pointer: Point, now: Instant) {
        let target = self
            .regions
            .iter()
            .rev()
            .find(|(region, area)| pointer.within(*area) && self.notifiers.contains_key(region))
            .map(|(region, _)| *region);

        if target == self.hovered {
            if let Some(notifier) = target.and_then(|region| self.notifiers.get_mut(&region)) {
                notifier.pointer_moved(pointer);
            }
            return;
        }

        self.leave_current();
        if let Some(region) = target {
            if let Some(notifier) = self.notifiers.get_mut(&region) {
                notifier.pointer_enter(pointer, now, &mut self.timers);
            }
            self.hovered = Some(region);
        }
    }

    pub fn pointer_left(&mut self) {
        self.leave_current();
    }

    pub fn tick(&mut self, now: Instant) {
        for id in self.timers.take_due(now) {
            for notifier in self.notifiers.values_mut() {
                if notifier.timer_fired(id) {
                    break;
                }
            }
        }
    }

    pub fn annotation(&self) -> Option<Annotation<'_>> {
        let region = self.hovered?;
        self.notifiers.get(&region)?.annotation()
    }

    fn leave_current(&mut self) {
        if let Some(region) = self.hovered.take() {
            if let Some(notifier) = self.notifiers.get_mut(&region) {
                notifier.pointer_exit(&mut self.timers);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fire_due(notifier: &mut HoverNotifier, timers: &mut TimerQueue, now: Instant) {
        for id in timers.take_due(now) {
            notifier.timer_fired(id);
        }
    }

    #[test]
    fn quick_pass_never_shows() {
        let start = Instant::now();
        let mut timers = TimerQueue::new();
        let mut notifier = HoverNotifier::new("Maximum population in your fort");

        notifier.pointer_enter(Point::new(3, 4), start, &mut timers);
        assert!(notifier.pending_timer().is_some());
        notifier.pointer_exit(&mut timers);
        fire_due(&mut notifier, &mut timers, start + Duration::from_secs(2));

        assert_eq!(notifier.phase(), HoverPhase::Idle);
        assert_eq!(notifier.render_count(), 0);
        assert_eq!(timers.pending_len(), 0);
    }

    #[test]
    fn resting_shows_then_hides_once() {
        let start = Instant::now();
        let mut timers = TimerQueue::new();
        let mut notifier = HoverNotifier::new("Play the game!");

        notifier.pointer_enter(Point::new(10, 2), start, &mut timers);
        fire_due(&mut notifier, &mut timers, start + Duration::from_millis(499));
        assert!(notifier.annotation().is_none());

        fire_due(&mut notifier, &mut timers, start + TOOLTIP_DELAY);
        let annotation = notifier.annotation().unwrap();
        assert_eq!(annotation.anchor, Point::new(26, 18));
        assert_eq!(annotation.text, "Play the game!");

        notifier.pointer_exit(&mut timers);
        assert!(notifier.annotation().is_none());
        assert_eq!(notifier.render_count(), 1);
    }

    #[test]
    fn repeated_enter_resets_the_delay_without_stacking_timers() {
        let start = Instant::now();
        let mut timers = TimerQueue::new();
        let mut notifier = HoverNotifier::new("tip");

        for step in 0..10u64 {
            notifier.pointer_enter(
                Point::new(1, 1),
                start + Duration::from_millis(step * 100),
                &mut timers,
            );
            assert_eq!(timers.pending_len(), 1);
        }
        fire_due(&mut notifier, &mut timers, start + Duration::from_millis(1000));
        assert!(notifier.annotation().is_none());
        notifier.pointer_exit(&mut timers);
        assert_eq!(timers.pending_len(), 0);
        assert_eq!(notifier.render_count(), 0);
    }

    #[test]
    fn text_changes_redraw_at_same_anchor_and_identical_text_is_ignored() {
        let start = Instant::now();
        let mut timers = TimerQueue::new();
        let mut notifier = HoverNotifier::new("first").with_offset(1, 1);
        notifier.pointer_enter(Point::new(5, 5), start, &mut timers);
        notifier.pointer_moved(Point::new(7, 5));
        fire_due(&mut notifier, &mut timers, start + TOOLTIP_DELAY);
        assert_eq!(notifier.render_count(), 1);

        notifier.pointer_moved(Point::new(30, 9));
        notifier.set_text("first");
        assert_eq!(notifier.render_count(), 1);
        notifier.set_text("second");
        assert_eq!(notifier.render_count(), 2);
        let annotation = notifier.annotation().unwrap();
        assert_eq!(annotation.anchor, Point::new(8, 6));
        assert_eq!(annotation.text, "second");
        assert_eq!(timers.pending_len(), 0);
    }

    #[test]
    fn empty_text_suppresses_until_text_arrives() {
        let start = Instant::now();
        let mut timers = TimerQueue::new();
        let mut notifier = HoverNotifier::new("");
        notifier.pointer_enter(Point::new(0, 0), start, &mut timers);
        fire_due(&mut notifier, &mut timers, start + TOOLTIP_DELAY);
        assert!(notifier.annotation().is_none());
        assert_eq!(notifier.render_count(), 0);

        notifier.set_text("Fixes temperature bugs");
        assert_eq!(notifier.annotation().unwrap().text, "Fixes temperature bugs");
    }

    #[test]
    fn set_text_is_safe_in_every_phase() {
        let start = Instant::now();
        let mut timers = TimerQueue::new();
        let mut notifier = HoverNotifier::new("a");
        notifier.set_text("b");
        notifier.pointer_enter(Point::new(0, 0), start, &mut timers);
        notifier.set_text("c");
        assert!(notifier.pending_timer().is_some());
        assert_eq!(notifier.render_count(), 0);
    }

    #[test]
    fn tracker_moves_between_regions() {
        let start = Instant::now();
        let mut tracker = HoverTracker::new();
        tracker.attach(1u8, HoverNotifier::new("one"));
        tracker.attach(2u8, HoverNotifier::new("two"));
        tracker.set_regions(vec![(1, Rect::new(0, 0, 10, 1)), (2, Rect::new(0, 1, 10, 1))]);

        tracker.pointer_moved(Point::new(2, 0), start);
        assert_eq!(tracker.hovered(), Some(1));
        tracker.tick(start + TOOLTIP_DELAY);
        assert_eq!(tracker.annotation().unwrap().text, "one");

        tracker.pointer_moved(Point::new(2, 1), start + TOOLTIP_DELAY);
        assert_eq!(tracker.hovered(), Some(2));
        assert!(tracker.annotation().is_none());
        assert_eq!(tracker.timers().pending_len(), 1);
        assert_eq!(tracker.notifier(1).unwrap().phase(), HoverPhase::Idle);

        tracker.pointer_moved(Point::new(40, 40), start + TOOLTIP_DELAY);
        assert_eq!(tracker.hovered(), None);
        assert_eq!(tracker.timers().pending_len(), 0);
    }

    #[test]
    fn vanished_region_counts_as_exit() {
        let start = Instant::now();
        let mut tracker = HoverTracker::new();
        tracker.attach("hacks", HoverNotifier::new("tip"));
        tracker.set_regions(vec![("hacks", Rect::new(0, 0, 5, 5))]);
        tracker.pointer_moved(Point::new(1, 1), start);
        tracker.set_regions(Vec::new());
        assert_eq!(tracker.hovered(), None);
        assert_eq!(tracker.timers().pending_len(), 0);
    }
}
