//! Explicit event dispatch between the viewer and whoever renders it.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use leafview_core::{Notification, Rotation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerEvent {
    CurrentPageChanged(u32),
    ZoomChanged(u32),
    ZoomLimitReached { limit: u32 },
    RotationChanged(Rotation),
    FitModeChanged(bool),
    Notify(Notification),
}

pub trait EventSink {
    fn emit(&mut self, event: ViewerEvent);
}

/// Shared FIFO of events; clones feed the same queue.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Rc<RefCell<VecDeque<ViewerEvent>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<ViewerEvent> {
        self.events.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl EventSink for EventQueue {
    fn emit(&mut self, event: ViewerEvent) {
        self.events.borrow_mut().push_back(event);
    }
}

/// Fans every event out to registered callbacks, in subscription order.
#[derive(Default)]
pub struct Observers {
    callbacks: Vec<Box<dyn FnMut(&ViewerEvent)>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(mut self, callback: impl FnMut(&ViewerEvent) + 'static) -> Self {
        self.callbacks.push(Box::new(callback));
        self
    }
}

impl EventSink for Observers {
    fn emit(&mut self, event: ViewerEvent) {
        for callback in &mut self.callbacks {
            callback(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_clones_share_storage() {
        let queue = EventQueue::new();
        let mut producer = queue.clone();
        producer.emit(ViewerEvent::ZoomChanged(110));
        producer.emit(ViewerEvent::FitModeChanged(false));

        assert_eq!(queue.len(), 2);
        assert_eq!(
            queue.drain(),
            vec![ViewerEvent::ZoomChanged(110), ViewerEvent::FitModeChanged(false)]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn observers_see_every_event() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink_seen = Rc::clone(&seen);
        let mut observers = Observers::new().subscribe(move |event| {
            if let ViewerEvent::CurrentPageChanged(page) = event {
                sink_seen.borrow_mut().push(*page);
            }
        });

        observers.emit(ViewerEvent::CurrentPageChanged(3));
        observers.emit(ViewerEvent::ZoomChanged(90));
        observers.emit(ViewerEvent::CurrentPageChanged(4));
        assert_eq!(*seen.borrow(), vec![3, 4]);
    }
}
