use super::frame::CapturedImage;
use std::sync::mpsc::{channel, Receiver, Sender};

/// Published once per successful capture.
#[derive(Debug, Clone)]
pub struct CaptureEvent {
    pub image: CapturedImage,
}

/// Fan-out of capture notifications to explicit subscribers.
#[derive(Debug, Default)]
pub struct CaptureBus {
    subscribers: Vec<Sender<CaptureEvent>>,
}

impl CaptureBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<CaptureEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    /// Returns how many live subscribers received the event. Dropped receivers are pruned.
    pub fn publish(&mut self, event: CaptureEvent) -> usize {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
        self.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn event() -> CaptureEvent {
        let image = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        CaptureEvent {
            image: CapturedImage::encode(&image, 80).unwrap(),
        }
    }

    #[test]
    fn test_every_subscriber_receives() {
        let mut bus = CaptureBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        assert_eq!(bus.publish(event()), 2);
        assert!(a.try_recv().is_ok());
        assert!(b.try_recv().is_ok());
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let mut bus = CaptureBus::new();
        let keep = bus.subscribe();
        drop(bus.subscribe());

        assert_eq!(bus.publish(event()), 1);
        assert_eq!(bus.subscriber_count(), 1);
        assert!(keep.try_recv().is_ok());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let mut bus = CaptureBus::new();
        assert_eq!(bus.publish(event()), 0);
    }
}
