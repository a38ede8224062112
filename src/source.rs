//! Frame producer interface
//!
//! The server consumes frames through [`FrameSource`]: a lazy, typically
//! infinite, non-restartable sequence of encoded JPEG buffers. Cameras,
//! file loops, and test fixtures all fit behind it. Pacing belongs on
//! this side of the boundary — wrap any source in [`Paced`] to hold a
//! target frame rate; the server itself has no notion of cadence.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// A producer of encoded JPEG frames
///
/// `Ok(None)` signals exhaustion: the sequence is over and will not
/// resume. An `Err` is treated the same way by the broadcast loop.
pub trait FrameSource {
    /// Yield the next frame, or `None` when the source is exhausted
    fn next_frame(&mut self) -> impl std::future::Future<Output = io::Result<Option<Bytes>>> + Send;
}

/// Rate-limiting adapter around any [`FrameSource`]
///
/// Each `next_frame` call first waits for the next tick of a fixed
/// interval, so the inner source is polled at most `fps` times per
/// second. A delivery that overruns its slot delays the following ticks
/// instead of bursting to catch up.
pub struct Paced<S> {
    source: S,
    ticker: Interval,
}

impl<S: FrameSource> Paced<S> {
    /// Pace `source` at `fps` frames per second
    pub fn new(source: S, fps: u32) -> Self {
        let period = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self { source, ticker }
    }
}

impl<S: FrameSource + Send> FrameSource for Paced<S> {
    async fn next_frame(&mut self) -> io::Result<Option<Bytes>> {
        self.ticker.tick().await;
        self.source.next_frame().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ListSource(std::collections::VecDeque<Bytes>);

    impl FrameSource for ListSource {
        async fn next_frame(&mut self) -> io::Result<Option<Bytes>> {
            Ok(self.0.pop_front())
        }
    }

    #[tokio::test]
    async fn test_source_exhaustion() {
        let mut source = ListSource(
            [Bytes::from_static(b"a"), Bytes::from_static(b"b")]
                .into_iter()
                .collect(),
        );

        assert_eq!(
            source.next_frame().await.unwrap(),
            Some(Bytes::from_static(b"a"))
        );
        assert_eq!(
            source.next_frame().await.unwrap(),
            Some(Bytes::from_static(b"b"))
        );
        assert_eq!(source.next_frame().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paced_source_holds_the_frame_rate() {
        let frames: std::collections::VecDeque<Bytes> =
            std::iter::repeat(Bytes::from_static(b"jpeg")).take(5).collect();
        let mut source = Paced::new(ListSource(frames), 10);

        let start = tokio::time::Instant::now();
        for _ in 0..5 {
            assert!(source.next_frame().await.unwrap().is_some());
        }

        // first tick fires immediately, the remaining four wait 100ms each
        assert_eq!(start.elapsed(), Duration::from_millis(400));
    }
}
