use std::{
    hint,
    time::{Duration, Instant},
};

/// Source of the fixed waits in the SMBus protocol.
pub trait Delay {
    fn delay_ms(&mut self, millis: u32);
}

impl<D: Delay + ?Sized> Delay for &mut D {
    fn delay_ms(&mut self, millis: u32) {
        (**self).delay_ms(millis)
    }
}

/// Busy-waits on the monotonic clock. Not cancellable.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpinDelay;

impl Delay for SpinDelay {
    fn delay_ms(&mut self, millis: u32) {
        let start = Instant::now();
        let wait = Duration::from_millis(u64::from(millis));
        while start.elapsed() <= wait {
            hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spin_delay_waits_at_least_the_requested_time() {
        let start = Instant::now();
        SpinDelay.delay_ms(5);
        assert!(start.elapsed() >= Duration::from_millis(5));
    }
}
