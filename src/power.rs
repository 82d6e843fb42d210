//! Sleep scheduling.
//!
//! Every wake cycle ends here: the requested wakeup source is armed (and
//! only that one) and the chip enters deep sleep.  Execution resumes at
//! reset with RAM cleared; only RTC retained memory survives.
//!
//! ```text
//!   Transition.sleep ──▶ NodeConfig::sleep_request ──▶ SleepScheduler
//!                                                        │ disable all
//!                                                        │ arm one
//!                                                        ▼
//!                                               SleepPlatform::suspend  (→ !)
//! ```

use log::{error, info};

use crate::error::SleepError;
use crate::pins;
use crate::sensors::Level;

// ---------------------------------------------------------------------------
// Wake cause
// ---------------------------------------------------------------------------

/// Why the chip is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeCause {
    /// Cold boot or reset; not a wake from deep sleep.
    PowerOn,
    Timer,
    /// RTC GPIO (ext0) wake.
    Pin,
    /// Any other source, raw platform code.
    Other(u32),
}

// ---------------------------------------------------------------------------
// Sleep modes and requests
// ---------------------------------------------------------------------------

/// Named sleep configurations chosen by the phase machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepMode {
    /// Long poll of the beam while the box is empty.
    Idle,
    /// Wait for the PIR module to settle after power-up.
    PirStartUp,
    /// Short grace period before arming motion wake.
    PirCalibration,
    /// Sleep until the PIR reports motion.
    AwaitMotion,
    /// Interval between beam re-checks after motion.
    BeamPulse,
}

impl SleepMode {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::PirStartUp => "PirStartUp",
            Self::PirCalibration => "PirCalibration",
            Self::AwaitMotion => "AwaitMotion",
            Self::BeamPulse => "BeamPulse",
        }
    }
}

/// Concrete wakeup source for one sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepRequest {
    Timer { micros: u64 },
    EdgeOnPin { gpio: i32, level: Level },
}

// ---------------------------------------------------------------------------
// Platform port
// ---------------------------------------------------------------------------

/// Wakeup-source control and the final suspend.
pub trait SleepPlatform {
    fn wake_cause(&self) -> WakeCause;
    fn disable_all_wakeup_sources(&mut self) -> Result<(), SleepError>;
    fn enable_timer_wakeup(&mut self, micros: u64) -> Result<(), SleepError>;
    fn enable_pin_wakeup(&mut self, gpio: i32, level: Level) -> Result<(), SleepError>;
    /// Enter deep sleep.  Does not return.
    fn suspend(&mut self) -> !;
}

/// Proof that exactly one wakeup source is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedWakeup {
    pub request: SleepRequest,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub struct SleepScheduler<P: SleepPlatform> {
    platform: P,
}

impl<P: SleepPlatform> SleepScheduler<P> {
    pub fn new(platform: P) -> Self {
        Self { platform }
    }

    pub fn wake_cause(&self) -> WakeCause {
        self.platform.wake_cause()
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Clear every wakeup source and arm the one `request` names.
    pub fn arm(&mut self, request: &SleepRequest) -> Result<ArmedWakeup, SleepError> {
        match *request {
            SleepRequest::Timer { micros: 0 } => return Err(SleepError::InvalidDuration(0)),
            SleepRequest::EdgeOnPin { gpio, .. } if !pins::is_rtc_capable(gpio) => {
                return Err(SleepError::InvalidWakePin(gpio));
            }
            _ => {}
        }

        self.platform.disable_all_wakeup_sources()?;
        match *request {
            SleepRequest::Timer { micros } => self.platform.enable_timer_wakeup(micros)?,
            SleepRequest::EdgeOnPin { gpio, level } => {
                self.platform.enable_pin_wakeup(gpio, level)?;
            }
        }
        Ok(ArmedWakeup { request: *request })
    }

    /// Arm `request` and enter deep sleep.
    ///
    /// A device that cannot arm its wakeup would never run again, so an
    /// arming failure panics (and the panic handler resets the chip).
    pub fn request_sleep(&mut self, request: SleepRequest) -> ! {
        match self.arm(&request) {
            Ok(armed) => {
                match armed.request {
                    SleepRequest::Timer { micros } => {
                        info!("SLEEP: timer wakeup in {} ms", micros / 1_000);
                    }
                    SleepRequest::EdgeOnPin { gpio, level } => {
                        info!("SLEEP: wake on GPIO {} {:?}", gpio, level);
                    }
                }
                self.platform.suspend()
            }
            Err(e) => {
                error!("SLEEP: cannot arm wakeup: {e}");
                panic!("sleep arming failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    #[derive(Debug, PartialEq)]
    enum Call {
        DisableAll,
        Timer(u64),
        Pin(i32, Level),
        Suspend,
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
        reject_timer: bool,
    }

    impl SleepPlatform for Recorder {
        fn wake_cause(&self) -> WakeCause {
            WakeCause::PowerOn
        }
        fn disable_all_wakeup_sources(&mut self) -> Result<(), SleepError> {
            self.calls.push(Call::DisableAll);
            Ok(())
        }
        fn enable_timer_wakeup(&mut self, micros: u64) -> Result<(), SleepError> {
            if self.reject_timer {
                return Err(SleepError::Platform(0x102));
            }
            self.calls.push(Call::Timer(micros));
            Ok(())
        }
        fn enable_pin_wakeup(&mut self, gpio: i32, level: Level) -> Result<(), SleepError> {
            self.calls.push(Call::Pin(gpio, level));
            Ok(())
        }
        fn suspend(&mut self) -> ! {
            self.calls.push(Call::Suspend);
            panic!("suspended");
        }
    }

    #[test]
    fn timer_request_arms_only_timer() {
        let mut s = SleepScheduler::new(Recorder::default());
        let armed = s.arm(&SleepRequest::Timer { micros: 5_000_000 }).unwrap();
        assert_eq!(armed.request, SleepRequest::Timer { micros: 5_000_000 });
        assert_eq!(s.platform().calls, vec![Call::DisableAll, Call::Timer(5_000_000)]);
    }

    #[test]
    fn edge_request_arms_only_pin() {
        let mut s = SleepScheduler::new(Recorder::default());
        let req = SleepRequest::EdgeOnPin { gpio: 33, level: Level::High };
        s.arm(&req).unwrap();
        assert_eq!(s.platform().calls, vec![Call::DisableAll, Call::Pin(33, Level::High)]);
    }

    #[test]
    fn zero_duration_rejected() {
        let mut s = SleepScheduler::new(Recorder::default());
        assert_eq!(
            s.arm(&SleepRequest::Timer { micros: 0 }),
            Err(SleepError::InvalidDuration(0))
        );
        assert!(s.platform().calls.is_empty());
    }

    #[test]
    fn non_rtc_pin_rejected() {
        let mut s = SleepScheduler::new(Recorder::default());
        let req = SleepRequest::EdgeOnPin { gpio: 5, level: Level::High };
        assert_eq!(s.arm(&req), Err(SleepError::InvalidWakePin(5)));
    }

    #[test]
    fn request_sleep_suspends_after_arming() {
        let mut s = SleepScheduler::new(Recorder::default());
        let r = catch_unwind(AssertUnwindSafe(|| {
            s.request_sleep(SleepRequest::Timer { micros: 1 });
        }));
        assert!(r.is_err());
        assert_eq!(
            s.platform().calls,
            vec![Call::DisableAll, Call::Timer(1), Call::Suspend]
        );
    }

    #[test]
    fn arming_failure_never_suspends() {
        let mut s = SleepScheduler::new(Recorder {
            reject_timer: true,
            ..Default::default()
        });
        let r = catch_unwind(AssertUnwindSafe(|| {
            s.request_sleep(SleepRequest::Timer { micros: 10 });
        }));
        assert!(r.is_err());
        assert!(!s.platform().calls.contains(&Call::Suspend));
    }
}
