//! Link-time providers the embassy crates expect from the application.
//!
//! * `critical-section`: embassy-sync's `CriticalSectionRawMutex` guards the
//!   completion and inbox channels, which are touched from the WiFi task
//!   (driver callbacks) and the main task.  Nested acquires on one thread
//!   only bump a depth counter.  On the host the `critical-section/std`
//!   implementation is used instead.
//! * `embassy-time` driver: `async_io_mini::Timer` bounds the hand-off
//!   wait.  Ticks are microseconds, from `esp_timer_get_time` on the
//!   device and a process-wide monotonic epoch on the host.

use std::time::Duration;

#[cfg(target_os = "espidf")]
use core::cell::{Cell, RefCell};
#[cfg(target_os = "espidf")]
use std::sync::{Mutex, MutexGuard, PoisonError};

// ── critical-section ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
static CRITICAL_SECTION_MUTEX: Mutex<()> = Mutex::new(());

#[cfg(target_os = "espidf")]
thread_local! {
    static DEPTH: Cell<u8> = const { Cell::new(0) };
    static GUARD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
}

#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
    DEPTH.with(|depth| {
        let d = depth.get();
        if d == 0 {
            // A panic inside a section must not wedge the radio callbacks.
            let lock = CRITICAL_SECTION_MUTEX
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            GUARD.with(|guard| *guard.borrow_mut() = Some(lock));
        }
        let next = d.saturating_add(1);
        depth.set(next);
        next
    })
}

#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_release(_token: u8) {
    DEPTH.with(|depth| {
        let d = depth.get();
        if d == 0 {
            return;
        }
        depth.set(d - 1);
        if d == 1 {
            GUARD.with(|guard| *guard.borrow_mut() = None);
        }
    })
}

// ── embassy-time driver ───────────────────────────────────────

#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _embassy_time_now() -> u64 {
    // esp_timer counts microseconds since boot and never goes negative.
    unsafe { esp_idf_svc::sys::esp_timer_get_time() as u64 }
}

#[cfg(not(target_os = "espidf"))]
static EPOCH: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();

#[cfg(not(target_os = "espidf"))]
#[unsafe(no_mangle)]
pub extern "C" fn _embassy_time_now() -> u64 {
    let elapsed = EPOCH.get_or_init(std::time::Instant::now).elapsed();
    u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
}

/// Wakes `waker` once the clock reaches `at`, from a short-lived thread.
#[unsafe(no_mangle)]
pub extern "C" fn _embassy_time_schedule_wake(at: u64, waker: *mut core::ffi::c_void) {
    if waker.is_null() {
        return;
    }

    // SAFETY: embassy-time passes a valid `&Waker` for the duration of the
    // call; it is cloned before returning.
    let waker = unsafe { (*(waker as *const core::task::Waker)).clone() };
    std::thread::spawn(move || {
        let now = _embassy_time_now();
        if at > now {
            std::thread::sleep(Duration::from_micros(at - now));
        }
        waker.wake();
    });
}
