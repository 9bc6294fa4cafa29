//! Watchdogs
//!
//! - [`Iwdg`]: independent watchdog on the LSI clock, picks a prescaler
//!   and reload for a timeout in milliseconds
//! - [`Wwdg`]: window watchdog on PCLK1 with an optional early wakeup
//!   callback serviced by [`wwdg::handle_interrupt`]

pub mod iwdg;
pub mod wwdg;

pub use iwdg::{Iwdg, IwdgTiming, IWDG_MAX_RELOAD};
pub use wwdg::{Wwdg, WwdgState, WWDG_COUNTER_MAX, WWDG_COUNTER_MIN};

pub use simplehal::watchdog::{IwdgPrescaler, WwdgPrescaler};
