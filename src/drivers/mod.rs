//! GPIO drivers, task helpers and the timer driver.

pub mod button;
pub mod onboard_led;
pub mod task_pin;
pub mod time_driver;
