mod timezone;

pub use timezone::{RequestTimezone, TIMEZONE_HEADER};
