pub mod dialing_codes;
pub mod error;
pub mod events;
pub mod i18n;
pub mod keyed_mutex;
pub mod rate_limit;
pub mod sequence;
