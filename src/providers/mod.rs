pub mod mfapi;
pub mod util;

pub use mfapi::MfApiProvider;
