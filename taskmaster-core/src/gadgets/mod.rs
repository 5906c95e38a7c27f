//! Field gadgets the personas can call as tools.

pub mod cipher;
pub mod weather;

pub use cipher::{decrypt, encrypt, DECRYPTION_PREFIX};
pub use weather::{OpenWeather, WeatherService};
