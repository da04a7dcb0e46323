mod admin_api;
mod rates_api;

pub use admin_api::AdminApi;
pub use rates_api::RatesApi;
