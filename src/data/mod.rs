pub mod align;
pub mod credentials;
pub mod fetch;
pub mod fred;

pub use align::{Alignment, SeriesAligner};
pub use credentials::{CredentialSource, EnvCredentials};
pub use fetch::{FetchFailure, FetchOutcome, SeriesSource, fetch_all};
pub use fred::FredClient;
