pub mod constants;
pub mod error;

pub use constants::{
    Protocol, RegisterPolicy, SslPolicy, DB_UPDATE_VERSION, MIN_UPDATE_VERSION, NULL_DATE,
};
pub use error::{CoreError, Result};
