pub mod clock;
pub mod credentials;
