pub mod ber;
pub mod commands;
pub mod config;
pub mod ldap;
pub mod ldif;

pub use config::Config;

#[derive(thiserror::Error, Debug)]
pub enum LdifBerError {
    #[error("BER error: {0}")]
    Ber(#[from] ber::BerError),

    #[error("LDIF error: {0}")]
    Ldif(#[from] ldif::LdifError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LDAP protocol error: {0}")]
    Protocol(String),
}

impl LdifBerError {
    /// Whether a reader that produced this error can move on to the next
    /// record.
    pub fn may_continue_reading(&self) -> bool {
        match self {
            LdifBerError::Ldif(e) => e.may_continue_reading(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, LdifBerError>;
