use tracing::warn;

use crate::domain::Error;

/// Proof that the shared admin passphrase was given. Only [`AdminGate`] can
/// mint one, and every ledger mutation asks for it.
#[derive(Debug)]
pub struct AdminToken {
    _private: (),
}

#[derive(Debug, Clone)]
pub struct AdminGate {
    secret: Option<String>,
}

impl AdminGate {
    /// A gate with no configured secret refuses everyone.
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn authorize(&self, passphrase: &str) -> Result<AdminToken, Error> {
        match &self.secret {
            None => Err(Error::Unauthorized(
                "no admin passphrase is configured".to_string(),
            )),
            Some(secret) if secret == passphrase => Ok(AdminToken { _private: () }),
            Some(_) => {
                warn!("rejected admin passphrase");
                Err(Error::Unauthorized("incorrect admin passphrase".to_string()))
            }
        }
    }
}
