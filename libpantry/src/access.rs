use crate::error::PantryError;
use log::warn;
use subtle::ConstantTimeEq;

/// Proof that the caller passed an [`AccessGate`]. Every operation that
/// writes pantry data, except the anonymous survey, takes one of these.
#[derive(Debug)]
pub struct WriteAccess {
    _granted: (),
}

impl WriteAccess {
    fn granted() -> Self {
        WriteAccess { _granted: () }
    }
}

pub trait AccessGate: Send + Sync {
    fn authorize(&self, token: Option<&str>) -> Result<WriteAccess, PantryError>;
}

/// Grants access to whoever presents the shared secret.
pub struct SharedSecretGate {
    secret: String,
}

impl SharedSecretGate {
    pub fn new(secret: impl Into<String>) -> Self {
        SharedSecretGate {
            secret: secret.into(),
        }
    }
}

impl AccessGate for SharedSecretGate {
    fn authorize(&self, token: Option<&str>) -> Result<WriteAccess, PantryError> {
        let token = token.ok_or(PantryError::AccessDenied)?;
        if bool::from(token.as_bytes().ct_eq(self.secret.as_bytes())) {
            Ok(WriteAccess::granted())
        } else {
            Err(PantryError::AccessDenied)
        }
    }
}

/// Grants access to everyone. Used when no secret is configured.
pub struct OpenGate;

impl AccessGate for OpenGate {
    fn authorize(&self, _token: Option<&str>) -> Result<WriteAccess, PantryError> {
        warn!("no write secret configured, granting write access");
        Ok(WriteAccess::granted())
    }
}

/// Gate backed by the secret in environment variable `var`, or an
/// [`OpenGate`] when it is unset or empty.
pub fn gate_from_env(var: &str) -> Box<dyn AccessGate> {
    match std::env::var(var) {
        Ok(secret) if !secret.is_empty() => Box::new(SharedSecretGate::new(secret)),
        _ => {
            warn!("{} is not set, writes are not protected", var);
            Box::new(OpenGate)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::access::{gate_from_env, AccessGate, OpenGate, SharedSecretGate};
    use crate::error::PantryError;

    use anyhow::Result;

    #[test]
    fn shared_secret() -> Result<()> {
        let gate = SharedSecretGate::new("pantry-staff");
        gate.authorize(Some("pantry-staff"))?;
        assert_eq!(
            gate.authorize(Some("pantry-staf")).err(),
            Some(PantryError::AccessDenied)
        );
        assert_eq!(gate.authorize(None).err(), Some(PantryError::AccessDenied));
        Ok(())
    }

    #[test]
    fn open_gate() -> Result<()> {
        OpenGate.authorize(None)?;
        OpenGate.authorize(Some("anything"))?;
        Ok(())
    }

    #[test]
    fn unset_variable_opens_gate() -> Result<()> {
        let gate = gate_from_env("PANTRY_TEST_SECRET_THAT_IS_NEVER_SET");
        gate.authorize(None)?;
        Ok(())
    }
}
