use secrecy::SecretString;
use std::convert::TryFrom;

// Define the global arguments
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub retries: u32,
    pub session_token: Option<SecretString>,
}

impl Default for GlobalArgs {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalArgs {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            retries: 1,
            session_token: None,
        }
    }

    pub fn set_retries(&mut self, retries: usize) {
        self.retries = u32::try_from(retries).unwrap_or(1).max(1);
    }

    pub fn set_session_token(&mut self, session_token: Option<SecretString>) {
        self.session_token = session_token;
    }
}
